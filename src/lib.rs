pub mod autosave;
pub mod config;
pub mod gateway;
pub mod storage;
pub mod types;
pub mod versioning;
pub mod web;

pub use autosave::{AutosaveConfig, AutosaveCoordinator, SaveOutcome, SaveStatus};
pub use config::ConfigManager;
pub use gateway::GatewayClient;
pub use storage::ResumeStore;
pub use versioning::VersionHistory;
pub use web::start_web_server;
