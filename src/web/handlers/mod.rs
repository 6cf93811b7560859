// src/web/handlers/mod.rs

pub mod ai_handlers;
pub mod resume_handlers;
pub mod settings_handlers;
pub mod version_handlers;

pub use ai_handlers::*;
pub use resume_handlers::*;
pub use settings_handlers::*;
pub use version_handlers::*;
