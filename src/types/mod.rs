// src/types/mod.rs

pub mod gateway;
pub mod resume;

pub use resume::{
    AiSuggestion, CustomSection, Education, Experience, Project, Resume, ResumeSections,
    ResumeVersion, TemplateKind, UserBasicInfo,
};
