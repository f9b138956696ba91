//! Prompt templates, one per model-backed step

mod template;

pub use template::StepPromptTemplates;
