pub mod facts;
pub mod format;
pub mod generator;
pub mod postprocess;
pub mod prompts;
pub mod template;
pub mod tone;
pub mod variant;
