use crate::{ConfigErrorResult, DEFAULT_MODEL_FILE, validate_relative_name};

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// GGUF model file, relative to the resource root
    pub file: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            file: String::from(DEFAULT_MODEL_FILE),
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        validate_relative_name("model.file", &self.file)
    }
}
