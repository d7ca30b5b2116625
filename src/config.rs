use crate::{error::ConfigError, limits::Limits, schema::PartSchema};

/// Top-level transcoder configuration model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultipartConfig {
    /// Decode-side resource limits.
    pub limits: Limits,
    /// Cardinality schema applied to decoded parts, if any.
    pub schema: Option<PartSchema>,
}

impl MultipartConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates limits and schema.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        if let Some(schema) = &self.schema {
            schema.validate()?;
        }
        Ok(())
    }
}
