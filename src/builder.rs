use crate::{
    config::MultipartConfig,
    error::ConfigError,
    limits::Limits,
    schema::PartSchema,
    Transcoder,
};

/// Builder for configuring a [`Transcoder`].
#[derive(Debug, Clone, Default)]
pub struct MultipartBuilder {
    config: MultipartConfig,
}

impl MultipartBuilder {
    /// Creates a builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current builder configuration snapshot.
    pub fn config(&self) -> &MultipartConfig {
        &self.config
    }

    /// Replaces the full builder configuration.
    pub fn with_config(mut self, config: MultipartConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets decode limits.
    pub fn limits(mut self, limits: Limits) -> Self {
        self.config.limits = limits;
        self
    }

    /// Caps the size of one part's header block.
    pub fn max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.config.limits.max_header_bytes = Some(max_header_bytes);
        self
    }

    /// Caps the number of parts in a message.
    pub fn max_parts(mut self, max_parts: usize) -> Self {
        self.config.limits.max_parts = Some(max_parts);
        self
    }

    /// Validates decoded parts against `schema`.
    pub fn schema(mut self, schema: PartSchema) -> Self {
        self.config.schema = Some(schema);
        self
    }

    /// Validates builder configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()
    }

    /// Finalizes and returns validated configuration.
    pub fn build_config(self) -> Result<MultipartConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Finalizes into a [`Transcoder`].
    pub fn build(self) -> Result<Transcoder, ConfigError> {
        Transcoder::with_config(self.config)
    }
}
