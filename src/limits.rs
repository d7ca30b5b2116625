use crate::error::ConfigError;

/// Default cap on a single part's header block.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 16 * 1024;

/// Resource limits enforced while decoding a multipart message.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum size in bytes of one part's header block.
    ///
    /// `None` lets header blocks grow without bound.
    pub max_header_bytes: Option<usize>,
    /// Maximum number of parts in a message.
    pub max_parts: Option<usize>,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_header_bytes: Some(DEFAULT_MAX_HEADER_BYTES),
            max_parts: None,
        }
    }
}

impl Limits {
    /// Creates the default limits configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits with nothing enforced.
    pub fn unlimited() -> Self {
        Self {
            max_header_bytes: None,
            max_parts: None,
        }
    }

    /// Validates that every configured limit is non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_header_bytes == Some(0) {
            return Err(ConfigError::InvalidLimitValue {
                limit: "max_header_bytes",
            });
        }

        if self.max_parts == Some(0) {
            return Err(ConfigError::InvalidLimitValue { limit: "max_parts" });
        }

        Ok(())
    }

    /// Returns `true` when `count` parts stay within [`Limits::max_parts`].
    pub fn allows_part_count(&self, count: usize) -> bool {
        let allowed = self.max_parts.map_or(true, |max| count <= max);

        #[cfg(feature = "tracing")]
        if !allowed {
            tracing::debug!(
                count = count,
                max_parts = ?self.max_parts,
                "limits: part count rejected"
            );
        }

        allowed
    }
}
