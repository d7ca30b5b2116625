//! Parts to frames to bytes.

/// Frame-to-byte rendering.
pub mod encoder;
/// Part-to-frame flattening.
pub mod frames;

pub use encoder::{FrameEncoder, MultipartBytes};
pub use frames::PartFrames;

use crate::error::ConfigError;

/// Chains [`PartFrames`] and [`MultipartBytes`] over a part stream.
pub fn serialize_parts<S>(
    boundary: &str,
    parts: S,
) -> Result<MultipartBytes<PartFrames<S>>, ConfigError> {
    MultipartBytes::new(boundary, PartFrames::new(parts))
}
