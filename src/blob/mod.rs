//! Turning a generated text blob into a project on disk.
//!
//! - `fence`: strip the single surrounding code fence
//! - `manifest`: split the body into logical files
//! - `materialize`: write the files into an owned temporary root

mod fence;
mod manifest;
mod materialize;

pub use fence::{strip_fence, FenceResult};
pub use manifest::{fallback_name, normalize_path, FileManifest, ManifestError, GENERIC_FALLBACK_NAME};
pub use materialize::MaterializedProject;
