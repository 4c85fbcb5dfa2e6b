// ABOUTME: Type-safe identifiers and validated domain types.
// ABOUTME: Uses phantom types to prevent ID confusion at compile time.

mod id;
mod image_ref;

pub use id::{ConfigId, ContainerId, Id, ImageId};
pub use image_ref::{ImageRef, ParseImageRefError};
