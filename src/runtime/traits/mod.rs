// ABOUTME: Composable capability traits for a Docker daemon client.
// ABOUTME: Defines SystemOps, ImageOps, ContainerOps, HostOps and the DaemonClient bundle.

mod container;
mod host;
mod image;
mod logs;
mod system;

pub use container::ContainerOps;
pub use host::HostOps;
pub use image::ImageOps;
pub use logs::LogOptions;
pub use system::SystemOps;

use super::error::DaemonError;
use super::stream::StreamSource;

/// Result of constructing a streaming daemon command.
pub type SourceResult<T> = Result<Box<dyn StreamSource<T>>, DaemonError>;

/// Everything the gateway needs from one daemon.
pub trait DaemonClient: SystemOps + ImageOps + ContainerOps + HostOps {}

impl<T> DaemonClient for T where T: SystemOps + ImageOps + ContainerOps + HostOps {}
