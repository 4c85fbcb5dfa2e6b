// ABOUTME: Image operations trait for a Docker daemon.
// ABOUTME: List, inspect, search, remove, import, load, save, pull, and push images.

use super::SourceResult;
use crate::runtime::error::DaemonError;
use crate::types::{ImageId, ImageRef};
use async_trait::async_trait;
use bollard::models::{
    BuildInfo, CreateImageInfo, ImageInspect, ImageSearchResponseItem, ImageSummary,
    PushImageInfo,
};
use bytes::Bytes;

#[async_trait]
pub trait ImageOps: Send + Sync {
    async fn list_images(&self) -> Result<Vec<ImageSummary>, DaemonError>;

    async fn inspect_image(&self, id: &ImageId) -> Result<ImageInspect, DaemonError>;

    async fn search_images(&self, term: &str) -> Result<Vec<ImageSearchResponseItem>, DaemonError>;

    async fn remove_image(&self, id: &ImageId) -> Result<(), DaemonError>;

    /// Import a root filesystem tarball as `reference`.
    async fn create_image(
        &self,
        reference: &ImageRef,
        archive: Bytes,
    ) -> Result<Vec<CreateImageInfo>, DaemonError>;

    /// Load images from a `docker save` archive.
    async fn load_image(&self, archive: Bytes) -> Result<Vec<BuildInfo>, DaemonError>;

    /// Export an image as a tar archive.
    async fn save_image(&self, reference: &ImageRef) -> Result<Bytes, DaemonError>;

    fn pull_image(&self, reference: &ImageRef) -> SourceResult<CreateImageInfo>;

    fn push_image(&self, reference: &ImageRef) -> SourceResult<PushImageInfo>;
}
