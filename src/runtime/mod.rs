// ABOUTME: Daemon client layer: capability traits, bollard client, and connection factory.
// ABOUTME: Also hosts the stream adapter that turns daemon callbacks into cancellable streams.

pub mod bollard;
mod connector;
mod error;
mod stream;
pub mod traits;

pub use connector::{
    BollardConnector, ConnectionFactory, DaemonEndpoint, TlsMaterial, validate_connection,
};
pub use error::{ConnectionError, DaemonError, DaemonErrorKind};
pub use stream::{
    DEFAULT_STREAM_CAPACITY, DaemonStream, ItemStream, PumpSource, SinkClosed, StreamSink,
    StreamSource, Subscription, pump,
};
pub use traits::{
    ContainerOps, DaemonClient, HostOps, ImageOps, LogOptions, SourceResult, SystemOps,
};
