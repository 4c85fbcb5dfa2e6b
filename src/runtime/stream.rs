// ABOUTME: Bridges push-style daemon callbacks into pull-based cancellable streams.
// ABOUTME: One bounded channel per stream; dropping the consumer closes the daemon subscription.

use super::error::DaemonError;
use futures::stream::FusedStream;
use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, trace, warn};

/// Items buffered between a daemon callback and a slow consumer.
pub const DEFAULT_STREAM_CAPACITY: usize = 32;

/// Boxed stream handed to transports.
pub type ItemStream<T> = Pin<Box<dyn Stream<Item = Result<T, DaemonError>> + Send>>;

/// Push side of a streaming daemon command.
///
/// `start` begins delivery into `sink` and returns a handle that stops it.
/// Delivery may happen on any thread, before or after `start` returns.
pub trait StreamSource<T>: Send {
    fn start(self: Box<Self>, sink: StreamSink<T>) -> Result<Box<dyn Subscription>, DaemonError>;
}

/// Cancellation handle for a started daemon stream.
pub trait Subscription: Send {
    fn close(&mut self) -> Result<(), DaemonError>;
}

#[derive(Debug)]
enum Terminal {
    Complete,
    Failed(DaemonError),
}

type TerminalSlot = Arc<Mutex<Option<Terminal>>>;

/// The consumer dropped the stream; further items are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stream consumer is gone")]
pub struct SinkClosed;

/// Callback surface given to a [`StreamSource`].
///
/// The first terminal signal wins. Items and signals after it are ignored.
pub struct StreamSink<T> {
    label: Arc<str>,
    tx: Mutex<Option<mpsc::Sender<T>>>,
    terminal: TerminalSlot,
}

impl<T: Send> StreamSink<T> {
    /// Deliver one item, waiting while the buffer is full.
    pub async fn next(&self, item: T) -> Result<(), SinkClosed> {
        let tx = self.tx.lock().clone().ok_or(SinkClosed)?;
        tx.send(item).await.map_err(|_| SinkClosed)
    }

    pub fn complete(&self) {
        self.terminate(Terminal::Complete);
    }

    pub fn error(&self, err: DaemonError) {
        self.terminate(Terminal::Failed(err));
    }

    /// True once the consumer is gone or a terminal signal was sent.
    pub fn is_closed(&self) -> bool {
        self.tx.lock().as_ref().is_none_or(|tx| tx.is_closed())
    }

    fn terminate(&self, terminal: Terminal) {
        {
            let mut slot = self.terminal.lock();
            if slot.is_some() {
                debug!(stream = %self.label, ?terminal, "ignoring signal after stream end");
                return;
            }
            *slot = Some(terminal);
        }
        // Dropping the sender lets the consumer observe the end after buffered items.
        self.tx.lock().take();
    }
}

impl<T> fmt::Debug for StreamSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSink")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

enum State<T> {
    Idle(Box<dyn StreamSource<T>>),
    Running {
        rx: mpsc::Receiver<T>,
        terminal: TerminalSlot,
        subscription: Box<dyn Subscription>,
    },
    Done,
}

/// Pull side of a daemon stream.
///
/// Nothing reaches the daemon until the first poll. Items arrive in callback
/// order; a failure is yielded once as the final `Err`; a [`DaemonError::Cancelled`]
/// failure ends the stream normally. Dropping it early closes the subscription.
pub struct DaemonStream<T> {
    label: Arc<str>,
    capacity: usize,
    state: State<T>,
}

impl<T> Unpin for DaemonStream<T> {}

impl<T: Send + 'static> DaemonStream<T> {
    pub fn new(label: impl Into<Arc<str>>, source: Box<dyn StreamSource<T>>) -> Self {
        Self {
            label: label.into(),
            capacity: DEFAULT_STREAM_CAPACITY,
            state: State::Idle(source),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn boxed(self) -> ItemStream<T> {
        Box::pin(self)
    }

    fn launch(&mut self, source: Box<dyn StreamSource<T>>) -> Result<(), DaemonError> {
        let (tx, rx) = mpsc::channel(self.capacity);
        let terminal = TerminalSlot::default();
        let sink = StreamSink {
            label: Arc::clone(&self.label),
            tx: Mutex::new(Some(tx)),
            terminal: Arc::clone(&terminal),
        };

        debug!(stream = %self.label, capacity = self.capacity, "starting daemon stream");
        let subscription = source.start(sink)?;
        self.state = State::Running {
            rx,
            terminal,
            subscription,
        };
        Ok(())
    }

    fn finish(&mut self) {
        if let State::Running {
            mut subscription, ..
        } = std::mem::replace(&mut self.state, State::Done)
        {
            close_subscription(&self.label, subscription.as_mut());
        }
    }
}

fn close_subscription(label: &str, subscription: &mut dyn Subscription) {
    if let Err(err) = subscription.close() {
        warn!(stream = %label, error = %err, "failed to close daemon subscription");
    }
}

/// The error to yield as the final item, if any.
fn end_with(label: &str, err: DaemonError) -> Option<DaemonError> {
    if err.is_cancellation() {
        debug!(stream = %label, "daemon stream cancelled");
        None
    } else {
        debug!(stream = %label, error = %err, "daemon stream failed");
        Some(err)
    }
}

impl<T: Send + 'static> Stream for DaemonStream<T> {
    type Item = Result<T, DaemonError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if let State::Idle(_) = this.state {
            let State::Idle(source) = std::mem::replace(&mut this.state, State::Done) else {
                return Poll::Ready(None);
            };
            if let Err(err) = this.launch(source) {
                return Poll::Ready(end_with(&this.label, err).map(Err));
            }
        }

        let State::Running { rx, terminal, .. } = &mut this.state else {
            return Poll::Ready(None);
        };

        match rx.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(item)) => {
                trace!(stream = %this.label, "daemon stream item");
                Poll::Ready(Some(Ok(item)))
            }
            Poll::Ready(None) => {
                let outcome = terminal.lock().take();
                this.finish();
                match outcome {
                    None | Some(Terminal::Complete) => {
                        debug!(stream = %this.label, "daemon stream completed");
                        Poll::Ready(None)
                    }
                    Some(Terminal::Failed(err)) => Poll::Ready(end_with(&this.label, err).map(Err)),
                }
            }
        }
    }
}

impl<T: Send + 'static> FusedStream for DaemonStream<T> {
    fn is_terminated(&self) -> bool {
        matches!(self.state, State::Done)
    }
}

impl<T> Drop for DaemonStream<T> {
    fn drop(&mut self) {
        if let State::Running { subscription, .. } = &mut self.state {
            debug!(stream = %self.label, "consumer dropped daemon stream, closing subscription");
            close_subscription(&self.label, subscription.as_mut());
        }
    }
}

/// Source backed by an async stream, pumped on a spawned task.
pub struct PumpSource<S> {
    stream: S,
}

impl<S> PumpSource<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

impl<S, T> StreamSource<T> for PumpSource<S>
where
    S: Stream<Item = Result<T, DaemonError>> + Send + 'static,
    T: Send + 'static,
{
    fn start(self: Box<Self>, sink: StreamSink<T>) -> Result<Box<dyn Subscription>, DaemonError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| DaemonError::Unreachable(format!("no async runtime: {}", e)))?;
        let stream = self.stream;

        let task = runtime.spawn(async move {
            let mut stream = std::pin::pin!(stream);
            while let Some(next) = stream.next().await {
                match next {
                    Ok(item) => {
                        if sink.next(item).await.is_err() {
                            return;
                        }
                    }
                    Err(err) => {
                        sink.error(err);
                        return;
                    }
                }
            }
            sink.complete();
        });

        Ok(Box::new(TaskSubscription(task.abort_handle())))
    }
}

struct TaskSubscription(AbortHandle);

impl Subscription for TaskSubscription {
    fn close(&mut self) -> Result<(), DaemonError> {
        self.0.abort();
        Ok(())
    }
}

/// Stream a sequence of results through the adapter.
pub fn pump<S, T>(label: impl Into<Arc<str>>, stream: S) -> DaemonStream<T>
where
    S: Stream<Item = Result<T, DaemonError>> + Send + 'static,
    T: Send + 'static,
{
    DaemonStream::new(label, Box::new(PumpSource::new(stream)))
}
