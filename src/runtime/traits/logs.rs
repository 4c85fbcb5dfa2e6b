// ABOUTME: Options for container log streaming.

/// Options for log streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogOptions {
    /// Keep the stream open for new output (like `tail -f`).
    pub follow: bool,
    /// Number of lines to show from the end; `None` shows everything.
    pub tail: Option<u64>,
    /// Prefix each line with the daemon timestamp.
    pub timestamps: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::follow_all()
    }
}

impl LogOptions {
    /// Follow all logs from the start. Matches a request with no options.
    pub fn follow_all() -> Self {
        Self {
            follow: true,
            tail: None,
            timestamps: false,
        }
    }

    /// The last `n` lines without following.
    pub fn tail(n: u64) -> Self {
        Self {
            follow: false,
            tail: Some(n),
            timestamps: false,
        }
    }

    pub fn new(follow: bool, tail: Option<u64>) -> Self {
        Self {
            follow,
            tail,
            timestamps: false,
        }
    }

    /// Value of the daemon's `tail` query parameter.
    pub fn tail_param(&self) -> String {
        self.tail
            .map(|n| n.to_string())
            .unwrap_or_else(|| "all".to_string())
    }
}
