/// Severity of a log line. Ordered from most to least verbose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Per-frame chatter (every control frame in/out).
    Trace,
    /// Handshake steps, reader start/stop, track swaps.
    Debug,
    /// Session lifecycle: start, join, peer added, call ended.
    Info,
    /// Recoverable trouble: device failures, dropped frames, failed connects.
    Warn,
    /// Broken invariants and transport faults.
    Error,
}

impl LogLevel {
    /// Fixed-width label used by the file writer.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO ",
            Self::Warn => "WARN ",
            Self::Error => "ERROR",
        }
    }
}
