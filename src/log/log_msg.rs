use crate::log::log_level::LogLevel;

/// A single queued log line.
///
/// Producers build these on their own thread; the logger worker formats and
/// writes them, so everything needed for the final line travels with it.
#[derive(Debug, Clone)]
pub struct LogMsg {
    /// Severity of the line.
    pub level: LogLevel,
    /// Wall-clock timestamp in milliseconds since the UNIX epoch.
    pub ts_ms: u128,
    /// Rendered message text.
    pub text: String,
    /// Module path of the call site (`module_path!()`).
    pub target: &'static str,
}

impl LogMsg {
    /// Creates a new `LogMsg`.
    ///
    /// ```rust,ignore
    /// let msg = LogMsg::new(LogLevel::Info, "peer joined", module_path!(), now_millis());
    /// ```
    pub fn new(
        level: LogLevel,
        text: impl Into<String>,
        target: &'static str,
        ts_ms: u128,
    ) -> Self {
        Self {
            level,
            ts_ms,
            text: text.into(),
            target,
        }
    }

    /// Renders the line exactly as the file writer stores it.
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "[{}] {} {} | {}",
            self.level.label(),
            self.ts_ms,
            self.target,
            self.text
        )
    }
}
