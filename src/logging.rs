//! Logging setup for bean-container
//!
//! The container emits `tracing` events under the `bean_container` target
//! whenever a definition is registered, the graph is resolved, a bean is
//! constructed or destroyed, and the container changes state. This module
//! installs a subscriber for applications that do not bring their own.
//!
//! # Features
//!
//! - `logging` - Emit container events (default)
//! - `logging-json` - JSON structured output
//! - `logging-pretty` - Human-readable colored output
//!
//! # Example
//!
//! ```rust,ignore
//! use bean_container::logging;
//!
//! logging::init();
//!
//! // Or configure explicitly
//! logging::builder()
//!     .info()
//!     .container_only()
//!     .pretty()
//!     .init();
//! ```

#[cfg(feature = "logging")]
use tracing::Level;

/// Target every container event is emitted under
pub const TARGET: &str = "bean_container";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logging
    #[default]
    Json,
    /// Multi-line colored output
    Pretty,
    /// Compact single-line output
    Compact,
}

/// Builder for the global subscriber
#[cfg(feature = "logging")]
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
    with_thread_names: bool,
}

#[cfg(feature = "logging")]
impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Json,
            target: None,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
            with_thread_names: false,
        }
    }
}

#[cfg(feature = "logging")]
impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    pub fn warn(self) -> Self {
        self.with_level(Level::WARN)
    }

    pub fn error(self) -> Self {
        self.with_level(Level::ERROR)
    }

    /// Only show events from `target`
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show container events
    pub fn container_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    pub fn with_thread_names(mut self) -> Self {
        self.with_thread_names = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// `EnvFilter` directive for the configured level and target
    pub fn filter_directive(&self) -> String {
        match self.target {
            Some(target) => format!("{}={}", target, self.level),
            None => self.level.to_string(),
        }
    }

    /// Install the subscriber globally.
    ///
    /// Does nothing if a global subscriber is already set.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        let _ = self.try_init();
    }

    /// Install the subscriber globally, failing if one is already set.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn try_init(self) -> Result<(), tracing_subscriber::util::TryInitError> {
        use tracing_subscriber::{EnvFilter, prelude::*};

        let filter = EnvFilter::new(self.filter_directive());
        tracing_subscriber::registry()
            .with(self.layer())
            .with(filter)
            .try_init()
    }

    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    fn layer(
        &self,
    ) -> Box<dyn tracing_subscriber::Layer<tracing_subscriber::Registry> + Send + Sync> {
        use tracing_subscriber::{Layer, fmt};

        let base = fmt::layer()
            .with_file(self.with_file)
            .with_line_number(self.with_line_number)
            .with_thread_ids(self.with_thread_ids)
            .with_thread_names(self.with_thread_names)
            .with_target(true);

        match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => base.json().boxed(),
            // Without the json feature, fall back to the default formatter
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => base.boxed(),
            LogFormat::Pretty => base.pretty().boxed(),
            LogFormat::Compact => base.compact().boxed(),
        }
    }

    /// No-op without a subscriber feature
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

/// Create a new logging builder
#[cfg(feature = "logging")]
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Initialize logging with default settings.
///
/// JSON when `logging-json` is enabled, pretty otherwise.
#[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
pub fn init() {
    #[cfg(feature = "logging-json")]
    init_json();

    #[cfg(all(feature = "logging-pretty", not(feature = "logging-json")))]
    init_pretty();
}

#[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
pub fn init() {}

/// JSON structured logging at DEBUG.
///
/// # Example output
/// ```json
/// {"timestamp":"2026-01-01T00:00:00.000Z","level":"DEBUG","fields":{"message":"Bean constructed","bean":"productService","scope":"singleton"},"target":"bean_container"}
/// ```
#[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
pub fn init_json() {
    builder().json().debug().init();
}

#[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
pub fn init_json() {}

/// Pretty colored logging at DEBUG.
///
/// # Example output
/// ```text
///   2026-01-01T00:00:00.000Z DEBUG bean_container: Bean constructed, bean: "productService", scope: singleton
/// ```
#[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
pub fn init_pretty() {
    builder().pretty().debug().init();
}

#[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
pub fn init_pretty() {}

/// Logging restricted to container events (other crates filtered out)
#[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
pub fn init_container_only() {
    builder().container_only().debug().init();
}

#[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
pub fn init_container_only() {}
