//! Tracing and observability plugin.
//!
//! [`TracingPlugin`] installs the `tracing` subscriber while the application
//! is built, so the registration and composition passes run by
//! [`Conflux::finish`] are already logged. It also registers a
//! [`TracingConfig`] component describing the installed settings.
//!
//! # Example
//!
//! ```
//! use conflux_compose::app::Conflux;
//! use conflux_config::MapConfig;
//! use conflux_core::{TracingConfig, TracingFormat, TracingPlugin};
//! use tracing::Level;
//!
//! let config = MapConfig::new()
//!     .with("conflux.tracing.level", "debug")
//!     .with("conflux.tracing.format", "compact");
//! let plugin = TracingPlugin::from_config(&config).unwrap();
//!
//! let mut app = Conflux::new(config);
//! app.add_plugins(plugin);
//! let runtime = app.finish().unwrap();
//!
//! let installed = runtime.container().resolve::<TracingConfig>().unwrap();
//! assert_eq!(installed.level, Level::DEBUG);
//! assert_eq!(installed.format, TracingFormat::Compact);
//! ```

use conflux_compose::app::Conflux;
use conflux_compose::component::{Component, ComponentDef};
use conflux_compose::plugin::Plugin;
use conflux_config::{ConfigError, ConfigSource};
use core::str::FromStr;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Maximum log level: `trace`, `debug`, `info`, `warn` or `error`.
pub const LEVEL_KEY: &str = "conflux.tracing.level";
/// Output format: `pretty`, `compact` or `json`.
pub const FORMAT_KEY: &str = "conflux.tracing.format";
/// Target directives, e.g. `conflux_compose=debug,hyper=warn`.
pub const FILTER_KEY: &str = "conflux.tracing.filter";
/// Whether span enter/exit events are printed.
pub const SPAN_EVENTS_KEY: &str = "conflux.tracing.span-events";

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

impl FromStr for TracingFormat {
    type Err = TracingSettingsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(TracingSettingsError::Format(raw.to_string())),
        }
    }
}

/// Error reading tracing settings from configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TracingSettingsError {
    /// `conflux.tracing.level` is not a log level.
    #[error("invalid tracing level '{0}'")]
    Level(String),
    /// `conflux.tracing.format` is not a known format.
    #[error("invalid tracing format '{0}': expected pretty, compact or json")]
    Format(String),
    /// A typed setting failed to parse.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// The settings the subscriber was installed with.
///
/// Registered as a component, so factories can adapt their own logging:
///
/// ```
/// # use conflux_compose::container::Container;
/// # use conflux_core::TracingConfig;
/// # use tracing::Level;
/// fn verbose(container: &Container) -> bool {
///     container
///         .resolve::<TracingConfig>()
///         .is_ok_and(|config| config.level >= Level::DEBUG)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TracingConfig {
    /// The configured log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
}

impl Component for TracingConfig {}

// ─────────────────────────────────────────────────────────────────────────────
// TracingPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Configures the `tracing` subscriber.
///
/// Installation uses `try_init`, so a subscriber set up earlier (by a test
/// harness or the host application) is left in place.
///
/// ```
/// use conflux_core::{TracingFormat, TracingPlugin};
/// use tracing::Level;
///
/// // Development: pretty output with span events
/// let dev = TracingPlugin::new()
///     .with_level(Level::DEBUG)
///     .with_span_events(true);
///
/// // Production: JSON with per-target levels
/// let prod = TracingPlugin::new()
///     .with_format(TracingFormat::Json)
///     .with_env_filter("conflux_compose=info,hyper=warn");
/// ```
#[derive(Debug, Clone)]
pub struct TracingPlugin {
    level: Level,
    format: TracingFormat,
    /// Directives that replace the plain level filter when they parse.
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingPlugin {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingPlugin {
    /// Creates a plugin logging at `info` in the pretty format.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the `conflux.tracing.*` keys. Absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TracingSettingsError`] if a present value does not parse.
    pub fn from_config(config: &dyn ConfigSource) -> Result<Self, TracingSettingsError> {
        let mut plugin = Self::default();
        if let Some(raw) = config.get_string(LEVEL_KEY) {
            plugin.level = Level::from_str(&raw).map_err(|_| TracingSettingsError::Level(raw))?;
        }
        if let Some(raw) = config.get_string(FORMAT_KEY) {
            plugin.format = raw.parse()?;
        }
        plugin.env_filter = config.get_string(FILTER_KEY);
        plugin.span_events = config.get_bool(SPAN_EVENTS_KEY)?.unwrap_or(false);
        Ok(plugin)
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets target directives in `target=level,...` form.
    ///
    /// Directives that fail to parse fall back to the plain level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    fn filter(&self) -> EnvFilter {
        self.env_filter
            .as_deref()
            .and_then(|directives| EnvFilter::try_new(directives).ok())
            .unwrap_or_else(|| EnvFilter::new(self.level.as_str()))
    }

    fn install(&self) {
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };
        let registry = tracing_subscriber::registry().with(self.filter());

        // try_init fails if a global subscriber already exists; keep that one.
        let installed = match self.format {
            TracingFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init(),
            TracingFormat::Compact => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init(),
            TracingFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init(),
        };

        if installed.is_ok() {
            tracing::info!(level = %self.level, format = ?self.format, "tracing initialized");
        }
    }
}

impl Plugin for TracingPlugin {
    fn build(&self, app: &mut Conflux) {
        self.install();
        app.add_component(ComponentDef::instance(TracingConfig {
            level: self.level,
            format: self.format,
        }));
    }
}
