use std::{env, io};

use tracing::{level_filters::LevelFilter, subscriber, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::constants::ENV_LOG_LEVEL;

/// Log level requested through the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LevelFilter,
    /// Value that could not be parsed, reported once logging is up
    pub rejected: Option<String>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LevelFilter::WARN,
            rejected: None,
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_value(env::var(ENV_LOG_LEVEL).ok().as_deref())
    }

    pub fn from_value(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        match parse_level(raw) {
            Some(level) => Self {
                level,
                rejected: None,
            },
            None => Self {
                rejected: Some(raw.to_string()),
                ..Self::default()
            },
        }
    }

    /// `-v` flags win over the environment
    pub fn effective_level(&self, verbose: u8) -> LevelFilter {
        match verbose {
            0 => self.level,
            1 => LevelFilter::INFO.max(self.level),
            2 => LevelFilter::DEBUG.max(self.level),
            _ => LevelFilter::TRACE,
        }
    }
}

fn parse_level(raw: &str) -> Option<LevelFilter> {
    // Numbers follow zerolog's numbering, not tracing's
    if let Ok(number) = raw.parse::<i64>() {
        return match number {
            -1 => Some(LevelFilter::TRACE),
            0 => Some(LevelFilter::DEBUG),
            1 => Some(LevelFilter::INFO),
            2 => Some(LevelFilter::WARN),
            3..=5 => Some(LevelFilter::ERROR),
            7 => Some(LevelFilter::OFF),
            _ => None,
        };
    }

    match raw.to_ascii_lowercase().as_str() {
        "fatal" | "panic" => Some(LevelFilter::ERROR),
        "disabled" => Some(LevelFilter::OFF),
        other => other.parse().ok(),
    }
}

/// Install the global subscriber; logs go to stderr so stdout stays machine-readable
pub fn init(settings: &LogSettings, verbose: u8) -> anyhow::Result<()> {
    let level = settings.effective_level(verbose);

    // Allow RUST_LOG env var to override everything else
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .with_file(verbose >= 3)
        .with_line_number(verbose >= 3)
        .compact()
        .finish();

    subscriber::set_global_default(subscriber)?;

    if let Some(rejected) = &settings.rejected {
        warn!("Invalid value '{}' for '{}'", rejected, ENV_LOG_LEVEL);
    }

    Ok(())
}
