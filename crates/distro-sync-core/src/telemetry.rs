//! Tracing setup for the distro-sync binary.
//!
//! Logs go to stderr so stdout stays free for the run summary, which CI
//! steps may capture or parse as JSON. The HTTP stack is held at `warn`
//! unless `RUST_LOG` says otherwise, so `--verbose` shows our own debug
//! events without connection-pool chatter.

use tracing::Level;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Shape of log lines on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, one event per line
    #[default]
    Text,
    /// Newline-delimited JSON objects
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

const QUIET_TARGETS: [&str; 3] = ["hyper", "hyper_util", "reqwest"];

fn build_filter(level: Level) -> EnvFilter {
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(level).into())
            .from_env_lossy();
    }

    QUIET_TARGETS.iter().fold(
        EnvFilter::new(level.as_str()),
        |filter, target| match format!("{target}=warn").parse::<Directive>() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        },
    )
}

/// Install the global subscriber; returns `false` when one was already set.
pub fn init_tracing(format: LogFormat, level: Level) -> bool {
    let text = (format == LogFormat::Text)
        .then(|| fmt::layer().with_target(false).with_writer(std::io::stderr));
    let json = (format == LogFormat::Json)
        .then(|| fmt::layer().with_target(false).with_writer(std::io::stderr).json());

    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(text)
        .with(json)
        .try_init()
        .is_ok()
}
