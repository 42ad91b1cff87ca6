//! Log subscriber setup
//!
//! Built on `tracing-subscriber` with per-target level control for the
//! chain and the two sources.

use filterfs_config::{LogConfig, LogFormat, LogLevel, TARGET_CHAIN, TARGET_MEMORY, TARGET_NATIVE};
use std::io;
use tracing::Level;
use tracing_subscriber::{
    filter::Targets, fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError,
    Layer, Registry,
};

fn to_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

/// Target filter derived from a `LogConfig`
pub fn targets(config: &LogConfig) -> Targets {
    Targets::new()
        .with_default(to_level(config.global))
        .with_target(TARGET_CHAIN, to_level(config.level_for(TARGET_CHAIN)))
        .with_target(TARGET_MEMORY, to_level(config.level_for(TARGET_MEMORY)))
        .with_target(TARGET_NATIVE, to_level(config.level_for(TARGET_NATIVE)))
}

/// Create formatter layer based on format
fn create_format_layer<W, F>(format: LogFormat, make_writer: F) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: io::Write + Send + Sync + 'static,
    F: Fn() -> W + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_target(true)
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .without_time()
            .with_writer(make_writer)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(make_writer)
            .boxed(),
    }
}

/// Install a global subscriber writing to stderr.
///
/// Fails if a global subscriber is already set.
pub fn try_init(config: &LogConfig) -> Result<(), TryInitError> {
    let layer = create_format_layer(config.format, io::stderr).with_filter(targets(config));
    tracing_subscriber::registry().with(layer).try_init()?;
    tracing::debug!(
        target: TARGET_CHAIN,
        global = config.global.as_str(),
        chain = config.level_for(TARGET_CHAIN).as_str(),
        memory = config.level_for(TARGET_MEMORY).as_str(),
        native = config.level_for(TARGET_NATIVE).as_str(),
        "log subscriber installed"
    );
    Ok(())
}

/// Install a global subscriber, ignoring one that is already set.
pub fn init(config: &LogConfig) {
    if try_init(config).is_err() {
        tracing::debug!(target: TARGET_CHAIN, "log subscriber already installed");
    }
}
