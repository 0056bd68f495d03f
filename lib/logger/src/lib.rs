use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
  EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

/// How the log stream is formatted on stdout.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StdioLogMode {
  #[default]
  Standard,
  Json,
  None,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct LogConfig {
  /// `error` / `warn` / `info` / `debug` / `trace`.
  pub level: String,
  pub stdio: StdioLogMode,
  /// Use `tracing_subscriber`'s multi-line pretty formatter.
  pub pretty: bool,
  pub ansi: bool,
  /// Include the module path target in each line.
  pub location: bool,
}

impl Default for LogConfig {
  fn default() -> Self {
    LogConfig {
      level: "info".to_string(),
      stdio: StdioLogMode::Standard,
      pretty: false,
      ansi: true,
      location: false,
    }
  }
}

/// Initializes the global `tracing` subscriber. Safe to call once per
/// process; a second call returns an error rather than panicking.
pub fn init(config: &LogConfig) -> anyhow::Result<()> {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(&config.level));

  let registry =
    Registry::default().with(LevelFilter::from_level(
      config.level.parse().unwrap_or(tracing::Level::INFO),
    ));

  match (config.stdio, config.pretty) {
    (StdioLogMode::Standard, true) => registry
      .with(filter)
      .with(
        tracing_subscriber::fmt::layer()
          .pretty()
          .with_file(false)
          .with_line_number(false)
          .with_target(config.location)
          .with_ansi(config.ansi),
      )
      .try_init(),
    (StdioLogMode::Standard, false) => registry
      .with(filter)
      .with(
        tracing_subscriber::fmt::layer()
          .with_file(false)
          .with_line_number(false)
          .with_target(config.location)
          .with_ansi(config.ansi),
      )
      .try_init(),
    (StdioLogMode::Json, _) => registry
      .with(filter)
      .with(tracing_subscriber::fmt::layer().json())
      .try_init(),
    (StdioLogMode::None, _) => Ok(()),
  }
  .context("failed to init logger")
}
