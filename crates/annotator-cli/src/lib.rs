//! The `annotator` command: reads platform events, posts them to the
//! dashboard as annotations.
//!
//! Configuration comes from a TOML file (default `annotator.toml`), then
//! `ANNOTATOR_*` environment variables, then command-line flags, each layer
//! overriding the previous one. See [`config::load_config`] and
//! [`cli::RunSettings::resolve`].

pub mod cli;
pub mod config;
pub mod logging;
pub mod run;

pub use cli::{Cli, RunSettings, SourceSelection};
pub use config::{load_config, Config, ConfigError};
pub use run::{execute, run, RunError, RunSummary};
