//! Subcommand implementations

pub mod config;
pub mod scan;

use std::path::Path;

use anyhow::Context;
use reflekt_engine::ReflektConfig;

/// Effective configuration: `--config`, else `./reflekt.toml`, else defaults,
/// with `REFLEKT_CLASSPATH` applied on top
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ReflektConfig> {
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let config = ReflektConfig::discover(path, &cwd).with_context(|| match path {
        Some(path) => format!("failed to load {}", path.display()),
        None => "failed to load reflekt.toml".to_string(),
    })?;
    Ok(config.with_env_overrides())
}
