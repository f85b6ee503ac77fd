//! `reflekt config`: print the effective configuration.

use std::path::Path;

pub fn execute(path: Option<&Path>) -> anyhow::Result<()> {
    let config = super::load_config(path)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}
