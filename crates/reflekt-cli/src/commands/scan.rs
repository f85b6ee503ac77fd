//! `reflekt scan`: list the compiled units under a namespace.

use std::path::PathBuf;

use anyhow::bail;
use reflekt_engine::{ReflectContext, ReflektConfig};
use tracing::info;

/// Arguments of `reflekt scan`
pub struct ScanArgs {
    pub config: Option<PathBuf>,
    pub namespace: String,
    pub classpath: Vec<PathBuf>,
    pub archive: Option<PathBuf>,
    pub extension: Option<String>,
}

pub fn execute(args: ScanArgs) -> anyhow::Result<()> {
    let config = apply_overrides(super::load_config(args.config.as_deref())?, &args)?;
    let ctx = ReflectContext::new(config);

    let discovery = ctx.scanner().discover_names(&args.namespace)?;
    let Some(strategy) = discovery.strategy else {
        bail!("no types found under '{}'", args.namespace);
    };
    info!(namespace = %args.namespace, strategy, count = discovery.names.len(), "scan complete");

    for name in &discovery.names {
        println!("{}", name);
    }
    eprintln!(
        "{} type(s) under '{}' (via {})",
        discovery.names.len(),
        args.namespace,
        strategy
    );
    Ok(())
}

fn apply_overrides(mut config: ReflektConfig, args: &ScanArgs) -> anyhow::Result<ReflektConfig> {
    for dir in &args.classpath {
        if !config.scan.classpath.contains(dir) {
            config.scan.classpath.push(dir.clone());
        }
    }
    if let Some(archive) = &args.archive {
        config.scan.archive = Some(archive.clone());
    }
    if let Some(extension) = &args.extension {
        config.scan.unit_extension = extension.trim_start_matches('.').to_string();
    }
    config.validate()?;
    Ok(config)
}
