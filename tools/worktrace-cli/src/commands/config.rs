//! Show or save the effective configuration.

use std::path::PathBuf;

use worktrace_common::AppConfig;

pub fn run(config: &AppConfig, path: Option<PathBuf>, write: bool) -> anyhow::Result<()> {
    config
        .analysis
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {e}"))?;

    println!("{}", serde_json::to_string_pretty(config)?);

    if write {
        let saved = match path {
            Some(path) => config.save_to(&path).map(|()| path),
            None => config.save(),
        }
        .map_err(|e| anyhow::anyhow!("Failed to save config: {e}"))?;
        println!("\nConfig saved to: {}", saved.display());
    }

    Ok(())
}
