//! Init command - write a default signalscope.toml

use anyhow::{Context, Result};
use std::path::Path;

use signalscope::config::{AnalysisConfig, CONFIG_FILE_NAME};

const HEADER: &str = "\
# Signalscope configuration
#
# Every key is optional; missing keys take the defaults shown here.
# Fusion weights must sum to 1.0.

";

/// Run the init command
pub fn run(path: &Path, force: bool) -> Result<()> {
    if !path.is_dir() {
        anyhow::bail!("Path is not a directory: {}", path.display());
    }
    let config_path = path.join(CONFIG_FILE_NAME);
    if config_path.exists() && !force {
        println!(
            "Config already exists at {} (use --force to overwrite)",
            config_path.display()
        );
        return Ok(());
    }

    let body = toml::to_string_pretty(&AnalysisConfig::default())
        .context("Failed to serialize default config")?;
    std::fs::write(&config_path, format!("{}{}", HEADER, body))
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Created {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use signalscope::config::load_config;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), false).unwrap();
        let loaded = load_config(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(loaded, AnalysisConfig::default());
    }

    #[test]
    fn test_init_keeps_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[engine]\nmax_findings = 7\n").unwrap();
        run(dir.path(), false).unwrap();
        assert_eq!(load_config(&path).unwrap().engine.max_findings, 7);

        run(dir.path(), true).unwrap();
        assert_eq!(load_config(&path).unwrap(), AnalysisConfig::default());
    }
}
