//! Configuration command.

use std::path::Path;

use crate::config::{self, Config};
use crate::error::Error;

/// Print the effective configuration (API keys masked).
///
/// With `init`, writes the defaults to the config file first, unless one
/// already exists.
pub fn cmd_config(config: &Config, path: Option<&Path>, init: bool) -> anyhow::Result<()> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => config::config_path().ok_or(config::ConfigError::NoConfigDir)?,
    };

    if init {
        if path.exists() {
            return Err(Error::invalid_input(format!("{} already exists", path.display())).into());
        }
        config::save_to(&Config::default(), &path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    println!("# {}", path.display());
    println!("{}", toml::to_string_pretty(&masked(config))?);
    Ok(())
}

/// Copy of `config` with API keys hidden.
fn masked(config: &Config) -> Config {
    let mut shown = config.clone();
    for provider in [
        &mut shown.providers.google_books,
        &mut shown.providers.open_library,
        &mut shown.providers.nytimes,
    ] {
        if provider.api_key.is_some() {
            provider.api_key = Some("********".to_string());
        }
    }
    shown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_keys() {
        let mut config = Config::default();
        config.providers.nytimes.api_key = Some("secret".to_string());

        let shown = masked(&config);
        assert_eq!(shown.providers.nytimes.api_key.as_deref(), Some("********"));
        assert_eq!(shown.providers.google_books.api_key, None);
        assert_eq!(config.providers.nytimes.api_key.as_deref(), Some("secret"));
    }

    #[test]
    fn test_init_writes_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");

        cmd_config(&Config::default(), Some(&path), true).unwrap();
        assert_eq!(config::load_from(&path), Config::default());
        assert!(cmd_config(&Config::default(), Some(&path), true).is_err());
    }
}
