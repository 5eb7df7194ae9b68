use anyhow::{Result, bail};
use clap::Subcommand;

use crate::config::{
    BACKEND_URL, Config, FLICKR_API_KEY, PEXELS_API_KEY, RADIUS_KM, SETTINGS, Settings, setting,
};

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective value of a setting
    Get { key: String },
    /// Store a setting
    Set { key: String, value: String },
    /// Remove a stored setting
    Unset { key: String },
    /// Show every setting with its effective value
    List,
}

/// API keys are shown masked.
fn display_value(key: &str, value: &str) -> String {
    let len = value.chars().count();
    if key.ends_with("api_key") && len > 4 {
        let tail: String = value.chars().skip(len - 4).collect();
        format!("****{tail}")
    } else {
        value.to_string()
    }
}

fn effective(settings: &Settings, key: &str) -> Option<String> {
    match key {
        BACKEND_URL => Some(settings.backend_url.clone()),
        FLICKR_API_KEY => settings.flickr_api_key.clone(),
        PEXELS_API_KEY => settings.pexels_api_key.clone(),
        RADIUS_KM => Some(settings.radius_km.to_string()),
        _ => None,
    }
}

/// Needs only the config table, so a bad stored value can always be fixed.
pub fn run(config: &Config, command: &ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Get { key } => {
            if setting(key).is_none() {
                bail!("unknown setting: {key}");
            }
            let settings = Settings::load(config)?;
            match effective(&settings, key) {
                Some(value) => println!("{}", display_value(key, &value)),
                None => println!("  {key} is not set"),
            }
        }
        ConfigCommand::Set { key, value } => {
            config.set(key, value)?;
            println!("✓ {key} = {}", display_value(key, value.trim()));
        }
        ConfigCommand::Unset { key } => {
            config.remove(key)?;
            println!("✓ {key} unset");
        }
        ConfigCommand::List => {
            let stored = config.list()?;
            let settings = Settings::load(config);
            for s in SETTINGS {
                let value = match &settings {
                    Ok(settings) => effective(settings, s.key),
                    Err(_) => stored.iter().find(|(k, _)| k == s.key).map(|(_, v)| v.clone()),
                };
                let origin = if stored.iter().any(|(k, _)| k == s.key) {
                    "stored"
                } else if std::env::var(s.env).is_ok_and(|v| !v.trim().is_empty()) {
                    "env"
                } else {
                    "default"
                };
                let shown = value.map_or_else(|| "-".to_string(), |v| display_value(s.key, &v));
                println!("  {:<15} {:<30} [{origin}]  {}", s.key, shown, s.description);
            }
            if let Err(e) = settings {
                eprintln!("warning: {e:#}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_keys_are_masked() {
        assert_eq!(display_value("flickr_api_key", "abcdef123456"), "****3456");
        assert_eq!(display_value("flickr_api_key", "abc"), "abc");
        assert_eq!(
            display_value("backend_url", "http://localhost:8000"),
            "http://localhost:8000"
        );
    }

    #[test]
    fn set_then_unset() {
        let config = Config::open(":memory:").unwrap();
        run(
            &config,
            &ConfigCommand::Set {
                key: "radius_km".to_string(),
                value: "30".to_string(),
            },
        )
        .unwrap();
        assert_eq!(config.get("radius_km").unwrap().as_deref(), Some("30"));

        run(
            &config,
            &ConfigCommand::Unset {
                key: "radius_km".to_string(),
            },
        )
        .unwrap();
        assert!(config.get("radius_km").unwrap().is_none());
    }

    #[test]
    fn get_unknown_key_fails() {
        let config = Config::open(":memory:").unwrap();
        assert!(
            run(
                &config,
                &ConfigCommand::Get {
                    key: "colour".to_string()
                }
            )
            .is_err()
        );
    }
}
