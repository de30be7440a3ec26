use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::prelude::*;
use nestify::nest;
use serde::{Deserialize, Serialize};

/// Executables whose name starts with this prefix belong to the tracked family
pub const DEFAULT_PREFIX: &str = "dcr";
pub const DEFAULT_AGENT_HOST: &str = "127.0.0.1";

nest! {
    #[derive(Debug, Default, Deserialize, Serialize, PartialEq, Eq)]*
    #[serde(rename_all = "kebab-case", default)]*
    /// Persistent configuration for dcrps.
    ///
    /// Stored at `~/.config/dcrps/config.yaml` by default. Every field is optional,
    /// values given on the command line take precedence.
    pub struct DcrpsConfig {
        pub prefix: Option<String>,
        pub agent: pub struct AgentConfig {
            /// Directory where agents write their port files
            pub config_dir: Option<PathBuf>,
            pub host: Option<String>,
        }
    }
}

/// Values passed on the command line (or through their environment variables)
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub prefix: Option<String>,
    pub agent_dir: Option<PathBuf>,
}

/// Effective settings after merging defaults, the config file and the overrides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub prefix: String,
    pub agent_dir: PathBuf,
    pub agent_host: String,
}

/// Base configuration directory, following the XDG Base Directory Specification
/// at https://specifications.freedesktop.org/basedir-spec/basedir-spec-latest.html
fn get_config_home() -> Result<PathBuf> {
    if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(config_home));
    }
    let home = env::var("HOME").context("HOME env variable not set")?;
    Ok(PathBuf::from(home).join(".config"))
}

/// If config_name is None, returns ~/.config/dcrps/config.yaml
/// If config_name is Some, returns ~/.config/dcrps/{config_name}.yaml
fn get_configuration_file_path(config_name: Option<&str>) -> Result<PathBuf> {
    let config_dir = get_config_home()?.join("dcrps");

    Ok(match config_name {
        Some(name) => config_dir.join(format!("{name}.yaml")),
        None => config_dir.join("config.yaml"),
    })
}

/// Directory the agents advertise their ports in when nothing else is configured
#[cfg(target_os = "macos")]
fn get_default_agent_dir() -> Result<PathBuf> {
    let home = env::var("HOME").context("HOME env variable not set")?;
    Ok(PathBuf::from(home).join("Library/Application Support/gops"))
}

#[cfg(not(target_os = "macos"))]
fn get_default_agent_dir() -> Result<PathBuf> {
    Ok(get_config_home()?.join("gops"))
}

impl DcrpsConfig {
    /// Load the configuration. If it does not exist, return a default configuration.
    pub fn load(config_name: Option<&str>) -> Result<Self> {
        let config_path = get_configuration_file_path(config_name)?;
        Self::load_from(&config_path)
    }

    fn load_from(config_path: &Path) -> Result<Self> {
        match fs::read(config_path) {
            Ok(config_str) => {
                let config: DcrpsConfig = serde_yaml::from_slice(&config_str).context(format!(
                    "Failed to parse dcrps config at {}",
                    config_path.display()
                ))?;
                debug!("Config loaded from {}", config_path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Config file not found at {}", config_path.display());
                Ok(DcrpsConfig::default())
            }
            Err(e) => bail!("Failed to load config: {e}"),
        }
    }

    /// Merge the file values with the command line overrides
    pub fn resolve(self, overrides: &Overrides) -> Result<Settings> {
        let prefix = overrides
            .prefix
            .clone()
            .or(self.prefix)
            .unwrap_or_else(|| DEFAULT_PREFIX.to_owned());

        let agent_dir = match overrides.agent_dir.clone().or(self.agent.config_dir) {
            Some(dir) => dir,
            None => get_default_agent_dir()?,
        };

        let agent_host = self
            .agent
            .host
            .unwrap_or_else(|| DEFAULT_AGENT_HOST.to_owned());

        Ok(Settings {
            prefix,
            agent_dir,
            agent_host,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = DcrpsConfig::load_from(&temp_dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, DcrpsConfig::default());
    }

    #[test]
    fn test_parse_kebab_case_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(
            &path,
            "prefix: btc\nagent:\n  config-dir: /tmp/agents\n  host: 10.0.0.2\n",
        )
        .unwrap();

        let config = DcrpsConfig::load_from(&path).unwrap();
        assert_eq!(config.prefix.as_deref(), Some("btc"));
        assert_eq!(config.agent.config_dir, Some(PathBuf::from("/tmp/agents")));
        assert_eq!(config.agent.host.as_deref(), Some("10.0.0.2"));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "prefix: [unterminated").unwrap();

        let err = DcrpsConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse dcrps config"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let config = DcrpsConfig {
            prefix: Some("btc".to_string()),
            agent: AgentConfig {
                config_dir: Some(PathBuf::from("/from/file")),
                host: None,
            },
        };
        let overrides = Overrides {
            prefix: Some("ltc".to_string()),
            agent_dir: Some(PathBuf::from("/from/cli")),
        };

        let settings = config.resolve(&overrides).unwrap();
        assert_eq!(settings.prefix, "ltc");
        assert_eq!(settings.agent_dir, PathBuf::from("/from/cli"));
        assert_eq!(settings.agent_host, DEFAULT_AGENT_HOST);
    }

    #[cfg(not(target_os = "macos"))]
    #[test]
    fn test_default_agent_dir_follows_xdg_config_home() {
        temp_env::with_vars([("XDG_CONFIG_HOME", Some("/xdg"))], || {
            let settings = DcrpsConfig::default()
                .resolve(&Overrides::default())
                .unwrap();
            assert_eq!(settings.prefix, DEFAULT_PREFIX);
            assert_eq!(settings.agent_dir, PathBuf::from("/xdg/gops"));
        });
    }

    #[test]
    fn test_named_config_path() {
        temp_env::with_vars([("XDG_CONFIG_HOME", Some("/xdg"))], || {
            assert_eq!(
                get_configuration_file_path(Some("testnet")).unwrap(),
                PathBuf::from("/xdg/dcrps/testnet.yaml")
            );
            assert_eq!(
                get_configuration_file_path(None).unwrap(),
                PathBuf::from("/xdg/dcrps/config.yaml")
            );
        });
    }
}
