use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::Context;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_hosts_file")]
    pub hosts_file: PathBuf,
    #[serde(default = "default_interfaces_file")]
    pub interfaces_file: PathBuf,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_hosts_file() -> PathBuf {
    PathBuf::from("/etc/dhcp/dhcpd.conf")
}

fn default_interfaces_file() -> PathBuf {
    PathBuf::from("/etc/default/isc-dhcp-server")
}

fn default_poll_interval() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hosts_file: default_hosts_file(),
            interfaces_file: default_interfaces_file(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .context("Failed to parse config file")?;
        Ok(config)
    }

    /// File values (or defaults when `path` is None), then
    /// `DHCP_CONF_PATH` / `INTERFACES_CONF_PATH` from the environment.
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        Ok(config.with_overrides(|key| std::env::var_os(key)))
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<std::ffi::OsString>,
    {
        if let Some(path) = lookup("DHCP_CONF_PATH").filter(|v| !v.is_empty()) {
            self.hosts_file = PathBuf::from(path);
        }
        if let Some(path) = lookup("INTERFACES_CONF_PATH").filter(|v| !v.is_empty()) {
            self.interfaces_file = PathBuf::from(path);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn load_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dhcpconf.toml");
        fs::write(&path, "hosts_file = \"/srv/dhcpd.conf\"\npoll_interval_secs = 30\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.hosts_file, PathBuf::from("/srv/dhcpd.conf"));
        assert_eq!(config.interfaces_file, default_interfaces_file());
        assert_eq!(config.poll_interval_secs, 30);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn environment_overrides_file() {
        let config = Config::default().with_overrides(|key| match key {
            "DHCP_CONF_PATH" => Some(OsString::from("/tmp/dhcpd.conf")),
            "INTERFACES_CONF_PATH" => Some(OsString::new()),
            _ => None,
        });
        assert_eq!(config.hosts_file, PathBuf::from("/tmp/dhcpd.conf"));
        assert_eq!(config.interfaces_file, default_interfaces_file());
    }
}
