//! Configuration handling for the region server client.
//!
//! The client reads an INI-style configuration file, by default
//! `/etc/regionserverclnt.cfg`, with an `[instance]` section carrying an
//! optional region override and a `[server]` section naming the API path
//! and the candidate region servers:
//!
//! ```ini
//! [server]
//! api = regionInfo
//! regionsrv = rgnsrv1.susecloud.net,rgnsrv2.susecloud.net
//!
//! [instance]
//! region = us
//! ```
//!
//! A missing or unparsable file is an error; the plugin entry point treats
//! it as fatal because no region can be determined without configuration.

use anyhow::{Context, Result};
use config::{Config, File, FileFormat};
use std::path::{Path, PathBuf};

/// Location of the configuration file when no explicit path is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/regionserverclnt.cfg";

/// Parsed client configuration: sections mapped to key/value pairs.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    inner: Config,
}

impl ClientConfig {
    /// Load the configuration from `path`, falling back to
    /// [`DEFAULT_CONFIG_PATH`] when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        let inner = Config::builder()
            .add_source(File::from(path.clone()).format(FileFormat::Ini))
            .build()
            .with_context(|| {
                format!(
                    "could not read or parse configuration file {}",
                    path.display()
                )
            })?;
        Ok(Self { inner })
    }

    /// Parse configuration from an INI string.
    pub fn from_ini(content: &str) -> Result<Self> {
        let inner = Config::builder()
            .add_source(File::from_str(content, FileFormat::Ini))
            .build()
            .context("could not parse configuration")?;
        Ok(Self { inner })
    }

    /// Value of `key` in `section`, if present.
    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.inner.get_string(&format!("{section}.{key}")).ok()
    }

    /// Value of `key` in `section`, failing when absent.
    pub fn require(&self, section: &str, key: &str) -> Result<String> {
        self.inner
            .get_string(&format!("{section}.{key}"))
            .with_context(|| format!("configuration is missing {section}.{key}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
[server]
api = regionInfo
regionsrv = rgnsrv1.example.net,rgnsrv2.example.net

[instance]
region = us
";

    #[test]
    fn load_reads_sections_and_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let cfg = ClientConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.get("server", "api").as_deref(), Some("regionInfo"));
        assert_eq!(
            cfg.get("server", "regionsrv").as_deref(),
            Some("rgnsrv1.example.net,rgnsrv2.example.net")
        );
        assert_eq!(cfg.get("instance", "region").as_deref(), Some("us"));
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("regionserverclnt.cfg");

        let err = ClientConfig::load(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("regionserverclnt.cfg"));
    }

    #[test]
    fn get_returns_none_for_absent_key() {
        let cfg = ClientConfig::from_ini("[server]\napi = regionInfo\n").unwrap();
        assert_eq!(cfg.get("instance", "region"), None);
    }

    #[test]
    fn require_reports_the_missing_key() {
        let cfg = ClientConfig::from_ini("[server]\napi = regionInfo\n").unwrap();
        let err = cfg.require("server", "regionsrv").unwrap_err();
        assert!(err.to_string().contains("server.regionsrv"));
    }
}
