//! Region server plugin.
//!
//! Resolves the region hint for the registration client: an explicit
//! `instance.region` entry in the configuration wins, otherwise the
//! configured region servers are probed and the closest one names the
//! region.

use crate::config::ClientConfig;
use crate::probe;
use anyhow::Result;
use std::path::Path;
use std::process;
use tracing::warn;

/// Resolve the region for the given configuration.
///
/// An explicit `instance.region` entry short-circuits the latency probe,
/// so no network traffic happens when the override is set.
pub fn resolve_region(cfg: &ClientConfig) -> Result<String> {
    if let Some(region) = cfg.get("instance", "region") {
        return Ok(region);
    }
    probe::probe_closest(cfg)
}

/// Plugin entry point invoked by the registration client.
///
/// Loads the configuration from the default location and renders the
/// region hint argument, `regionHint=<code>`. The code is empty when no
/// region server was reachable.
pub fn generate_region_srv_args() -> Result<String> {
    generate_region_srv_args_from(None)
}

/// Same as [`generate_region_srv_args`] but reading the configuration
/// from an explicit path.
///
/// A missing or unparsable configuration file is fatal: the process exits
/// with a non-zero status after logging a warning, since no region can be
/// determined without configuration. Probe failures other than the
/// absorbed unreachable-server kinds propagate to the caller.
pub fn generate_region_srv_args_from(path: Option<&Path>) -> Result<String> {
    let cfg = match ClientConfig::load(path) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!("{err:#}");
            process::exit(1);
        }
    };
    let region = resolve_region(&cfg)?;
    Ok(format!("regionHint={region}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_region_override_wins_without_probing() {
        // No [server] section at all: a probe attempt would fail loudly,
        // so a successful resolve proves the override short-circuits.
        let cfg = ClientConfig::from_ini("[instance]\nregion = us\n").unwrap();
        assert_eq!(resolve_region(&cfg).unwrap(), "us");
    }

    #[test]
    fn entry_point_renders_the_hint_argument() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[instance]\nregion = de\n").unwrap();

        let args = generate_region_srv_args_from(Some(file.path())).unwrap();
        assert_eq!(args, "regionHint=de");
    }

    #[test]
    fn entry_point_renders_empty_hint_when_nothing_is_reachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "[server]\napi = regionInfo\nregionsrv = 127.0.0.1:{port}\n"
        )
        .unwrap();

        let args = generate_region_srv_args_from(Some(file.path())).unwrap();
        assert_eq!(args, "regionHint=");
    }
}
