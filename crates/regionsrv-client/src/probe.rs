//! Latency probing of candidate region servers.
//!
//! Each candidate listed in `server.regionsrv` is probed once with a
//! blocking HTTPS GET and the round-trip wall clock time is recorded. The
//! probes run strictly in list order, one at a time; total probe time is
//! the sum of the individual latencies, a simplicity trade-off this client
//! accepts. The candidate with the lowest recorded latency names the
//! region.

use crate::config::ClientConfig;
use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Outcome of a single latency probe against one candidate server.
#[derive(Clone, Debug)]
pub struct ProbeResult {
    /// Hostname exactly as listed in `server.regionsrv`.
    pub server: String,
    /// Round-trip time of the probe; `None` when the server was
    /// unreachable or the TLS handshake failed.
    pub elapsed: Option<Duration>,
}

/// Determine the closest region by probing every candidate server and
/// picking the lowest observed latency.
///
/// Candidates that refuse the connection or fail the TLS handshake are
/// skipped; any other failure aborts the whole probe. Returns an empty
/// string when no candidate responded.
pub fn probe_closest(cfg: &ClientConfig) -> Result<String> {
    let api = cfg.require("server", "api")?;
    let servers = cfg.require("server", "regionsrv")?;
    let client = reqwest::blocking::Client::new();

    // The server list is taken verbatim: order preserved, no trimming,
    // duplicates kept.
    let mut results = Vec::new();
    for server in servers.split(',') {
        results.push(probe_one(&client, server, &api)?);
    }

    Ok(closest_region(&results).to_string())
}

/// Probe a single candidate and record how long the request took.
fn probe_one(
    client: &reqwest::blocking::Client,
    server: &str,
    api: &str,
) -> Result<ProbeResult> {
    let url = format!("https://{server}/{api}");
    let start = Instant::now();
    match client.get(&url).send() {
        Ok(_) => {
            let elapsed = start.elapsed();
            debug!("Probe of {} took {:?}", server, elapsed);
            Ok(ProbeResult {
                server: server.to_string(),
                elapsed: Some(elapsed),
            })
        }
        // Unreachable candidates don't abort the probe; reqwest reports
        // refused connections and TLS handshake failures as connect errors.
        Err(err) if err.is_connect() => {
            info!("Skipping unreachable region server {}: {}", server, err);
            Ok(ProbeResult {
                server: server.to_string(),
                elapsed: None,
            })
        }
        Err(err) => Err(err).with_context(|| format!("probe of {url} failed")),
    }
}

/// Pick the candidate with the lowest recorded latency and map it to its
/// region code. The first occurrence of the minimum wins, so ties break
/// deterministically in list order.
#[must_use]
pub fn closest_region(results: &[ProbeResult]) -> &str {
    let mut best: Option<(&str, Duration)> = None;
    for result in results {
        if let Some(elapsed) = result.elapsed {
            match best {
                Some((_, fastest)) if fastest <= elapsed => {}
                _ => best = Some((&result.server, elapsed)),
            }
        }
    }
    best.map(|(server, _)| region_code(server)).unwrap_or("")
}

/// Extract the region code from a candidate hostname.
///
/// Hostnames carrying the `rgn` prefix encode the code in the following
/// two characters (`rgnde1` -> `de`); any other hostname uses its first
/// two characters (`usw1` -> `us`). Short names degrade to whatever is
/// there rather than failing.
#[must_use]
pub fn region_code(server: &str) -> &str {
    match server.strip_prefix("rgn") {
        Some(rest) => rest.get(..2).unwrap_or(rest),
        None => server.get(..2).unwrap_or(server),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn reached(server: &str, millis: u64) -> ProbeResult {
        ProbeResult {
            server: server.to_string(),
            elapsed: Some(Duration::from_millis(millis)),
        }
    }

    fn unreached(server: &str) -> ProbeResult {
        ProbeResult {
            server: server.to_string(),
            elapsed: None,
        }
    }

    /// Port on localhost with nothing listening, so connections are
    /// refused immediately.
    fn refused_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[test]
    fn rgn_prefixed_hostname_yields_embedded_code() {
        assert_eq!(region_code("rgnde1.example.net"), "de");
        assert_eq!(region_code("rgnus2"), "us");
    }

    #[test]
    fn plain_hostname_yields_leading_code() {
        assert_eq!(region_code("usw1"), "us");
        assert_eq!(region_code("euw2.example.net"), "eu");
    }

    #[test]
    fn short_hostnames_do_not_panic() {
        assert_eq!(region_code("u"), "u");
        assert_eq!(region_code("rgn"), "");
        assert_eq!(region_code("rgnd"), "d");
        assert_eq!(region_code(""), "");
    }

    #[test]
    fn fastest_candidate_wins() {
        let results = [reached("rgnde1", 30), reached("rgnus2", 80)];
        assert_eq!(closest_region(&results), "de");
    }

    #[test]
    fn fastest_plain_candidate_uses_leading_characters() {
        let results = [reached("usw1", 20), reached("euw2", 90)];
        assert_eq!(closest_region(&results), "us");
    }

    #[test]
    fn ties_break_in_list_order() {
        let results = [reached("rgnde1", 50), reached("rgnus2", 50)];
        assert_eq!(closest_region(&results), "de");
    }

    #[test]
    fn unreachable_candidates_are_ignored_for_selection() {
        let results = [unreached("rgnde1"), reached("rgnus2", 120)];
        assert_eq!(closest_region(&results), "us");
    }

    #[test]
    fn no_reachable_candidate_yields_empty_region() {
        assert_eq!(closest_region(&[unreached("rgnde1")]), "");
        assert_eq!(closest_region(&[]), "");
    }

    #[test]
    fn refused_connections_are_skipped_not_fatal() {
        let port = refused_port();
        let cfg = ClientConfig::from_ini(&format!(
            "[server]\napi = regionInfo\nregionsrv = 127.0.0.1:{port},127.0.0.1:{port}\n"
        ))
        .unwrap();

        let region = probe_closest(&cfg).unwrap();
        assert_eq!(region, "");
    }

    #[test]
    fn probe_requires_server_section() {
        let cfg = ClientConfig::from_ini("[instance]\nregion = us\n").unwrap();
        let err = probe_closest(&cfg).unwrap_err();
        assert!(err.to_string().contains("server.api"));
    }
}
