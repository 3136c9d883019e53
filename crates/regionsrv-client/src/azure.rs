//! Region hint from the Azure instance metadata service.
//!
//! The primary source is the instance metadata endpoint, which answers
//! with the location directly. When the metadata service cannot be
//! reached or answers with an HTTP error the plugin falls back to the
//! wire server: every nameserver in `resolv.conf` is a wire server
//! candidate, its goal state XML names an extensions document, and that
//! document carries the `<Location>` of the instance.

use regex::Regex;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{info, warn};

const METADATA_URL: &str = "http://169.254.169.254/metadata/instance/";
const ZONE_INFO: &str = "location";
const RESOLV_CONF: &str = "/etc/resolv.conf";

static EXTENSIONS_CONFIG_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<ExtensionsConfig>(.*?)</ExtensionsConfig>").unwrap());
static LOCATION_RX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<Location>(.*?)</Location>").unwrap());

/// Plugin entry point invoked by the registration client on Azure.
///
/// Returns `None` when neither the metadata service nor any wire server
/// could name the location; failures are logged, not fatal.
pub fn generate_region_srv_args() -> Option<String> {
    region_hint_from(METADATA_URL, Path::new(RESOLV_CONF))
}

fn region_hint_from(metadata_url: &str, resolv_conf: &Path) -> Option<String> {
    let url = format!("{metadata_url}{ZONE_INFO}");
    let client = agent_client(Duration::from_secs(5))?;

    match client.get(&url).header("Metadata", "true").send() {
        Ok(response) => {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            if status == StatusCode::OK {
                return Some(format!("regionHint={body}"));
            }
            // An HTTP error means the answer is not coming; only then is
            // the wire server worth asking.
            if status.is_client_error() || status.is_server_error() {
                info!("Falling back to XML data from wire server");
                return wire_server_hint(&nameservers(resolv_conf));
            }
            warn!("Unable to get availability zone metadata");
            warn!("\tReturn code: {}", status.as_u16());
            warn!("\tMessage: {}", body);
            None
        }
        Err(err) => {
            warn!(
                "Unable to determine instance placement from metadata server \"{}\": {}",
                url, err
            );
            info!("Falling back to XML data from wire server");
            wire_server_hint(&nameservers(resolv_conf))
        }
    }
}

/// Walk the wire server candidates and extract the location from the
/// extensions document referenced by their goal state.
fn wire_server_hint(nameservers: &[String]) -> Option<String> {
    let client = agent_client(Duration::from_secs(15))?;

    for nameserver in nameservers {
        let goal_state_url = format!("http://{nameserver}/machine/?comp=goalstate");
        let response = match agent_get(&client, &goal_state_url) {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    "Could not retrieve goal state XML from {}: {}",
                    nameserver, err
                );
                continue;
            }
        };
        if response.status() != StatusCode::OK {
            warn!(
                "{} error for goal state request: {}",
                nameserver,
                response.status().as_u16()
            );
            continue;
        }
        let goal_state = match response.text() {
            Ok(goal_state) => goal_state,
            Err(err) => {
                warn!("Could not read goal state XML from {}: {}", nameserver, err);
                continue;
            }
        };

        let Some(extensions_uri) = extensions_config_uri(&goal_state) else {
            warn!("No \"<ExtensionsConfig>\" in goal state XML");
            continue;
        };

        let response = match agent_get(&client, &extensions_uri) {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    "Could not get extensions information from \"{}\": {}",
                    extensions_uri, err
                );
                continue;
            }
        };
        if response.status() != StatusCode::OK {
            warn!(
                "Extensions request failed with: {}",
                response.status().as_u16()
            );
            continue;
        }
        let extensions = match response.text() {
            Ok(extensions) => extensions,
            Err(err) => {
                warn!("Could not read extensions document: {}", err);
                continue;
            }
        };

        match location_from_extensions(&extensions) {
            Some(location) => return Some(format!("regionHint={location}")),
            None => {
                warn!("No \"<Location>\" in extensions XML");
                continue;
            }
        }
    }

    warn!(
        "Could not determine location from any of the endpoints: {:?}",
        nameservers
    );
    None
}

/// Blocking client with the given request timeout.
fn agent_client(timeout: Duration) -> Option<Client> {
    match Client::builder().timeout(timeout).build() {
        Ok(client) => Some(client),
        Err(err) => {
            warn!("Could not construct HTTP client: {}", err);
            None
        }
    }
}

fn agent_get(client: &Client, url: &str) -> reqwest::Result<reqwest::blocking::Response> {
    client
        .get(url)
        .header("x-ms-agent-name", "WALinuxAgent")
        .header("x-ms-version", "2012-11-30")
        .send()
}

/// URI of the extensions document named by the goal state XML. The goal
/// state embeds it XML-escaped and percent-encoded.
fn extensions_config_uri(goal_state: &str) -> Option<String> {
    let captures = EXTENSIONS_CONFIG_RX.captures(goal_state)?;
    let unescaped = xml_unescape(&captures[1]);
    let uri = match urlencoding::decode(&unescaped) {
        Ok(decoded) => decoded.into_owned(),
        // Escapes decoding to invalid UTF-8 are left as they were.
        Err(_) => unescaped,
    };
    Some(uri)
}

/// Instance location named by the extensions document.
fn location_from_extensions(extensions: &str) -> Option<&str> {
    LOCATION_RX
        .captures(extensions)
        .map(|captures| captures.get(1).map_or("", |m| m.as_str()))
}

/// Undo XML entity escaping. `&amp;` goes last so it cannot manufacture
/// new entities.
fn xml_unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Nameserver addresses from resolv.conf; on Azure the wire server is
/// always listed among them.
fn nameservers(path: &Path) -> Vec<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!("Could not read {}: {}", path.display(), err);
            return Vec::new();
        }
    };
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match fields.next() {
                Some("nameserver") => fields.next().map(str::to_string),
                _ => None,
            }
        })
        .collect()
}
