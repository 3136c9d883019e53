//! Region hint from the EC2 instance metadata service.
//!
//! EC2 guests learn their placement from the link-local metadata service
//! instead of probing region servers. The availability zone carries a
//! trailing zone letter (`us-east-1a`); dropping it yields the region.

use reqwest::StatusCode;
use tracing::warn;

const METADATA_URL: &str = "http://169.254.169.254/latest/meta-data/";
const ZONE_INFO: &str = "placement/availability-zone";

/// Plugin entry point invoked by the registration client on EC2.
///
/// Returns `None` when the metadata service cannot be reached or does not
/// answer with an availability zone; the failure is logged, not fatal.
pub fn generate_region_srv_args() -> Option<String> {
    region_hint_from(METADATA_URL)
}

fn region_hint_from(metadata_url: &str) -> Option<String> {
    let url = format!("{metadata_url}{ZONE_INFO}");
    let response = match reqwest::blocking::get(&url) {
        Ok(response) => response,
        Err(err) => {
            warn!("Unable to determine instance placement from \"{}\": {}", url, err);
            return None;
        }
    };

    let status = response.status();
    let body = match response.text() {
        Ok(body) => body,
        Err(err) => {
            warn!("Unable to read availability zone response: {}", err);
            return None;
        }
    };

    if status != StatusCode::OK {
        warn!("Unable to get availability zone metadata");
        warn!("\tReturn code: {}", status.as_u16());
        warn!("\tMessage: {}", body);
        return None;
    }

    Some(format!("regionHint={}", region_from_zone(&body)))
}

/// Remove the trailing availability zone letter to get the region,
/// `us-east-1a` -> `us-east-1`.
fn region_from_zone(zone: &str) -> &str {
    match zone.char_indices().last() {
        Some((idx, _)) => &zone[..idx],
        None => zone,
    }
}
