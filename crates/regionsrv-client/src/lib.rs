//! Region hint plugins for the cloud guest registration client.
//!
//! A cloud guest registering with the update infrastructure needs to know
//! which region it runs in so it can talk to the nearest registration
//! server. This crate provides the plugins that produce that hint:
//!
//! - [`regionsrv`]: probes the configured region servers over HTTPS and
//!   picks the one with the lowest round-trip latency
//! - [`ec2`]: asks the EC2 instance metadata service for the availability
//!   zone
//! - [`azure`]: asks the Azure instance metadata service for the location,
//!   falling back to the wire server goal state
//!
//! Every plugin renders its answer as `regionHint=<code>` for the
//! registration client. Configuration lives in
//! `/etc/regionserverclnt.cfg`; see [`config`] for the format.

pub mod azure;
pub mod config;
pub mod ec2;
pub mod probe;
pub mod regionsrv;

// Re-export key types for convenience
pub use config::{ClientConfig, DEFAULT_CONFIG_PATH};
pub use probe::{ProbeResult, closest_region, probe_closest, region_code};
pub use regionsrv::{generate_region_srv_args, generate_region_srv_args_from, resolve_region};
