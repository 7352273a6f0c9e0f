//! The configuration surface this core consumes.
//!
//! Parsed with `serde`/`toml`, the same stack `cascade-cfg` uses for its
//! own per-zone configuration file.

use std::net::SocketAddr;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::Deserialize;

/// How far REFRESH/RETRY timers are jittered, as a percentage of the
/// interval (avoiding thundering herds of secondaries refreshing
/// in lockstep").
pub const JITTER_PCT: u32 = 10;

/// How long a freshly loaded secondary zone waits before its first AXFR,
/// spread out so a fleet restart does not open every transfer at once.
pub const BOOTSTRAP_DELAY_MS: u64 = 500;

/// The top-level configuration document: global settings plus one
/// section per zone.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default, rename = "zone")]
    pub zones: Vec<ZoneSection>,
}

/// Settings that apply to every zone unless overridden.
#[derive(Clone, Debug, Deserialize)]
pub struct GlobalConfig {
    /// Directory zonefiles are synced into.
    #[serde(default = "default_zonefile_dir")]
    pub zonefile_dir: Utf8PathBuf,

    /// How long the sync timer waits after a dirty journal before
    /// flushing to the zonefile, absent an eviction-triggered sync.
    #[serde(default = "default_dbsync_timeout", with = "duration_secs")]
    pub dbsync_timeout: Duration,

    /// Default per-zone journal size bound in bytes.
    #[serde(default = "default_journal_fslimit")]
    pub journal_fslimit: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            zonefile_dir: default_zonefile_dir(),
            dbsync_timeout: default_dbsync_timeout(),
            journal_fslimit: default_journal_fslimit(),
        }
    }
}

fn default_zonefile_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("/var/lib/cascade-zonecore/zones")
}

fn default_dbsync_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_journal_fslimit() -> usize {
    crate::zone_entry::DEFAULT_JOURNAL_FSLIMIT
}

/// One `[[zone]]` section.
#[derive(Clone, Debug, Deserialize)]
pub struct ZoneSection {
    pub name: String,

    /// The primary to transfer from, if this is a secondary zone.
    pub primary: Option<SocketAddr>,

    /// Secondaries to send NOTIFY to after a local update.
    #[serde(default)]
    pub notify_to: Vec<SocketAddr>,

    #[serde(default)]
    pub provide_xfr_to: Vec<AclEntryConfig>,
    #[serde(default)]
    pub allow_notify_from: Vec<AclEntryConfig>,
    #[serde(default)]
    pub allow_update_from: Vec<AclEntryConfig>,

    pub journal_fslimit: Option<usize>,
}

/// One configured ACL entry, as written in the TOML document.
#[derive(Clone, Debug, Deserialize)]
pub struct AclEntryConfig {
    pub network: std::net::IpAddr,
    #[serde(default = "default_prefix_len")]
    pub prefix_len: u8,
    pub key_name: Option<String>,
}

fn default_prefix_len() -> u8 {
    32
}

impl From<AclEntryConfig> for crate::acl::AclEntry {
    fn from(cfg: AclEntryConfig) -> Self {
        crate::acl::AclEntry {
            network: cfg.network,
            prefix_len: cfg.prefix_len,
            key_name: cfg.key_name,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Parse a configuration document from its TOML text.
pub fn parse(text: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(text)
}
