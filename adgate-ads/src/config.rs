//! Engine configuration.
//!
//! Every delay, cooldown and cap the engine uses lives here. Defaults match
//! the values the app shipped with; all of them can be overridden from JSON.

use crate::error::{AdsError, AdsResult};
use adgate_types::{AdKind, BannerSize};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Ad network behind the SDK adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdVendor {
    #[default]
    GoogleMobileAds,
    UnityAds,
}

impl AdVendor {
    /// Returns the snake_case name used in configuration and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::GoogleMobileAds => "google_mobile_ads",
            Self::UnityAds => "unity_ads",
        }
    }
}

/// Host platform. Only used to pick vendor test placements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Android,
    Ios,
}

/// Placement identifiers per ad surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placements {
    pub banner: String,
    pub interstitial: String,
    pub rewarded: String,
}

impl Placements {
    /// The vendor's public test placements for `platform`.
    #[must_use]
    pub fn test_ids(vendor: AdVendor, platform: Platform) -> Self {
        match (vendor, platform) {
            (AdVendor::GoogleMobileAds, Platform::Android) => Self {
                banner: "ca-app-pub-3940256099942544/9214589741".into(),
                interstitial: "ca-app-pub-3940256099942544/1033173712".into(),
                rewarded: "ca-app-pub-3940256099942544/5224354917".into(),
            },
            (AdVendor::GoogleMobileAds, Platform::Ios) => Self {
                banner: "ca-app-pub-3940256099942544/2435281174".into(),
                interstitial: "ca-app-pub-3940256099942544/4411468910".into(),
                rewarded: "ca-app-pub-3940256099942544/1712485313".into(),
            },
            (AdVendor::UnityAds, Platform::Android) => Self {
                banner: "Banner_Android".into(),
                interstitial: "Interstitial_Android".into(),
                rewarded: "Rewarded_Android".into(),
            },
            (AdVendor::UnityAds, Platform::Ios) => Self {
                banner: "Banner_iOS".into(),
                interstitial: "Interstitial_iOS".into(),
                rewarded: "Rewarded_iOS".into(),
            },
        }
    }

    /// Returns the placement for `kind`.
    #[must_use]
    pub fn for_kind(&self, kind: AdKind) -> &str {
        match kind {
            AdKind::Banner => &self.banner,
            AdKind::Interstitial => &self.interstitial,
            AdKind::Rewarded => &self.rewarded,
        }
    }
}

/// Configuration for [`AdEngine`](crate::AdEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdEngineConfig {
    /// Ad network in use.
    pub vendor: AdVendor,
    /// Host platform.
    pub platform: Platform,
    /// Production placements. When absent the vendor test placements are used.
    pub placements: Option<Placements>,
    /// Banner size handed to the UI.
    pub banner_size: BannerSize,
    /// Minimum time between interstitials (ms).
    pub cooldown_ms: u64,
    /// Maximum interstitials per process.
    pub max_per_session: u32,
    /// Delay before retrying a failed load (ms).
    pub load_retry_delay_ms: u64,
    /// Delay before preloading the next ad after one closes (ms).
    pub reload_after_close_delay_ms: u64,
    /// Consecutive load failures retried before a unit gives up.
    pub max_load_retries: u32,
    /// Upper bound on `wait_for_initialization` (ms).
    pub init_wait_timeout_ms: u64,
}

impl Default for AdEngineConfig {
    fn default() -> Self {
        Self {
            vendor: AdVendor::default(),
            platform: Platform::default(),
            placements: None,
            banner_size: BannerSize::default(),
            cooldown_ms: 30_000,
            max_per_session: 5,
            load_retry_delay_ms: 10_000,
            reload_after_close_delay_ms: 1_000,
            max_load_retries: 5,
            init_wait_timeout_ms: 5_000,
        }
    }
}

impl AdEngineConfig {
    /// Parses and validates a JSON configuration. Missing fields take
    /// their defaults.
    pub fn from_json_str(json: &str) -> AdsResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AdsError::Config(format!("invalid JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> AdsResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| AdsError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// Checks the configuration for values the engine cannot work with.
    pub fn validate(&self) -> AdsResult<()> {
        if let Some(p) = &self.placements {
            for (kind, id) in [
                (AdKind::Banner, &p.banner),
                (AdKind::Interstitial, &p.interstitial),
                (AdKind::Rewarded, &p.rewarded),
            ] {
                if id.trim().is_empty() {
                    return Err(AdsError::Config(format!("empty {kind} placement id")));
                }
            }
        }
        if self.init_wait_timeout_ms == 0 {
            return Err(AdsError::Config("init_wait_timeout_ms must be > 0".into()));
        }
        Ok(())
    }

    /// Effective placements: configured ones, or the vendor test ids.
    #[must_use]
    pub fn placements(&self) -> Placements {
        self.placements
            .clone()
            .unwrap_or_else(|| Placements::test_ids(self.vendor, self.platform))
    }

    /// Per-unit timing derived from this configuration.
    #[must_use]
    pub fn unit_timings(&self) -> UnitTimings {
        UnitTimings {
            load_retry_delay: Duration::from_millis(self.load_retry_delay_ms),
            reload_after_close_delay: Duration::from_millis(self.reload_after_close_delay_ms),
            max_load_retries: self.max_load_retries,
        }
    }

    /// Upper bound on `wait_for_initialization`.
    #[must_use]
    pub fn init_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.init_wait_timeout_ms)
    }
}

/// Retry and reload timing for one ad unit controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitTimings {
    pub load_retry_delay: Duration,
    pub reload_after_close_delay: Duration,
    pub max_load_retries: u32,
}

impl Default for UnitTimings {
    fn default() -> Self {
        AdEngineConfig::default().unit_timings()
    }
}
