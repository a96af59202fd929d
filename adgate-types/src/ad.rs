//! Ad surface kinds and the values handed to UI code.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A distinct ad format with its own life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdKind {
    /// Persistent strip rendered by the UI layer.
    Banner,
    /// Full-screen ad shown between screens. Rate limited.
    Interstitial,
    /// User-initiated full-screen ad that grants a reward.
    Rewarded,
}

impl AdKind {
    /// Returns the lowercase name used in logs and configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Banner => "banner",
            Self::Interstitial => "interstitial",
            Self::Rewarded => "rewarded",
        }
    }

    /// Returns true for formats that take over the whole screen.
    #[must_use]
    pub const fn is_full_screen(&self) -> bool {
        matches!(self, Self::Interstitial | Self::Rewarded)
    }
}

impl fmt::Display for AdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "banner" => Ok(Self::Banner),
            "interstitial" => Ok(Self::Interstitial),
            "rewarded" => Ok(Self::Rewarded),
            other => Err(Error::UnknownAdKind(other.to_string())),
        }
    }
}

/// Banner dimensions understood by the supported SDKs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerSize {
    /// 320x50.
    Banner,
    /// 320x100.
    LargeBanner,
    /// 300x250.
    MediumRectangle,
    /// 468x60.
    FullBanner,
    /// 728x90.
    Leaderboard,
    /// Full width, height chosen by the SDK.
    #[default]
    AnchoredAdaptive,
}

impl BannerSize {
    /// Returns the fixed dimensions in density-independent pixels, or `None`
    /// for adaptive sizes.
    #[must_use]
    pub const fn dimensions(&self) -> Option<(u32, u32)> {
        match self {
            Self::Banner => Some((320, 50)),
            Self::LargeBanner => Some((320, 100)),
            Self::MediumRectangle => Some((300, 250)),
            Self::FullBanner => Some((468, 60)),
            Self::Leaderboard => Some((728, 90)),
            Self::AnchoredAdaptive => None,
        }
    }

    /// Returns the snake_case name used in configuration.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Banner => "banner",
            Self::LargeBanner => "large_banner",
            Self::MediumRectangle => "medium_rectangle",
            Self::FullBanner => "full_banner",
            Self::Leaderboard => "leaderboard",
            Self::AnchoredAdaptive => "anchored_adaptive",
        }
    }
}

impl FromStr for BannerSize {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "banner" => Ok(Self::Banner),
            "large_banner" => Ok(Self::LargeBanner),
            "medium_rectangle" => Ok(Self::MediumRectangle),
            "full_banner" => Ok(Self::FullBanner),
            "leaderboard" => Ok(Self::Leaderboard),
            "anchored_adaptive" => Ok(Self::AnchoredAdaptive),
            other => Err(Error::UnknownBannerSize(other.to_string())),
        }
    }
}

/// What the UI needs to render a banner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerConfig {
    /// SDK placement identifier.
    pub placement_id: String,
    /// Requested banner size.
    pub size: BannerSize,
}

/// Reward granted by a completed rewarded ad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    /// Reward type as configured on the SDK side (e.g. "coins").
    pub kind: String,
    /// Reward amount.
    pub amount: u32,
}

impl Reward {
    /// Creates a reward.
    pub fn new(kind: impl Into<String>, amount: u32) -> Self {
        Self {
            kind: kind.into(),
            amount,
        }
    }
}
