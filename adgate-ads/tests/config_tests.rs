use adgate_ads::{AdEngineConfig, AdVendor, AdsError, Placements, Platform, UnitTimings};
use adgate_types::{AdKind, BannerSize};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::time::Duration;

#[test]
fn defaults_match_shipped_values() {
    let config = AdEngineConfig::default();
    assert_eq!(config.cooldown_ms, 30_000);
    assert_eq!(config.max_per_session, 5);
    assert_eq!(config.load_retry_delay_ms, 10_000);
    assert_eq!(config.reload_after_close_delay_ms, 1_000);
    assert_eq!(config.init_wait_timeout(), Duration::from_secs(5));
    assert_eq!(config.banner_size, BannerSize::AnchoredAdaptive);
    assert!(config.validate().is_ok());
}

#[test]
fn partial_json_keeps_other_defaults() {
    let config = AdEngineConfig::from_json_str(
        r#"{ "vendor": "unity_ads", "platform": "ios", "cooldown_ms": 60000 }"#,
    )
    .unwrap();
    assert_eq!(config.vendor, AdVendor::UnityAds);
    assert_eq!(config.platform, Platform::Ios);
    assert_eq!(config.cooldown_ms, 60_000);
    assert_eq!(config.max_per_session, 5);
    assert_eq!(config.placements().interstitial, "Interstitial_iOS");
}

#[test]
fn configured_placements_override_test_ids() {
    let config = AdEngineConfig::from_json_str(
        r#"{
            "placements": {
                "banner": "prod/banner",
                "interstitial": "prod/interstitial",
                "rewarded": "prod/rewarded"
            },
            "banner_size": "medium_rectangle"
        }"#,
    )
    .unwrap();
    let placements = config.placements();
    assert_eq!(placements.for_kind(AdKind::Rewarded), "prod/rewarded");
    assert_eq!(config.banner_size, BannerSize::MediumRectangle);
}

#[test]
fn test_ids_differ_per_platform() {
    let android = Placements::test_ids(AdVendor::GoogleMobileAds, Platform::Android);
    let ios = Placements::test_ids(AdVendor::GoogleMobileAds, Platform::Ios);
    assert_ne!(android.interstitial, ios.interstitial);
    assert!(android.banner.starts_with("ca-app-pub-3940256099942544/"));
}

#[test]
fn empty_placement_is_rejected() {
    let err = AdEngineConfig::from_json_str(
        r#"{ "placements": { "banner": "b", "interstitial": " ", "rewarded": "r" } }"#,
    )
    .unwrap_err();
    assert!(matches!(err, AdsError::Config(msg) if msg.contains("interstitial")));
}

#[test]
fn zero_init_timeout_is_rejected() {
    let err = AdEngineConfig::from_json_str(r#"{ "init_wait_timeout_ms": 0 }"#).unwrap_err();
    assert!(matches!(err, AdsError::Config(_)));
}

#[test]
fn malformed_json_is_a_config_error() {
    let err = AdEngineConfig::from_json_str("{ cooldown_ms: ").unwrap_err();
    assert!(matches!(err, AdsError::Config(msg) if msg.starts_with("invalid JSON")));
}

#[test]
fn loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "max_per_session": 3, "load_retry_delay_ms": 2000 }}"#).unwrap();

    let config = AdEngineConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.max_per_session, 3);
    assert_eq!(
        config.unit_timings(),
        UnitTimings {
            load_retry_delay: Duration::from_secs(2),
            reload_after_close_delay: Duration::from_secs(1),
            max_load_retries: 5,
        }
    );
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AdEngineConfig::from_json_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, AdsError::Config(msg) if msg.contains("failed to read")));
}
