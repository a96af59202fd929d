use adgate_types::{
    AdKind, BannerSize, Clock, EntitlementState, HandleId, ManualClock, StatusSnapshot,
};
use pretty_assertions::assert_eq;
use std::str::FromStr;

// ── EntitlementState ─────────────────────────────────────────────

#[test]
fn unloaded_state_is_not_entitled() {
    let state = EntitlementState::unloaded();
    assert!(!state.loaded);
    assert!(!state.is_entitled());
    assert_eq!(state, EntitlementState::default());
}

#[test]
fn either_flag_entitles() {
    assert!(EntitlementState::loaded(true, false).is_entitled());
    assert!(EntitlementState::loaded(false, true).is_entitled());
    assert!(EntitlementState::loaded(true, true).is_entitled());
    assert!(!EntitlementState::loaded(false, false).is_entitled());
}

#[test]
fn entitlement_serde_roundtrip() {
    let state = EntitlementState::loaded(true, false);
    let json = serde_json::to_string(&state).unwrap();
    let back: EntitlementState = serde_json::from_str(&json).unwrap();
    assert_eq!(state, back);
}

// ── AdKind / BannerSize ──────────────────────────────────────────

#[test]
fn ad_kind_display_and_parse() {
    for kind in [AdKind::Banner, AdKind::Interstitial, AdKind::Rewarded] {
        assert_eq!(AdKind::from_str(&kind.to_string()).unwrap(), kind);
    }
    assert!(AdKind::from_str("popup").is_err());
}

#[test]
fn only_interstitial_and_rewarded_are_full_screen() {
    assert!(!AdKind::Banner.is_full_screen());
    assert!(AdKind::Interstitial.is_full_screen());
    assert!(AdKind::Rewarded.is_full_screen());
}

#[test]
fn banner_size_parse_matches_serde_names() {
    let size: BannerSize = serde_json::from_str("\"medium_rectangle\"").unwrap();
    assert_eq!(size, BannerSize::MediumRectangle);
    assert_eq!(BannerSize::from_str(size.as_str()).unwrap(), size);
    assert!(BannerSize::from_str("huge").is_err());
}

#[test]
fn adaptive_banner_has_no_fixed_dimensions() {
    assert_eq!(BannerSize::default(), BannerSize::AnchoredAdaptive);
    assert_eq!(BannerSize::AnchoredAdaptive.dimensions(), None);
    assert_eq!(BannerSize::Banner.dimensions(), Some((320, 50)));
}

// ── StatusSnapshot ───────────────────────────────────────────────

#[test]
fn should_show_ads_requires_loaded_unentitled_and_initialized() {
    let free = EntitlementState::loaded(false, false);
    assert!(StatusSnapshot::should_show_ads_for(&free, true));
    assert!(!StatusSnapshot::should_show_ads_for(&free, false));
    assert!(!StatusSnapshot::should_show_ads_for(
        &EntitlementState::unloaded(),
        true
    ));
    assert!(!StatusSnapshot::should_show_ads_for(
        &EntitlementState::loaded(false, true),
        true
    ));
}

// ── HandleId ─────────────────────────────────────────────────────

#[test]
fn handle_ids_are_unique_and_display_as_uuids() {
    let a = HandleId::new();
    let b = HandleId::default();
    assert_ne!(a, b);

    let text = a.to_string();
    assert_eq!(text.len(), 36);
    assert_eq!(text.matches('-').count(), 4);
    assert_ne!(text, b.to_string());
}

// ── ManualClock ──────────────────────────────────────────────────

#[test]
fn manual_clock_moves_only_when_told() {
    let clock = ManualClock::new(1_000);
    assert_eq!(clock.now_ms(), 1_000);
    clock.advance(500);
    assert_eq!(clock.now_ms(), 1_500);
    clock.set(0);
    assert_eq!(clock.now_ms(), 0);
}

mod props {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn entitled_iff_any_flag(premium: bool, staff: bool) {
            let state = EntitlementState::loaded(premium, staff);
            prop_assert_eq!(state.is_entitled(), premium || staff);
            prop_assert!(!StatusSnapshot::should_show_ads_for(&state, true) || !(premium || staff));
        }
    }
}
