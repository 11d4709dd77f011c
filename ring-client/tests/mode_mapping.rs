//! Property-based tests for the alarm mode mapping
//!
//! The raw-to-presentation mapping is the one piece of pure logic every
//! other component leans on, so it gets exhaustive treatment: totality,
//! stability, and serde round-trips.

use proptest::prelude::*;

use ring_client::{AlarmMode, LocationMode, RawAlarmMode};

/// Strategy over every raw mode the remote can report
fn raw_mode_strategy() -> impl Strategy<Value = RawAlarmMode> {
    prop_oneof![
        Just(RawAlarmMode::None),
        Just(RawAlarmMode::Some),
        Just(RawAlarmMode::All),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* raw mode, the mapped presentation mode is exactly one of
    /// disarm/home/arm — the mapping is total.
    #[test]
    fn prop_mapping_is_total(raw in raw_mode_strategy()) {
        let mapped = AlarmMode::from(raw);
        prop_assert!(matches!(
            mapped,
            AlarmMode::Disarm | AlarmMode::Home | AlarmMode::Arm
        ));
    }

    /// *For any* raw mode, mapping twice through the same input yields the
    /// same output — the mapping is a pure function, stable under repeated
    /// application.
    #[test]
    fn prop_mapping_is_stable(raw in raw_mode_strategy()) {
        prop_assert_eq!(AlarmMode::from(raw), AlarmMode::from(raw));
    }

    /// *For any* raw mode, the mapping is injective: distinct raw modes
    /// never collapse onto one presentation mode.
    #[test]
    fn prop_mapping_is_injective(a in raw_mode_strategy(), b in raw_mode_strategy()) {
        if a != b {
            prop_assert_ne!(AlarmMode::from(a), AlarmMode::from(b));
        }
    }

    /// *For any* raw mode, serde round-trips preserve the value
    #[test]
    fn prop_raw_mode_serde_roundtrip(raw in raw_mode_strategy()) {
        let json = serde_json::to_string(&raw).unwrap();
        let back: RawAlarmMode = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(raw, back);
    }
}

#[test]
fn mapping_matches_remote_semantics() {
    assert_eq!(AlarmMode::from(RawAlarmMode::None), AlarmMode::Disarm);
    assert_eq!(AlarmMode::from(RawAlarmMode::Some), AlarmMode::Home);
    assert_eq!(AlarmMode::from(RawAlarmMode::All), AlarmMode::Arm);
}

#[test]
fn fallback_command_values_cover_every_mode() {
    assert_eq!(AlarmMode::Disarm.as_location_mode(), LocationMode::Disarmed);
    assert_eq!(AlarmMode::Home.as_location_mode(), LocationMode::Home);
    assert_eq!(AlarmMode::Arm.as_location_mode(), LocationMode::Away);
}
