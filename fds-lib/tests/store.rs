//! Settings store: transmission gate and notification list semantics

mod common;

use common::*;

#[tokio::test]
async fn test_apply_and_send_rereads_triple() {
    let (transport, device) = mock_link();
    let mut store = SettingsStore::default();
    store.apply_command(Command::StageNumbers(StageId::Canopy, StageNumber::Volume, [3, 4, 5]));

    let edit = Edit::Stage(preset(0), StageId::Canopy, StageValue::Number(StageNumber::Volume, 9));
    let command = store.apply_and_send(edit, &transport).await.unwrap();

    assert_eq!(command, Command::StageNumbers(StageId::Canopy, StageNumber::Volume, [9, 4, 5]));
    assert_eq!(device.sent(), ["X090405"]);
}

#[tokio::test]
async fn test_local_apply_never_transmits() {
    let (transport, device) = mock_link();
    let mut store = SettingsStore::default();

    store.apply(Edit::General(GeneralSetting::IncludePostJumpInfo, true)).unwrap();
    store.apply_command(Command::General(GeneralSetting::UseMetric, true));
    assert!(device.sent().is_empty());

    store
        .apply_and_send(Edit::FreefallThreshold(preset(2), 120), &transport)
        .await
        .unwrap();
    assert_eq!(device.sent(), ["Y000000120"]);
    let settings = store.snapshot();
    assert!(settings.general_settings.include_post_jump_info);
    assert!(settings.general_settings.use_metric);
}

#[tokio::test]
async fn test_duplicate_add_is_still_sent_once_stored() {
    let (transport, device) = mock_link();
    let mut store = SettingsStore::default();
    let door = AdditionalNotification::new("Door", 13_000);

    for _ in 0..2 {
        store
            .apply_and_send(Edit::AddNotification(preset(1), StageId::Ascend, door.clone()), &transport)
            .await
            .unwrap();
    }

    assert_eq!(
        store.snapshot().preset_settings[1].ascend_settings.additional_notifications,
        vec![door]
    );
    assert_eq!(device.sent(), ["+3a13000Door", "+3a13000Door"]);
}

#[test]
fn test_remove_missing_keeps_order() {
    let mut store = SettingsStore::default();
    for (name, altitude) in [("Base", 1000), ("Final", 300), ("Downwind", 900)] {
        store.add_preset_stage_notification(preset(2), StageId::Canopy, AdditionalNotification::new(name, altitude));
    }
    let before = store.snapshot().preset_settings[2].canopy_settings.additional_notifications.clone();

    store.remove_preset_stage_notification(preset(2), StageId::Canopy, AdditionalNotification::new("Final", 301));
    store.remove_preset_stage_notification(preset(0), StageId::Canopy, AdditionalNotification::new("Final", 300));

    assert_eq!(
        store.snapshot().preset_settings[2].canopy_settings.additional_notifications,
        before
    );
}

#[test]
fn test_altitude_band_checked_against_current_values() {
    let mut store = SettingsStore::default();
    let raise_to = Edit::Stage(preset(0), StageId::Freefall, StageValue::Number(StageNumber::ToAltitude, 14_000));
    let raise_from = Edit::Stage(preset(0), StageId::Freefall, StageValue::Number(StageNumber::FromAltitude, 12_000));
    assert!(store.apply(raise_from.clone()).is_err());
    store.apply(raise_to).unwrap();
    store.apply(raise_from).unwrap();
    assert_eq!(
        store.snapshot().preset_settings[0].freefall_settings.from_altitude,
        12_000
    );
}
