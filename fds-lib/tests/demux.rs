//! Stream demultiplexer behaviour over whole and fragmented input

mod common;

use common::*;
use fds_lib::constants::ALTITUDE_NOTIFICATION;

#[test]
fn test_session_markers_around_split_field() {
    let (store, scans) = feed_chunks(["n41G10002000500", "0end-settings"]);

    assert!(scans[0].session_started);
    assert!(!scans[0].session_ended);
    assert_eq!(scans[0].buffer, "G10002000500");
    assert!(scans[0].changed.is_empty());

    assert!(scans[1].session_ended);
    assert!(scans[1].buffer.is_empty());
    assert_eq!(
        scans[1].changed,
        [Field::StageNumber(StageId::Ascend, StageNumber::AnnouncementFrequency)]
    );
    assert_eq!(
        store
            .snapshot()
            .stage_numbers(StageId::Ascend, StageNumber::AnnouncementFrequency),
        [1000, 2000, 5000]
    );
    assert!(store.catalog().contains(ALTITUDE_NOTIFICATION));
}

#[test]
fn test_notification_added_to_first_preset() {
    let (store, scans) = feed_chunks(["+2a01000Beep"]);
    assert!(scans[0].buffer.is_empty());
    let snapshot = store.snapshot();
    assert_eq!(
        snapshot.preset_settings[0].ascend_settings.additional_notifications,
        vec![AdditionalNotification::new("Beep", 1000)]
    );
    assert!(snapshot.preset_settings[1].ascend_settings.additional_notifications.is_empty());
}

#[test]
fn test_notification_removed_by_exact_match() {
    let (store, _) = feed_chunks(["+3c00500Flare+3c00600Flare", "-3c00500Flare-3c00700Flare"]);
    assert_eq!(
        store.snapshot().preset_settings[1].canopy_settings.additional_notifications,
        vec![AdditionalNotification::new("Flare", 600)]
    );
}

#[test]
fn test_full_dump_in_one_chunk() {
    let (store, scans) = feed_chunks([SETTINGS_DUMP]);
    let scan = &scans[0];
    assert!(scan.session_started);
    assert!(scan.session_ended);
    assert!(scan.buffer.is_empty(), "left over: {:?}", scan.buffer);

    let settings = store.snapshot();
    assert!(settings.general_settings.include_pre_jump_info);
    assert!(!settings.general_settings.include_post_jump_info);
    assert!(settings.general_settings.use_metric);
    assert_eq!(
        settings.stage_flags(StageId::Ascend, StageFlag::AbbreviateReadings),
        [true, false, true]
    );
    assert_eq!(settings.stage_numbers(StageId::Ascend, StageNumber::Volume), [5, 10, 1]);
    assert_eq!(settings.freefall_thresholds(), [10, 20, 30]);
    assert_eq!(settings.dropzone_offsets(), [100, -200, 0]);
    assert_eq!(
        settings.preset_settings[1].freefall_settings.additional_notifications,
        vec![AdditionalNotification::new("Swoop", 4000)]
    );
    assert_eq!(
        store.catalog().extra(),
        ["Swoop".to_string(), "Hop pop".to_string(), ALTITUDE_NOTIFICATION.to_string()]
    );
}

#[test]
fn test_every_two_way_split_matches_whole() {
    let (whole, _) = feed_chunks([SETTINGS_DUMP]);

    for split in 1..SETTINGS_DUMP.len() {
        let (head, tail) = SETTINGS_DUMP.split_at(split);
        let (store, scans) = feed_chunks([head, tail]);

        assert_eq!(store.snapshot(), whole.snapshot(), "split at {split}");
        assert_eq!(store.catalog(), whole.catalog(), "split at {split}");
        assert!(scans.iter().any(|s| s.session_started), "split at {split}");
        assert!(scans.iter().any(|s| s.session_ended), "split at {split}");
        assert!(scans.last().unwrap().buffer.is_empty(), "split at {split}");
    }
}

#[test]
fn test_byte_at_a_time_matches_whole() {
    let (whole, _) = feed_chunks([SETTINGS_DUMP]);
    let bytes: Vec<String> = SETTINGS_DUMP.chars().map(String::from).collect();
    let (store, scans) = feed_chunks(bytes.iter().map(String::as_str));

    assert_eq!(store.snapshot(), whole.snapshot());
    assert_eq!(store.catalog(), whole.catalog());
    assert!(scans.last().unwrap().buffer.is_empty());
}

#[test]
fn test_same_field_repeated_in_one_chunk() {
    let (store, scans) = feed_chunks(["A1A0"]);
    assert_eq!(scans[0].changed.len(), 2);
    assert!(!store.snapshot().general_settings.include_pre_jump_info);
}

#[test]
fn test_play_echo_carries_no_state() {
    let (store, scans) = feed_chunks(["pBeep"]);
    assert_eq!(scans[0].changed, [Field::PlayNotification]);
    assert_eq!(*store.snapshot(), Settings::default());
}

#[test]
fn test_unknown_text_is_kept() {
    let (_, scans) = feed_chunks(["xyz", "A1"]);
    assert_eq!(scans[0].buffer, "xyz");
    assert_eq!(scans[1].buffer, "xyz");
}

#[test]
fn test_name_running_past_chunk_end_matches_whole() {
    let message = "+2f04000Pull highaPull highend-settings";
    let (whole, _) = feed_chunks([message]);
    let (store, scans) = feed_chunks(["+2f04000Pull high", "aPull highend-settings"]);

    assert_eq!(scans[0].buffer, "+2f04000Pull high");
    assert!(scans[1].buffer.is_empty(), "left over: {:?}", scans[1].buffer);
    assert_eq!(store.snapshot(), whole.snapshot());
    assert_eq!(
        store.snapshot().preset_settings[0].freefall_settings.additional_notifications,
        vec![AdditionalNotification::new("Pull high", 4000)]
    );
}

#[test]
fn test_known_longer_name_split_after_prefix() {
    let announce = "aBeep twiceend settings";
    let (whole, _) = feed_chunks([announce, "+2a01000Beep twice"]);
    let (store, scans) = feed_chunks([announce, "+2a01000Beep", " twice"]);

    assert_eq!(scans[1].buffer, "+2a01000Beep");
    assert!(scans[2].buffer.is_empty(), "left over: {:?}", scans[2].buffer);
    assert_eq!(store.snapshot(), whole.snapshot());
    assert_eq!(
        store.snapshot().preset_settings[0].ascend_settings.additional_notifications,
        vec![AdditionalNotification::new("Beep twice", 1000)]
    );
}

#[test]
fn test_hyphen_after_name_waits_for_removal() {
    let (store, scans) = feed_chunks(["+3c00500Flare-", "3c00500Flare"]);
    assert_eq!(scans[0].buffer, "+3c00500Flare-");
    assert!(scans[1].buffer.is_empty());
    assert!(store.snapshot().preset_settings[1].canopy_settings.additional_notifications.is_empty());
}
