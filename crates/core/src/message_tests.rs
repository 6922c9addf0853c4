// SPDX-License-Identifier: MIT

use super::*;
use chrono::TimeZone;

#[test]
fn subject_uses_uppercase_wire_form() {
    assert_eq!(serde_json::to_string(&Subject::Stuck).unwrap(), "\"STUCK\"");
    assert_eq!("PROGRESS".parse::<Subject>().unwrap(), Subject::Progress);
    assert!("progress".parse::<Subject>().is_err());
}

#[test]
fn message_round_trips_and_tracks_ack() {
    let created = chrono::Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).single().unwrap();
    let mut msg = Message {
        id: "m-1".into(),
        subject: Subject::Task,
        from: "hub".into(),
        to: "demo-amazon".into(),
        body: "start on dm-42".into(),
        thread: None,
        created_at: created,
        acked_at: None,
    };
    assert!(!msg.is_acked());

    let json = serde_json::to_string(&msg).unwrap();
    assert!(!json.contains("acked_at"));

    msg.acked_at = Some(created);
    assert!(msg.is_acked());
    let back: Message = serde_json::from_str(&serde_json::to_string(&msg).unwrap()).unwrap();
    assert_eq!(back, msg);
}
