use super::*;
use crate::reminders::{ContactView, Dispatch};
use chrono::{Duration, TimeZone};
use intouch_core::{contact::Contact, traits::Notification};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn view(name: &str, contacted_days_ago: Option<i64>, enabled: bool) -> ContactView {
    let mut contact = Contact::new(name, vec!["111".into()], Duration::days(14));
    contact.last_contacted_at = contacted_days_ago.map(|d| now() - Duration::days(d));
    contact.notify_enabled = enabled;
    let fraction = intouch_core::reminder::due_fraction(&contact, now());
    ContactView {
        reach_out: enabled && fraction >= 1.0,
        fraction,
        contact,
    }
}

fn dispatch(contact: Option<&str>, error: Option<&str>) -> Dispatch {
    Dispatch {
        notification: Notification {
            id: if contact.is_some() { 0 } else { -1 },
            title: "t".into(),
            body: "b".into(),
            target_uri: "sms:111".into(),
            group_id: "intouch".into(),
            is_summary: contact.is_none(),
        },
        contact: contact.map(str::to_string),
        error: error.map(str::to_string),
    }
}

#[test]
fn test_days_ago() {
    assert_eq!(days_ago(None, now()), "never");
    assert_eq!(days_ago(Some(now() - Duration::hours(3)), now()), "today");
    assert_eq!(days_ago(Some(now() - Duration::days(1)), now()), "1 day ago");
    assert_eq!(days_ago(Some(now() - Duration::days(15)), now()), "15 days ago");
}

#[test]
fn test_format_list_marks_due() {
    let out = format_list(&Listing {
        at: now(),
        contacts: vec![view("Ana", Some(28), true), view("Ben", Some(7), false)],
    });
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Name"));
    assert!(lines[1].contains("Ana"));
    assert!(lines[1].contains("200%"));
    assert!(lines[1].contains("28 days ago"));
    assert!(lines[1].ends_with(REACH_OUT));
    assert!(lines[2].contains("50%"));
    assert!(lines[2].contains("off"));
    assert!(!lines[2].contains(REACH_OUT));
}

#[test]
fn test_format_list_empty() {
    let empty = Listing {
        at: now(),
        contacts: vec![],
    };
    assert_eq!(format_list(&empty), "No contacts with a phone number.");
}

#[test]
fn test_format_tick() {
    let quiet = TickReport {
        at: now(),
        dispatches: vec![],
    };
    assert_eq!(format_tick(&quiet), "Nobody to remind.");

    let busy = TickReport {
        at: now(),
        dispatches: vec![
            dispatch(Some("Ana"), None),
            dispatch(Some("Ben"), None),
            dispatch(Some("Cid"), Some("sink offline")),
            dispatch(None, None),
        ],
    };
    let out = format_tick(&busy);
    assert!(out.starts_with("Reminded: Ana, Ben"));
    assert!(out.contains("Summary sent."));
    assert!(out.contains("Failed: Cid (sink offline)"));
}

#[test]
fn test_format_history() {
    assert_eq!(format_history(&[]), "No notifications sent yet.");
    let rows = vec![
        LoggedNotification {
            notification_id: 0,
            contact_name: Some("Ana".into()),
            target_uri: "sms:111".into(),
            is_summary: false,
            status: "error".into(),
            error: Some("sink offline".into()),
            created_at: "2026-03-01 12:00:00".into(),
        },
        LoggedNotification {
            notification_id: -1,
            contact_name: None,
            target_uri: String::new(),
            is_summary: true,
            status: "ok".into(),
            error: None,
            created_at: "2026-03-01 12:00:00".into(),
        },
    ];
    let out = format_history(&rows);
    assert!(out.contains("[2026-03-01 12:00:00] Ana error: sink offline"));
    assert!(out.contains("summary ok"));
}

#[test]
fn test_format_status() {
    let status = StatusReport {
        at: now(),
        contacts: 5,
        enabled: 3,
        due: 1,
    };
    let out = format_status(&Config::default(), &status);
    assert!(out.contains("Contacts:    5 (3 enabled)"));
    assert!(out.contains("Due now:     1"));
    assert!(out.contains("Check every: 4h (repeat after 24h)"));
}
