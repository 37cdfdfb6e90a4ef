use super::*;

#[test]
fn doc_state_new_is_empty() {
    let doc = DocState::new();
    assert!(doc.clients.is_empty());
    assert!(doc.participants.is_empty());
    assert!(doc.content.is_empty());
    assert!(doc.activity.is_empty());
}

#[test]
fn doc_state_default_equals_new() {
    let a = DocState::new();
    let b = DocState::default();
    assert_eq!(a.clients.len(), b.clients.len());
    assert_eq!(a.participants.len(), b.participants.len());
    assert_eq!(a.content, b.content);
    assert_eq!(a.activity.len(), b.activity.len());
}

#[test]
fn activity_entry_renders_wire_line() {
    let entry = ActivityEntry::new("bob", "joined");
    assert_eq!(entry.line(), "bob joined");
    assert!(entry.ts > 0);
}

#[test]
fn push_activity_caps_retention_oldest_first() {
    let mut doc = DocState::new();
    for i in 0..5 {
        doc.push_activity(ActivityEntry::new(format!("u{i}"), "joined"), 3);
    }
    assert_eq!(doc.activity.len(), 3);
    assert_eq!(doc.activity.front().unwrap().line(), "u2 joined");
    assert_eq!(doc.activity.back().unwrap().line(), "u4 joined");
}

#[test]
fn push_activity_with_zero_cap_retains_nothing() {
    let mut doc = DocState::new();
    doc.push_activity(ActivityEntry::new("bob", "joined"), 0);
    assert!(doc.activity.is_empty());
}

#[test]
fn snapshot_assembles_all_three_slices() {
    let mut doc = DocState::new();
    doc.participants.insert(
        Uuid::new_v4(),
        Participant { username: "alice".to_owned(), joined_at: now_ms() },
    );
    doc.participants.insert(
        Uuid::new_v4(),
        Participant { username: "bob".to_owned(), joined_at: now_ms() },
    );
    doc.content = "<p>hello</p>".to_owned();
    doc.push_activity(ActivityEntry::new("alice", "joined"), 200);
    doc.push_activity(ActivityEntry::new("bob", "joined"), 200);

    let snapshot = doc.snapshot();
    assert_eq!(snapshot.users.len(), 2);
    assert_eq!(snapshot.users["alice"].username, "alice");
    assert_eq!(snapshot.editor_content, "<p>hello</p>");
    assert_eq!(snapshot.user_activity, vec!["alice joined", "bob joined"]);
}

#[test]
fn name_taken_by_other_ignores_own_connection() {
    let mut doc = DocState::new();
    let conn = Uuid::new_v4();
    doc.participants
        .insert(conn, Participant { username: "alice".to_owned(), joined_at: now_ms() });

    assert!(!doc.name_taken_by_other(conn, "alice"));
    assert!(doc.name_taken_by_other(Uuid::new_v4(), "alice"));
    assert!(!doc.name_taken_by_other(Uuid::new_v4(), "bob"));
}

#[test]
fn username_of_reports_joined_connections_only() {
    let mut doc = DocState::new();
    let conn = Uuid::new_v4();
    doc.participants
        .insert(conn, Participant { username: "carol".to_owned(), joined_at: now_ms() });

    assert_eq!(doc.username_of(conn), Some("carol"));
    assert_eq!(doc.username_of(Uuid::new_v4()), None);
}
