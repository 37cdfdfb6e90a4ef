use super::*;
use protocol::ErrorData;

fn snapshot(users: &[&str], content: &str, activity: &[&str]) -> ServerMessage {
    let users = users
        .iter()
        .map(|u| ((*u).to_owned(), UserInfo { username: (*u).to_owned() }))
        .collect();
    ServerMessage::Snapshot {
        data: SnapshotData {
            users,
            editor_content: content.to_owned(),
            user_activity: activity.iter().map(|a| (*a).to_owned()).collect(),
        },
    }
}

#[test]
fn apply_snapshot_replaces_all_slices() {
    let mut mirror = Mirror::default();
    let changed = mirror.apply(&snapshot(&["alice", "bob"], "<p>hi</p>", &["alice joined", "bob joined"]));

    assert!(changed);
    assert_eq!(mirror.users.len(), 2);
    assert_eq!(mirror.content, "<p>hi</p>");
    assert_eq!(mirror.activity, vec!["alice joined", "bob joined"]);
}

#[test]
fn apply_snapshot_discards_stale_local_state() {
    let mut mirror = Mirror::default();
    mirror.apply(&snapshot(&["alice", "bob"], "<p>old</p>", &["alice joined", "bob joined"]));

    // A smaller authoritative snapshot wins outright; nothing is merged.
    let changed = mirror.apply(&snapshot(&["bob"], "<p>new</p>", &["bob joined"]));
    assert!(changed);
    assert_eq!(mirror.users.len(), 1);
    assert!(mirror.users.contains_key("bob"));
    assert_eq!(mirror.content, "<p>new</p>");
    assert_eq!(mirror.activity, vec!["bob joined"]);
}

#[test]
fn apply_identical_snapshot_reports_no_change() {
    let mut mirror = Mirror::default();
    let msg = snapshot(&["alice"], "<p>hi</p>", &["alice joined"]);
    assert!(mirror.apply(&msg));
    assert!(!mirror.apply(&msg));
}

#[test]
fn apply_error_leaves_mirror_untouched() {
    let mut mirror = Mirror::default();
    mirror.apply(&snapshot(&["alice"], "<p>hi</p>", &["alice joined"]));
    let before = mirror.clone();

    let changed = mirror.apply(&ServerMessage::Error {
        data: ErrorData { code: "E_NOT_JOINED".to_owned(), message: "nope".to_owned() },
    });
    assert!(!changed);
    assert_eq!(mirror, before);
}

#[test]
fn mirror_snapshot_round_trips() {
    let mut mirror = Mirror::default();
    let msg = snapshot(&["alice"], "<p>hi</p>", &["alice joined"]);
    mirror.apply(&msg);

    let ServerMessage::Snapshot { data } = msg else {
        unreachable!();
    };
    assert_eq!(mirror.snapshot(), data);
}

#[test]
fn backoff_doubles_to_ceiling() {
    assert_eq!(next_backoff(INITIAL_BACKOFF_MS, DEFAULT_MAX_BACKOFF_MS), 2_000);
    assert_eq!(next_backoff(4_000, DEFAULT_MAX_BACKOFF_MS), 8_000);
    assert_eq!(next_backoff(8_000, DEFAULT_MAX_BACKOFF_MS), 10_000);
    assert_eq!(next_backoff(10_000, DEFAULT_MAX_BACKOFF_MS), 10_000);
    assert_eq!(next_backoff(u64::MAX, DEFAULT_MAX_BACKOFF_MS), 10_000);
}
