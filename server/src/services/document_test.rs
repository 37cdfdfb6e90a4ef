use super::*;
use crate::state::test_helpers;

#[tokio::test]
async fn edit_without_join_is_a_noop() {
    let state = test_helpers::test_app_state();
    let (conn_id, mut rx) = test_helpers::attach_client(&state).await;

    let err = apply_edit(&state, conn_id, "<p>sneaky</p>".to_owned())
        .await
        .expect_err("unjoined edit");
    assert!(matches!(err, DocumentError::NotJoined(id) if id == conn_id));
    assert_eq!(err.error_code(), "E_NOT_JOINED");

    assert!(state.doc.read().await.content.is_empty());
    assert!(rx.try_recv().is_err(), "dropped edit must not broadcast");
}

#[tokio::test]
async fn edit_replaces_content_and_fans_out() {
    let state = test_helpers::test_app_state();
    let (conn_id, mut rx) = test_helpers::attach_client(&state).await;
    test_helpers::seed_participant(&state, conn_id, "bob").await;

    apply_edit(&state, conn_id, "<p>hi</p>".to_owned()).await.expect("edit");

    let msg = rx.try_recv().expect("snapshot fanned out");
    let ServerMessage::Snapshot { data } = msg else {
        panic!("expected snapshot");
    };
    assert_eq!(data.editor_content, "<p>hi</p>");
    // Edits are not logged; only presence changes are.
    assert!(data.user_activity.is_empty());
    assert_eq!(state.doc.read().await.content, "<p>hi</p>");
}

#[tokio::test]
async fn last_write_wins() {
    let state = test_helpers::test_app_state();
    let (first, _rx_a) = test_helpers::attach_client(&state).await;
    let (second, _rx_b) = test_helpers::attach_client(&state).await;
    test_helpers::seed_participant(&state, first, "alice").await;
    test_helpers::seed_participant(&state, second, "bob").await;

    apply_edit(&state, first, "<p>first</p>".to_owned()).await.expect("e1");
    apply_edit(&state, second, "<p>second</p>".to_owned()).await.expect("e2");

    assert_eq!(state.doc.read().await.content, "<p>second</p>");
}

#[tokio::test]
async fn snapshot_reflects_live_stores() {
    let state = test_helpers::test_app_state();
    let (conn_id, _rx) = test_helpers::attach_client(&state).await;
    test_helpers::seed_participant(&state, conn_id, "alice").await;
    apply_edit(&state, conn_id, "<p>now</p>".to_owned()).await.expect("edit");

    let data = snapshot(&state).await;
    assert_eq!(data.editor_content, "<p>now</p>");
    assert!(data.users.contains_key("alice"));
}
