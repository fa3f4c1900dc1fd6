//! Controller integration tests
//!
//! Drives a bootstrapped session against `FakeBackend` and records what the
//! user would see with `RecordingView`.

use std::sync::Arc;

use parlor::backend::{BackendCall, FakeBackend};
use parlor::chat::{Role, DEFAULT_TITLE};
use parlor::config::UnansweredPolicy;
use parlor::controller::{
    start_session, ControllerOptions, ConversationController, DeleteOutcome, SendOutcome,
    SendState,
};
use parlor::view::{RecordingView, ViewEvent};

mod common;
use common::chat_at;

async fn session(
    backend: &FakeBackend,
    options: ControllerOptions,
) -> (ConversationController, Arc<RecordingView>) {
    let view = Arc::new(RecordingView::new());
    let (controller, _report) = start_session(
        Arc::new(backend.clone()),
        view.clone(),
        options,
        "gpt-3.5-turbo",
    )
    .await;
    (controller, view)
}

fn rollback() -> ControllerOptions {
    ControllerOptions {
        on_send_failure: UnansweredPolicy::Rollback,
        ..ControllerOptions::default()
    }
}

#[tokio::test]
async fn test_bootstrap_renders_newest_first() {
    let backend = FakeBackend::with_chats([chat_at("A", "m", 100), chat_at("B", "m", 200)]);
    let (controller, view) = session(&backend, ControllerOptions::default()).await;

    assert_eq!(
        view.last_chat_list(),
        Some(vec!["B".to_string(), "A".to_string()])
    );
    assert_eq!(controller.active_chat().unwrap().id, "B");
}

#[tokio::test]
async fn test_create_then_delete_only_chat_empties_store() {
    let backend = FakeBackend::new();
    let (controller, view) = session(&backend, ControllerOptions::default()).await;

    let id = controller.create_chat();
    let outcome = controller.delete_chat(&id).await.unwrap();

    assert_eq!(outcome, DeleteOutcome::Deleted { next: None });
    assert!(controller.snapshot().store().is_empty());
    assert!(controller.active_chat().is_none());
    assert_eq!(view.last_chat_list(), Some(vec![]));
    assert!(view
        .events()
        .contains(&ViewEvent::Confirm("Are you sure you want to delete this chat?".to_string())));
}

#[tokio::test]
async fn test_send_without_active_chat_touches_nothing() {
    let backend = FakeBackend::new();
    let (controller, _view) = session(&backend, ControllerOptions::default()).await;

    assert_eq!(controller.send_message("hello").await, SendOutcome::Skipped);
    assert!(controller.spawn_send("hello").is_none());
    assert!(controller.snapshot().store().is_empty());
    assert_eq!(backend.send_count(), 0);
}

#[tokio::test]
async fn test_title_uses_first_thirty_scalar_values() {
    let backend = FakeBackend::new();
    let (controller, view) = session(&backend, ControllerOptions::default()).await;
    let id = controller.create_chat();

    let first = "é".repeat(40);
    let outcome = controller.send_message(&first).await;
    controller.flush_pending().await;

    assert_eq!(outcome.state(), SendState::Completed);
    let chat = controller.active_chat().unwrap();
    assert_eq!(chat.title, format!("{}...", "é".repeat(30)));
    assert_eq!(chat.messages[1].role, Role::Assistant);
    assert_eq!(chat.messages[1].content, format!("Echo: {}", first));
    assert_eq!(backend.stored_chat(&id).unwrap().title, chat.title);
    assert_eq!(view.last_chat_list(), Some(vec![id]));
}

#[tokio::test]
async fn test_title_not_derived_after_rename() {
    let backend = FakeBackend::new();
    let (controller, _view) = session(&backend, ControllerOptions::default()).await;
    let id = controller.create_chat();
    controller.rename_chat(&id, "Keep me").unwrap();

    controller.send_message("a long first message that would become a title").await;
    assert_eq!(controller.active_chat().unwrap().title, "Keep me");
}

#[tokio::test]
async fn test_rename_blank_stores_default_title() {
    let backend = FakeBackend::new();
    let (controller, _view) = session(&backend, ControllerOptions::default()).await;
    let id = controller.create_chat();

    controller.rename_chat(&id, "Something").unwrap();
    let chat = controller.rename_chat(&id, "   ").unwrap();
    controller.flush_pending().await;

    assert_eq!(chat.title, DEFAULT_TITLE);
    assert_eq!(backend.stored_chat(&id).unwrap().title, DEFAULT_TITLE);
}

#[tokio::test]
async fn test_failed_delete_keeps_chat_and_active() {
    let backend = FakeBackend::with_chats([chat_at("A", "m", 100), chat_at("B", "m", 200)]);
    let (controller, view) = session(&backend, ControllerOptions::default()).await;
    backend.fail_delete(true);

    let outcome = controller.delete_chat("B").await.unwrap();

    assert!(matches!(outcome, DeleteOutcome::Failed { .. }));
    assert_eq!(controller.snapshot().store().len(), 2);
    assert_eq!(controller.active_chat().unwrap().id, "B");
    assert_eq!(view.errors(), vec!["Failed to delete chat".to_string()]);
}

#[tokio::test]
async fn test_delete_active_switches_to_most_recent() {
    let backend = FakeBackend::with_chats([
        chat_at("A", "m", 100),
        chat_at("B", "m", 200),
        chat_at("C", "llama3", 300),
    ]);
    let (controller, _view) = session(&backend, ControllerOptions::default()).await;
    controller.switch_chat("A").unwrap();

    let outcome = controller.delete_chat("A").await.unwrap();

    assert_eq!(
        outcome,
        DeleteOutcome::Deleted {
            next: Some("C".to_string())
        }
    );
    assert_eq!(controller.active_chat().unwrap().id, "C");
    assert_eq!(controller.selected_model(), "llama3");
}

#[tokio::test]
async fn test_delete_inactive_keeps_active() {
    let backend = FakeBackend::with_chats([chat_at("A", "m", 100), chat_at("B", "m", 200)]);
    let (controller, _view) = session(&backend, ControllerOptions::default()).await;

    let outcome = controller.delete_chat("A").await.unwrap();

    assert_eq!(outcome, DeleteOutcome::Deleted { next: None });
    assert_eq!(controller.active_chat().unwrap().id, "B");
}

#[tokio::test]
async fn test_reply_lands_in_captured_chat_after_switch() {
    let backend = FakeBackend::new();
    let (controller, view) = session(&backend, ControllerOptions::default()).await;
    let first = controller.create_chat();
    let second = controller.create_chat();
    controller.switch_chat(&first).unwrap();

    backend.hold_sends();
    let handle = controller.spawn_send("question for the first chat").unwrap();
    controller.switch_chat(&second).unwrap();
    view.reset();
    backend.release_sends(1);

    let outcome = handle.await.unwrap();
    assert!(matches!(outcome, SendOutcome::Completed { ref chat_id, .. } if *chat_id == first));

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.chat(&first).unwrap().messages.len(), 2);
    assert!(snapshot.chat(&second).unwrap().messages.is_empty());
    assert_eq!(controller.active_chat().unwrap().id, second);
    // The reply is not rendered over the chat on screen
    assert!(!view
        .events()
        .iter()
        .any(|event| matches!(event, ViewEvent::Messages { .. })));
}

#[tokio::test]
async fn test_concurrent_sends_in_two_chats() {
    let backend = FakeBackend::new();
    let (controller, _view) = session(&backend, ControllerOptions::default()).await;
    let first = controller.create_chat();
    backend.hold_sends();
    let a = controller.spawn_send("one").unwrap();
    let second = controller.create_chat();
    let b = controller.spawn_send("two").unwrap();
    assert_eq!(controller.sends_in_flight(), 2);

    backend.release_sends(2);
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    assert_eq!(a.state(), SendState::Completed);
    assert_eq!(b.state(), SendState::Completed);
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.chat(&first).unwrap().messages[1].content, "Echo: one");
    assert_eq!(snapshot.chat(&second).unwrap().messages[1].content, "Echo: two");
}

#[tokio::test]
async fn test_delete_cancels_in_flight_send() {
    let backend = FakeBackend::new();
    let (controller, _view) = session(&backend, ControllerOptions::default()).await;
    let id = controller.create_chat();

    backend.hold_sends();
    let handle = controller.spawn_send("will never be answered").unwrap();
    let outcome = controller.delete_chat(&id).await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted { next: None });

    let send = handle.await.unwrap();
    assert_eq!(send, SendOutcome::Cancelled { chat_id: id.clone() });
    assert_eq!(send.state(), SendState::Cancelled);
    controller.flush_pending().await;
    assert!(backend.stored_chat(&id).is_none());
}

#[tokio::test]
async fn test_failure_keeps_unanswered_message_by_default() {
    let backend = FakeBackend::new();
    let (controller, view) = session(&backend, ControllerOptions::default()).await;
    controller.create_chat();
    backend.fail_send(true);

    let outcome = controller.send_message("hello?").await;

    assert_eq!(outcome.state(), SendState::Failed);
    let chat = controller.active_chat().unwrap();
    assert_eq!(chat.messages.len(), 1);
    assert_eq!(chat.title, DEFAULT_TITLE);
    assert_eq!(
        view.errors(),
        vec!["An error occurred while sending the message".to_string()]
    );
}

#[tokio::test]
async fn test_failure_rolls_back_with_rollback_policy() {
    let backend = FakeBackend::new();
    let (controller, _view) = session(&backend, rollback()).await;
    controller.create_chat();
    controller.send_message("first").await;
    backend.fail_send(true);

    controller.send_message("second").await;

    let chat = controller.active_chat().unwrap();
    assert_eq!(chat.messages.len(), 2);
    assert_eq!(chat.messages[1].content, "Echo: first");
}

#[tokio::test]
async fn test_shutdown_cancels_pending_and_rolls_back() {
    let backend = FakeBackend::new();
    let (controller, _view) = session(&backend, rollback()).await;
    controller.create_chat();

    backend.hold_sends();
    let handle = controller.spawn_send("pending").unwrap();
    controller.shutdown().await;

    assert!(matches!(handle.await.unwrap(), SendOutcome::Cancelled { .. }));
    assert!(controller.active_chat().unwrap().messages.is_empty());
}

#[tokio::test]
async fn test_no_response_is_silent() {
    let backend = FakeBackend::new();
    let (controller, view) = session(&backend, ControllerOptions::default()).await;
    controller.create_chat();
    backend.push_reply(None);

    let outcome = controller.send_message("anyone?").await;

    assert!(matches!(outcome, SendOutcome::NoResponse { .. }));
    assert_eq!(controller.active_chat().unwrap().messages.len(), 1);
    assert!(view.errors().is_empty());
}

#[tokio::test]
async fn test_save_failures_are_not_surfaced() {
    let backend = FakeBackend::new();
    backend.fail_save(true);
    let (controller, view) = session(&backend, ControllerOptions::default()).await;

    let id = controller.create_chat();
    controller.send_message("hello").await;
    controller.flush_pending().await;

    assert!(view.errors().is_empty());
    assert_eq!(controller.snapshot().chat(&id).unwrap().messages.len(), 2);
    assert_eq!(backend.stored_count(), 0);
}

#[tokio::test]
async fn test_send_carries_model_and_full_history() {
    let backend = FakeBackend::new();
    let (controller, _view) = session(&backend, ControllerOptions::default()).await;
    controller.create_chat();
    controller.change_model("gpt-4o");
    controller.send_message("one").await;
    controller.send_message("two").await;

    let sends: Vec<_> = backend
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            BackendCall::SendMessage { model, messages } => Some((model, messages.len())),
            _ => None,
        })
        .collect();
    assert_eq!(sends, vec![("gpt-4o".to_string(), 1), ("gpt-4o".to_string(), 3)]);
}

#[tokio::test]
async fn test_chat_list_edit_mode_commit() {
    let backend = FakeBackend::with_chats([chat_at("A", "m", 100), chat_at("B", "m", 200)]);
    let (controller, _view) = session(&backend, ControllerOptions::default()).await;
    let chat_list = controller.chat_list();

    assert_eq!(chat_list.begin_edit(Some("2")).unwrap(), "A");
    assert!(chat_list.entries()[1].editing);

    assert_eq!(
        chat_list.commit_edit(&controller, "  Renamed  ").unwrap(),
        Some("A".to_string())
    );
    assert_eq!(chat_list.editing(), None);
    assert_eq!(controller.snapshot().chat("A").unwrap().title, "Renamed");
    assert_eq!(chat_list.commit_edit(&controller, "ignored").unwrap(), None);
}

#[tokio::test]
async fn test_chat_list_select_by_position() {
    let backend = FakeBackend::with_chats([chat_at("A", "m", 100), chat_at("B", "m", 200)]);
    let (controller, _view) = session(&backend, ControllerOptions::default()).await;

    assert_eq!(controller.chat_list().select(&controller, "2").unwrap(), "A");
    assert_eq!(controller.active_chat().unwrap().id, "A");
    assert!(controller.chat_list().select(&controller, "9").is_err());
}

#[tokio::test]
async fn test_deleting_edited_chat_leaves_edit_mode() {
    let backend = FakeBackend::with_chats([chat_at("A", "m", 100)]);
    let (controller, _view) = session(&backend, ControllerOptions::default()).await;

    controller.chat_list().begin_edit(None).unwrap();
    controller.chat_list().delete(&controller, None).await.unwrap();

    assert_eq!(controller.chat_list().editing(), None);
}
