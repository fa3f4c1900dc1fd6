//! HTTP backend integration tests
//!
//! Runs `HttpBackend` against a `wiremock` mock server and checks the wire
//! format of every call along with status and payload error handling.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use parlor::backend::{ChatBackend, HttpBackend};
use parlor::chat::{Message, Role};
use parlor::config::BackendConfig;
use parlor::error::ParlorError;

mod common;

fn make_backend(base_url: &str) -> HttpBackend {
    HttpBackend::new(&BackendConfig {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
    })
    .expect("valid backend config")
}

#[tokio::test]
async fn test_list_chats_parses_collection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_chats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chats": {
                "1700000000000": {
                    "id": "1700000000000",
                    "title": "Trip planning",
                    "model": "gpt-4o",
                    "messages": [
                        {"role": "user", "content": "Where to?"},
                        {"role": "assistant", "content": "Lisbon."}
                    ],
                    "created_at": "2023-11-14T22:13:20Z"
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let chats = make_backend(&server.uri()).list_chats().await.unwrap();

    let chat = &chats["1700000000000"];
    assert_eq!(chat.title, "Trip planning");
    assert_eq!(chat.messages.len(), 2);
    assert_eq!(chat.messages[1].role, Role::Assistant);
}

#[tokio::test]
async fn test_list_chats_missing_key_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_chats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let chats = make_backend(&server.uri()).list_chats().await.unwrap();
    assert!(chats.is_empty());
}

#[tokio::test]
async fn test_list_chats_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_chats"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
        .mount(&server)
        .await;

    let err = make_backend(&server.uri()).list_chats().await.unwrap_err();
    match err.downcast_ref::<ParlorError>() {
        Some(ParlorError::BackendStatus { status, message }) => {
            assert_eq!(*status, 500);
            assert_eq!(message, "db down");
        }
        other => panic!("expected BackendStatus, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get_chats"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Login required"))
        .mount(&server)
        .await;

    let err = make_backend(&server.uri()).list_chats().await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ParlorError>(),
        Some(ParlorError::Authentication(message)) if message == "Login required"
    ));
}

#[tokio::test]
async fn test_save_chat_wire_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/save_chat"))
        .and(body_partial_json(json!({
            "chatId": "42",
            "chatData": {
                "id": "42",
                "title": "New Chat",
                "model": "gpt-3.5-turbo",
                "messages": [{"role": "user", "content": "hi"}]
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let mut chat = common::chat_at("42", "gpt-3.5-turbo", 1_700_000_000);
    chat.messages.push(Message::user("hi"));

    make_backend(&server.uri()).save_chat(&chat).await.unwrap();
}

#[tokio::test]
async fn test_delete_chat_wire_format() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/delete_chat"))
        .and(body_json(json!({"chatId": "42"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    make_backend(&server.uri()).delete_chat("42").await.unwrap();
}

#[tokio::test]
async fn test_delete_chat_failure_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/delete_chat"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = make_backend(&server.uri()).delete_chat("42").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ParlorError>(),
        Some(ParlorError::BackendStatus { status: 404, .. })
    ));
}

#[tokio::test]
async fn test_send_message_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send_message"))
        .and(body_json(json!({
            "model": "gpt-4o",
            "messages": [
                {"role": "user", "content": "Hello"},
                {"role": "assistant", "content": "Hi!"},
                {"role": "user", "content": "How are you?"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "Fine."})))
        .expect(1)
        .mount(&server)
        .await;

    let messages = vec![
        Message::user("Hello"),
        Message::assistant("Hi!"),
        Message::user("How are you?"),
    ];
    let reply = make_backend(&server.uri())
        .send_message("gpt-4o", &messages)
        .await
        .unwrap();
    assert_eq!(reply.as_deref(), Some("Fine."));
}

#[tokio::test]
async fn test_send_message_without_response_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send_message"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"other": 1})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/send_message"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let backend = make_backend(&server.uri());
    let messages = [Message::user("Hello")];
    assert_eq!(backend.send_message("m", &messages).await.unwrap(), None);
    assert_eq!(backend.send_message("m", &messages).await.unwrap(), None);
}

#[tokio::test]
async fn test_send_message_empty_response_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send_message"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": ""})))
        .mount(&server)
        .await;

    let reply = make_backend(&server.uri())
        .send_message("m", &[Message::user("Hello")])
        .await
        .unwrap();
    assert_eq!(reply, None);
}

#[tokio::test]
async fn test_send_message_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send_message"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let backend = HttpBackend::new(&BackendConfig {
        base_url: server.uri(),
        timeout_seconds: 1,
    })
    .unwrap();
    let err = backend
        .send_message("m", &[Message::user("Hello")])
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ParlorError>(),
        Some(ParlorError::Backend(_))
    ));
}

#[tokio::test]
async fn test_login_success_keeps_session_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({"username": "ada", "password": "secret"})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "session=abc123; Path=/")
                .set_body_json(json!({"success": true})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/get_chats"))
        .and(wiremock::matchers::header("cookie", "session=abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"chats": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = make_backend(&server.uri());
    backend.login("ada", "secret").await.unwrap();
    backend.list_chats().await.unwrap();
}

#[tokio::test]
async fn test_login_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;

    let err = make_backend(&server.uri())
        .login("ada", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ParlorError>(),
        Some(ParlorError::Authentication(message)) if message == "Invalid credentials"
    ));
}

#[tokio::test]
async fn test_logout_posts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    make_backend(&server.uri()).logout().await.unwrap();
}

#[tokio::test]
async fn test_base_path_prefix_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_chats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"chats": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let backend = make_backend(&format!("{}/api", server.uri()));
    backend.list_chats().await.unwrap();
}
