//! HTTP implementation of the chat backend
//!
//! Talks JSON to the chat service over reqwest. The client keeps a cookie
//! store so the session established by [`ChatBackend::login`] is sent with
//! every later call.

use crate::backend::ChatBackend;
use crate::chat::{Chat, ChatId, Message};
use crate::config::BackendConfig;
use crate::error::{ParlorError, Result};

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// Chat backend reached over HTTP
///
/// # Examples
///
/// ```
/// use parlor::backend::HttpBackend;
/// use parlor::config::BackendConfig;
///
/// let config = BackendConfig {
///     base_url: "http://localhost:5000".to_string(),
///     timeout_seconds: 30,
/// };
/// let backend = HttpBackend::new(&config).unwrap();
/// assert_eq!(backend.base_url().as_str(), "http://localhost:5000/");
/// ```
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
}

/// Response of `GET /get_chats`
#[derive(Debug, Deserialize)]
struct ChatListResponse {
    #[serde(default)]
    chats: Option<HashMap<ChatId, Chat>>,
}

/// Body of `POST /save_chat`
#[derive(Debug, Serialize)]
struct SaveChatRequest<'a> {
    #[serde(rename = "chatId")]
    chat_id: &'a str,
    #[serde(rename = "chatData")]
    chat_data: &'a Chat,
}

/// Body of `POST /delete_chat`
#[derive(Debug, Serialize)]
struct DeleteChatRequest<'a> {
    #[serde(rename = "chatId")]
    chat_id: &'a str,
}

/// Body of `POST /send_message`
#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

/// Response of `POST /send_message`
#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Body of `POST /login`
#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Response of `POST /login`
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

/// Error body the backend attaches to failed calls
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl HttpBackend {
    /// Create a backend client
    ///
    /// # Arguments
    ///
    /// * `config` - Backend URL and request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the base URL is invalid or the HTTP client cannot
    /// be built
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| {
            ParlorError::Config(format!("Invalid backend URL {}: {}", config.base_url, e))
        })?;
        // Keep any path prefix when joining endpoint names
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .cookie_store(true)
            .user_agent(concat!("parlor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ParlorError::from)
            .context("Failed to create HTTP client")?;

        tracing::info!(
            "Initialized HTTP backend: url={}, timeout={}s",
            base_url,
            config.timeout_seconds
        );

        Ok(Self { client, base_url })
    }

    /// Base URL every endpoint is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, name: &str) -> Result<Url> {
        self.base_url
            .join(name)
            .map_err(|e| ParlorError::Config(format!("Invalid endpoint {}: {}", name, e)).into())
    }

    async fn post<B: Serialize + ?Sized>(&self, name: &str, body: &B) -> Result<Response> {
        let url = self.endpoint(name)?;
        tracing::debug!("POST {}", url);

        let response = self.client.post(url).json(body).send().await.map_err(|e| {
            tracing::error!("Request to {} failed: {}", name, e);
            ParlorError::Backend(format!("Failed to reach backend ({}): {}", name, e))
        })?;

        check_status(name, response).await
    }
}

/// Turn a non-success response into an error
///
/// 401 maps to [`ParlorError::Authentication`]; every other failure keeps its
/// status in [`ParlorError::BackendStatus`]. The message is taken from the
/// backend's `{"error": ...}` body when present.
async fn check_status(name: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&error_text)
        .map(|body| body.error)
        .unwrap_or_else(|_| {
            if error_text.trim().is_empty() {
                status.canonical_reason().unwrap_or("Unknown error").to_string()
            } else {
                error_text.trim().to_string()
            }
        });
    tracing::error!("Backend returned error {} for {}: {}", status, name, message);

    if status == StatusCode::UNAUTHORIZED {
        return Err(ParlorError::Authentication(message).into());
    }
    Err(ParlorError::BackendStatus {
        status: status.as_u16(),
        message,
    }
    .into())
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn list_chats(&self) -> Result<HashMap<ChatId, Chat>> {
        let url = self.endpoint("get_chats")?;
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            tracing::error!("Request to get_chats failed: {}", e);
            ParlorError::Backend(format!("Failed to reach backend (get_chats): {}", e))
        })?;
        let response = check_status("get_chats", response).await?;

        let listing: ChatListResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse chat listing: {}", e);
            ParlorError::Backend(format!("Failed to parse chat listing: {}", e))
        })?;

        let chats = listing.chats.unwrap_or_default();
        tracing::debug!("Fetched {} chats", chats.len());
        Ok(chats)
    }

    async fn save_chat(&self, chat: &Chat) -> Result<()> {
        let body = SaveChatRequest {
            chat_id: &chat.id,
            chat_data: chat,
        };
        self.post("save_chat", &body).await?;
        tracing::debug!("Saved chat {}", chat.id);
        Ok(())
    }

    async fn delete_chat(&self, id: &str) -> Result<()> {
        self.post("delete_chat", &DeleteChatRequest { chat_id: id })
            .await?;
        tracing::debug!("Deleted chat {}", id);
        Ok(())
    }

    async fn send_message(&self, model: &str, messages: &[Message]) -> Result<Option<String>> {
        tracing::debug!(
            "Sending {} messages to completion endpoint (model={})",
            messages.len(),
            model
        );
        let response = self
            .post("send_message", &SendMessageRequest { model, messages })
            .await?;

        let body = response.text().await.map_err(|e| {
            tracing::error!("Failed to read send_message body: {}", e);
            ParlorError::Backend(format!("Failed to read reply: {}", e))
        })?;

        match serde_json::from_str::<SendMessageResponse>(&body) {
            Ok(parsed) => Ok(parsed.response.filter(|text| !text.is_empty())),
            Err(e) => {
                tracing::warn!("Malformed send_message body: {}", e);
                Ok(None)
            }
        }
    }

    async fn login(&self, username: &str, password: &str) -> Result<()> {
        let response = self
            .post("login", &LoginRequest { username, password })
            .await?;
        let login: LoginResponse = response.json().await.map_err(|e| {
            ParlorError::Authentication(format!("Malformed login response: {}", e))
        })?;

        if !login.success {
            let message = login
                .message
                .unwrap_or_else(|| "Invalid credentials".to_string());
            tracing::warn!("Login rejected for {}: {}", username, message);
            return Err(ParlorError::Authentication(message).into());
        }

        tracing::info!("Logged in as {}", username);
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        self.post("logout", &serde_json::json!({})).await?;
        tracing::info!("Logged out");
        Ok(())
    }
}
