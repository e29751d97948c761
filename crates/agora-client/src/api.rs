//! HTTP client wrapper.
//!
//! Every request carries `Accept: application/json` and, when the
//! credential provider has one, `Authorization: Bearer <token>`. Successful
//! responses are unwrapped to their decoded body. Any failure is turned into
//! an [`ApiError`], published once as an error notification, and returned.

use std::sync::Arc;

use agora_shared::Notification;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::CredentialProvider;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::notifications::Notifier;

/// Structured error body returned by the backend.
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
    credentials: Arc<dyn CredentialProvider>,
    notifier: Arc<dyn Notifier>,
}

impl ApiClient {
    pub fn new(
        config: ClientConfig,
        credentials: Arc<dyn CredentialProvider>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            config: Arc::new(config),
            credentials,
            notifier,
        })
    }

    /// The notifier failures are published to; mutations reuse it for
    /// their success notifications.
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.http.get(self.config.url(path))).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        self.send(self.http.get(self.config.url(path)).query(query))
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send(self.http.post(self.config.url(path)).json(body))
            .await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(self.http.delete(self.config.url(path))).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let mut request = request.header(ACCEPT, "application/json");
        if let Some(token) = self.credentials.token() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let result = match request.send().await {
            Ok(response) => unwrap_body(response).await,
            Err(e) => Err(ApiError::Transport(e.to_string())),
        };

        result.map_err(|err| {
            warn!(status = ?err.status(), error = %err, "API request failed");
            self.notifier.notify(Notification::error(err.to_string()));
            err
        })
    }
}

async fn unwrap_body<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()));
    }

    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) if !body.message.is_empty() => body.message,
        _ => format!("Request failed with status code {}", status.as_u16()),
    };

    Err(ApiError::Http {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use agora_shared::{Discussion, NotificationKind, Role, User};
    use serde_json::{json, Value};

    use super::*;
    use crate::test_support::*;

    #[tokio::test]
    async fn success_returns_the_bare_body() {
        let backend = Backend::spawn().await;
        let client = backend.client();
        client.login_as("u1@example.com", Role::User).await;

        let me: User = client.api.get("/auth/me").await.unwrap();
        assert_eq!(me.email, "u1@example.com");

        let health: Value = client.api.get("/health").await.unwrap();
        assert_eq!(health["status"], "ok");
        assert!(client.notifications.list().is_empty());
    }

    #[tokio::test]
    async fn missing_token_sends_no_authorization_header() {
        let backend = Backend::spawn().await;
        let client = backend.client();

        let err = client
            .api
            .get::<Vec<Discussion>>("/discussions")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "Unauthorized");
    }

    #[tokio::test]
    async fn failure_publishes_exactly_one_error_notification() {
        let backend = Backend::spawn().await;
        let client = backend.client();

        let _ = client
            .api
            .post::<Value, _>("/comments", &json!({ "body": "hi", "discussionId": "d1" }))
            .await;

        let notes = client.notifications.list();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].notification.kind, NotificationKind::Error);
        assert_eq!(notes[0].notification.title, "Error");
        assert_eq!(notes[0].notification.message.as_deref(), Some("Unauthorized"));
    }

    #[tokio::test]
    async fn unstructured_error_body_falls_back_to_transport_message() {
        let backend = Backend::spawn().await;
        let client = backend.client();

        let err = client.api.get::<Value>("/no-such-route").await.unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Request failed with status code 404");
        assert_eq!(client.notifications.list().len(), 1);
    }

    #[tokio::test]
    async fn transport_failure_is_notified_and_returned() {
        let addr = {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let client = TestClient::new(format!("http://{addr}"));

        let err = client.api.get::<Value>("/health").await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));

        let notes = client.notifications.list();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].notification.message, Some(err.to_string()));
    }

    #[tokio::test]
    async fn undecodable_body_is_an_error() {
        let backend = Backend::spawn().await;
        let client = backend.client();

        let err = client.api.get::<Vec<String>>("/health").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(client.notifications.list().len(), 1);
    }
}
