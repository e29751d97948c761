//! Spins up the real backend on an ephemeral port for client tests.

use std::sync::Arc;

use agora_server::{serve_listener, AppState};
use agora_shared::{Comment, RegisterInput, Role, User};
use agora_store::{MockDb, TableName};
use tokio::net::TcpListener;

use crate::api::ApiClient;
use crate::auth::{self, TokenStore};
use crate::config::ClientConfig;
use crate::notifications::NotificationStore;

pub struct Backend {
    pub base_url: String,
    pub state: AppState,
}

impl Backend {
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = AppState::new(MockDb::in_memory().unwrap());

        tokio::spawn(serve_listener(listener, state.clone()));

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn client(&self) -> TestClient {
        TestClient::new(self.base_url.clone())
    }

    /// Write a comment straight into the store, bypassing the API.
    pub async fn insert_comment(&self, comment: Comment) {
        let mut db = self.state.db.lock().await;
        db.comments.create(comment).unwrap();
        db.persist(TableName::Comment).unwrap();
    }
}

pub struct TestClient {
    pub api: ApiClient,
    pub tokens: Arc<TokenStore>,
    pub notifications: Arc<NotificationStore>,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let tokens = Arc::new(TokenStore::new());
        let notifications = Arc::new(NotificationStore::new());
        let api = ApiClient::new(
            ClientConfig::new(base_url),
            tokens.clone(),
            notifications.clone(),
        )
        .unwrap();

        Self {
            api,
            tokens,
            notifications,
        }
    }

    /// Register `email` with `role` over HTTP and keep the session token.
    pub async fn login_as(&self, email: &str, role: Role) -> User {
        auth::register(
            &self.api,
            &self.tokens,
            &RegisterInput {
                email: email.into(),
                first_name: "Test".into(),
                last_name: email.into(),
                password: "password".into(),
                role: Some(role),
            },
        )
        .await
        .unwrap()
    }
}
