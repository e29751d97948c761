//! Credentials and the `/auth/*` calls.

use std::sync::{PoisonError, RwLock};

use agora_shared::{AuthResponse, LoginInput, RegisterInput, User};
use tracing::info;

use crate::api::ApiClient;
use crate::error::ApiError;

/// Source of the session token attached to outgoing requests.
pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// In-memory session token holder.
#[derive(Debug, Default)]
pub struct TokenStore {
    token: RwLock<Option<String>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl CredentialProvider for TokenStore {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub async fn login(api: &ApiClient, tokens: &TokenStore, input: &LoginInput) -> Result<User, ApiError> {
    let auth: AuthResponse = api.post("/auth/login", input).await?;
    tokens.set(auth.jwt);
    info!(user = %auth.user.id, "Logged in");
    Ok(auth.user)
}

pub async fn register(
    api: &ApiClient,
    tokens: &TokenStore,
    input: &RegisterInput,
) -> Result<User, ApiError> {
    let auth: AuthResponse = api.post("/auth/register", input).await?;
    tokens.set(auth.jwt);
    info!(user = %auth.user.id, "Registered");
    Ok(auth.user)
}

pub async fn me(api: &ApiClient) -> Result<User, ApiError> {
    api.get("/auth/me").await
}

pub fn logout(tokens: &TokenStore) {
    tokens.clear();
}

#[cfg(test)]
mod tests {
    use agora_shared::Role;

    use super::*;
    use crate::test_support::*;

    #[test]
    fn token_store_set_and_clear() {
        let store = TokenStore::new();
        assert_eq!(store.token(), None);
        store.set("abc");
        assert_eq!(store.token().as_deref(), Some("abc"));
        store.clear();
        assert_eq!(store.token(), None);
    }

    #[tokio::test]
    async fn register_stores_the_session_token() {
        let backend = Backend::spawn().await;
        let client = backend.client();

        let user = register(
            &client.api,
            &client.tokens,
            &RegisterInput {
                email: "ada@example.com".into(),
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                password: "engine".into(),
                role: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(user.role, Role::User);
        assert!(client.tokens.token().is_some());

        assert_eq!(me(&client.api).await.unwrap(), user);

        logout(&client.tokens);
        assert_eq!(me(&client.api).await.unwrap_err().status(), Some(401));
    }

    #[tokio::test]
    async fn bad_login_keeps_previous_token() {
        let backend = Backend::spawn().await;
        let client = backend.client();
        client.login_as("ada@example.com", Role::User).await;
        let before = client.tokens.token();

        let err = login(
            &client.api,
            &client.tokens,
            &LoginInput {
                email: "ada@example.com".into(),
                password: "wrong".into(),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(client.tokens.token(), before);
    }
}
