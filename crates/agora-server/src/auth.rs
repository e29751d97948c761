//! Session authentication and the `/auth/*` endpoints.

use agora_shared::{AuthResponse, FieldErrors, LoginInput, RegisterInput, User};
use agora_store::{hash_password, verify_password, MockDb, TableName, UserRecord};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use tracing::{info, warn};

use crate::api::AppState;
use crate::error::ServerError;
use crate::{new_id, now_millis};

/// Session token carried by the request, with or without a `Bearer ` prefix.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?
        .trim();
    let token = auth.strip_prefix("Bearer ").unwrap_or(auth).trim();
    (!token.is_empty()).then_some(token)
}

/// Resolve the caller, failing with `Unauthorized` if there is no valid
/// session behind the request.
pub fn require_auth<'db>(headers: &HeaderMap, db: &'db MockDb) -> Result<&'db UserRecord, ServerError> {
    let Some(token) = bearer_token(headers) else {
        warn!("request without credentials");
        return Err(ServerError::Unauthorized);
    };
    db.session_user(token).ok_or_else(|| {
        warn!("request with unknown session token");
        ServerError::Unauthorized
    })
}

/// Validate and insert a new user, persisting the user table.
pub fn create_user(db: &mut MockDb, input: RegisterInput) -> Result<UserRecord, ServerError> {
    let mut errors = FieldErrors::new();
    for (field, value) in [
        ("email", &input.email),
        ("firstName", &input.first_name),
        ("lastName", &input.last_name),
        ("password", &input.password),
    ] {
        if value.is_empty() {
            errors.add(field, agora_shared::validation::REQUIRED);
        }
    }
    let input = errors.into_result(input)?;

    if db.find_user_by_email(&input.email).is_some() {
        return Err(ServerError::Conflict("The user already exists".into()));
    }

    let record = db.users.create(UserRecord {
        id: new_id(),
        email: input.email,
        first_name: input.first_name,
        last_name: input.last_name,
        role: input.role.unwrap_or_default(),
        bio: String::new(),
        created_at: now_millis(),
        password_hash: hash_password(&input.password),
    })?;
    db.persist(TableName::User)?;

    info!(user = %record.id, role = %record.role, "User registered");
    Ok(record)
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterInput>, JsonRejection>,
) -> Result<Json<AuthResponse>, ServerError> {
    let Json(input) = payload?;
    let mut db = state.db.lock().await;

    let record = create_user(&mut db, input)?;
    let jwt = db.issue_session(&record.id);

    Ok(Json(AuthResponse {
        jwt,
        user: record.sanitize(),
    }))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginInput>, JsonRejection>,
) -> Result<Json<AuthResponse>, ServerError> {
    let Json(input) = payload?;
    let mut db = state.db.lock().await;

    let user = match db.find_user_by_email(&input.email) {
        Some(record) if verify_password(&input.password, &record.password_hash) => {
            record.sanitize()
        }
        _ => {
            warn!(email = %input.email, "Failed login attempt");
            return Err(ServerError::InvalidCredentials);
        }
    };
    let jwt = db.issue_session(&user.id);

    info!(user = %user.id, "User logged in");
    Ok(Json(AuthResponse { jwt, user }))
}

pub async fn me(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<User>, ServerError> {
    let db = state.db.lock().await;
    let user = require_auth(&headers, &db)?;
    Ok(Json(user.sanitize()))
}

#[cfg(test)]
mod tests {
    use agora_shared::Role;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::*;
    use crate::api::build_router;
    use crate::api::test_support::*;

    #[test]
    fn bearer_prefix_is_optional() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert("authorization", "abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert("authorization", "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn register_then_login_then_me() {
        let app = build_router(state());

        let (status, registered) = send(
            &app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "email": "ada@example.com",
                "firstName": "Ada",
                "lastName": "Lovelace",
                "password": "engine",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(registered["user"]["role"], "USER");
        assert!(registered["user"].get("passwordHash").is_none());

        let (status, logged_in) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "engine" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let token = logged_in["jwt"].as_str().unwrap();
        let (status, me) = send(&app, Method::GET, "/auth/me", Some(token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["email"], "ada@example.com");
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let state = state();
        seed_user(&state, "ada@example.com", Role::User).await;
        let app = build_router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "ada@example.com", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let state = state();
        seed_user(&state, "ada@example.com", Role::User).await;
        let app = build_router(state);

        let (status, _) = send(
            &app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "email": "ada@example.com",
                "firstName": "Ada",
                "lastName": "Again",
                "password": "pw",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn register_requires_non_empty_fields() {
        let app = build_router(state());

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "email": "ada@example.com",
                "firstName": " ",
                "lastName": "",
                "password": "",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "Invalid request: lastName: Required, password: Required"
        );
    }

    #[tokio::test]
    async fn me_without_token_is_unauthorized() {
        let app = build_router(state());
        let (status, body) = send(&app, Method::GET, "/auth/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized");
    }

    #[tokio::test]
    async fn malformed_body_is_a_structured_bad_request() {
        let app = build_router(state());
        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": 42 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().is_some());
    }
}
