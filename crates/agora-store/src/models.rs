//! Backend-only row types.

use agora_shared::{Role, User};
use serde::{Deserialize, Serialize};

use crate::table::Record;

/// A user row as stored by the mock backend. Never sent over the wire
/// directly: see [`UserRecord::sanitize`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub bio: String,
    pub created_at: i64,
    /// `hex(salt)$hex(blake3(salt || password))`
    pub password_hash: String,
}

impl UserRecord {
    /// Strip sensitive fields.
    pub fn sanitize(&self) -> User {
        User {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role,
            bio: self.bio.clone(),
            created_at: self.created_at,
        }
    }
}

impl Record for UserRecord {
    const TABLE: &'static str = "user";

    fn id(&self) -> &str {
        &self.id
    }
}

fn digest(salt: &[u8], password: &str) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize()
}

pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::random();
    format!("{}${}", hex::encode(salt), digest(&salt, password).to_hex())
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, hash_hex)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), blake3::Hash::from_hex(hash_hex)) else {
        return false;
    };
    // blake3::Hash equality is constant-time.
    digest(&salt, password) == expected
}
