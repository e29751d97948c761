//! # agora-shared
//!
//! Wire types shared by the Agora client and the mock backend: the
//! discussion board entities, request bodies, input validation and the
//! notification payload surfaced to the UI.

pub mod error;
pub mod notification;
pub mod types;
pub mod validation;

pub use error::FieldErrors;
pub use notification::{Notification, NotificationKind};
pub use types::*;
pub use validation::{CreateCommentInput, CreateDiscussionInput, Validate};
