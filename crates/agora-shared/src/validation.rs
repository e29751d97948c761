//! Input validation for create operations.
//!
//! Validation runs before anything touches the network; a failure carries
//! one message per offending field.

use serde::{Deserialize, Serialize};

use crate::error::FieldErrors;

pub const REQUIRED: &str = "Required";

pub trait Validate: Sized {
    fn validate(self) -> Result<Self, FieldErrors>;
}

fn require(errors: &mut FieldErrors, field: &str, value: &str) {
    if value.is_empty() {
        errors.add(field, REQUIRED);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDiscussionInput {
    pub title: String,
    pub body: String,
}

impl Validate for CreateDiscussionInput {
    fn validate(self) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "title", &self.title);
        require(&mut errors, "body", &self.body);
        errors.into_result(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    pub body: String,
    pub discussion_id: String,
}

impl Validate for CreateCommentInput {
    fn validate(self) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        require(&mut errors, "body", &self.body);
        require(&mut errors, "discussionId", &self.discussion_id);
        errors.into_result(self)
    }
}
