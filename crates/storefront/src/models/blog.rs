//! Blog posts and media uploads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vitrine_core::{MediaId, PostId, PostStatus};

/// A blog post. List responses omit `body`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    /// Editor markup, passed through untouched.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

/// One page of `GET blog`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPage {
    #[serde(default)]
    pub items: Vec<Post>,
    #[serde(default)]
    pub total: u64,
}

/// Post form validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostInputError {
    #[error("title cannot be empty")]
    EmptyTitle,
    #[error("title must be at most {max} characters")]
    TitleTooLong { max: usize },
    #[error("a published post needs a body")]
    EmptyBody,
}

/// Body of `POST blog` and `PUT blog/{id}`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PostInput {
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub status: PostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<MediaId>,
}

impl PostInput {
    pub const MAX_TITLE_LENGTH: usize = 200;

    /// Check the form before it is submitted.
    ///
    /// # Errors
    ///
    /// Returns the first rule the input breaks.
    pub fn validate(&self) -> Result<(), PostInputError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(PostInputError::EmptyTitle);
        }
        if title.chars().count() > Self::MAX_TITLE_LENGTH {
            return Err(PostInputError::TitleTooLong {
                max: Self::MAX_TITLE_LENGTH,
            });
        }
        if self.status.is_public() && self.body.trim().is_empty() {
            return Err(PostInputError::EmptyBody);
        }
        Ok(())
    }
}

/// A stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Media {
    pub id: MediaId,
    pub url: String,
}
