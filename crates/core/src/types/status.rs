//! Blog post publication status.

use serde::{Deserialize, Serialize};

/// Whether a blog post is visible to shoppers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    /// Only visible to editors.
    #[default]
    Draft,
    /// Listed on the public blog.
    Published,
    /// Hidden from the blog but kept for reference.
    Archived,
}

impl PostStatus {
    /// Shoppers can see the post.
    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Published)
    }
}
