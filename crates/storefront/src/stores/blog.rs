//! Blog store: post listing, reading and editing.
//!
//! Post bodies are opaque strings here; rendering and rich-text editing
//! belong to the UI.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use vitrine_core::PostId;

use super::InFlight;
use crate::api::{ApiClient, ApiError, Upload};
use crate::error::StoreError;
use crate::models::{Media, Post, PostInput};
use crate::notify::Notifier;

/// Observable blog state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlogState {
    /// Posts of the current page.
    pub posts: Vec<Post>,
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    /// Post opened with [`BlogStore::load_post`] or last saved.
    pub current: Option<Post>,
    pub loading: bool,
    pub saving: bool,
    pub last_error: Option<String>,
}

impl BlogState {
    #[must_use]
    pub fn page_count(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.per_page))
    }
}

#[derive(Clone)]
pub struct BlogStore {
    inner: Arc<BlogInner>,
}

struct BlogInner {
    api: ApiClient,
    notifier: Notifier,
    state: watch::Sender<BlogState>,
    generation: AtomicU64,
    saving: AtomicBool,
}

impl BlogStore {
    #[must_use]
    pub fn new(api: ApiClient, notifier: Notifier, per_page: u32) -> Self {
        let (state, _) = watch::channel(BlogState {
            posts: Vec::new(),
            page: 1,
            per_page,
            total: 0,
            current: None,
            loading: false,
            saving: false,
            last_error: None,
        });
        Self {
            inner: Arc::new(BlogInner {
                api,
                notifier,
                state,
                generation: AtomicU64::new(0),
                saving: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> BlogState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<BlogState> {
        self.inner.state.subscribe()
    }

    /// Load one page of posts, replacing the list.
    ///
    /// # Errors
    ///
    /// Returns the API error; it is also recorded in `last_error`.
    #[instrument(skip(self))]
    pub async fn load_posts(&self, page: u32) -> Result<(), StoreError> {
        let page = page.max(1);
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let per_page = self.inner.state.borrow().per_page;
        self.inner.state.send_modify(|s| s.loading = true);

        let result = self.inner.api.list_posts(page, per_page).await;
        if self.inner.generation.load(Ordering::Acquire) != generation {
            debug!("Discarding superseded post page");
            return Ok(());
        }

        match result {
            Ok(listing) => {
                self.inner.state.send_modify(|s| {
                    s.posts = listing.items;
                    s.total = listing.total;
                    s.page = page;
                    s.loading = false;
                    s.last_error = None;
                });
                Ok(())
            }
            Err(e) => {
                let message = e.user_message();
                warn!(error = %e, "Failed to load posts");
                self.inner.state.send_modify(|s| {
                    s.loading = false;
                    s.last_error = Some(message.clone());
                });
                self.inner.notifier.error(message);
                Err(e.into())
            }
        }
    }

    /// Open a post by slug.
    ///
    /// # Errors
    ///
    /// Returns the API error; not found is recorded in `last_error` without a
    /// notification.
    #[instrument(skip(self))]
    pub async fn load_post(&self, slug: &str) -> Result<Post, StoreError> {
        match self.inner.api.get_post(slug).await {
            Ok(post) => {
                let current = post.clone();
                self.inner.state.send_modify(|s| {
                    s.current = Some(current);
                    s.last_error = None;
                });
                Ok(post)
            }
            Err(e) => {
                let message = e.user_message();
                self.inner.state.send_modify(|s| {
                    s.current = None;
                    s.last_error = Some(message.clone());
                });
                if !matches!(e, ApiError::NotFound(_)) {
                    warn!(error = %e, "Failed to load post");
                    self.inner.notifier.error(message);
                }
                Err(e.into())
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for invalid input, [`StoreError::Busy`]
    /// while another save runs, or the API error.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_post(&self, input: &PostInput) -> Result<Post, StoreError> {
        let _saving = self.begin_save(input)?;
        self.mark_saving(true);

        match self.inner.api.create_post(input).await {
            Ok(post) => {
                info!(post_id = %post.id, "Post created");
                let created = post.clone();
                self.inner.state.send_modify(|s| {
                    if s.page == 1 {
                        s.posts.insert(0, created.clone());
                    }
                    s.total += 1;
                    s.current = Some(created);
                    s.saving = false;
                    s.last_error = None;
                });
                self.inner.notifier.success("Post created");
                Ok(post)
            }
            Err(e) => Err(self.fail("Could not create the post", e)),
        }
    }

    /// # Errors
    ///
    /// Same as [`create_post`](Self::create_post).
    #[instrument(skip(self, input))]
    pub async fn update_post(&self, id: PostId, input: &PostInput) -> Result<Post, StoreError> {
        let _saving = self.begin_save(input)?;
        self.mark_saving(true);

        match self.inner.api.update_post(id, input).await {
            Ok(post) => {
                let updated = post.clone();
                self.inner.state.send_modify(|s| {
                    if let Some(existing) = s.posts.iter_mut().find(|p| p.id == id) {
                        *existing = updated.clone();
                    }
                    s.current = Some(updated);
                    s.saving = false;
                    s.last_error = None;
                });
                self.inner.notifier.success("Post saved");
                Ok(post)
            }
            Err(e) => Err(self.fail("Could not save the post", e)),
        }
    }

    /// # Errors
    ///
    /// Returns [`StoreError::AuthRequired`] when signed out, or the API error.
    #[instrument(skip(self))]
    pub async fn delete_post(&self, id: PostId) -> Result<(), StoreError> {
        self.require_session()?;
        match self.inner.api.delete_post(id).await {
            Ok(()) => {
                self.inner.state.send_modify(|s| {
                    let before = s.posts.len();
                    s.posts.retain(|p| p.id != id);
                    if s.posts.len() < before {
                        s.total = s.total.saturating_sub(1);
                    }
                    if s.current.as_ref().is_some_and(|p| p.id == id) {
                        s.current = None;
                    }
                    s.last_error = None;
                });
                self.inner.notifier.success("Post deleted");
                Ok(())
            }
            Err(e) => Err(self.fail("Could not delete the post", e)),
        }
    }

    /// Upload an image and return where it is served from.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AuthRequired`] when signed out, or the API error.
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name))]
    pub async fn upload_media(&self, upload: Upload) -> Result<Media, StoreError> {
        self.require_session()?;
        self.inner
            .api
            .upload_media(upload)
            .await
            .map_err(|e| self.fail("Upload failed", e))
    }

    fn begin_save(&self, input: &PostInput) -> Result<InFlight<'_>, StoreError> {
        self.require_session()?;
        input.validate()?;
        InFlight::acquire(&self.inner.saving).ok_or(StoreError::Busy)
    }

    fn mark_saving(&self, saving: bool) {
        self.inner.state.send_modify(|s| s.saving = saving);
    }

    fn require_session(&self) -> Result<(), StoreError> {
        if self.inner.api.session().is_authenticated() {
            Ok(())
        } else {
            self.inner.notifier.warning("Sign in to manage posts");
            Err(StoreError::AuthRequired)
        }
    }

    fn fail(&self, action: &str, err: ApiError) -> StoreError {
        warn!(error = %err, "{action}");
        let message = err.user_message();
        self.inner.state.send_modify(|s| {
            s.saving = false;
            s.last_error = Some(message.clone());
        });
        self.inner.notifier.error(format!("{action}: {message}"));
        err.into()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;
    use vitrine_core::PostStatus;

    use super::*;
    use crate::api::{ApiResponse, Method};
    use crate::testing::{self, ScriptedTransport};

    fn post_json(id: i64, title: &str) -> serde_json::Value {
        json!({"id": id, "slug": format!("post-{id}"), "title": title, "status": "published"})
    }

    fn input(title: &str) -> PostInput {
        PostInput {
            title: title.to_string(),
            body: "<p>Body</p>".to_string(),
            status: PostStatus::Published,
            ..PostInput::default()
        }
    }

    #[tokio::test]
    async fn test_load_posts_and_page_count() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.route(Method::Get, "blog", |request, _| {
            assert_eq!(ScriptedTransport::query_param(request, "per_page").as_deref(), Some("2"));
            Ok(ApiResponse::json(
                StatusCode::OK,
                &json!({"items": [post_json(1, "One"), post_json(2, "Two")], "total": 5}),
            ))
        });
        let blog = BlogStore::new(testing::anonymous_client(&transport), Notifier::new(), 2);

        blog.load_posts(1).await.unwrap();
        let state = blog.snapshot();
        assert_eq!(state.posts.len(), 2);
        assert_eq!(state.page_count(), 3);
    }

    #[tokio::test]
    async fn test_create_requires_session_and_valid_input() {
        let transport = Arc::new(ScriptedTransport::new());
        let anonymous = BlogStore::new(testing::anonymous_client(&transport), Notifier::new(), 10);
        assert!(matches!(
            anonymous.create_post(&input("Hello")).await,
            Err(StoreError::AuthRequired)
        ));

        let blog = BlogStore::new(testing::signed_in_client(&transport).await, Notifier::new(), 10);
        assert!(matches!(
            blog.create_post(&input("   ")).await,
            Err(StoreError::Validation(_))
        ));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_create_prepends_and_notifies() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply(Method::Post, "blog", StatusCode::CREATED, post_json(9, "Fresh"));
        let notifier = Notifier::new();
        let mut notices = notifier.subscribe();
        let blog = BlogStore::new(testing::signed_in_client(&transport).await, notifier, 10);

        let post = blog.create_post(&input("Fresh")).await.unwrap();
        assert_eq!(post.id, PostId::new(9));
        let state = blog.snapshot();
        assert_eq!(state.posts[0].title, "Fresh");
        assert_eq!(state.total, 1);
        assert!(!state.saving);
        assert_eq!(notices.try_recv().unwrap().message, "Post created");
    }

    #[tokio::test]
    async fn test_missing_post_is_recorded_quietly() {
        let transport = Arc::new(ScriptedTransport::new());
        let notifier = Notifier::new();
        let mut notices = notifier.subscribe();
        let blog = BlogStore::new(testing::anonymous_client(&transport), notifier, 10);

        assert!(blog.load_post("nope").await.is_err());
        assert!(blog.snapshot().last_error.is_some());
        assert!(notices.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_delete_removes_from_list() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.reply(Method::Get, "blog", StatusCode::OK, json!({"items": [post_json(1, "One")], "total": 1}));
        transport.reply(Method::Delete, "blog/1", StatusCode::NO_CONTENT, json!(null));
        let blog = BlogStore::new(testing::signed_in_client(&transport).await, Notifier::new(), 10);
        blog.load_posts(1).await.unwrap();

        blog.delete_post(PostId::new(1)).await.unwrap();
        let state = blog.snapshot();
        assert!(state.posts.is_empty());
        assert_eq!(state.total, 0);
    }
}
