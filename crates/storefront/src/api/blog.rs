//! Blog and media endpoints.

use tracing::instrument;
use vitrine_core::PostId;

use super::{ApiClient, ApiError, ApiRequest, Upload, paths};
use crate::models::{Media, Post, PostInput, PostPage};

impl ApiClient {
    /// One page of posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_posts(&self, page: u32, per_page: u32) -> Result<PostPage, ApiError> {
        let request = ApiRequest::get(paths::BLOG)
            .query("page", page)
            .query("per_page", per_page);
        self.execute(request).await
    }

    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown slug.
    #[instrument(skip(self))]
    pub async fn get_post(&self, slug: &str) -> Result<Post, ApiError> {
        self.execute(ApiRequest::get(paths::post_by_slug(slug))).await
    }

    /// # Errors
    ///
    /// Returns an error if the post is rejected or the caller may not write.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_post(&self, input: &PostInput) -> Result<Post, ApiError> {
        self.execute(ApiRequest::post(paths::BLOG).json(input)?)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the post is rejected or does not exist.
    #[instrument(skip(self, input))]
    pub async fn update_post(&self, id: PostId, input: &PostInput) -> Result<Post, ApiError> {
        self.execute(ApiRequest::put(paths::post(id)).json(input)?)
            .await
    }

    /// # Errors
    ///
    /// Returns an error if the post cannot be deleted.
    #[instrument(skip(self))]
    pub async fn delete_post(&self, id: PostId) -> Result<(), ApiError> {
        self.execute_empty(ApiRequest::delete(paths::post(id))).await
    }

    /// Upload an image for use as a post cover or avatar.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected.
    #[instrument(skip(self, upload), fields(file_name = %upload.file_name, size = upload.bytes.len()))]
    pub async fn upload_media(&self, upload: Upload) -> Result<Media, ApiError> {
        self.execute(ApiRequest::post(paths::MEDIA).multipart(upload))
            .await
    }
}
