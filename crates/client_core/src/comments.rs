use std::{fmt, str::FromStr, sync::Arc};

use reqwest::Method;
use shared::{
    domain::{ArticleId, Comment, CommentId},
    protocol::{CommentBody, CommentListResponse},
};

use crate::{
    error::{ClientResult, ValidationError},
    http::ApiClient,
};

pub const MAX_COMMENT_CHARS: usize = 500;

/// Returns the trimmed body when it may be submitted. The limit applies to the draft as
/// typed, surrounding whitespace included.
pub fn validate_comment_body(raw: &str) -> Result<String, ValidationError> {
    let body = raw.trim();
    if body.is_empty() {
        return Err(ValidationError::EmptyComment);
    }
    let len = raw.chars().count();
    if len > MAX_COMMENT_CHARS {
        return Err(ValidationError::CommentTooLong {
            len,
            max: MAX_COMMENT_CHARS,
        });
    }
    Ok(body.to_string())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommentSort {
    #[default]
    Newest,
    Oldest,
    Popular,
}

impl CommentSort {
    /// Sorted copy of `comments`; equal keys keep their input order.
    pub fn apply(self, comments: &[Comment]) -> Vec<Comment> {
        let mut sorted = comments.to_vec();
        match self {
            Self::Newest => sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            Self::Oldest => sorted.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            Self::Popular => sorted.sort_by(|a, b| b.upvote_count.cmp(&a.upvote_count)),
        }
        sorted
    }
}

impl fmt::Display for CommentSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Newest => "newest",
            Self::Oldest => "oldest",
            Self::Popular => "popular",
        })
    }
}

impl FromStr for CommentSort {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(Self::Newest),
            "oldest" => Ok(Self::Oldest),
            "popular" => Ok(Self::Popular),
            other => Err(format!(
                "unknown sort '{other}' (expected newest, oldest or popular)"
            )),
        }
    }
}

/// Comment CRUD and upvotes scoped to one registered article.
pub struct CommentStore {
    api: Arc<ApiClient>,
}

impl CommentStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub fn is_authenticated(&self) -> bool {
        self.api.is_authenticated()
    }

    pub async fn list(&self, article_id: &ArticleId) -> ClientResult<Vec<Comment>> {
        let path = format!("/comments/{article_id}");
        let request = self.api.authorized(Method::GET, &path)?;
        let body: CommentListResponse = self.api.send_json(&path, request).await?;
        Ok(body.comments)
    }

    pub async fn create(&self, article_id: &ArticleId, body_text: &str) -> ClientResult<()> {
        let path = format!("/comments/{article_id}");
        let request = self
            .api
            .authorized(Method::POST, &path)?
            .json(&comment_body(body_text));
        self.api.send_empty(&path, request).await
    }

    pub async fn update(
        &self,
        article_id: &ArticleId,
        comment_id: &CommentId,
        body_text: &str,
    ) -> ClientResult<()> {
        let path = format!("/comments/{article_id}/{comment_id}");
        let request = self
            .api
            .authorized(Method::PATCH, &path)?
            .json(&comment_body(body_text));
        self.api.send_empty(&path, request).await
    }

    pub async fn delete(&self, article_id: &ArticleId, comment_id: &CommentId) -> ClientResult<()> {
        let path = format!("/comments/{article_id}/{comment_id}");
        let request = self.api.authorized(Method::DELETE, &path)?;
        self.api.send_empty(&path, request).await
    }

    pub async fn upvote(&self, article_id: &ArticleId, comment_id: &CommentId) -> ClientResult<()> {
        let path = format!("/comments/{article_id}/{comment_id}/upvote");
        let request = self.api.authorized(Method::PATCH, &path)?;
        self.api.send_empty(&path, request).await
    }
}

fn comment_body(body_text: &str) -> CommentBody {
    CommentBody {
        comment_text: body_text.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/comments_tests.rs"]
mod tests;
