use std::sync::Arc;

use reqwest::Method;
use shared::{
    domain::{Article, ArticleId, SavedList},
    protocol::{ArticleListResponse, ArticleRef, ViewResponse},
};

use crate::{error::ClientResult, http::ApiClient};

/// Article-scoped calls: view registration, bookmark/like toggles and the saved lists.
pub struct EngagementClient {
    api: Arc<ApiClient>,
}

impl EngagementClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn is_authenticated(&self) -> bool {
        self.api.is_authenticated()
    }

    /// Upserts the article on the backend and returns its durable id.
    pub async fn register_view(&self, article: &Article) -> ClientResult<ViewResponse> {
        let path = "/article/view";
        let request = self.api.authorized(Method::POST, path)?.json(article);
        self.api.send_json(path, request).await
    }

    pub async fn toggle_bookmark(&self, article_id: &ArticleId) -> ClientResult<()> {
        self.toggle("/article/bookmark", article_id).await
    }

    pub async fn toggle_like(&self, article_id: &ArticleId) -> ClientResult<()> {
        self.toggle("/article/like", article_id).await
    }

    pub async fn saved_articles(&self, list: SavedList) -> ClientResult<Vec<Article>> {
        let path = format!("/article/{}", list.path_segment());
        let request = self.api.authorized(Method::GET, &path)?;
        let body: ArticleListResponse = self.api.send_json(&path, request).await?;
        Ok(body.articles)
    }

    async fn toggle(&self, path: &str, article_id: &ArticleId) -> ClientResult<()> {
        let request = self.api.authorized(Method::PATCH, path)?.json(&ArticleRef {
            article_id: article_id.clone(),
        });
        self.api.send_empty(path, request).await
    }
}
