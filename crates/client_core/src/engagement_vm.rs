//! Bookmark/like state for one mounted article view.
//!
//! Bookmarks are pessimistic: the flag flips only after the backend acknowledges. Likes are
//! optimistic: the flag and count flip before the call is issued and flip back if it fails.
//! In-flight toggles are not deduplicated; each response applies to the current state on
//! its own.

use std::sync::Arc;

use shared::domain::{Article, ArticleId, EngagementState};
use tokio::sync::Mutex;
use tracing::warn;

use crate::{
    engagement::EngagementClient,
    registry::{ArticleRegistry, RegisteredArticle, RegistrationOutcome, RegistrationPhase},
    ActionOutcome,
};

struct ViewState {
    engagement: EngagementState,
    hydrated: bool,
}

pub struct EngagementViewModel {
    article: Article,
    client: Arc<EngagementClient>,
    registry: Arc<ArticleRegistry>,
    state: Mutex<ViewState>,
}

impl EngagementViewModel {
    pub fn new(
        article: Article,
        client: Arc<EngagementClient>,
        registry: Arc<ArticleRegistry>,
    ) -> Self {
        Self::with_state(article, client, registry, EngagementState::default())
    }

    /// Starts from a caller-known state; hints in the view response still take precedence.
    pub fn with_state(
        article: Article,
        client: Arc<EngagementClient>,
        registry: Arc<ArticleRegistry>,
        initial: EngagementState,
    ) -> Self {
        Self {
            article,
            client,
            registry,
            state: Mutex::new(ViewState {
                engagement: initial,
                hydrated: false,
            }),
        }
    }

    pub fn article(&self) -> &Article {
        &self.article
    }

    pub async fn state(&self) -> EngagementState {
        self.state.lock().await.engagement
    }

    pub async fn phase(&self) -> RegistrationPhase {
        self.registry.phase(&self.article.link).await
    }

    /// Mount-time view tracking. Returns the article id when registration succeeded.
    pub async fn open(&self) -> Option<ArticleId> {
        self.registered().await.ok()
    }

    pub async fn toggle_bookmark(&self) -> ActionOutcome {
        let article_id = match self.registered().await {
            Ok(article_id) => article_id,
            Err(outcome) => return outcome,
        };

        match self.client.toggle_bookmark(&article_id).await {
            Ok(()) => {
                let engagement = {
                    let mut state = self.state.lock().await;
                    state.engagement.flip_bookmark();
                    state.engagement
                };
                self.record(engagement).await;
                ActionOutcome::Completed
            }
            Err(error) => {
                warn!(%article_id, %error, "bookmark toggle failed; state unchanged");
                ActionOutcome::from_client_error(&error)
            }
        }
    }

    pub async fn toggle_like(&self) -> ActionOutcome {
        let article_id = match self.registered().await {
            Ok(article_id) => article_id,
            Err(outcome) => return outcome,
        };

        self.state.lock().await.engagement.flip_like();

        let result = self.client.toggle_like(&article_id).await;
        let engagement = {
            let mut state = self.state.lock().await;
            if result.is_err() {
                state.engagement.flip_like();
            }
            state.engagement
        };
        self.record(engagement).await;

        match result {
            Ok(()) => ActionOutcome::Completed,
            Err(error) => {
                warn!(%article_id, %error, "like toggle failed; rolled back");
                ActionOutcome::from_client_error(&error)
            }
        }
    }

    async fn record(&self, engagement: EngagementState) {
        self.registry
            .record_engagement(&self.article.link, engagement)
            .await;
    }

    async fn registered(&self) -> Result<ArticleId, ActionOutcome> {
        if !self.client.is_authenticated() {
            return Err(ActionOutcome::Unauthenticated);
        }
        match self.registry.ensure_registered(&self.article).await {
            RegistrationOutcome::Registered(registered) => {
                self.hydrate(&registered).await;
                Ok(registered.article_id)
            }
            RegistrationOutcome::Unauthenticated => Err(ActionOutcome::Unauthenticated),
            RegistrationOutcome::Unavailable => Err(ActionOutcome::Unavailable),
        }
    }

    async fn hydrate(&self, registered: &RegisteredArticle) {
        let mut state = self.state.lock().await;
        if state.hydrated {
            return;
        }
        state.hydrated = true;
        let Some(view) = &registered.view else {
            return;
        };
        if let Some(is_bookmarked) = view.is_bookmarked {
            state.engagement.is_bookmarked = is_bookmarked;
        }
        if let Some(is_liked) = view.is_liked {
            state.engagement.is_liked = is_liked;
        }
        if let Some(like_count) = view.like_count {
            state.engagement.like_count = like_count;
        }
    }
}

#[cfg(test)]
#[path = "tests/engagement_vm_tests.rs"]
mod tests;
