//! Comment list, composer and edit-in-place state for one article.
//!
//! Every successful mutation is followed by a full re-fetch; the visible list only ever
//! contains what the server returned.

use std::sync::Arc;

use shared::domain::{Article, ArticleId, Comment, CommentId};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{
    comments::{validate_comment_body, CommentSort, CommentStore},
    registry::{ArticleRegistry, RegistrationOutcome},
    ActionOutcome,
};

/// Interactive yes/no gate in front of a delete.
pub trait DeleteConfirmation: Send + Sync {
    fn confirm(&self, comment: &Comment) -> bool;
}

impl<F> DeleteConfirmation for F
where
    F: Fn(&Comment) -> bool + Send + Sync,
{
    fn confirm(&self, comment: &Comment) -> bool {
        self(comment)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub target: CommentId,
    pub draft: String,
}

#[derive(Default)]
struct CommentListState {
    /// Server order of the last successful fetch.
    fetched: Vec<Comment>,
    sort: CommentSort,
    draft: String,
    edit: Option<EditSession>,
    submitting: bool,
}

pub struct CommentViewModel {
    article: Article,
    store: Arc<CommentStore>,
    registry: Arc<ArticleRegistry>,
    state: Mutex<CommentListState>,
}

impl CommentViewModel {
    pub fn new(article: Article, store: Arc<CommentStore>, registry: Arc<ArticleRegistry>) -> Self {
        Self {
            article,
            store,
            registry,
            state: Mutex::new(CommentListState::default()),
        }
    }

    pub async fn comments(&self) -> Vec<Comment> {
        let state = self.state.lock().await;
        state.sort.apply(&state.fetched)
    }

    pub async fn sort(&self) -> CommentSort {
        self.state.lock().await.sort
    }

    pub async fn set_sort(&self, sort: CommentSort) {
        self.state.lock().await.sort = sort;
    }

    pub async fn draft(&self) -> String {
        self.state.lock().await.draft.clone()
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        self.state.lock().await.draft = text.into();
    }

    pub async fn can_submit(&self) -> bool {
        let state = self.state.lock().await;
        !state.submitting && validate_comment_body(&state.draft).is_ok()
    }

    pub async fn is_submitting(&self) -> bool {
        self.state.lock().await.submitting
    }

    pub async fn refresh(&self) -> ActionOutcome {
        match self.article_id().await {
            Ok(article_id) => self.refetch(&article_id).await,
            Err(outcome) => outcome,
        }
    }

    pub async fn submit(&self) -> ActionOutcome {
        let body = {
            let mut state = self.state.lock().await;
            if state.submitting {
                return ActionOutcome::Cancelled;
            }
            let body = match validate_comment_body(&state.draft) {
                Ok(body) => body,
                Err(invalid) => return ActionOutcome::Invalid(invalid),
            };
            state.submitting = true;
            body
        };

        let outcome = self.create(&body).await;

        let mut state = self.state.lock().await;
        state.submitting = false;
        if outcome == ActionOutcome::Completed {
            state.draft.clear();
        }
        outcome
    }

    pub async fn edit_session(&self) -> Option<EditSession> {
        self.state.lock().await.edit.clone()
    }

    /// Enters edit mode on `comment_id`, discarding any other unsaved edit.
    pub async fn begin_edit(&self, comment_id: &CommentId) -> bool {
        let mut state = self.state.lock().await;
        let Some(comment) = state.fetched.iter().find(|c| &c.id == comment_id) else {
            return false;
        };
        let session = EditSession {
            target: comment.id.clone(),
            draft: comment.body_text.clone(),
        };
        if let Some(previous) = state.edit.replace(session) {
            if &previous.target != comment_id {
                debug!(discarded = %previous.target, "switched edit target; draft discarded");
            }
        }
        true
    }

    pub async fn set_edit_draft(&self, text: impl Into<String>) {
        if let Some(edit) = self.state.lock().await.edit.as_mut() {
            edit.draft = text.into();
        }
    }

    pub async fn cancel_edit(&self) {
        self.state.lock().await.edit = None;
    }

    pub async fn save_edit(&self) -> ActionOutcome {
        let Some(edit) = self.state.lock().await.edit.clone() else {
            return ActionOutcome::Cancelled;
        };
        let body = match validate_comment_body(&edit.draft) {
            Ok(body) => body,
            Err(invalid) => return ActionOutcome::Invalid(invalid),
        };
        let article_id = match self.article_id().await {
            Ok(article_id) => article_id,
            Err(outcome) => return outcome,
        };

        if let Err(error) = self.store.update(&article_id, &edit.target, &body).await {
            warn!(%article_id, comment_id = %edit.target, %error, "comment update failed");
            return ActionOutcome::from_client_error(&error);
        }

        {
            let mut state = self.state.lock().await;
            if state.edit.as_ref().map(|e| &e.target) == Some(&edit.target) {
                state.edit = None;
            }
        }
        self.refetch(&article_id).await;
        ActionOutcome::Completed
    }

    pub async fn delete(
        &self,
        comment_id: &CommentId,
        confirmation: &dyn DeleteConfirmation,
    ) -> ActionOutcome {
        let comment = {
            let state = self.state.lock().await;
            state.fetched.iter().find(|c| &c.id == comment_id).cloned()
        };
        let Some(comment) = comment else {
            warn!(%comment_id, "delete requested for a comment not in the list");
            return ActionOutcome::Failed;
        };
        if !confirmation.confirm(&comment) {
            return ActionOutcome::Cancelled;
        }
        let article_id = match self.article_id().await {
            Ok(article_id) => article_id,
            Err(outcome) => return outcome,
        };

        if let Err(error) = self.store.delete(&article_id, comment_id).await {
            warn!(%article_id, %comment_id, %error, "comment delete failed");
            return ActionOutcome::from_client_error(&error);
        }

        {
            let mut state = self.state.lock().await;
            if state.edit.as_ref().map(|e| &e.target) == Some(comment_id) {
                state.edit = None;
            }
        }
        self.refetch(&article_id).await;
        ActionOutcome::Completed
    }

    pub async fn upvote(&self, comment_id: &CommentId) -> ActionOutcome {
        let article_id = match self.article_id().await {
            Ok(article_id) => article_id,
            Err(outcome) => return outcome,
        };

        if let Err(error) = self.store.upvote(&article_id, comment_id).await {
            warn!(%article_id, %comment_id, %error, "comment upvote failed");
            return ActionOutcome::from_client_error(&error);
        }
        self.refetch(&article_id).await;
        ActionOutcome::Completed
    }

    async fn create(&self, body: &str) -> ActionOutcome {
        let article_id = match self.article_id().await {
            Ok(article_id) => article_id,
            Err(outcome) => return outcome,
        };

        if let Err(error) = self.store.create(&article_id, body).await {
            warn!(%article_id, %error, "comment create failed");
            return ActionOutcome::from_client_error(&error);
        }
        self.refetch(&article_id).await;
        ActionOutcome::Completed
    }

    async fn article_id(&self) -> Result<ArticleId, ActionOutcome> {
        if !self.store.is_authenticated() {
            return Err(ActionOutcome::Unauthenticated);
        }
        match self.registry.ensure_registered(&self.article).await {
            RegistrationOutcome::Registered(registered) => Ok(registered.article_id),
            RegistrationOutcome::Unauthenticated => Err(ActionOutcome::Unauthenticated),
            RegistrationOutcome::Unavailable => Err(ActionOutcome::Unavailable),
        }
    }

    /// Replaces the list with the server's. A failed fetch keeps what is displayed.
    async fn refetch(&self, article_id: &ArticleId) -> ActionOutcome {
        match self.store.list(article_id).await {
            Ok(comments) => {
                debug!(%article_id, count = comments.len(), "comments refreshed");
                self.state.lock().await.fetched = comments;
                ActionOutcome::Completed
            }
            Err(error) => {
                warn!(%article_id, %error, "comment list fetch failed");
                ActionOutcome::from_client_error(&error)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/comment_vm_tests.rs"]
mod tests;
