//! Profile dashboard: the signed-in user plus their bookmarks, likes and reading history.

use std::{collections::HashMap, sync::Arc};

use shared::domain::{Article, SavedList, UserRecord};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::{engagement::EngagementClient, ActionOutcome};

#[derive(Default)]
struct ProfileState {
    active: SavedList,
    lists: HashMap<SavedList, Vec<Article>>,
}

pub struct ProfileViewModel {
    client: Arc<EngagementClient>,
    state: Mutex<ProfileState>,
}

impl ProfileViewModel {
    pub fn new(client: Arc<EngagementClient>) -> Self {
        Self {
            client,
            state: Mutex::new(ProfileState::default()),
        }
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.client.api().session().get().and_then(|s| s.user)
    }

    pub async fn active_tab(&self) -> SavedList {
        self.state.lock().await.active
    }

    /// `None` until the tab has loaded once.
    pub async fn articles(&self, tab: SavedList) -> Option<Vec<Article>> {
        self.state.lock().await.lists.get(&tab).cloned()
    }

    /// Switches tabs, loading the tab the first time it is shown.
    pub async fn select_tab(&self, tab: SavedList) -> ActionOutcome {
        let loaded = {
            let mut state = self.state.lock().await;
            state.active = tab;
            state.lists.contains_key(&tab)
        };
        if loaded {
            return ActionOutcome::Completed;
        }
        self.load(tab).await
    }

    pub async fn refresh(&self) -> ActionOutcome {
        let tab = self.active_tab().await;
        self.load(tab).await
    }

    async fn load(&self, tab: SavedList) -> ActionOutcome {
        if !self.client.is_authenticated() {
            return ActionOutcome::Unauthenticated;
        }
        match self.client.saved_articles(tab).await {
            Ok(articles) => {
                debug!(list = tab.path_segment(), count = articles.len(), "saved list loaded");
                self.state.lock().await.lists.insert(tab, articles);
                ActionOutcome::Completed
            }
            Err(error) => {
                warn!(list = tab.path_segment(), %error, "saved list load failed");
                ActionOutcome::from_client_error(&error)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/profile_tests.rs"]
mod tests;
