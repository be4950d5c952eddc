//! Session-wide article registration, memoized per article link.
//!
//! The first caller for a link issues `registerView`; callers arriving while that call is in
//! flight await the same shared future. A server-assigned id is written once and never
//! replaced for the rest of the session.

use std::{collections::HashMap, sync::Arc};

use futures::future::{BoxFuture, FutureExt, Shared};
use shared::{
    domain::{Article, ArticleId, EngagementState},
    protocol::ViewResponse,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::engagement::EngagementClient;

#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredArticle {
    pub article_id: ArticleId,
    /// Engagement hints: the view response, later replaced by the last confirmed toggle.
    /// `None` when the id was already known and nothing was toggled yet.
    pub view: Option<ViewResponse>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
    Registered(RegisteredArticle),
    Unauthenticated,
    /// Registration failed on the server or in transport; disabled for this session.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationPhase {
    Unregistered,
    Registering,
    Registered,
    Unavailable,
}

enum Registration {
    Registering(Shared<BoxFuture<'static, RegistrationOutcome>>),
    Registered(RegisteredArticle),
    Unavailable,
}

pub struct ArticleRegistry {
    client: Arc<EngagementClient>,
    entries: Mutex<HashMap<String, Registration>>,
}

impl ArticleRegistry {
    pub fn new(client: Arc<EngagementClient>) -> Arc<Self> {
        Arc::new(Self {
            client,
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub async fn phase(&self, link: &str) -> RegistrationPhase {
        match self.entries.lock().await.get(link) {
            None => RegistrationPhase::Unregistered,
            Some(Registration::Registering(_)) => RegistrationPhase::Registering,
            Some(Registration::Registered(_)) => RegistrationPhase::Registered,
            Some(Registration::Unavailable) => RegistrationPhase::Unavailable,
        }
    }

    pub async fn article_id(&self, link: &str) -> Option<ArticleId> {
        match self.entries.lock().await.get(link) {
            Some(Registration::Registered(registered)) => Some(registered.article_id.clone()),
            _ => None,
        }
    }

    /// Stores the latest confirmed engagement so a later mount of the same article starts
    /// from it instead of the hints of the first view response.
    pub async fn record_engagement(&self, link: &str, engagement: EngagementState) {
        if let Some(Registration::Registered(registered)) = self.entries.lock().await.get_mut(link)
        {
            registered.view = Some(ViewResponse {
                article_id: registered.article_id.clone(),
                is_bookmarked: Some(engagement.is_bookmarked),
                is_liked: Some(engagement.is_liked),
                like_count: Some(engagement.like_count),
            });
        }
    }

    pub async fn ensure_registered(&self, article: &Article) -> RegistrationOutcome {
        let link = article.link.clone();
        let pending = {
            let mut entries = self.entries.lock().await;
            match entries.get(&link) {
                Some(Registration::Registered(registered)) => {
                    return RegistrationOutcome::Registered(registered.clone());
                }
                Some(Registration::Unavailable) => return RegistrationOutcome::Unavailable,
                Some(Registration::Registering(pending)) => pending.clone(),
                None => {
                    if let Some(article_id) = article.article_id.clone() {
                        let registered = RegisteredArticle {
                            article_id,
                            view: None,
                        };
                        entries.insert(link, Registration::Registered(registered.clone()));
                        return RegistrationOutcome::Registered(registered);
                    }
                    if !self.client.is_authenticated() {
                        return RegistrationOutcome::Unauthenticated;
                    }
                    let pending = register(self.client.clone(), article.clone())
                        .boxed()
                        .shared();
                    entries.insert(link.clone(), Registration::Registering(pending.clone()));
                    pending
                }
            }
        };

        let outcome = pending.await;

        let mut entries = self.entries.lock().await;
        match &outcome {
            RegistrationOutcome::Registered(registered) => {
                if !matches!(entries.get(&link), Some(Registration::Registered(_))) {
                    entries.insert(link, Registration::Registered(registered.clone()));
                }
            }
            RegistrationOutcome::Unavailable => {
                if !matches!(entries.get(&link), Some(Registration::Registered(_))) {
                    entries.insert(link, Registration::Unavailable);
                }
            }
            RegistrationOutcome::Unauthenticated => {
                if matches!(entries.get(&link), Some(Registration::Registering(_))) {
                    entries.remove(&link);
                }
            }
        }
        outcome
    }
}

async fn register(client: Arc<EngagementClient>, article: Article) -> RegistrationOutcome {
    debug!(link = %article.link, "registering article view");
    match client.register_view(&article).await {
        Ok(view) => {
            info!(link = %article.link, article_id = %view.article_id, "article registered");
            RegistrationOutcome::Registered(RegisteredArticle {
                article_id: view.article_id.clone(),
                view: Some(view),
            })
        }
        Err(error) if error.is_unauthenticated() => {
            warn!(link = %article.link, %error, "view registration skipped: not signed in");
            RegistrationOutcome::Unauthenticated
        }
        Err(error) => {
            warn!(
                link = %article.link,
                %error,
                "view registration failed; engagement disabled for this article"
            );
            RegistrationOutcome::Unavailable
        }
    }
}
