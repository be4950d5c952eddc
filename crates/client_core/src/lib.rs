pub mod comment_vm;
pub mod comments;
pub mod display;
pub mod engagement;
pub mod engagement_vm;
pub mod error;
pub mod http;
pub mod profile;
pub mod registry;
pub mod session;
pub mod verification;

pub use comment_vm::{CommentViewModel, DeleteConfirmation, EditSession};
pub use comments::{validate_comment_body, CommentSort, CommentStore, MAX_COMMENT_CHARS};
pub use engagement::EngagementClient;
pub use engagement_vm::EngagementViewModel;
pub use error::{ClientError, ClientResult, ValidationError};
pub use http::{ApiClient, ApiConfig, SessionEvent};
pub use profile::ProfileViewModel;
pub use registry::{ArticleRegistry, RegisteredArticle, RegistrationOutcome, RegistrationPhase};
pub use session::{InMemorySession, Session, SessionAccessor};
pub use verification::{VerificationClient, VerificationPhase, VerificationViewModel};

/// Result of a user-triggered view-model action. Network failures are logged, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// The user or a guard declined the action; nothing was sent.
    Cancelled,
    Invalid(ValidationError),
    Unauthenticated,
    /// The article could not be registered this session.
    Unavailable,
    Failed,
}

impl ActionOutcome {
    pub(crate) fn from_client_error(error: &ClientError) -> Self {
        if error.is_unauthenticated() {
            Self::Unauthenticated
        } else {
            Self::Failed
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
