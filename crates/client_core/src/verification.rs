//! Email verification: request a one-time code, then submit it.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use reqwest::Method;
use shared::{
    domain::UserRecord,
    protocol::{VerifyRequest, VerifyResponse},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    error::{ClientResult, ValidationError},
    http::ApiClient,
    ActionOutcome,
};

pub const DEFAULT_RESEND_COOLDOWN: Duration = Duration::from_secs(30);
const CODE_LEN: usize = 6;

pub fn validate_code(raw: &str) -> Result<String, ValidationError> {
    let code = raw.trim();
    if code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(code.to_string())
    } else {
        Err(ValidationError::MalformedCode)
    }
}

pub struct VerificationClient {
    api: Arc<ApiClient>,
}

impl VerificationClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn send_code(&self) -> ClientResult<()> {
        let path = "/user/verify/send";
        let request = self.api.authorized(Method::POST, path)?;
        self.api.send_empty(path, request).await
    }

    pub async fn verify(&self, otp: &str) -> ClientResult<UserRecord> {
        let path = "/user/verify";
        let request = self.api.authorized(Method::PATCH, path)?.json(&VerifyRequest {
            otp: otp.to_string(),
        });
        let body: VerifyResponse = self.api.send_json(path, request).await?;
        Ok(body.user)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationPhase {
    Idle,
    Sending,
    CodeSent,
    Verifying,
    Verified,
    Failed,
}

struct VerificationState {
    phase: VerificationPhase,
    last_sent: Option<Instant>,
}

pub struct VerificationViewModel {
    client: Arc<VerificationClient>,
    api: Arc<ApiClient>,
    cooldown: Duration,
    state: Mutex<VerificationState>,
}

impl VerificationViewModel {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self::with_cooldown(api, DEFAULT_RESEND_COOLDOWN)
    }

    pub fn with_cooldown(api: Arc<ApiClient>, cooldown: Duration) -> Self {
        let already_verified = api
            .session()
            .get()
            .and_then(|s| s.user)
            .is_some_and(|u| u.is_verified);
        Self {
            client: Arc::new(VerificationClient::new(api.clone())),
            api,
            cooldown,
            state: Mutex::new(VerificationState {
                phase: if already_verified {
                    VerificationPhase::Verified
                } else {
                    VerificationPhase::Idle
                },
                last_sent: None,
            }),
        }
    }

    pub async fn phase(&self) -> VerificationPhase {
        self.state.lock().await.phase
    }

    pub async fn can_resend(&self) -> bool {
        let state = self.state.lock().await;
        self.cooldown_elapsed(&state)
    }

    pub async fn send_code(&self) -> ActionOutcome {
        if !self.api.is_authenticated() {
            return ActionOutcome::Unauthenticated;
        }
        {
            let mut state = self.state.lock().await;
            match state.phase {
                VerificationPhase::Verified => return ActionOutcome::Completed,
                VerificationPhase::Sending | VerificationPhase::Verifying => {
                    return ActionOutcome::Cancelled
                }
                _ => {}
            }
            if !self.cooldown_elapsed(&state) {
                return ActionOutcome::Invalid(ValidationError::ResendCoolingDown);
            }
            state.phase = VerificationPhase::Sending;
        }

        let result = self.client.send_code().await;

        let mut state = self.state.lock().await;
        match result {
            Ok(()) => {
                info!("verification code sent");
                state.phase = VerificationPhase::CodeSent;
                state.last_sent = Some(Instant::now());
                ActionOutcome::Completed
            }
            Err(error) => {
                warn!(%error, "verification code request failed");
                state.phase = VerificationPhase::Failed;
                ActionOutcome::from_client_error(&error)
            }
        }
    }

    pub async fn verify(&self, raw_code: &str) -> ActionOutcome {
        let code = match validate_code(raw_code) {
            Ok(code) => code,
            Err(invalid) => return ActionOutcome::Invalid(invalid),
        };
        if !self.api.is_authenticated() {
            return ActionOutcome::Unauthenticated;
        }
        {
            let mut state = self.state.lock().await;
            match state.phase {
                VerificationPhase::Verified => return ActionOutcome::Completed,
                VerificationPhase::Sending | VerificationPhase::Verifying => {
                    return ActionOutcome::Cancelled
                }
                _ => state.phase = VerificationPhase::Verifying,
            }
        }

        let result = self.client.verify(&code).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(user) => {
                info!(user_id = %user.id, "email verified");
                self.api.session().set_user(user);
                state.phase = VerificationPhase::Verified;
                ActionOutcome::Completed
            }
            Err(error) => {
                warn!(%error, "verification failed");
                state.phase = VerificationPhase::Failed;
                ActionOutcome::from_client_error(&error)
            }
        }
    }

    fn cooldown_elapsed(&self, state: &VerificationState) -> bool {
        state
            .last_sent
            .map_or(true, |sent| sent.elapsed() >= self.cooldown)
    }
}

#[cfg(test)]
#[path = "tests/verification_tests.rs"]
mod tests;
