//! The waitlist wizard: intent, user type, phone number, then confirmation.
//!
//! The rendering surface owns the clock: every time-dependent operation takes
//! `now`, and [`SignupFlow::tick`] applies whatever delayed effects have come
//! due. Entries are submitted at most once per modal lifecycle, either when the
//! wizard completes or when it is dismissed part-way through.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Utc;
use shared::domain::{
    is_valid_phone, prefixed_phone, sanitize_phone, Intent, UserType, WaitlistEntry,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    analytics::{AnalyticsEvent, AnalyticsSink},
    cache::EntryCache,
    gateway::{SubmitOutcome, WaitlistGateway},
};

/// Delay between closing the modal and clearing the wizard, so the close
/// animation never shows an emptied form.
pub const RESET_DELAY: Duration = Duration::from_millis(300);
/// How long the confirmation celebration stays visible.
pub const CELEBRATION_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupStep {
    Intent,
    UserType,
    Phone,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("operation belongs to step {expected:?}, wizard is on {actual:?}")]
    WrongStep {
        expected: SignupStep,
        actual: SignupStep,
    },
    #[error("select an intent before continuing")]
    MissingIntent,
    #[error("select a user type before continuing")]
    MissingUserType,
    #[error("phone number must be exactly 10 digits, have {digits}")]
    InvalidPhone { digits: usize },
    #[error("signup already completed")]
    AlreadyComplete,
}

/// Full wizard state, inspectable as one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupState {
    pub step: SignupStep,
    pub intent: Option<Intent>,
    pub user_type: Option<UserType>,
    /// Sanitized national digits, without the country code.
    pub phone: String,
    /// Set once this modal lifecycle has handed an entry to the gateway.
    pub already_submitted: bool,
    pub open: bool,
    pub celebrate_until: Option<Instant>,
    pub reset_at: Option<Instant>,
}

impl Default for SignupState {
    fn default() -> Self {
        Self {
            step: SignupStep::Intent,
            intent: None,
            user_type: None,
            phone: String::new(),
            already_submitted: false,
            open: false,
            celebrate_until: None,
            reset_at: None,
        }
    }
}

impl SignupState {
    fn has_input(&self) -> bool {
        self.intent.is_some() || self.user_type.is_some() || !self.phone.is_empty()
    }
}

pub struct SignupFlow {
    state: SignupState,
    gateway: Arc<dyn WaitlistGateway>,
    cache: Arc<dyn EntryCache>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl SignupFlow {
    pub fn new(
        gateway: Arc<dyn WaitlistGateway>,
        cache: Arc<dyn EntryCache>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            state: SignupState::default(),
            gateway,
            cache,
            analytics,
        }
    }

    pub fn state(&self) -> &SignupState {
        &self.state
    }

    pub fn step(&self) -> SignupStep {
        self.state.step
    }

    pub fn is_celebrating(&self, now: Instant) -> bool {
        self.state.celebrate_until.is_some_and(|until| now < until)
    }

    /// Opens the modal for a new lifecycle. A reset still waiting on the
    /// close animation is applied right away. No-op while already open.
    pub fn open(&mut self) {
        if self.state.open {
            return;
        }
        self.reset_fields();
        self.state.open = true;
        self.state.already_submitted = false;
    }

    pub fn select_intent(&mut self, intent: Intent) -> Result<(), FlowError> {
        self.expect_step(SignupStep::Intent)?;
        self.state.intent = Some(intent);
        Ok(())
    }

    pub fn select_user_type(&mut self, user_type: UserType) -> Result<(), FlowError> {
        self.expect_step(SignupStep::UserType)?;
        self.state.user_type = Some(user_type);
        Ok(())
    }

    /// Filters raw keystrokes into the phone field and returns the stored digits.
    pub fn input_phone(&mut self, raw: &str) -> Result<&str, FlowError> {
        self.expect_step(SignupStep::Phone)?;
        self.state.phone = sanitize_phone(raw);
        Ok(&self.state.phone)
    }

    /// Moves to the next step if the current one is complete.
    ///
    /// Leaving the phone step submits the finalized entry and waits for the
    /// gateway to settle. The wizard reaches [`SignupStep::Done`] whatever the
    /// delivery outcome.
    pub async fn advance(&mut self, now: Instant) -> Result<SignupStep, FlowError> {
        match self.state.step {
            SignupStep::Intent => {
                let intent = self.state.intent.ok_or(FlowError::MissingIntent)?;
                self.analytics.track(&AnalyticsEvent::IntentSelected { intent });
                self.state.step = SignupStep::UserType;
            }
            SignupStep::UserType => {
                let user_type = self.state.user_type.ok_or(FlowError::MissingUserType)?;
                self.analytics.track(&AnalyticsEvent::UserTypeSelected { user_type });
                self.state.step = SignupStep::Phone;
            }
            SignupStep::Phone => self.complete(now).await?,
            SignupStep::Done => return Err(FlowError::AlreadyComplete),
        }
        Ok(self.state.step)
    }

    /// Closes the modal from any step.
    ///
    /// If nothing has been submitted yet and some field is filled in, the
    /// partial entry is saved on a detached task that outlives the modal; the
    /// handle is returned for callers that need to wait for it before
    /// shutting down. Must be called from within a Tokio runtime.
    pub fn dismiss(&mut self, now: Instant) -> Option<JoinHandle<SubmitOutcome>> {
        self.state.open = false;
        self.state.reset_at = Some(now + RESET_DELAY);

        if self.state.already_submitted || !self.state.has_input() {
            return None;
        }

        let entry = WaitlistEntry::partial(
            self.state.intent,
            self.state.user_type,
            &self.state.phone,
            Utc::now(),
        );
        self.state.already_submitted = true;

        info!(
            step = ?self.state.step,
            intent = %entry.intent,
            user_type = %entry.user_type,
            phone = %entry.masked_phone(),
            "saving partial waitlist entry"
        );

        let gateway = Arc::clone(&self.gateway);
        let cache = Arc::clone(&self.cache);
        Some(tokio::spawn(async move {
            record_and_submit(cache.as_ref(), gateway.as_ref(), &entry).await
        }))
    }

    /// Applies delayed effects that are due at `now`.
    pub fn tick(&mut self, now: Instant) {
        if self.state.reset_at.is_some_and(|at| now >= at) {
            self.reset_fields();
        }
        if self.state.celebrate_until.is_some_and(|until| now >= until) {
            self.state.celebrate_until = None;
        }
    }

    async fn complete(&mut self, now: Instant) -> Result<(), FlowError> {
        if !is_valid_phone(&self.state.phone) {
            return Err(FlowError::InvalidPhone {
                digits: self.state.phone.len(),
            });
        }
        let intent = self.state.intent.ok_or(FlowError::MissingIntent)?;
        let user_type = self.state.user_type.ok_or(FlowError::MissingUserType)?;
        let entry = WaitlistEntry::finalized(intent, user_type, &self.state.phone, Utc::now())
            .map_err(|_| FlowError::InvalidPhone {
                digits: self.state.phone.len(),
            })?;

        let phone = prefixed_phone(&self.state.phone);
        self.analytics.track(&AnalyticsEvent::PhoneEntered {
            phone: phone.clone(),
        });
        self.analytics.track(&AnalyticsEvent::SignupComplete {
            intent,
            user_type,
            phone,
        });

        self.state.already_submitted = true;
        let outcome = record_and_submit(self.cache.as_ref(), self.gateway.as_ref(), &entry).await;
        info!(?outcome, phone = %entry.masked_phone(), "waitlist signup completed");

        self.state.step = SignupStep::Done;
        self.state.celebrate_until = Some(now + CELEBRATION_DURATION);
        Ok(())
    }

    fn reset_fields(&mut self) {
        let already_submitted = self.state.already_submitted;
        let open = self.state.open;
        self.state = SignupState {
            already_submitted,
            open,
            ..SignupState::default()
        };
    }

    fn expect_step(&self, expected: SignupStep) -> Result<(), FlowError> {
        if self.state.step == expected {
            Ok(())
        } else {
            Err(FlowError::WrongStep {
                expected,
                actual: self.state.step,
            })
        }
    }
}

/// Writes the local backup first, then hands the entry to the gateway. The
/// cache grows on every call, delivered or not.
async fn record_and_submit(
    cache: &dyn EntryCache,
    gateway: &dyn WaitlistGateway,
    entry: &WaitlistEntry,
) -> SubmitOutcome {
    if let Err(error) = cache.append(entry).await {
        warn!(%error, "failed to append waitlist entry to local cache");
    }
    gateway.submit(entry).await
}

#[cfg(test)]
#[path = "tests/flow_tests.rs"]
mod tests;
