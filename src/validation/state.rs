//! Validation state records.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use checkout_types::{ValidationOutcome, ValidationStep};

/// One recorded validation outcome for an (order, step) pair.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationState {
    pub state_id: String,
    pub order_id: String,
    pub step: ValidationStep,
    pub outcome: ValidationOutcome,
    /// Free-text note from whoever recorded the outcome
    pub context: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub invalidated: bool,
}

impl ValidationState {
    pub(crate) fn new(
        order_id: &str,
        step: ValidationStep,
        outcome: ValidationOutcome,
        context: impl Into<String>,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            state_id: format!("val-{}", Uuid::new_v4().simple()),
            order_id: order_id.to_string(),
            step,
            outcome,
            context: context.into(),
            created_at: now,
            updated_at: now,
            expires_at,
            invalidated: false,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Not invalidated and not expired.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.invalidated && !self.is_expired(now)
    }

    /// Valid and `Passed`: the only kind that satisfies a step.
    pub fn satisfies_step(&self, now: DateTime<Utc>) -> bool {
        self.is_valid(now) && self.outcome == ValidationOutcome::Passed
    }
}
