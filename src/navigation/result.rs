//! Navigation results and the outcome handed back to screen controllers.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Final classification of a navigation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationResult {
    Success,
    /// The screen changed but the payload could not be injected
    PartialSuccess,
    FailedRecoverable,
    FailedCritical,
    Cancelled,
    /// The screen did not visibly change; the payload is safe in a session
    DataPreserved,
}

impl NavigationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, NavigationResult::Success | NavigationResult::PartialSuccess)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NavigationResult::Success
                | NavigationResult::PartialSuccess
                | NavigationResult::FailedCritical
                | NavigationResult::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationResult::Success => "success",
            NavigationResult::PartialSuccess => "partial_success",
            NavigationResult::FailedRecoverable => "failed_recoverable",
            NavigationResult::FailedCritical => "failed_critical",
            NavigationResult::Cancelled => "cancelled",
            NavigationResult::DataPreserved => "data_preserved",
        }
    }
}

impl fmt::Display for NavigationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy tier, in chain order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Primary,
    Fallback,
    Emergency,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Primary => "primary",
            StrategyKind::Fallback => "fallback",
            StrategyKind::Emergency => "emergency",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One strategy's attempt within a request.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyAttempt {
    pub strategy: StrategyKind,
    /// Result the strategy reported, `None` when it failed
    pub result: Option<NavigationResult>,
    pub error: Option<String>,
    pub detail: Option<String>,
}

/// Everything a screen controller needs to react to a navigation.
#[derive(Debug, Clone, Serialize)]
pub struct NavigationOutcome {
    pub request_id: Uuid,
    pub target: String,
    pub result: NavigationResult,
    /// Strategy that produced the result
    pub strategy: Option<StrategyKind>,
    /// Session holding the preserved payload
    pub session_id: Option<String>,
    pub attempts: Vec<StrategyAttempt>,
    /// Precondition violations, for rejected requests
    pub reasons: Vec<String>,
    /// Support correlation code, set on `FailedCritical`
    pub reference_code: Option<String>,
    /// User-facing explanation
    pub message: String,
    pub duration_ms: u64,
}

impl NavigationOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }

    /// Whether the UI should offer to resume from the preserved session.
    pub fn can_resume(&self) -> bool {
        self.result == NavigationResult::DataPreserved && self.session_id.is_some()
    }
}

const REFERENCE_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const REFERENCE_SUFFIX_LEN: usize = 6;

/// Support reference code: `NAV-YYYYMMDD-XXXXXX`.
pub fn reference_code(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..REFERENCE_SUFFIX_LEN)
        .map(|_| REFERENCE_CHARSET[rng.gen_range(0..REFERENCE_CHARSET.len())] as char)
        .collect();
    format!("NAV-{}-{}", now.format("%Y%m%d"), suffix)
}

/// User-facing message for a result.
pub(crate) fn user_message(result: NavigationResult, title: &str, reference: Option<&str>) -> String {
    match result {
        NavigationResult::Success => format!("Opened {title}."),
        NavigationResult::PartialSuccess => {
            format!("{title} is open, but your order details could not be loaded into it.")
        }
        NavigationResult::FailedRecoverable => {
            format!("{title} could not be opened. Please try again.")
        }
        NavigationResult::FailedCritical => format!(
            "Something went wrong opening {title}. Retry, or go back and continue another way. Reference: {}",
            reference.unwrap_or("unavailable")
        ),
        NavigationResult::Cancelled => "Checkout cancelled.".to_string(),
        NavigationResult::DataPreserved => format!(
            "{title} could not be shown, but your order is saved. Choose Resume to continue where you left off."
        ),
    }
}
