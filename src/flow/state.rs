//! Conversation state machine: tracks where a session is in the flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::flow::intent::LoanCategory;
use crate::identity::ApplicantProfile;
use crate::underwriting::Decision;

/// The states of a loan-origination conversation.
///
/// Progresses linearly from `Greeting` to `Done`; every rejection path also
/// lands in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Greeting,
    CollectName,
    CollectEmail,
    CollectPhone,
    CollectPan,
    AwaitingCode,
    Verifying,
    LoanIntent,
    CollectAmount,
    CollectTenure,
    Underwriting,
    Sanction,
    Done,
}

impl ConversationState {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: ConversationState) -> bool {
        use ConversationState::*;
        // Any non-terminal state may abort to Done (rejections, declines).
        if target == Done {
            return *self != Done;
        }
        matches!(
            (self, target),
            (Greeting, CollectName)
                | (CollectName, CollectEmail)
                | (CollectEmail, CollectPhone)
                | (CollectPhone, CollectPan)
                | (CollectPan, AwaitingCode)
                | (AwaitingCode, Verifying)
                | (Verifying, LoanIntent)
                | (LoanIntent, CollectAmount)
                | (CollectAmount, CollectTenure)
                | (CollectTenure, Underwriting)
                | (Underwriting, Sanction)
        )
    }

    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Whether this state expects raw PII or a one-time code. The loan-topic
    /// short-circuit must never fire here: sensitive-field states always take
    /// precedence over free-form question handling.
    pub fn expects_sensitive_input(&self) -> bool {
        matches!(
            self,
            Self::CollectName
                | Self::CollectEmail
                | Self::CollectPhone
                | Self::CollectPan
                | Self::AwaitingCode
                | Self::Verifying
        )
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::Greeting
    }
}

impl std::fmt::Display for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Greeting => "greeting",
            Self::CollectName => "collect_name",
            Self::CollectEmail => "collect_email",
            Self::CollectPhone => "collect_phone",
            Self::CollectPan => "collect_pan",
            Self::AwaitingCode => "awaiting_code",
            Self::Verifying => "verifying",
            Self::LoanIntent => "loan_intent",
            Self::CollectAmount => "collect_amount",
            Self::CollectTenure => "collect_tenure",
            Self::Underwriting => "underwriting",
            Self::Sanction => "sanction",
            Self::Done => "done",
        };
        write!(f, "{s}")
    }
}

/// Per-conversation mutable context. Owned exclusively by the turn currently
/// being processed; never shared across sessions.
#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    pub id: Uuid,
    pub state: ConversationState,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub pan: Option<String>,
    pub applicant: Option<ApplicantProfile>,
    /// Pending one-time code: cleared once consumed, replaced on re-dispatch.
    pub pending_otp: Option<String>,
    pub requested_amount: Option<u64>,
    pub category: Option<LoanCategory>,
    pub preferred_tenure: Option<u32>,
    /// Overwritten whole by each underwriting call, never mutated in place.
    pub decision: Option<Decision>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: ConversationState::default(),
            name: None,
            email: None,
            phone: None,
            pan: None,
            applicant: None,
            pending_otp: None,
            requested_amount: None,
            category: None,
            preferred_tenure: None,
            decision: None,
            created_at: now,
            last_active: now,
        }
    }

    /// Record activity for idle pruning.
    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Transition to a new state, enforcing the transition table.
    pub fn transition_to(&mut self, target: ConversationState) -> Result<(), String> {
        if !self.state.can_transition_to(target) {
            return Err(format!("Cannot transition from {} to {}", self.state, target));
        }
        tracing::debug!(session = %self.id, from = %self.state, to = %target, "state transition");
        self.state = target;
        Ok(())
    }
}
