//! Conversation orchestration.
//!
//! One [`SessionContext`] per active conversation, held behind a per-session
//! mutex: turns for the same session are serialized end to end while
//! unrelated sessions proceed in parallel. Every collaborator call is
//! timeout-guarded; a timeout or failure is a *transient* outcome: the
//! session state is not advanced, collected context and any pending one-time
//! code are preserved, and the user is asked to retry. No error escapes
//! [`Orchestrator::handle_turn`]: every path yields a well-formed reply.

pub mod intent;
pub mod state;
pub mod validate;

pub use state::{ConversationState, SessionContext};

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::advisor;
use crate::collaborators::{DocumentRenderer, LookupStore, OtpTransport, TextCompletion};
use crate::config::{CANDIDATE_TENURES, Config};
use crate::error::CollaboratorError;
use crate::flow::intent::{Intent, IntentTable, loan_question_trigger};
use crate::identity::{Resolution, Resolver};
use crate::underwriting::{self, Decision};

const RETRY_MESSAGE: &str = "We hit a temporary issue on our side. Please try that again.";

/// Injected collaborator capabilities.
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn LookupStore>,
    pub otp: Arc<dyn OtpTransport>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub responder: Arc<dyn TextCompletion>,
}

/// What a turn hands back to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReply {
    pub message: String,
    pub artifact_path: Option<String>,
}

impl TurnReply {
    fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            artifact_path: None,
        }
    }
}

/// Drives conversations: validates each turn's input for the current state,
/// mutates the session context, and invokes the identity resolver and the
/// underwriting engine at the appropriate states.
pub struct Orchestrator {
    config: Config,
    deps: Collaborators,
    resolver: Resolver,
    intents: IntentTable,
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<SessionContext>>>>,
}

impl Orchestrator {
    pub fn new(config: Config, deps: Collaborators) -> Self {
        let resolver = Resolver::new(deps.directory.clone());
        Self {
            config,
            deps,
            resolver,
            intents: IntentTable::new(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Process one inbound turn for a session, creating the session on first
    /// contact.
    pub async fn handle_turn(&self, session_id: Uuid, raw_text: &str) -> TurnReply {
        let slot = {
            let mut sessions = self.sessions.write().await;
            sessions
                .entry(session_id)
                .or_insert_with(|| Arc::new(Mutex::new(SessionContext::new(session_id))))
                .clone()
        };

        // Held for the whole turn: per-session serialization.
        let mut ctx = slot.lock().await;
        ctx.touch();
        tracing::debug!(session = %session_id, state = %ctx.state, "handling turn");

        if ctx.state.is_terminal() {
            return self.contextual_response(&ctx, raw_text).await;
        }

        // Loan-question short-circuit, but never while raw PII or a
        // one-time code is expected.
        if !ctx.state.expects_sensitive_input() {
            if let Some(trigger) = loan_question_trigger(raw_text) {
                tracing::debug!(session = %session_id, trigger, "loan-question short-circuit");
                return self.contextual_response(&ctx, raw_text).await;
            }
        }

        match ctx.state {
            ConversationState::Greeting => self.greeting(&mut ctx),
            ConversationState::CollectName => self.collect_name(&mut ctx, raw_text),
            ConversationState::CollectEmail => self.collect_email(&mut ctx, raw_text),
            ConversationState::CollectPhone => self.collect_phone(&mut ctx, raw_text),
            ConversationState::CollectPan => self.collect_pan(&mut ctx, raw_text).await,
            ConversationState::AwaitingCode => self.awaiting_code(&mut ctx, raw_text).await,
            ConversationState::Verifying => self.run_verification(&mut ctx).await,
            ConversationState::LoanIntent => self.loan_intent(&mut ctx, raw_text),
            ConversationState::CollectAmount => self.collect_amount(&mut ctx, raw_text),
            ConversationState::CollectTenure => self.collect_tenure(&mut ctx, raw_text).await,
            ConversationState::Underwriting => self.run_underwriting(&mut ctx).await,
            ConversationState::Sanction => self.run_sanction(&mut ctx).await,
            ConversationState::Done => self.contextual_response(&ctx, raw_text).await,
        }
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Clone of a session's context, for inspection.
    pub async fn snapshot(&self, session_id: Uuid) -> Option<SessionContext> {
        let slot = self.sessions.read().await.get(&session_id).cloned()?;
        let ctx = slot.lock().await;
        Some(ctx.clone())
    }

    /// Drop sessions idle longer than the configured timeout. Sessions with
    /// a turn in flight are never pruned. Returns the number removed.
    pub async fn prune_idle(&self) -> usize {
        let idle = chrono::Duration::from_std(self.config.session_idle_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(1800));
        let cutoff = Utc::now() - idle;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| match slot.try_lock() {
            Ok(ctx) => ctx.last_active > cutoff,
            Err(_) => true,
        });
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, "pruned idle sessions");
        }
        removed
    }

    // ── State handlers ──────────────────────────────────────────────

    fn greeting(&self, ctx: &mut SessionContext) -> TurnReply {
        let _ = ctx.transition_to(ConversationState::CollectName);
        TurnReply::text(
            "Welcome to CapMitra, your loan advisor. To get started, may I have your full name?",
        )
    }

    fn collect_name(&self, ctx: &mut SessionContext, raw: &str) -> TurnReply {
        match validate::parse_name(raw) {
            Some(name) => {
                ctx.name = Some(name);
                let _ = ctx.transition_to(ConversationState::CollectEmail);
                TurnReply::text("Thanks! What's your email address?")
            }
            None => TurnReply::text(
                "Please share your full name (first and last name) so I can look you up.",
            ),
        }
    }

    fn collect_email(&self, ctx: &mut SessionContext, raw: &str) -> TurnReply {
        match validate::parse_email(raw) {
            Some(email) => {
                ctx.email = Some(email);
                let _ = ctx.transition_to(ConversationState::CollectPhone);
                TurnReply::text("Got it. And your 10-digit mobile number?")
            }
            None => TurnReply::text("That doesn't look like a valid email address. Please re-enter it."),
        }
    }

    fn collect_phone(&self, ctx: &mut SessionContext, raw: &str) -> TurnReply {
        match validate::parse_phone(raw) {
            Some(phone) => {
                ctx.phone = Some(phone);
                let _ = ctx.transition_to(ConversationState::CollectPan);
                TurnReply::text("Thanks. Lastly, please share your PAN (e.g. ABCDE1234F).")
            }
            None => TurnReply::text("I need exactly 10 digits for the mobile number. Please re-enter it."),
        }
    }

    async fn collect_pan(&self, ctx: &mut SessionContext, raw: &str) -> TurnReply {
        let Some(pan) = validate::parse_pan(raw) else {
            return TurnReply::text(
                "A PAN is 5 letters, 4 digits and a letter (e.g. ABCDE1234F). Please re-enter it.",
            );
        };
        let Some(phone) = ctx.phone.clone() else {
            // Unreachable by construction; fail soft rather than panic.
            return TurnReply::text(RETRY_MESSAGE);
        };

        let code = self.generate_code();
        let send = self.deps.otp.send(&phone, &code);
        match self.with_timeout("otp", send).await {
            Ok(()) => {
                ctx.pan = Some(pan);
                // Replaces any earlier code; the old one is dead.
                ctx.pending_otp = Some(code);
                let _ = ctx.transition_to(ConversationState::AwaitingCode);
                TurnReply::text(
                    "I've sent a one-time code to your mobile number. Please enter it to verify your identity.",
                )
            }
            Err(e) => {
                tracing::warn!(session = %ctx.id, error = %e, "OTP dispatch failed");
                TurnReply::text(RETRY_MESSAGE)
            }
        }
    }

    async fn awaiting_code(&self, ctx: &mut SessionContext, raw: &str) -> TurnReply {
        let Some(expected) = ctx.pending_otp.clone() else {
            return TurnReply::text(RETRY_MESSAGE);
        };
        let entered: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if entered != expected {
            // Mismatch does not consume the pending code.
            return TurnReply::text("That code doesn't match. Please check and enter it again.");
        }
        ctx.pending_otp = None;
        let _ = ctx.transition_to(ConversationState::Verifying);
        // Same-turn continuation into identity resolution.
        self.run_verification(ctx).await
    }

    async fn run_verification(&self, ctx: &mut SessionContext) -> TurnReply {
        let (Some(pan), Some(email), Some(phone)) =
            (ctx.pan.clone(), ctx.email.clone(), ctx.phone.clone())
        else {
            return TurnReply::text(RETRY_MESSAGE);
        };

        let resolve = self.resolver.resolve(&pan, &email, &phone);
        let resolution = match self.with_timeout("lookup", resolve).await {
            Ok(resolution) => resolution,
            Err(e) => {
                // Parked in Verifying; the next turn retries regardless of input.
                tracing::warn!(session = %ctx.id, error = %e, "identity lookup failed");
                return TurnReply::text(RETRY_MESSAGE);
            }
        };

        match resolution {
            Resolution::Verified(profile) => {
                let first_name = profile
                    .name
                    .split_whitespace()
                    .next()
                    .unwrap_or(&profile.name)
                    .to_string();
                ctx.applicant = Some(profile);
                let _ = ctx.transition_to(ConversationState::LoanIntent);
                TurnReply::text(format!(
                    "You're verified, {first_name}! What kind of loan are you looking for: \
                     personal, home, vehicle, education, or business?"
                ))
            }
            Resolution::NoKycRecord(_) => {
                let _ = ctx.transition_to(ConversationState::Done);
                TurnReply::text(
                    "We don't have a KYC record on file for you, so I can't proceed with a loan \
                     today. Please contact support to complete your KYC.",
                )
            }
            Resolution::KycNotVerified(_) => {
                let _ = ctx.transition_to(ConversationState::Done);
                TurnReply::text(
                    "Your KYC record hasn't been verified yet, so I can't proceed with a loan \
                     today. Please contact support to finish verification.",
                )
            }
            Resolution::NotFound => {
                let _ = ctx.transition_to(ConversationState::Done);
                TurnReply::text(
                    "I couldn't match those details to a customer record. Please contact support \
                     if you believe this is a mistake.",
                )
            }
        }
    }

    fn loan_intent(&self, ctx: &mut SessionContext, raw: &str) -> TurnReply {
        match self.intents.classify(raw) {
            Some(Intent::Decline) => {
                let _ = ctx.transition_to(ConversationState::Done);
                TurnReply::text("No problem at all. Come back any time, happy to help!")
            }
            Some(Intent::Category(category)) => {
                ctx.category = Some(category);
                let _ = ctx.transition_to(ConversationState::CollectAmount);
                TurnReply::text(format!(
                    "Great, a {category} loan. How much would you like to borrow?"
                ))
            }
            None => TurnReply::text(
                "I can help with personal, home, vehicle, education, or business loans. \
                 Which would you like? (Or say \"not interested\".)",
            ),
        }
    }

    fn collect_amount(&self, ctx: &mut SessionContext, raw: &str) -> TurnReply {
        match validate::parse_amount(raw) {
            Some(amount) => {
                ctx.requested_amount = Some(amount);
                let _ = ctx.transition_to(ConversationState::CollectTenure);
                let options = CANDIDATE_TENURES
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                TurnReply::text(format!(
                    "Noted, {}. Over how many months would you like to repay? Options: {options}.",
                    advisor::rupees(amount as f64)
                ))
            }
            None => TurnReply::text("Please tell me the loan amount as a positive number."),
        }
    }

    async fn collect_tenure(&self, ctx: &mut SessionContext, raw: &str) -> TurnReply {
        match validate::parse_tenure(raw, &CANDIDATE_TENURES) {
            Some(months) => {
                ctx.preferred_tenure = Some(months);
                let _ = ctx.transition_to(ConversationState::Underwriting);
                // Same-turn continuation into the decision.
                self.run_underwriting(ctx).await
            }
            None => {
                let options = CANDIDATE_TENURES
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                TurnReply::text(format!("Please pick one of the available tenures: {options} months."))
            }
        }
    }

    async fn run_underwriting(&self, ctx: &mut SessionContext) -> TurnReply {
        let (Some(applicant), Some(amount), Some(tenure)) = (
            ctx.applicant.clone(),
            ctx.requested_amount,
            ctx.preferred_tenure,
        ) else {
            return TurnReply::text(RETRY_MESSAGE);
        };

        let decision =
            underwriting::evaluate(&applicant, amount, self.config.base_rate, tenure, &self.config);
        ctx.decision = Some(decision.clone());

        match decision {
            Decision::Rejected { reason } => {
                let _ = ctx.transition_to(ConversationState::Done);
                TurnReply::text(format!(
                    "I'm sorry, we can't approve this application: {reason}. \
                     Please contact support if you'd like to discuss your options."
                ))
            }
            Decision::Approved(_) => {
                let _ = ctx.transition_to(ConversationState::Sanction);
                // Same-turn continuation into letter generation.
                self.run_sanction(ctx).await
            }
        }
    }

    async fn run_sanction(&self, ctx: &mut SessionContext) -> TurnReply {
        let (Some(applicant), Some(Decision::Approved(approval))) =
            (ctx.applicant.clone(), ctx.decision.clone())
        else {
            return TurnReply::text(RETRY_MESSAGE);
        };

        let render = self.deps.renderer.render(
            &applicant.name,
            approval.approved_amount,
            approval.chosen.annual_rate,
            approval.chosen.tenure_months,
        );
        let path = match self.with_timeout("renderer", render).await {
            Ok(path) => path,
            Err(e) => {
                // Parked in Sanction with the decision preserved; the next
                // turn retries the render.
                tracing::warn!(session = %ctx.id, error = %e, "sanction letter render failed");
                return TurnReply::text(RETRY_MESSAGE);
            }
        };

        let _ = ctx.transition_to(ConversationState::Done);
        let mut lines = vec![format!(
            "Congratulations! Your loan of {} over {} months at {:.2}% is approved \
             (EMI {}/month).",
            advisor::rupees(approval.approved_amount as f64),
            approval.chosen.tenure_months,
            approval.chosen.annual_rate,
            advisor::rupees(approval.chosen.emi),
        )];
        lines.extend(advisor::summarize(&approval));
        lines.push(format!("Your sanction letter is ready: {path}"));

        TurnReply {
            message: lines.join("\n"),
            artifact_path: Some(path),
        }
    }

    async fn contextual_response(&self, ctx: &SessionContext, raw: &str) -> TurnReply {
        let context = format!("conversation state: {}", ctx.state);
        let respond = self.deps.responder.respond(&context, raw);
        match self.with_timeout("responder", respond).await {
            Ok(message) => TurnReply::text(message),
            Err(e) => {
                tracing::warn!(session = %ctx.id, error = %e, "contextual responder failed");
                TurnReply::text(RETRY_MESSAGE)
            }
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn generate_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.config.otp_length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10)))
            .collect()
    }

    async fn with_timeout<T, F>(&self, name: &str, fut: F) -> Result<T, CollaboratorError>
    where
        F: Future<Output = Result<T, CollaboratorError>>,
    {
        match tokio::time::timeout(self.config.collaborator_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout {
                name: name.to_string(),
                timeout: self.config.collaborator_timeout,
            }),
        }
    }
}
