//! Collaborator capability traits and their shipped implementations.
//!
//! The conversation core never constructs its collaborators; they are
//! injected as trait objects so the decision logic can be tested without
//! network access. All of these may perform blocking I/O; callers wrap
//! every invocation in a timeout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{CollaboratorError, ConfigError};
use crate::identity::{ApplicantProfile, matches_identity};

/// Customer / bureau / KYC lookup.
#[async_trait]
pub trait LookupStore: Send + Sync {
    /// Find the profile matching all three identifiers, bureau score joined
    /// in. `None` is a normal miss, not an error.
    async fn find_by_identity(
        &self,
        pan: &str,
        email: &str,
        phone: &str,
    ) -> Result<Option<ApplicantProfile>, CollaboratorError>;

    /// The KYC verification flag for a customer. `None` means no KYC record
    /// exists, which callers must keep distinguishable from `Some(false)`.
    async fn kyc_record(&self, customer_id: &str) -> Result<Option<bool>, CollaboratorError>;
}

/// One-time-code delivery. Success means *submission*, not delivery.
#[async_trait]
pub trait OtpTransport: Send + Sync {
    async fn send(&self, destination: &str, code: &str) -> Result<(), CollaboratorError>;
}

/// Sanction-letter rendering. Returns a storage path for the artifact.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(
        &self,
        name: &str,
        amount: u64,
        rate: f64,
        tenure_months: u32,
    ) -> Result<String, CollaboratorError>;
}

/// Free-form contextual responses. Used only at terminal states and for the
/// loan-question short-circuit; its output never feeds the decision engine.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn respond(&self, context: &str, user_text: &str)
    -> Result<String, CollaboratorError>;
}

// ── In-memory directory ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreditRecord {
    customer_id: String,
    credit_score: u32,
}

#[derive(Debug, Deserialize)]
struct KycEntry {
    customer_id: String,
    verified: bool,
}

/// On-disk dataset shape for [`InMemoryDirectory::from_json_file`].
#[derive(Debug, Deserialize)]
struct Dataset {
    customers: Vec<ApplicantProfile>,
    #[serde(default)]
    credit_scores: Vec<CreditRecord>,
    #[serde(default)]
    kyc: Vec<KycEntry>,
}

/// Lookup store backed by in-memory tables, loadable from a JSON dataset.
pub struct InMemoryDirectory {
    customers: Vec<ApplicantProfile>,
    kyc: HashMap<String, bool>,
}

impl InMemoryDirectory {
    pub fn new(customers: Vec<ApplicantProfile>, kyc: HashMap<String, bool>) -> Self {
        Self { customers, kyc }
    }

    /// Load the directory from a JSON dataset file. Bureau scores are joined
    /// onto profiles by `customer_id`; customers without a bureau row keep
    /// `credit_score = None`.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::DataFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let dataset: Dataset = serde_json::from_str(&raw).map_err(|e| ConfigError::DataFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let scores: HashMap<&str, u32> = dataset
            .credit_scores
            .iter()
            .map(|r| (r.customer_id.as_str(), r.credit_score))
            .collect();
        let customers = dataset
            .customers
            .into_iter()
            .map(|mut profile| {
                if profile.credit_score.is_none() {
                    profile.credit_score = scores.get(profile.customer_id.as_str()).copied();
                }
                profile
            })
            .collect();
        let kyc = dataset
            .kyc
            .into_iter()
            .map(|e| (e.customer_id, e.verified))
            .collect();
        Ok(Self { customers, kyc })
    }

    /// A small built-in dataset for demos and tests.
    pub fn demo() -> Self {
        let customers = vec![
            ApplicantProfile {
                customer_id: "CUST001".into(),
                name: "Asha Verma".into(),
                pan: "ABCDE1234F".into(),
                email: "asha@example.com".into(),
                phone: "+91-9876543210".into(),
                credit_score: Some(720),
                pre_approved_limit: 500_000,
                monthly_income: 40_000.0,
            },
            ApplicantProfile {
                customer_id: "CUST002".into(),
                name: "Ravi Iyer".into(),
                pan: "FGHIJ5678K".into(),
                email: "ravi@example.com".into(),
                phone: "+91-9123456780".into(),
                credit_score: Some(610),
                pre_approved_limit: 300_000,
                monthly_income: 35_000.0,
            },
            ApplicantProfile {
                customer_id: "CUST003".into(),
                name: "Meera Nair".into(),
                pan: "KLMNO9012P".into(),
                email: "meera@example.com".into(),
                phone: "+91-9988776655".into(),
                credit_score: Some(815),
                pre_approved_limit: 800_000,
                monthly_income: 95_000.0,
            },
        ];
        let kyc = HashMap::from([
            ("CUST001".to_string(), true),
            ("CUST002".to_string(), true),
            ("CUST003".to_string(), false),
        ]);
        Self::new(customers, kyc)
    }
}

#[async_trait]
impl LookupStore for InMemoryDirectory {
    async fn find_by_identity(
        &self,
        pan: &str,
        email: &str,
        phone: &str,
    ) -> Result<Option<ApplicantProfile>, CollaboratorError> {
        Ok(self
            .customers
            .iter()
            .find(|p| matches_identity(p, pan, email, phone))
            .cloned())
    }

    async fn kyc_record(&self, customer_id: &str) -> Result<Option<bool>, CollaboratorError> {
        Ok(self.kyc.get(customer_id).copied())
    }
}

// ── Dev OTP transport ───────────────────────────────────────────────

/// Development transport: logs the code instead of sending it.
pub struct ConsoleOtpTransport;

#[async_trait]
impl OtpTransport for ConsoleOtpTransport {
    async fn send(&self, destination: &str, code: &str) -> Result<(), CollaboratorError> {
        tracing::info!(destination, "dispatching one-time code");
        eprintln!("[otp] code for {destination}: {code}");
        Ok(())
    }
}

// ── Filesystem renderer ─────────────────────────────────────────────

/// Writes sanction letters as plain-text files under a configurable
/// directory, one timestamped file per approval.
pub struct FileSystemRenderer {
    letters_dir: PathBuf,
}

impl FileSystemRenderer {
    pub fn new(letters_dir: impl Into<PathBuf>) -> Self {
        Self {
            letters_dir: letters_dir.into(),
        }
    }
}

#[async_trait]
impl DocumentRenderer for FileSystemRenderer {
    async fn render(
        &self,
        name: &str,
        amount: u64,
        rate: f64,
        tenure_months: u32,
    ) -> Result<String, CollaboratorError> {
        tokio::fs::create_dir_all(&self.letters_dir)
            .await
            .map_err(|e| CollaboratorError::failed("renderer", e.to_string()))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let safe_name: String = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let path = self
            .letters_dir
            .join(format!("sanction_letter_{safe_name}_{timestamp}.txt"));

        let body = format!(
            "CapMitra - Loan Sanction Letter\n\n\
             Dear {name},\n\n\
             We are delighted to inform you that your loan of Rs. {amount} has been approved.\n\
             Interest Rate: {rate}% per annum\n\
             Tenure: {tenure_months} months\n\n\
             Thank you for choosing CapMitra.\n\
             Funds will be disbursed within 24 hours of acceptance.\n"
        );
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| CollaboratorError::failed("renderer", e.to_string()))?;

        tracing::info!(path = %path.display(), "sanction letter rendered");
        Ok(path.display().to_string())
    }
}

// ── Canned contextual responder ─────────────────────────────────────

/// Keyword-table contextual responses for terminal-state chatter and loan
/// questions. Ordered: the first matching keyword wins.
pub struct CannedResponder {
    replies: Vec<(&'static str, &'static str)>,
    fallback: &'static str,
}

impl CannedResponder {
    pub fn new() -> Self {
        Self {
            replies: vec![
                (
                    "interest rate",
                    "Rates start from our base rate and adjust with tenure and credit score.",
                ),
                (
                    "processing fee",
                    "The processing fee is 0.5% of the loan amount, with a Rs. 999 minimum.",
                ),
                (
                    "document",
                    "For pre-approved offers we only need your PAN and a verified KYC record.",
                ),
                (
                    "prepay",
                    "You can prepay at any time; foreclosure charges may apply per your agreement.",
                ),
                (
                    "eligib",
                    "Eligibility depends on your credit score, pre-approved limit, and income.",
                ),
                (
                    "sanction",
                    "Your sanction letter, once issued, is available from the link we shared.",
                ),
            ],
            fallback: "I'm CapMitra, your loan advisor. Ask me anything about your loan.",
        }
    }
}

impl Default for CannedResponder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextCompletion for CannedResponder {
    async fn respond(
        &self,
        _context: &str,
        user_text: &str,
    ) -> Result<String, CollaboratorError> {
        let lower = user_text.to_lowercase();
        for (keyword, reply) in &self.replies {
            if lower.contains(keyword) {
                return Ok((*reply).to_string());
            }
        }
        Ok(self.fallback.to_string())
    }
}
