//! Identity resolution: matches applicant-supplied identifiers against the
//! customer directory and gates on the KYC verification flag.
//!
//! Matching policy: case-insensitive exact match on PAN and email; phone
//! matches by digit *suffix* (stored numbers may carry country-code
//! prefixes). All three predicates must hold; a partial match is no match.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::collaborators::LookupStore;
use crate::error::CollaboratorError;

/// An applicant record from the customer directory.
///
/// `customer_id` is the sole join key across the customer, bureau, and KYC
/// tables. `credit_score` is `None` when the bureau file has no row; the
/// underwriting engine applies an explicit neutral fallback, never a silent
/// zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantProfile {
    pub customer_id: String,
    pub name: String,
    pub pan: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub credit_score: Option<u32>,
    pub pre_approved_limit: u64,
    pub monthly_income: f64,
}

/// Outcome of identity resolution plus the KYC check.
///
/// The two KYC misses terminate the session just like `NotFound`, but they
/// are distinct reasons and are logged as such.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Identity matched and the KYC record is verified.
    Verified(ApplicantProfile),
    /// Identity matched but there is no KYC record at all.
    NoKycRecord(ApplicantProfile),
    /// Identity matched but the KYC record is explicitly unverified.
    KycNotVerified(ApplicantProfile),
    /// No directory record satisfied all three identifiers.
    NotFound,
}

/// Strip everything but ASCII digits.
pub fn normalize_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Whether a stored phone number matches user input: both are reduced to
/// digits and the stored number must *end with* the input. Empty input never
/// matches.
pub fn phone_suffix_match(stored: &str, input: &str) -> bool {
    let stored = normalize_digits(stored);
    let input = normalize_digits(input);
    !input.is_empty() && stored.ends_with(&input)
}

/// Whether a profile matches all three supplied identifiers.
pub fn matches_identity(profile: &ApplicantProfile, pan: &str, email: &str, phone: &str) -> bool {
    profile.pan.eq_ignore_ascii_case(pan.trim())
        && profile.email.eq_ignore_ascii_case(email.trim())
        && phone_suffix_match(&profile.phone, phone)
}

/// Resolves identities against the lookup store and applies the KYC gate.
pub struct Resolver {
    store: Arc<dyn LookupStore>,
}

impl Resolver {
    pub fn new(store: Arc<dyn LookupStore>) -> Self {
        Self { store }
    }

    /// Resolve a (pan, email, phone) triple to a verified applicant.
    ///
    /// A miss at any stage is a normal business outcome, not an error;
    /// `Err` is reserved for collaborator I/O failures.
    pub async fn resolve(
        &self,
        pan: &str,
        email: &str,
        phone: &str,
    ) -> Result<Resolution, CollaboratorError> {
        let Some(profile) = self.store.find_by_identity(pan, email, phone).await? else {
            tracing::info!(reason = "identity_not_found", "identity resolution miss");
            return Ok(Resolution::NotFound);
        };

        match self.store.kyc_record(&profile.customer_id).await? {
            Some(true) => {
                tracing::info!(customer_id = %profile.customer_id, "identity verified");
                Ok(Resolution::Verified(profile))
            }
            Some(false) => {
                tracing::warn!(
                    customer_id = %profile.customer_id,
                    reason = "kyc_not_verified",
                    "KYC record present but unverified"
                );
                Ok(Resolution::KycNotVerified(profile))
            }
            None => {
                tracing::warn!(
                    customer_id = %profile.customer_id,
                    reason = "no_kyc_record",
                    "no KYC record for resolved identity"
                );
                Ok(Resolution::NoKycRecord(profile))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ApplicantProfile {
        ApplicantProfile {
            customer_id: "CUST001".into(),
            name: "Asha Verma".into(),
            pan: "ABCDE1234F".into(),
            email: "asha@example.com".into(),
            phone: "+91-9876543210".into(),
            credit_score: Some(720),
            pre_approved_limit: 500_000,
            monthly_income: 40_000.0,
        }
    }

    #[test]
    fn pan_and_email_case_insensitive() {
        let p = profile();
        assert!(matches_identity(&p, "abcde1234f", "ASHA@EXAMPLE.COM", "9876543210"));
        assert!(matches_identity(&p, "ABCDE1234F", "asha@example.com", "9876543210"));
    }

    #[test]
    fn phone_matches_by_suffix() {
        assert!(phone_suffix_match("+91-9876543210", "9876543210"));
        assert!(phone_suffix_match("919876543210", "98765 43210"));
        assert!(!phone_suffix_match("+91-9876543210", "9876543211"));
    }

    #[test]
    fn empty_phone_never_matches() {
        assert!(!phone_suffix_match("+91-9876543210", ""));
        assert!(!phone_suffix_match("+91-9876543210", "abc"));
    }

    #[test]
    fn all_three_predicates_required() {
        let p = profile();
        assert!(!matches_identity(&p, "ZZZZZ9999Z", "asha@example.com", "9876543210"));
        assert!(!matches_identity(&p, "ABCDE1234F", "other@example.com", "9876543210"));
        assert!(!matches_identity(&p, "ABCDE1234F", "asha@example.com", "1234567890"));
    }

    #[test]
    fn normalize_digits_strips_everything_else() {
        assert_eq!(normalize_digits("+91-98765 43210"), "919876543210");
        assert_eq!(normalize_digits("no digits"), "");
    }
}
