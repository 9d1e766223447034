//! Configuration types.

use std::time::Duration;

/// Tenure options offered to applicants, in months.
///
/// The underwriting engine always sweeps this full set regardless of the
/// applicant's stated preference.
pub const CANDIDATE_TENURES: [u32; 5] = [12, 24, 36, 48, 60];

/// Loan-origination configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base annual interest rate (percent) before adjustments.
    pub base_rate: f64,
    /// Processing fee as a fraction of the principal.
    pub fee_rate: f64,
    /// Minimum processing fee in rupees.
    pub fee_minimum: f64,
    /// Maximum EMI-to-income ratio for a plan to be feasible.
    pub affordability_cap: f64,
    /// Hard-reject threshold for credit scores.
    pub min_credit_score: u32,
    /// Requested amount may not exceed this multiple of the pre-approved limit.
    pub pre_approved_multiple: f64,
    /// Credit score assumed when the bureau file has no row for the applicant.
    /// Middle band: contributes no rate delta and passes the hard-reject gate.
    pub fallback_credit_score: u32,
    /// Number of digits in a one-time code.
    pub otp_length: usize,
    /// Timeout applied to every collaborator call.
    pub collaborator_timeout: Duration,
    /// Sessions idle longer than this are pruned.
    pub session_idle_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_rate: 10.5,
            fee_rate: 0.005,
            fee_minimum: 999.0,
            affordability_cap: 0.50,
            min_credit_score: 650,
            pre_approved_multiple: 2.0,
            fallback_credit_score: 700,
            otp_length: 6,
            collaborator_timeout: Duration::from_secs(10),
            session_idle_timeout: Duration::from_secs(1800), // 30 minutes
        }
    }
}
