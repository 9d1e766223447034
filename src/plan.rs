//! Plan calculator: pure repayment math.
//!
//! EMI uses the standard amortization formula
//! `P × r × (1 + r)^n / [(1 + r)^n - 1]` with `r = annual_rate / 1200`.
//! All functions here are stateless; a [`PlanOption`] is always rebuilt from
//! authoritative inputs, never cached across differing principal/rate/tenure
//! combinations.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::CalcError;

/// One tenure's fully-computed repayment plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanOption {
    /// Tenure in months.
    pub tenure_months: u32,
    /// Adjusted annual interest rate (percent).
    pub annual_rate: f64,
    /// Equated monthly installment.
    pub emi: f64,
    /// Total interest paid over the tenure.
    pub total_interest: f64,
    /// One-time processing fee.
    pub processing_fee: f64,
    /// EMI divided by monthly income.
    pub affordability: f64,
}

/// Adjust the base annual rate for tenure and credit score.
///
/// Tenure bands: ≤12 months −0.50, ≤24 −0.25, ≤36 +0.00, ≤48 +0.25,
/// longer +0.50. Credit bands: ≥800 −0.25, <700 +0.25, otherwise +0.00.
/// The two deltas are independent and summed. No floor is applied: extreme
/// inputs can produce a negative annual rate, and callers get exactly that.
pub fn adjust_rate(base_rate: f64, tenure_months: u32, credit_score: u32) -> f64 {
    let tenure_delta = match tenure_months {
        0..=12 => -0.50,
        13..=24 => -0.25,
        25..=36 => 0.00,
        37..=48 => 0.25,
        _ => 0.50,
    };
    let score_delta = if credit_score >= 800 {
        -0.25
    } else if credit_score < 700 {
        0.25
    } else {
        0.00
    };
    base_rate + tenure_delta + score_delta
}

/// Compute the monthly installment for an amortized loan.
///
/// An exactly-zero monthly rate degenerates to `principal / months`; negative
/// rates go through the compound formula unchanged. A zero tenure is the only
/// invalid input.
pub fn calc_emi(principal: f64, annual_rate_percent: f64, months: u32) -> Result<f64, CalcError> {
    if months == 0 {
        return Err(CalcError::InvalidTenure(months));
    }
    let monthly_rate = annual_rate_percent / 1200.0;
    if monthly_rate == 0.0 {
        return Ok(principal / months as f64);
    }
    // powi keeps precision for integer month counts
    let factor = (1.0 + monthly_rate).powi(months as i32);
    Ok(principal * monthly_rate * factor / (factor - 1.0))
}

/// Processing fee: `max(fee_minimum, amount × fee_rate)`, rounded to the
/// nearest rupee.
pub fn processing_fee(amount: f64, config: &Config) -> f64 {
    (config.fee_minimum.max(amount * config.fee_rate)).round()
}

/// Build the full [`PlanOption`] for one tenure.
///
/// The affordability ratio is recomputed here from the authoritative inputs
/// on every call.
pub fn build_plan(
    principal: f64,
    base_rate: f64,
    credit_score: u32,
    tenure_months: u32,
    monthly_income: f64,
    config: &Config,
) -> Result<PlanOption, CalcError> {
    let annual_rate = adjust_rate(base_rate, tenure_months, credit_score);
    let emi = calc_emi(principal, annual_rate, tenure_months)?;
    let total_interest = emi * tenure_months as f64 - principal;
    Ok(PlanOption {
        tenure_months,
        annual_rate,
        emi,
        total_interest,
        processing_fee: processing_fee(principal, config),
        affordability: emi / monthly_income,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emi_known_value() {
        // 1 lakh at 12% for 12 months ≈ 8884.88
        let emi = calc_emi(100_000.0, 12.0, 12).unwrap();
        assert!((emi - 8884.88).abs() < 1.0, "got {emi}");
    }

    #[test]
    fn emi_zero_rate_is_exact_division() {
        assert_eq!(calc_emi(120_000.0, 0.0, 12).unwrap(), 10_000.0);
        assert_eq!(calc_emi(100_000.0, 0.0, 8).unwrap(), 100_000.0 / 8.0);
    }

    #[test]
    fn emi_zero_tenure_rejected() {
        assert_eq!(calc_emi(100_000.0, 12.0, 0), Err(CalcError::InvalidTenure(0)));
    }

    #[test]
    fn emi_negative_rate_uses_compound_formula() {
        // A negative adjusted rate is documented behavior, not an error.
        let emi = calc_emi(100_000.0, -1.0, 12).unwrap();
        assert!(emi > 0.0);
        assert!(emi < 100_000.0 / 12.0, "negative rate must undercut the linear split");
    }

    #[test]
    fn rate_bands_exact() {
        // Neutral score (700..800) isolates the tenure delta.
        assert_eq!(adjust_rate(10.5, 12, 750), 10.0);
        assert_eq!(adjust_rate(10.5, 24, 750), 10.25);
        assert_eq!(adjust_rate(10.5, 36, 750), 10.5);
        assert_eq!(adjust_rate(10.5, 48, 750), 10.75);
        assert_eq!(adjust_rate(10.5, 60, 750), 11.0);
    }

    #[test]
    fn rate_band_boundaries() {
        assert_eq!(adjust_rate(10.0, 13, 750), adjust_rate(10.0, 24, 750));
        assert_eq!(adjust_rate(10.0, 25, 750), adjust_rate(10.0, 36, 750));
        assert_eq!(adjust_rate(10.0, 49, 750), adjust_rate(10.0, 120, 750));
    }

    #[test]
    fn rate_credit_modifier() {
        assert_eq!(adjust_rate(10.5, 36, 820), 10.25);
        assert_eq!(adjust_rate(10.5, 36, 699), 10.75);
        assert_eq!(adjust_rate(10.5, 36, 700), 10.5);
        assert_eq!(adjust_rate(10.5, 36, 800), 10.25);
    }

    #[test]
    fn rate_can_go_negative_without_clamp() {
        // Short tenure + excellent score on a tiny base rate.
        assert_eq!(adjust_rate(0.5, 12, 810), -0.25);
    }

    #[test]
    fn rate_monotone_across_tenures_for_fixed_score() {
        let rates: Vec<f64> = crate::config::CANDIDATE_TENURES
            .iter()
            .map(|&t| adjust_rate(10.5, t, 720))
            .collect();
        for pair in rates.windows(2) {
            assert!(pair[0] <= pair[1], "rates must not decrease with tenure: {rates:?}");
        }
    }

    #[test]
    fn processing_fee_floor_and_rate() {
        let config = Config::default();
        // Small principal: minimum fee wins.
        assert_eq!(processing_fee(50_000.0, &config), 999.0);
        // Large principal: 0.5% wins.
        assert_eq!(processing_fee(400_000.0, &config), 2000.0);
    }

    #[test]
    fn build_plan_recomputes_affordability() {
        let config = Config::default();
        let plan = build_plan(400_000.0, 10.5, 720, 24, 40_000.0, &config).unwrap();
        assert_eq!(plan.tenure_months, 24);
        assert_eq!(plan.annual_rate, 10.25);
        assert!((plan.affordability - plan.emi / 40_000.0).abs() < f64::EPSILON);
        assert!(plan.total_interest > 0.0);

        // Doubling income halves the ratio: no caching across inputs.
        let plan2 = build_plan(400_000.0, 10.5, 720, 24, 80_000.0, &config).unwrap();
        assert!((plan2.affordability - plan.affordability / 2.0).abs() < 1e-12);
    }
}
