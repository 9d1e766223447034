//! Turns the underwriting engine's numeric output into human-readable
//! advice: how the applicant's chosen plan compares to the cheapest one, and
//! whether the installment sits comfortably within their income.

use crate::underwriting::Approval;

/// Format a rupee amount with thousands separators: `₹400,000`.
pub fn rupees(amount: f64) -> String {
    let whole = amount.round() as i64;
    let negative = whole < 0;
    let digits = whole.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if negative {
        format!("-₹{grouped}")
    } else {
        format!("₹{grouped}")
    }
}

/// Summarize an approval: chosen-vs-best comparison, affordability note,
/// fee/interest line, and the cheaper alternative when one exists.
pub fn summarize(approval: &Approval) -> Vec<String> {
    let chosen = &approval.chosen;
    let best = &approval.best;
    let mut lines = Vec::new();

    let emi_diff = (chosen.emi - best.emi).abs();
    let interest_delta = chosen.total_interest - best.total_interest;

    if chosen.tenure_months == best.tenure_months {
        lines.push(format!(
            "Your chosen {}-month plan is also the cheapest feasible option for this amount.",
            chosen.tenure_months
        ));
    } else if chosen.tenure_months > best.tenure_months {
        lines.push(format!(
            "You chose a longer {}-month tenure: it keeps the EMI lower ({}/month), \
             but total interest rises by about {} compared to the {}-month option.",
            chosen.tenure_months,
            rupees(chosen.emi),
            rupees(interest_delta),
            best.tenure_months
        ));
    } else {
        lines.push(format!(
            "The {}-month option is more aggressive: EMI is {}, {} apart from the \
             best-balance plan.",
            chosen.tenure_months,
            rupees(chosen.emi),
            rupees(emi_diff)
        ));
    }

    if chosen.affordability < 0.30 {
        lines.push("Your EMI is well within a safe affordability range.".to_string());
    } else if chosen.affordability < 0.50 {
        lines.push(
            "EMI is manageable, but keep a buffer for your other expenses.".to_string(),
        );
    } else {
        lines.push("EMI looks high; consider a longer tenure for comfort.".to_string());
    }

    lines.push(format!(
        "Processing fee: {}, total interest: {}.",
        rupees(chosen.processing_fee),
        rupees(chosen.total_interest)
    ));

    if best.tenure_months != chosen.tenure_months {
        lines.push(format!(
            "Alternative: {} months @ {:.2}%, EMI {}, saves about {} in interest.",
            best.tenure_months,
            best.annual_rate,
            rupees(best.emi),
            rupees(interest_delta)
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanOption;

    fn plan(tenure: u32, rate: f64, emi: f64, interest: f64, affordability: f64) -> PlanOption {
        PlanOption {
            tenure_months: tenure,
            annual_rate: rate,
            emi,
            total_interest: interest,
            processing_fee: 2000.0,
            affordability,
        }
    }

    #[test]
    fn rupee_formatting() {
        assert_eq!(rupees(0.0), "₹0");
        assert_eq!(rupees(999.4), "₹999");
        assert_eq!(rupees(400_000.0), "₹400,000");
        assert_eq!(rupees(1_234_567.0), "₹1,234,567");
        assert_eq!(rupees(-2500.0), "-₹2,500");
    }

    #[test]
    fn optimal_choice_summary() {
        let p = plan(24, 10.25, 18_500.0, 44_000.0, 0.46);
        let approval = Approval {
            approved_amount: 400_000,
            chosen: p.clone(),
            best: p.clone(),
            feasible: vec![p],
        };
        let lines = summarize(&approval);
        assert!(lines[0].contains("also the cheapest"));
        assert!(lines.iter().any(|l| l.contains("manageable")));
        // No alternative line when chosen == best.
        assert!(!lines.iter().any(|l| l.starts_with("Alternative")));
    }

    #[test]
    fn longer_tenure_summary_mentions_alternative() {
        let chosen = plan(60, 11.0, 8_700.0, 122_000.0, 0.22);
        let best = plan(24, 10.25, 18_500.0, 44_000.0, 0.46);
        let approval = Approval {
            approved_amount: 400_000,
            chosen: chosen.clone(),
            best: best.clone(),
            feasible: vec![best, chosen],
        };
        let lines = summarize(&approval);
        assert!(lines[0].contains("longer 60-month tenure"));
        assert!(lines.iter().any(|l| l.contains("well within a safe")));
        assert!(lines.iter().any(|l| l.contains("Alternative: 24 months")));
    }
}
