//! Intent classification and the loan-question trigger list.
//!
//! Both are *ordered* keyword tables: the first matching entry wins, and that
//! ordering is an explicit, tested contract rather than an accident of map
//! iteration.

use serde::{Deserialize, Serialize};

/// Loan product categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanCategory {
    Personal,
    Home,
    Vehicle,
    Education,
    Business,
}

impl std::fmt::Display for LoanCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Personal => "personal",
            Self::Home => "home",
            Self::Vehicle => "vehicle",
            Self::Education => "education",
            Self::Business => "business",
        };
        write!(f, "{s}")
    }
}

/// Outcome of classifying a `LoanIntent` turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Category(LoanCategory),
    Decline,
}

/// Ordered keyword-to-intent table. Decline entries come first so a refusal
/// that happens to mention a product ("no, cancel the home loan") still
/// routes out.
pub struct IntentTable {
    entries: Vec<(&'static str, Intent)>,
}

impl IntentTable {
    pub fn new() -> Self {
        use Intent::*;
        use LoanCategory::*;
        Self {
            entries: vec![
                ("not interested", Decline),
                ("no thanks", Decline),
                ("decline", Decline),
                ("cancel", Decline),
                ("maybe later", Decline),
                ("personal", Category(Personal)),
                ("home", Category(Home)),
                ("house", Category(Home)),
                ("car", Category(Vehicle)),
                ("vehicle", Category(Vehicle)),
                ("bike", Category(Vehicle)),
                ("education", Category(Education)),
                ("study", Category(Education)),
                ("business", Category(Business)),
            ],
        }
    }

    /// Classify free text; `None` means re-prompt without a state change.
    pub fn classify(&self, text: &str) -> Option<Intent> {
        let lower = text.to_lowercase();
        self.entries
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|&(_, intent)| intent)
    }
}

impl Default for IntentTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Ordered loan-question vocabulary for the cross-cutting short-circuit.
///
/// Deliberately question-shaped terms only, never the bare word "loan" or a
/// number, so structured answers like "I want a personal loan" or "400000"
/// are still handled by their state's own validator.
const TRIGGER_VOCABULARY: [&str; 8] = [
    "interest rate",
    "processing fee",
    "eligib",
    "document",
    "prepay",
    "foreclos",
    "credit score",
    "what is emi",
];

/// Return the first trigger keyword the text contains, if any.
pub fn loan_question_trigger(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    TRIGGER_VOCABULARY
        .iter()
        .find(|keyword| lower.contains(*keyword))
        .copied()
}
