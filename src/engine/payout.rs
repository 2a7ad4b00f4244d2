use serde::Serialize;

/// Identifier of the cash-on-hand destination
pub const CASH_ON_HAND: &str = "hand";

/// One place earnings can be paid into
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayoutOption {
    pub value: String,
    pub label: String,
    pub description: String,
}

impl PayoutOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            description: description.into(),
        }
    }

    fn cash_on_hand() -> Self {
        Self::new(CASH_ON_HAND, "Cash on hand", "Paid out as cash in your wallet")
    }
}

/// Destination could not be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutRejection {
    Blank,
    Unknown(String),
}

/// The enumerated destinations a completion may pay into.
/// Cash on hand is always first, whatever the configured set holds.
#[derive(Debug, Clone)]
pub struct PayoutOptions {
    options: Vec<PayoutOption>,
}

impl PayoutOptions {
    pub fn new(configured: Vec<PayoutOption>) -> Self {
        let mut options = vec![PayoutOption::cash_on_hand()];
        for option in configured {
            let value = option.value.trim();
            if value.is_empty() || options.iter().any(|o| o.value == value) {
                continue;
            }
            options.push(PayoutOption {
                value: value.to_string(),
                ..option
            });
        }
        Self { options }
    }

    pub fn options(&self) -> &[PayoutOption] {
        &self.options
    }

    /// Resolve the caller's choice; no choice means cash on hand
    pub fn resolve(&self, requested: Option<&str>) -> Result<String, PayoutRejection> {
        let Some(requested) = requested else {
            return Ok(CASH_ON_HAND.to_string());
        };

        let value = requested.trim();
        if value.is_empty() {
            return Err(PayoutRejection::Blank);
        }

        self.options
            .iter()
            .find(|option| option.value == value)
            .map(|option| option.value.clone())
            .ok_or_else(|| PayoutRejection::Unknown(value.to_string()))
    }
}

impl Default for PayoutOptions {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
