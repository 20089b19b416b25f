//! Flow configuration.
//!
//! Every field has a default, so a host only sets what it wants to change:
//!
//! ```
//! use market_kit::FlowConfig;
//!
//! let config = FlowConfig::from_json(r#"{ "default_expiry_days": 30 }"#).unwrap();
//! assert_eq!(config.default_expiry_days, 30);
//! assert_eq!(config.max_expiry_days, 180);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::types::FlowKind;

/// Per-step label text shown by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepLabels {
    pub form: String,
    pub fee_selection: String,
    pub approve: String,
    pub re_approve: String,
    pub create_listing: String,
    pub make_offer: String,
}

impl Default for StepLabels {
    fn default() -> Self {
        Self {
            form: "Enter details".to_string(),
            fee_selection: "Select fee".to_string(),
            approve: "Approve".to_string(),
            re_approve: "Re-approve".to_string(),
            create_listing: "Create listing".to_string(),
            make_offer: "Make offer".to_string(),
        }
    }
}

impl StepLabels {
    /// Label of the final step for a flow kind.
    pub fn execute(&self, kind: FlowKind) -> &str {
        match kind {
            FlowKind::Listing => &self.create_listing,
            FlowKind::Offer => &self.make_offer,
        }
    }
}

/// Configuration for a [`Flow`](crate::Flow).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Expiry applied when the flow is created (default: 7 days)
    pub default_expiry_days: u32,

    /// Upper bound for `set_expiry_days` (default: 180 days)
    pub max_expiry_days: u32,

    /// Initial quantity text (default: "1")
    pub default_quantity: String,

    /// Step labels
    pub labels: StepLabels,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            default_expiry_days: 7,
            max_expiry_days: 180,
            default_quantity: "1".to_string(),
            labels: StepLabels::default(),
        }
    }
}

impl FlowConfig {
    /// Parse a JSON config, filling unspecified fields with defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: FlowConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_expiry_days == 0 {
            return Err(Error::Config("max_expiry_days must be at least 1".to_string()));
        }
        if self.default_expiry_days == 0 || self.default_expiry_days > self.max_expiry_days {
            return Err(Error::Config(format!(
                "default_expiry_days must be between 1 and {}",
                self.max_expiry_days
            )));
        }
        Ok(())
    }

    /// Clamp a requested expiry into `1..=max_expiry_days`.
    pub fn clamp_expiry_days(&self, days: u32) -> u32 {
        days.clamp(1, self.max_expiry_days.max(1))
    }
}
