//! Form validation for listing and offer inputs.
//!
//! [`validate`] is a pure function of the current decimal inputs and the
//! fetched balance. Problems are reported per field and never raised as
//! errors, so the form stays editable while it is invalid.
//!
//! ```
//! use market_kit::{DecimalValue, FlowKind};
//! use market_kit::validation::{validate, ValidationInputs};
//!
//! let price = DecimalValue::parse("0", 6);
//! let quantity = DecimalValue::parse("1", 0);
//! let result = validate(&ValidationInputs::new(FlowKind::Listing, &price, &quantity));
//!
//! assert!(!result.is_valid());
//! assert_eq!(result.collect_errors(), vec!["Price must be greater than 0"]);
//! ```

use serde::Serialize;

use crate::types::{DecimalValue, FlowKind};

/// Error shown when the price is zero, negative or unparsable.
pub const PRICE_NOT_POSITIVE: &str = "Price must be greater than 0";
/// Error shown when the quantity is zero, negative or unparsable.
pub const QUANTITY_NOT_POSITIVE: &str = "Quantity must be greater than 0";

/// Outcome for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldValidation {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl FieldValidation {
    /// A passing field.
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    /// A failing field with its message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(message.into()),
        }
    }

    fn check(ok: bool, message: impl FnOnce() -> String) -> Self {
        if ok { Self::valid() } else { Self::invalid(message()) }
    }
}

/// Validation result for the whole form.
///
/// `balance` is present only when a balance was supplied, `marketplace` only
/// when a reference price was supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormValidation {
    pub price: FieldValidation,
    pub quantity: FieldValidation,
    pub balance: Option<FieldValidation>,
    pub marketplace: Option<FieldValidation>,
}

impl FormValidation {
    /// True iff every present criterion is valid.
    pub fn is_valid(&self) -> bool {
        self.fields().all(|(_, field)| field.is_valid)
    }

    /// Error messages in the fixed order price, quantity, balance, marketplace.
    pub fn collect_errors(&self) -> Vec<String> {
        self.invalid_fields()
            .into_iter()
            .map(|(_, message)| message)
            .collect()
    }

    /// `(field name, message)` for every invalid field, in the same order as
    /// [`collect_errors`](Self::collect_errors).
    pub fn invalid_fields(&self) -> Vec<(&'static str, String)> {
        self.fields()
            .filter(|(_, field)| !field.is_valid)
            .map(|(name, field)| (name, field.error.clone().unwrap_or_default()))
            .collect()
    }

    fn fields(&self) -> impl Iterator<Item = (&'static str, &FieldValidation)> {
        [
            ("price", Some(&self.price)),
            ("quantity", Some(&self.quantity)),
            ("balance", self.balance.as_ref()),
            ("marketplace", self.marketplace.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, field)| field.map(|f| (name, f)))
    }
}

/// Inputs to [`validate`].
#[derive(Debug, Clone, Copy)]
pub struct ValidationInputs<'a> {
    pub kind: FlowKind,
    /// Price per unit, at the payment currency's scale
    pub price: &'a DecimalValue,
    /// Quantity, at the collectible's scale
    pub quantity: &'a DecimalValue,
    /// Collectible balance for listings, currency balance for offers
    pub balance: Option<&'a DecimalValue>,
    /// Price an offer has to exceed on orderbooks that enforce one
    pub reference_price: Option<&'a DecimalValue>,
}

impl<'a> ValidationInputs<'a> {
    /// Inputs with no balance and no reference price.
    pub fn new(kind: FlowKind, price: &'a DecimalValue, quantity: &'a DecimalValue) -> Self {
        Self {
            kind,
            price,
            quantity,
            balance: None,
            reference_price: None,
        }
    }

    /// Attach a fetched balance.
    pub fn balance(mut self, balance: &'a DecimalValue) -> Self {
        self.balance = Some(balance);
        self
    }

    /// Attach a reference price.
    pub fn reference_price(mut self, reference: &'a DecimalValue) -> Self {
        self.reference_price = Some(reference);
        self
    }
}

/// Validate the current inputs.
pub fn validate(inputs: &ValidationInputs<'_>) -> FormValidation {
    let price = FieldValidation::check(inputs.price.is_positive(), || {
        PRICE_NOT_POSITIVE.to_string()
    });
    let quantity = FieldValidation::check(inputs.quantity.is_positive(), || {
        QUANTITY_NOT_POSITIVE.to_string()
    });

    let balance = inputs
        .balance
        .map(|balance| validate_balance(inputs, balance));

    let marketplace = inputs.reference_price.map(|reference| {
        FieldValidation::check(inputs.price > reference, || {
            format!("Offer must exceed the current price of {}", reference)
        })
    });

    FormValidation {
        price,
        quantity,
        balance,
        marketplace,
    }
}

fn validate_balance(inputs: &ValidationInputs<'_>, balance: &DecimalValue) -> FieldValidation {
    match inputs.kind {
        FlowKind::Listing => FieldValidation::check(inputs.quantity <= balance, || {
            format!(
                "Insufficient balance: you own {} but are listing {}",
                balance, inputs.quantity
            )
        }),
        FlowKind::Offer => match inputs.price.checked_mul(inputs.quantity) {
            Some(total) => FieldValidation::check(&total <= balance, || {
                format!(
                    "Insufficient balance: offer total {} exceeds available {}",
                    total, balance
                )
            }),
            None => FieldValidation::invalid("Insufficient balance: offer total is too large"),
        },
    }
}
