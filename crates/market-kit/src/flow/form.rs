//! Raw order inputs and their decimal views.

use chrono::{DateTime, Duration, Utc};

use crate::client::OrderParams;
use crate::types::{Currency, DecimalValue};

/// The user's order inputs.
///
/// Price and quantity are kept as typed text and parsed on every read, so a
/// currency change re-parses the same text at the new scale.
#[derive(Debug, Clone)]
pub struct OrderForm {
    price: String,
    quantity: String,
    currency: Currency,
    collectible_decimals: u8,
    expiry_days: u32,
    expires_at: DateTime<Utc>,
}

impl OrderForm {
    pub fn new(
        currency: Currency,
        collectible_decimals: u8,
        quantity: impl Into<String>,
        expiry_days: u32,
    ) -> Self {
        let mut form = Self {
            price: String::new(),
            quantity: quantity.into(),
            currency,
            collectible_decimals,
            expiry_days: 0,
            expires_at: Utc::now(),
        };
        form.set_expiry_days(expiry_days);
        form
    }

    pub fn set_price(&mut self, text: impl Into<String>) {
        self.price = text.into();
    }

    pub fn set_quantity(&mut self, text: impl Into<String>) {
        self.quantity = text.into();
    }

    pub fn set_currency(&mut self, currency: Currency) {
        self.currency = currency;
    }

    pub fn set_collectible_decimals(&mut self, decimals: u8) {
        self.collectible_decimals = decimals;
    }

    /// Set the expiry relative to now. The timestamp is fixed here, not on
    /// every read, so the order parameters stay stable.
    pub fn set_expiry_days(&mut self, days: u32) {
        self.set_expiry_from(days, Utc::now());
    }

    pub(crate) fn set_expiry_from(&mut self, days: u32, now: DateTime<Utc>) {
        self.expiry_days = days;
        self.expires_at = now
            .checked_add_signed(Duration::days(i64::from(days)))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    pub fn price_text(&self) -> &str {
        &self.price
    }

    pub fn quantity_text(&self) -> &str {
        &self.quantity
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn collectible_decimals(&self) -> u8 {
        self.collectible_decimals
    }

    pub fn expiry_days(&self) -> u32 {
        self.expiry_days
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Price per unit at the currency's scale. Zero when unparsable.
    pub fn price(&self) -> DecimalValue {
        DecimalValue::parse(&self.price, self.currency.scale())
    }

    /// Quantity at the collectible's scale. Zero when unparsable.
    pub fn quantity(&self) -> DecimalValue {
        DecimalValue::parse(&self.quantity, u32::from(self.collectible_decimals))
    }

    pub fn price_in_smallest_unit(&self) -> String {
        self.price().to_smallest_unit()
    }

    pub fn quantity_in_smallest_unit(&self) -> String {
        self.quantity().to_smallest_unit()
    }

    /// Order parameters for the payload generator.
    pub fn order_params(&self, token_id: &str) -> OrderParams {
        OrderParams {
            token_id: token_id.to_string(),
            price: self.price_in_smallest_unit(),
            quantity: self.quantity_in_smallest_unit(),
            expiry: self.expires_at.timestamp(),
            currency: self.currency.address,
        }
    }
}
