//! Exact fixed-point amounts over arbitrary-precision integers.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};

use crate::error::ParseDecimalError;

/// Largest scale the parsers accept. Token decimals are a `u8`.
pub const MAX_SCALE: u32 = u8::MAX as u32;

/// An exact decimal number stored as `mantissa / 10^scale`.
///
/// The scale is fixed per logical quantity: a price uses the payment
/// currency's decimals, a quantity uses the collectible's decimals. Values
/// with different scales still compare correctly, because every comparison
/// rescales both sides first.
///
/// # Parsing
///
/// [`DecimalValue::parse`] is tolerant and never fails. Empty or malformed
/// text gives zero at the requested scale, so an input box can always render
/// what the user typed while validation reports the problem.
///
/// ```
/// use market_kit::DecimalValue;
///
/// let price = DecimalValue::parse("1.5", 6);
/// assert_eq!(price.to_smallest_unit(), "1500000");
///
/// assert!(DecimalValue::parse("abc", 6).is_zero());
/// assert!(DecimalValue::parse("", 6).is_zero());
/// ```
///
/// # Comparison
///
/// ```
/// use market_kit::DecimalValue;
///
/// let a = DecimalValue::parse("2", 0);
/// let b = DecimalValue::parse("1.999999", 6);
/// assert!(a > b);
/// assert_eq!(DecimalValue::parse("1", 0), DecimalValue::parse("1.000", 18));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecimalValue {
    #[serde(with = "mantissa_text")]
    mantissa: BigInt,
    scale: u32,
}

/// Display options for [`DecimalValue::format`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatOptions {
    /// Keep at most this many fractional digits (extra digits are cut, not rounded).
    pub max_fraction_digits: Option<u32>,
    /// Insert `,` between groups of three whole digits.
    pub group_thousands: bool,
    /// Symbol appended after a space, e.g. `"USDC"`.
    pub symbol: Option<String>,
}

impl FormatOptions {
    /// Limit the number of fractional digits shown.
    pub fn max_fraction_digits(mut self, digits: u32) -> Self {
        self.max_fraction_digits = Some(digits);
        self
    }

    /// Group whole digits by thousands.
    pub fn grouped(mut self) -> Self {
        self.group_thousands = true;
        self
    }

    /// Append a currency symbol.
    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }
}

impl DecimalValue {
    /// Create from a mantissa already expressed in smallest units.
    pub fn new(mantissa: impl Into<BigInt>, scale: u32) -> Self {
        Self {
            mantissa: mantissa.into(),
            scale,
        }
    }

    /// Zero at the given scale.
    pub fn zero(scale: u32) -> Self {
        Self::new(BigInt::zero(), scale)
    }

    /// Parse human-readable text such as `"1.5"`, never failing.
    ///
    /// Anything [`try_parse`](Self::try_parse) rejects becomes zero at
    /// `scale`. Excess precision is rejected rather than cut off, so the
    /// parsed value is always exactly what the user typed or zero. A scale
    /// above [`MAX_SCALE`] also gives zero.
    pub fn parse(input: &str, scale: u32) -> Self {
        Self::try_parse(input, scale).unwrap_or_else(|_| Self::zero(scale))
    }

    /// Strictly parse decimal text at the given scale.
    ///
    /// Accepts an optional sign, a leading or trailing dot (`".5"`, `"2."`)
    /// and surrounding whitespace. Trailing fractional zeros beyond `scale`
    /// are allowed since they do not change the value.
    ///
    /// ```
    /// use market_kit::DecimalValue;
    ///
    /// assert!(DecimalValue::try_parse("1.1234567", 6).is_err());
    /// assert_eq!(
    ///     DecimalValue::try_parse("1.1000000", 6).unwrap().to_smallest_unit(),
    ///     "1100000"
    /// );
    /// ```
    pub fn try_parse(input: &str, scale: u32) -> Result<Self, ParseDecimalError> {
        if scale > MAX_SCALE {
            return Err(ParseDecimalError::ScaleTooLarge(scale));
        }
        let s = input.trim();
        if s.is_empty() {
            return Err(ParseDecimalError::Empty);
        }

        let (negative, unsigned) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
            return Err(ParseDecimalError::InvalidFormat(s.to_string()));
        }

        let significant = frac.trim_end_matches('0');
        if significant.len() > scale as usize {
            return Err(ParseDecimalError::TooManyDecimals {
                input: s.to_string(),
                scale,
            });
        }

        // Pad fractional part with zeros up to the scale
        let digits = format!(
            "{}{:0<width$}",
            whole,
            significant,
            width = scale as usize
        );
        let magnitude = if digits.is_empty() {
            BigInt::zero()
        } else {
            BigInt::parse_bytes(digits.as_bytes(), 10)
                .ok_or_else(|| ParseDecimalError::InvalidFormat(s.to_string()))?
        };

        let mantissa = if negative { -magnitude } else { magnitude };
        Ok(Self { mantissa, scale })
    }

    /// Build from a smallest-unit integer string as returned by a chain or indexer.
    ///
    /// Malformed input gives zero at `scale`.
    pub fn from_smallest_unit(raw: &str, scale: u32) -> Self {
        BigInt::parse_bytes(raw.trim().as_bytes(), 10)
            .map(|mantissa| Self { mantissa, scale })
            .unwrap_or_else(|| Self::zero(scale))
    }

    /// Render the mantissa as a base-10 integer, ready for a contract call argument.
    pub fn to_smallest_unit(&self) -> String {
        self.mantissa.to_string()
    }

    /// The raw mantissa in smallest units.
    pub fn mantissa(&self) -> &BigInt {
        &self.mantissa
    }

    /// The number of decimal places.
    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Check if this value is zero.
    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    /// Check if this value is strictly greater than zero.
    pub fn is_positive(&self) -> bool {
        self.mantissa.is_positive()
    }

    /// Check if this value is strictly below zero.
    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    /// Re-express at another scale, only if that is exact.
    ///
    /// Increasing the scale succeeds up to [`MAX_SCALE`]. Decreasing it
    /// succeeds only when the dropped digits are all zero.
    pub fn rescale(&self, scale: u32) -> Option<Self> {
        if scale > MAX_SCALE && scale > self.scale {
            return None;
        }
        match scale.cmp(&self.scale) {
            Ordering::Equal => Some(self.clone()),
            Ordering::Greater => Some(Self {
                mantissa: &self.mantissa * pow10(scale - self.scale),
                scale,
            }),
            Ordering::Less => {
                let divisor = pow10(self.scale - scale);
                let remainder = &self.mantissa % &divisor;
                remainder.is_zero().then(|| Self {
                    mantissa: &self.mantissa / &divisor,
                    scale,
                })
            }
        }
    }

    /// Exact product. The result's scale is the sum of both scales.
    ///
    /// Returns `None` only if the summed scale overflows.
    ///
    /// ```
    /// use market_kit::DecimalValue;
    ///
    /// let price = DecimalValue::parse("1.5", 6);
    /// let quantity = DecimalValue::parse("2", 0);
    /// let total = price.checked_mul(&quantity).unwrap();
    /// assert_eq!(total, DecimalValue::parse("3", 6));
    /// ```
    pub fn checked_mul(&self, other: &DecimalValue) -> Option<DecimalValue> {
        let scale = self.scale.checked_add(other.scale)?;
        Some(Self {
            mantissa: &self.mantissa * &other.mantissa,
            scale,
        })
    }

    /// Human-readable rendering for display. Not for on-chain payloads.
    ///
    /// ```
    /// use market_kit::{DecimalValue, FormatOptions};
    ///
    /// let v = DecimalValue::parse("1234567.891", 6);
    /// let opts = FormatOptions::default().grouped().max_fraction_digits(2).symbol("USDC");
    /// assert_eq!(v.format(&opts), "1,234,567.89 USDC");
    /// ```
    pub fn format(&self, options: &FormatOptions) -> String {
        let digits = self.mantissa.magnitude().to_string();
        let scale = self.scale as usize;

        let (whole, frac) = if digits.len() > scale {
            let (w, f) = digits.split_at(digits.len() - scale);
            (w.to_string(), f.to_string())
        } else {
            ("0".to_string(), format!("{:0>width$}", digits, width = scale))
        };

        let mut frac = frac;
        if let Some(max) = options.max_fraction_digits {
            frac.truncate(max as usize);
        }
        let frac = frac.trim_end_matches('0');

        let whole = if options.group_thousands {
            group_thousands(&whole)
        } else {
            whole
        };

        let mut out = String::new();
        if self.is_negative() && (whole != "0" || !frac.is_empty()) {
            out.push('-');
        }
        out.push_str(&whole);
        if !frac.is_empty() {
            out.push('.');
            out.push_str(frac);
        }
        if let Some(symbol) = &options.symbol {
            out.push(' ');
            out.push_str(symbol);
        }
        out
    }

    /// Mantissas of `self` and `other` brought to their common scale.
    fn aligned(&self, other: &DecimalValue) -> (BigInt, BigInt) {
        match self.scale.cmp(&other.scale) {
            Ordering::Equal => (self.mantissa.clone(), other.mantissa.clone()),
            Ordering::Less => (
                &self.mantissa * pow10(other.scale - self.scale),
                other.mantissa.clone(),
            ),
            Ordering::Greater => (
                self.mantissa.clone(),
                &other.mantissa * pow10(self.scale - other.scale),
            ),
        }
    }
}

fn pow10(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), exp as usize)
}

fn group_thousands(whole: &str) -> String {
    let len = whole.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl PartialEq for DecimalValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DecimalValue {}

impl PartialOrd for DecimalValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DecimalValue {
    fn cmp(&self, other: &Self) -> Ordering {
        // Signs settle it without rescaling
        let signs = self.mantissa.sign().cmp(&other.mantissa.sign());
        if signs != Ordering::Equal || self.is_zero() {
            return signs;
        }
        let (a, b) = self.aligned(other);
        a.cmp(&b)
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(&FormatOptions::default()))
    }
}

/// Serializes the mantissa as decimal text so JSON consumers never lose precision.
mod mantissa_text {
    use num_bigint::BigInt;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let text = String::deserialize(deserializer)?;
        BigInt::parse_bytes(text.as_bytes(), 10)
            .ok_or_else(|| D::Error::custom(format!("invalid mantissa: '{}'", text)))
    }
}
