//! Field-level validation rules for card data.
//!
//! Every check is a pure function of its inputs. Expiry checks take the
//! current date explicitly so callers decide which clock applies.

use super::brand::{self, CardBrand};
use super::digits;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::fmt;

pub const MAX_CARD_HOLDER_NAME_LEN: usize = 128;
pub const MAX_NONCE_LEN: usize = 16;
pub const MIN_CARD_TOKEN_LEN: usize = 32;
pub const MAX_CARD_TOKEN_LEN: usize = 64;

/// Reasons a field can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValidationErrorCode {
    #[serde(rename = "PAN_INVALID")]
    PanInvalid,
    #[serde(rename = "EXPIRY_INVALID")]
    ExpiryInvalid,
    #[serde(rename = "CARD_HOLDER_NAME_INVALID")]
    CardHolderNameInvalid,
    #[serde(rename = "CVV_INVALID")]
    CvvInvalid,
    #[serde(rename = "NONCE_MISSING_OR_INVALID")]
    NonceInvalid,
}

impl ValidationErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PanInvalid => "PAN_INVALID",
            Self::ExpiryInvalid => "EXPIRY_INVALID",
            Self::CardHolderNameInvalid => "CARD_HOLDER_NAME_INVALID",
            Self::CvvInvalid => "CVV_INVALID",
            Self::NonceInvalid => "NONCE_MISSING_OR_INVALID",
        }
    }
}

impl fmt::Display for ValidationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating one request.
///
/// Codes keep the order in which the checks ran and never repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    errors: Vec<ValidationErrorCode>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `code` unless `passed` is true.
    pub fn check(&mut self, passed: bool, code: ValidationErrorCode) {
        if !passed && !self.errors.contains(&code) {
            self.errors.push(code);
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationErrorCode] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ValidationErrorCode> {
        self.errors
    }
}

/// Luhn (mod 10) checksum over a digit string.
///
/// Any non-digit character fails the check.
pub fn luhn_check(number: &str) -> bool {
    let mut sum = 0;
    let mut double = false;

    for c in number.chars().rev() {
        let Some(mut digit) = c.to_digit(10) else {
            return false;
        };
        if double {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
        double = !double;
    }

    sum % 10 == 0
}

/// Whether `number` has a length the given brand issues. Unknown brands never pass.
pub fn is_valid_length(number: &str, brand: CardBrand) -> bool {
    brand.valid_lengths().contains(&number.len())
}

/// Luhn plus brand length check, after stripping separators.
pub fn is_valid_pan(pan: &str) -> bool {
    let number = digits::remove_non_digits(pan);
    luhn_check(&number) && is_valid_length(&number, brand::detect(&number))
}

/// Expands a two-digit year into the century of `today`.
///
/// Years outside `0..=99` are returned unchanged.
pub fn normalize_year(year: i32, today: NaiveDate) -> i32 {
    if (0..100).contains(&year) {
        today.year() / 100 * 100 + year
    } else {
        year
    }
}

/// Month in `1..=12`.
pub fn is_valid_expiry_month(month: i32) -> bool {
    (1..=12).contains(&month)
}

fn has_year_passed(year: i32, today: NaiveDate) -> bool {
    normalize_year(year, today) < today.year()
}

/// Cards expire at the end of their expiry month.
fn has_month_passed(year: i32, month: i32, today: NaiveDate) -> bool {
    if has_year_passed(year, today) {
        return true;
    }
    normalize_year(year, today) == today.year() && month < today.month() as i32
}

/// Valid month that has not ended yet relative to `today`. Two-digit years are normalized first.
pub fn is_valid_expiry(month: i32, year: i32, today: NaiveDate) -> bool {
    is_valid_expiry_month(month) && !has_month_passed(year, month, today)
}

/// Between 1 and 128 characters.
pub fn is_valid_card_holder_name(name: &str) -> bool {
    let len = name.chars().count();
    len > 0 && len <= MAX_CARD_HOLDER_NAME_LEN
}

/// CVV check against the brand of the accompanying PAN.
///
/// Without a PAN, or with a PAN of unknown brand, both 3 and 4 digits pass.
pub fn is_valid_cvv(cvv: &str, pan: Option<&str>) -> bool {
    if digits::is_blank(cvv) {
        return false;
    }
    let cvv = cvv.trim();
    let brand = pan.map_or(CardBrand::Unknown, brand::detect_brand);

    digits::is_digits_only(cvv) && brand.cvv_lengths().contains(&cvv.len())
}

/// Between 1 and 16 characters.
pub fn is_valid_nonce(nonce: &str) -> bool {
    let len = nonce.chars().count();
    len > 0 && len <= MAX_NONCE_LEN
}

/// Between 32 and 64 characters.
pub fn is_valid_card_token(token: &str) -> bool {
    (MIN_CARD_TOKEN_LEN..=MAX_CARD_TOKEN_LEN).contains(&token.chars().count())
}
