use super::digits;
use super::validation::{self, ValidationErrorCode, ValidationReport};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;

/// A request whose fields can be validated and serialized for encryption.
pub trait EncryptRequest: Send + fmt::Debug {
    /// Runs every applicable check; never stops at the first failure.
    fn validate(&self, today: NaiveDate) -> ValidationReport;

    /// Canonical plaintext handed to the encryption service.
    fn plain(&self) -> String;
}

/// Raw card fields as supplied by a caller or read from a batch file.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct CardDetails {
    pub pan: String,
    pub card_holder_name: String,
    pub expiry_year: i32,
    pub expiry_month: i32,
    pub cvv: String,
    pub nonce: String,
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("pan", &digits::mask_pan(&self.pan))
            .field("expiry_year", &self.expiry_year)
            .field("expiry_month", &self.expiry_month)
            .finish_non_exhaustive()
    }
}

/// Full card request. PAN and CVV are reduced to digits and the expiry year
/// is expanded to four digits when the request is built.
#[derive(Clone, PartialEq, Eq)]
pub struct CardEncryptRequest {
    pan: String,
    expiry_year: i32,
    expiry_month: i32,
    card_holder_name: String,
    cvv: String,
    nonce: String,
}

impl CardEncryptRequest {
    pub fn new(details: CardDetails, today: NaiveDate) -> Self {
        Self {
            pan: digits::remove_non_digits(&details.pan),
            expiry_year: validation::normalize_year(details.expiry_year, today),
            expiry_month: details.expiry_month,
            card_holder_name: details.card_holder_name,
            cvv: digits::remove_non_digits(&details.cvv),
            nonce: details.nonce,
        }
    }

    pub fn pan(&self) -> &str {
        &self.pan
    }

    pub fn expiry_year(&self) -> i32 {
        self.expiry_year
    }
}

impl EncryptRequest for CardEncryptRequest {
    fn validate(&self, today: NaiveDate) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.check(
            validation::is_valid_pan(&self.pan),
            ValidationErrorCode::PanInvalid,
        );
        report.check(
            validation::is_valid_expiry(self.expiry_month, self.expiry_year, today),
            ValidationErrorCode::ExpiryInvalid,
        );
        report.check(
            validation::is_valid_card_holder_name(&self.card_holder_name),
            ValidationErrorCode::CardHolderNameInvalid,
        );
        report.check(
            validation::is_valid_cvv(&self.cvv, Some(&self.pan)),
            ValidationErrorCode::CvvInvalid,
        );
        report.check(
            validation::is_valid_nonce(&self.nonce),
            ValidationErrorCode::NonceInvalid,
        );
        report
    }

    fn plain(&self) -> String {
        format!(
            "p={}&y={}&m={:02}&c={}&cn={}&n={}",
            self.pan,
            self.expiry_year,
            self.expiry_month,
            self.cvv,
            self.card_holder_name,
            self.nonce
        )
    }
}

impl fmt::Debug for CardEncryptRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardEncryptRequest")
            .field("pan", &digits::mask_pan(&self.pan))
            .field("expiry_year", &self.expiry_year)
            .field("expiry_month", &self.expiry_month)
            .finish_non_exhaustive()
    }
}

/// CVV-only request, used to re-verify a stored card.
#[derive(Clone, PartialEq, Eq)]
pub struct CvvEncryptRequest {
    cvv: String,
    nonce: String,
}

impl CvvEncryptRequest {
    pub fn new(cvv: &str, nonce: &str) -> Self {
        Self {
            cvv: digits::remove_non_digits(cvv),
            nonce: nonce.to_string(),
        }
    }
}

impl EncryptRequest for CvvEncryptRequest {
    fn validate(&self, _today: NaiveDate) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.check(
            validation::is_valid_cvv(&self.cvv, None),
            ValidationErrorCode::CvvInvalid,
        );
        report.check(
            validation::is_valid_nonce(&self.nonce),
            ValidationErrorCode::NonceInvalid,
        );
        report
    }

    fn plain(&self) -> String {
        format!("c={}&n={}", self.cvv, self.nonce)
    }
}

impl fmt::Debug for CvvEncryptRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CvvEncryptRequest").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn visa_details() -> CardDetails {
        CardDetails {
            pan: "4111 1111 1111 1111".to_string(),
            card_holder_name: "Jane Doe".to_string(),
            expiry_year: 2026,
            expiry_month: 3,
            cvv: "123".to_string(),
            nonce: "nonce-1".to_string(),
        }
    }

    #[test]
    fn test_valid_card_request_plain_payload() {
        let request = CardEncryptRequest::new(visa_details(), today());
        let report = request.validate(today());

        assert!(report.is_valid(), "unexpected errors: {:?}", report.errors());
        assert_eq!(
            request.plain(),
            "p=4111111111111111&y=2026&m=03&c=123&cn=Jane Doe&n=nonce-1"
        );
    }

    #[test]
    fn test_two_digit_year_is_expanded_at_construction() {
        let details = CardDetails {
            expiry_year: 27,
            expiry_month: 11,
            ..visa_details()
        };
        let request = CardEncryptRequest::new(details, today());
        assert_eq!(request.expiry_year(), 2027);
        assert!(request.plain().contains("&y=2027&m=11&"));
    }

    #[test]
    fn test_all_failures_are_reported() {
        let details = CardDetails {
            pan: "4111111111111112".to_string(),
            card_holder_name: String::new(),
            expiry_year: 2023,
            expiry_month: 1,
            cvv: "12".to_string(),
            nonce: "x".repeat(17),
        };
        let request = CardEncryptRequest::new(details, today());
        let report = request.validate(today());

        assert_eq!(
            report.errors(),
            &[
                ValidationErrorCode::PanInvalid,
                ValidationErrorCode::ExpiryInvalid,
                ValidationErrorCode::CardHolderNameInvalid,
                ValidationErrorCode::CvvInvalid,
                ValidationErrorCode::NonceInvalid,
            ]
        );
    }

    #[test]
    fn test_validate_is_idempotent() {
        let details = CardDetails {
            cvv: "1234".to_string(),
            ..visa_details()
        };
        let request = CardEncryptRequest::new(details, today());
        let first = request.validate(today());
        let second = request.validate(today());
        assert_eq!(first, second);
        assert_eq!(first.errors(), &[ValidationErrorCode::CvvInvalid]);
    }

    #[test]
    fn test_cvv_is_checked_against_pan_brand() {
        let details = CardDetails {
            pan: "378282246310005".to_string(),
            cvv: "1234".to_string(),
            ..visa_details()
        };
        let request = CardEncryptRequest::new(details, today());
        assert!(request.validate(today()).is_valid());
    }

    #[test]
    fn test_debug_masks_card_data() {
        let request = CardEncryptRequest::new(visa_details(), today());
        let debug = format!("{:?}", request);
        assert!(debug.contains("************1111"));
        assert!(!debug.contains("4111111111111111"));
        assert!(!debug.contains("nonce-1"));
    }

    #[test]
    fn test_cvv_request() {
        let request = CvvEncryptRequest::new("1 2 3", "abc");
        assert!(request.validate(today()).is_valid());
        assert_eq!(request.plain(), "c=123&n=abc");

        let four = CvvEncryptRequest::new("1234", "abc");
        assert!(four.validate(today()).is_valid());

        let bad = CvvEncryptRequest::new("", "");
        assert_eq!(
            bad.validate(today()).errors(),
            &[
                ValidationErrorCode::CvvInvalid,
                ValidationErrorCode::NonceInvalid
            ]
        );
    }
}
