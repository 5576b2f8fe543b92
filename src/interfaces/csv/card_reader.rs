use crate::domain::request::CardDetails;
use crate::error::{CseError, Result};
use std::io::Read;

/// Reads card records from a CSV source.
///
/// Expected headers: `pan, card_holder_name, expiry_year, expiry_month, cvv, nonce`.
/// Whitespace around fields is trimmed and short records are tolerated so
/// that a bad row surfaces as an error for that row only.
pub struct CardReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CardReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes records, one `Result` per data row.
    pub fn cards(self) -> impl Iterator<Item = Result<CardDetails>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(CseError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "pan, card_holder_name, expiry_year, expiry_month, cvv, nonce";

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "{HEADER}\n4111 1111 1111 1111, Jane Doe, 2030, 1, 123, n1\n378282246310005, John Roe, 31, 12, 1234, n2"
        );
        let reader = CardReader::new(data.as_bytes());
        let results: Vec<Result<CardDetails>> = reader.cards().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.pan, "4111 1111 1111 1111");
        assert_eq!(first.card_holder_name, "Jane Doe");
        assert_eq!(first.expiry_month, 1);
        let second = results[1].as_ref().unwrap();
        assert_eq!(second.expiry_year, 31);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = format!("{HEADER}\n4111111111111111, Jane, soon, 1, 123, n1\n4111111111111111, Jane");
        let reader = CardReader::new(data.as_bytes());
        let results: Vec<Result<CardDetails>> = reader.cards().collect();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert!(results[1].is_err());
    }
}
