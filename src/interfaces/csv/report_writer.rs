use crate::domain::brand::CardBrand;
use crate::domain::validation::ValidationReport;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// One line of a batch validation report.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ReportRow {
    pub row: usize,
    pub brand: CardBrand,
    pub valid: bool,
    /// Error codes joined with `|`, empty when valid.
    pub errors: String,
}

impl ReportRow {
    pub fn new(row: usize, brand: CardBrand, report: &ValidationReport) -> Self {
        let errors = report
            .errors()
            .iter()
            .map(|code| code.as_str())
            .collect::<Vec<_>>()
            .join("|");
        Self {
            row,
            brand,
            valid: report.is_valid(),
            errors,
        }
    }
}

/// Writes report rows as CSV with a `row,brand,valid,errors` header.
pub struct ReportWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_row(&mut self, row: &ReportRow) -> Result<()> {
        self.writer.serialize(row)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validation::ValidationErrorCode;

    #[test]
    fn test_writes_header_and_rows() {
        let mut invalid = ValidationReport::new();
        invalid.check(false, ValidationErrorCode::PanInvalid);
        invalid.check(false, ValidationErrorCode::CvvInvalid);

        let mut buffer = Vec::new();
        {
            let mut writer = ReportWriter::new(&mut buffer);
            writer
                .write_row(&ReportRow::new(1, CardBrand::Visa, &ValidationReport::new()))
                .unwrap();
            writer
                .write_row(&ReportRow::new(2, CardBrand::AmericanExpress, &invalid))
                .unwrap();
            writer.finish().unwrap();
        }

        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(
            output,
            "row,brand,valid,errors\n1,visa,true,\n2,american-express,false,PAN_INVALID|CVV_INVALID\n"
        );
    }
}
