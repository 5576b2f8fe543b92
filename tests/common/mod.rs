use std::fs::File;
use std::io::Error;
use std::path::Path;

pub const HEADER: [&str; 6] = [
    "pan",
    "card_holder_name",
    "expiry_year",
    "expiry_month",
    "cvv",
    "nonce",
];

/// Computes the digit that makes `payload` + digit pass the Luhn check.
pub fn luhn_check_digit(payload: &str) -> char {
    let sum: u32 = payload
        .chars()
        .rev()
        .map(|c| c.to_digit(10).unwrap())
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    char::from_digit((10 - sum % 10) % 10, 10).unwrap()
}

/// Writes `rows` valid Visa records to a CSV file.
pub fn generate_cards_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(HEADER)?;

    for i in 0..rows {
        let payload = format!("411111{:09}", i);
        let pan = format!("{}{}", payload, luhn_check_digit(&payload));
        wtr.write_record([
            pan.as_str(),
            "Batch Holder",
            "2099",
            "6",
            "123",
            &format!("n{}", i),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
