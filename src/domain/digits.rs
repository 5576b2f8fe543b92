//! Helpers for free-form numeric card input.

/// Strips every character that is not an ASCII digit.
pub fn remove_non_digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// True when the input is empty or contains only whitespace.
pub fn is_blank(input: &str) -> bool {
    input.trim().is_empty()
}

/// True when the input is non-empty and made of ASCII digits only.
pub fn is_digits_only(input: &str) -> bool {
    !input.is_empty() && input.chars().all(|c| c.is_ascii_digit())
}

/// Renders a PAN for diagnostics, keeping only the last four digits.
pub fn mask_pan(pan: &str) -> String {
    let digits: Vec<char> = pan.chars().collect();
    let visible = digits.len().min(4);
    let hidden = digits.len() - visible;
    let mut masked = "*".repeat(hidden);
    masked.extend(&digits[hidden..]);
    masked
}
