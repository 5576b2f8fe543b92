use super::digits;
use serde::Serialize;
use std::fmt;

/// Card networks recognised by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CardBrand {
    Visa,
    Mastercard,
    AmericanExpress,
    DinersClub,
    Discover,
    Jcb,
    Troy,
    Dinacard,
    UnionPay,
    Maestro,
    Unknown,
}

const LENGTH_COMMON: &[usize] = &[16];
const LENGTH_AMERICAN_EXPRESS: &[usize] = &[15];
const LENGTH_DINERS_CLUB: &[usize] = &[14];
const LENGTH_VISA: &[usize] = &[16, 19];
const LENGTH_MAESTRO: &[usize] = &[12, 13, 14, 15, 16, 17, 18, 19];

impl CardBrand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::AmericanExpress => "american-express",
            Self::DinersClub => "diners-club",
            Self::Discover => "discover",
            Self::Jcb => "jcb",
            Self::Troy => "troy",
            Self::Dinacard => "dinacard",
            Self::UnionPay => "union-pay",
            Self::Maestro => "maestro",
            Self::Unknown => "unknown",
        }
    }

    /// PAN lengths accepted for this brand. Empty for [`CardBrand::Unknown`].
    pub fn valid_lengths(&self) -> &'static [usize] {
        match self {
            Self::AmericanExpress => LENGTH_AMERICAN_EXPRESS,
            Self::DinersClub => LENGTH_DINERS_CLUB,
            Self::Visa => LENGTH_VISA,
            Self::Maestro => LENGTH_MAESTRO,
            Self::Unknown => &[],
            Self::Mastercard
            | Self::Discover
            | Self::Jcb
            | Self::Troy
            | Self::Dinacard
            | Self::UnionPay => LENGTH_COMMON,
        }
    }

    /// CVV lengths accepted for a card of this brand.
    pub fn cvv_lengths(&self) -> &'static [usize] {
        match self {
            Self::Unknown => &[3, 4],
            Self::AmericanExpress => &[4],
            _ => &[3],
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single structural test over the leading digits of a PAN.
#[derive(Debug, Clone, Copy)]
enum Pattern {
    /// The BIN window starts with the given digits.
    Prefix(&'static str),
    /// The first `width` digits, read as a number, fall in `low..=high`.
    /// Inputs shorter than `width` never match.
    Range { width: usize, low: u32, high: u32 },
}

impl Pattern {
    fn matches(&self, bin: &str) -> bool {
        match *self {
            Pattern::Prefix(prefix) => bin.starts_with(prefix),
            Pattern::Range { width, low, high } => bin
                .get(..width)
                .and_then(|lead| lead.parse::<u32>().ok())
                .is_some_and(|value| (low..=high).contains(&value)),
        }
    }
}

const fn range(width: usize, low: u32, high: u32) -> Pattern {
    Pattern::Range { width, low, high }
}

struct BrandRule {
    brand: CardBrand,
    patterns: &'static [Pattern],
}

/// Number of leading digits inspected by the rules.
pub const BIN_WINDOW: usize = 6;

/// Ordered rule table; the first matching rule wins.
///
/// Maestro sits right after Visa so its prefixes take precedence over every
/// later range.
static RULES: &[BrandRule] = &[
    BrandRule {
        brand: CardBrand::Visa,
        patterns: &[Pattern::Prefix("4")],
    },
    BrandRule {
        brand: CardBrand::Maestro,
        patterns: &[
            Pattern::Prefix("56"),
            Pattern::Prefix("58"),
            Pattern::Prefix("67"),
            Pattern::Prefix("502"),
            Pattern::Prefix("503"),
            Pattern::Prefix("506"),
            Pattern::Prefix("639"),
            Pattern::Prefix("5018"),
            Pattern::Prefix("6020"),
        ],
    },
    BrandRule {
        brand: CardBrand::Mastercard,
        patterns: &[range(2, 51, 55), range(4, 2221, 2720)],
    },
    BrandRule {
        brand: CardBrand::AmericanExpress,
        patterns: &[Pattern::Prefix("34"), Pattern::Prefix("37")],
    },
    BrandRule {
        brand: CardBrand::DinersClub,
        patterns: &[
            range(3, 300, 305),
            Pattern::Prefix("309"),
            Pattern::Prefix("36"),
            Pattern::Prefix("38"),
            Pattern::Prefix("39"),
        ],
    },
    BrandRule {
        brand: CardBrand::Discover,
        patterns: &[
            Pattern::Prefix("6011"),
            Pattern::Prefix("65"),
            range(6, 622126, 622925),
            range(3, 644, 649),
        ],
    },
    BrandRule {
        brand: CardBrand::Jcb,
        patterns: &[range(4, 3528, 3589)],
    },
    BrandRule {
        brand: CardBrand::Troy,
        patterns: &[range(5, 97920, 97929)],
    },
    BrandRule {
        brand: CardBrand::Dinacard,
        patterns: &[
            range(6, 989100, 989104),
            range(6, 989106, 989107),
            range(6, 989109, 989109),
            range(6, 989111, 989115),
            range(6, 989117, 989119),
            range(6, 989121, 989125),
            range(6, 989127, 989127),
            range(6, 989129, 989131),
            range(6, 989135, 989136),
            range(6, 989140, 989144),
            range(6, 989146, 989146),
            range(6, 989149, 989153),
            range(6, 989155, 989161),
            range(6, 989164, 989170),
            range(6, 989173, 989178),
            range(6, 989180, 989180),
            range(6, 989186, 989189),
        ],
    },
];

/// Classifies a digit-only PAN (or PAN prefix) into a [`CardBrand`].
///
/// Classification is structural only; no Luhn check is performed.
pub fn detect(pan_digits: &str) -> CardBrand {
    if digits::is_blank(pan_digits) {
        return CardBrand::Unknown;
    }
    let bin = pan_digits.get(..BIN_WINDOW).unwrap_or(pan_digits);

    RULES
        .iter()
        .find(|rule| rule.patterns.iter().any(|p| p.matches(bin)))
        .map_or(CardBrand::Unknown, |rule| rule.brand)
}

/// Normalizes free-form input before classifying it.
pub fn detect_brand(pan: &str) -> CardBrand {
    detect(&digits::remove_non_digits(pan))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input_is_unknown() {
        assert_eq!(detect(""), CardBrand::Unknown);
        assert_eq!(detect_brand(" - "), CardBrand::Unknown);
    }

    #[test]
    fn test_reference_bins() {
        let cases = [
            ("4111111111111111", CardBrand::Visa),
            ("5555555555554444", CardBrand::Mastercard),
            ("5105105105105100", CardBrand::Mastercard),
            ("2221000000000009", CardBrand::Mastercard),
            ("2720990000000007", CardBrand::Mastercard),
            ("341111111111111", CardBrand::AmericanExpress),
            ("378282246310005", CardBrand::AmericanExpress),
            ("30569309025904", CardBrand::DinersClub),
            ("38520000023237", CardBrand::DinersClub),
            ("6011111111111117", CardBrand::Discover),
            ("6500000000000002", CardBrand::Discover),
            ("6221260000000000", CardBrand::Discover),
            ("6229250000000000", CardBrand::Discover),
            ("6445644564456445", CardBrand::Discover),
            ("3530111333300000", CardBrand::Jcb),
            ("3528000000000007", CardBrand::Jcb),
            ("9792030000000000", CardBrand::Troy),
            ("9891000000000000", CardBrand::Dinacard),
            ("9891890000000000", CardBrand::Dinacard),
            ("6759649826438453", CardBrand::Maestro),
            ("5018000000000009", CardBrand::Maestro),
            ("6390000000000000", CardBrand::Maestro),
        ];
        for (pan, expected) in cases {
            assert_eq!(detect(pan), expected, "pan {pan}");
        }
    }

    #[test]
    fn test_range_edges() {
        assert_eq!(detect("2220990000000000"), CardBrand::Unknown);
        assert_eq!(detect("2721000000000000"), CardBrand::Unknown);
        assert_eq!(detect("3527000000000000"), CardBrand::Unknown);
        assert_eq!(detect("3590000000000000"), CardBrand::Unknown);
        assert_eq!(detect("6221250000000000"), CardBrand::Unknown);
        assert_eq!(detect("6229260000000000"), CardBrand::Unknown);
        assert_eq!(detect("3060000000000000"), CardBrand::Unknown);
        assert_eq!(detect("6430000000000000"), CardBrand::Unknown);
    }

    #[test]
    fn test_dinacard_gaps_are_unknown() {
        assert_eq!(detect("9891050000000000"), CardBrand::Unknown);
        assert_eq!(detect("9891080000000000"), CardBrand::Unknown);
        assert_eq!(detect("9891810000000000"), CardBrand::Unknown);
        assert_eq!(detect("9891900000000000"), CardBrand::Unknown);
    }

    #[test]
    fn test_window_too_short_for_range_rule() {
        // Troy needs a fifth digit, Dinacard a sixth.
        assert_eq!(detect("9792"), CardBrand::Unknown);
        assert_eq!(detect("97920"), CardBrand::Troy);
        assert_eq!(detect("98910"), CardBrand::Unknown);
        assert_eq!(detect("4"), CardBrand::Visa);
    }

    #[test]
    fn test_maestro_overrides_later_rules() {
        assert_eq!(detect("5600000000000000"), CardBrand::Maestro);
        assert_eq!(detect("5800000000000000"), CardBrand::Maestro);
        assert_eq!(detect("6020000000000000"), CardBrand::Maestro);
    }

    #[test]
    fn test_union_pay_is_never_detected() {
        assert_eq!(detect("6200000000000000"), CardBrand::Unknown);
        assert_eq!(CardBrand::UnionPay.valid_lengths(), &[16]);
    }

    #[test]
    fn test_brand_names() {
        assert_eq!(CardBrand::AmericanExpress.to_string(), "american-express");
        assert_eq!(
            serde_json::to_string(&CardBrand::DinersClub).unwrap(),
            "\"diners-club\""
        );
        assert_eq!(
            serde_json::to_string(&CardBrand::UnionPay).unwrap(),
            "\"union-pay\""
        );
    }

    #[test]
    fn test_detect_brand_normalizes() {
        assert_eq!(detect_brand("4111 1111 1111 1111"), CardBrand::Visa);
        assert_eq!(detect_brand("3411-111111-11111"), CardBrand::AmericanExpress);
    }
}
