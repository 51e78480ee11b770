//! Fixed-point token amounts.
//!
//! Both treasury tokens are scaled by 10^4 on chain. User input arrives as a
//! decimal string and is converted to the on-chain integer here; balances and
//! event amounts travel the other way for display.
//!
//! Parsing builds the integer digit by digit in `U256`, so the only upper
//! bound is the width of `U256` itself. NEVER route an amount through f64.

use std::fmt;

use alloy::primitives::U256;
use thiserror::Error;

/// Fractional digits used by both ARSV and USDT on the treasury deployment.
pub const DEFAULT_DECIMALS: u8 = 4;

/// Largest scale accepted for conversions.
pub const MAX_DECIMALS: u8 = 18;

/// Errors produced while turning user text into a fixed-point amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("Amount is empty")]
    Empty,

    #[error("Not a number: {0}")]
    NotANumber(String),

    #[error("Amount must be positive: {0}")]
    NotPositive(String),

    #[error("Amount {input} has more than {decimals} fractional digits")]
    TooPrecise { input: String, decimals: u8 },

    #[error("Amount out of range: {0}")]
    Overflow(String),

    #[error("Unsupported scale: {0}")]
    UnsupportedScale(u8),
}

/// A token amount in its on-chain integer form together with its scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount {
    raw: U256,
    decimals: u8,
}

impl TokenAmount {
    /// Wrap a raw on-chain integer.
    pub fn from_raw(raw: U256, decimals: u8) -> Self {
        Self { raw, decimals }
    }

    /// Parse user input such as `"12.5"` into a strictly positive amount.
    pub fn parse(text: &str, decimals: u8) -> Result<Self, AmountError> {
        parse_units(text, decimals).map(|raw| Self { raw, decimals })
    }

    /// The on-chain integer.
    pub fn raw(&self) -> U256 {
        self.raw
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_units(self.raw, self.decimals))
    }
}

/// Returns `10^decimals` as a `U256`.
fn scale_factor(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// Decimal number split into its significant digits and a power of ten.
///
/// The value is `digits * 10^-frac_len`.
struct DecimalText<'a> {
    negative: bool,
    int_part: &'a str,
    frac_part: &'a str,
    exponent: i64,
}

impl<'a> DecimalText<'a> {
    /// Accepts `[+-]digits[.digits][(e|E)[+-]digits]` with at least one digit
    /// in the mantissa. Anything else, including `_` separators, is rejected.
    fn split(text: &'a str) -> Option<Self> {
        let (negative, unsigned) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        let (mantissa, exponent) = match unsigned.find(['e', 'E']) {
            Some(pos) => (&unsigned[..pos], parse_exponent(&unsigned[pos + 1..])?),
            None => (unsigned, 0),
        };

        let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !all_digits(int_part) || !all_digits(frac_part) {
            return None;
        }

        Some(Self {
            negative,
            int_part,
            frac_part,
            exponent,
        })
    }

    fn digits(&self) -> impl Iterator<Item = u8> + '_ {
        self.int_part
            .bytes()
            .chain(self.frac_part.bytes())
            .map(|b| b - b'0')
    }

    fn is_zero(&self) -> bool {
        self.digits().all(|d| d == 0)
    }
}

fn parse_exponent(text: &str) -> Option<i64> {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if unsigned.is_empty() || !unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // Exponents beyond this are out of range for any U256 amount anyway.
    let magnitude: i64 = unsigned.parse().ok().filter(|m: &i64| *m <= 1_000)?;
    Some(if text.starts_with('-') { -magnitude } else { magnitude })
}

/// Convert a positive decimal string to its fixed-point integer.
///
/// Accepts plain (`"12.34"`) and scientific (`"1.5e2"`) notation with
/// surrounding whitespace. Zero, negative values and anything with more
/// fractional digits than `decimals` are rejected. There is no upper bound
/// other than `U256` overflow.
pub fn parse_units(text: &str, decimals: u8) -> Result<U256, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::UnsupportedScale(decimals));
    }

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AmountError::Empty);
    }

    let number =
        DecimalText::split(trimmed).ok_or_else(|| AmountError::NotANumber(trimmed.to_string()))?;

    if number.negative || number.is_zero() {
        return Err(AmountError::NotPositive(trimmed.to_string()));
    }

    // Trailing zeros carry no precision.
    let mut digits: Vec<u8> = number.digits().collect();
    let mut frac_len = number.frac_part.len() as i64 - number.exponent;
    while frac_len > 0 && digits.last() == Some(&0) {
        digits.pop();
        frac_len -= 1;
    }

    if frac_len > i64::from(decimals) {
        return Err(AmountError::TooPrecise {
            input: trimmed.to_string(),
            decimals,
        });
    }

    let overflow = || AmountError::Overflow(trimmed.to_string());
    let ten = U256::from(10u64);

    let mut raw = U256::ZERO;
    for digit in digits {
        raw = raw
            .checked_mul(ten)
            .and_then(|v| v.checked_add(U256::from(digit)))
            .ok_or_else(overflow)?;
    }

    let padding = i64::from(decimals) - frac_len;
    for _ in 0..padding {
        raw = raw.checked_mul(ten).ok_or_else(overflow)?;
    }

    Ok(raw)
}

/// Render a fixed-point integer as a decimal string.
///
/// Trailing fractional zeros are dropped, so `1234500` at scale 4 renders as
/// `"123.45"` and `500000` as `"50"`.
pub fn format_units(raw: U256, decimals: u8) -> String {
    if decimals == 0 {
        return raw.to_string();
    }

    let divisor = scale_factor(decimals);
    let whole = raw / divisor;
    let frac = raw % divisor;

    let frac_digits = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    let frac_digits = frac_digits.trim_end_matches('0');

    if frac_digits.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac_digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_units_balance() {
        assert_eq!(format_units(U256::from(1_234_500u64), 4), "123.45");
    }

    #[test]
    fn test_format_units_whole_and_small() {
        assert_eq!(format_units(U256::from(500_000u64), 4), "50");
        assert_eq!(format_units(U256::from(1u64), 4), "0.0001");
        assert_eq!(format_units(U256::ZERO, 4), "0");
        assert_eq!(format_units(U256::from(42u64), 0), "42");
    }

    #[test]
    fn test_format_units_large_value() {
        // Far wider than 128 bits.
        let raw = U256::MAX;
        let rendered = format_units(raw, 4);
        assert!(rendered.starts_with("11579208923731619542357098500868790785326998466564056403945758400791312963"));
        assert!(rendered.contains('.'));
    }

    #[test]
    fn test_parse_units_basic() {
        assert_eq!(parse_units("123.45", 4).unwrap(), U256::from(1_234_500u64));
        assert_eq!(parse_units("50", 4).unwrap(), U256::from(500_000u64));
        assert_eq!(parse_units("0.0001", 4).unwrap(), U256::from(1u64));
        assert_eq!(parse_units("  7.5 ", 4).unwrap(), U256::from(75_000u64));
    }

    #[test]
    fn test_parse_units_scientific() {
        assert_eq!(parse_units("1.5e2", 4).unwrap(), U256::from(1_500_000u64));
        assert_eq!(parse_units("25E-4", 4).unwrap(), U256::from(25u64));
        assert_eq!(parse_units("1e29", 4).unwrap(), U256::from(10u64).pow(U256::from(33u64)));
        assert!(matches!(parse_units("1e-5", 4), Err(AmountError::TooPrecise { .. })));
    }

    #[test]
    fn test_parse_units_beyond_decimal_range() {
        // 2^96, one past the largest 96-bit mantissa.
        let raw = parse_units("79228162514264337593543950336", 4).unwrap();
        assert_eq!(raw, (U256::from(1u64) << 96) * U256::from(10_000u64));

        let raw = parse_units("100000000000000000000000000000", 4).unwrap();
        assert_eq!(raw, U256::from(10u64).pow(U256::from(33u64)));
    }

    #[test]
    fn test_parse_units_u256_overflow() {
        let max = U256::MAX.to_string();
        assert_eq!(parse_units(&max, 0).unwrap(), U256::MAX);
        assert!(matches!(parse_units(&max, 4), Err(AmountError::Overflow(_))));
        assert!(matches!(parse_units("1e80", 4), Err(AmountError::Overflow(_))));
    }

    #[test]
    fn test_parse_units_rejects_separators_and_junk() {
        for text in ["1_000", "1,000", "1 000", "0x10", ".", "e5", "1e", "1e+", "++1", "inf", "NaN"] {
            assert!(
                matches!(parse_units(text, 4), Err(AmountError::NotANumber(_))),
                "{:?} should not parse",
                text
            );
        }
    }

    #[test]
    fn test_parse_units_partial_forms() {
        assert_eq!(parse_units(".5", 4).unwrap(), U256::from(5_000u64));
        assert_eq!(parse_units("5.", 4).unwrap(), U256::from(50_000u64));
        assert_eq!(parse_units("+2", 4).unwrap(), U256::from(20_000u64));
        assert_eq!(parse_units("007", 4).unwrap(), U256::from(70_000u64));
    }

    #[test]
    fn test_parse_units_trailing_zeros_within_scale() {
        // "1.500000" normalizes to scale 1.
        assert_eq!(parse_units("1.500000", 4).unwrap(), U256::from(15_000u64));
    }

    #[test]
    fn test_parse_units_rejects_invalid() {
        assert_eq!(parse_units("", 4), Err(AmountError::Empty));
        assert_eq!(parse_units("   ", 4), Err(AmountError::Empty));
        assert!(matches!(parse_units("abc", 4), Err(AmountError::NotANumber(_))));
        assert!(matches!(parse_units("1.2.3", 4), Err(AmountError::NotANumber(_))));
        assert!(matches!(parse_units("0", 4), Err(AmountError::NotPositive(_))));
        assert!(matches!(parse_units("-5", 4), Err(AmountError::NotPositive(_))));
        assert!(matches!(parse_units("0.000", 4), Err(AmountError::NotPositive(_))));
    }

    #[test]
    fn test_parse_units_too_precise() {
        assert_eq!(
            parse_units("1.23456", 4),
            Err(AmountError::TooPrecise {
                input: "1.23456".to_string(),
                decimals: 4
            })
        );
    }

    #[test]
    fn test_parse_units_unsupported_scale() {
        assert_eq!(parse_units("1", 19), Err(AmountError::UnsupportedScale(19)));
    }

    #[test]
    fn test_display_of_parsed_amount() {
        for text in ["123.45", "50", "0.0001", "99999.9999"] {
            let amount = TokenAmount::parse(text, DEFAULT_DECIMALS).unwrap();
            assert_eq!(amount.to_string(), text);
        }
    }

    #[test]
    fn test_token_amount_accessors() {
        let amount = TokenAmount::from_raw(U256::from(250_000u64), 4);
        assert_eq!(amount.raw(), U256::from(250_000u64));
        assert_eq!(amount.decimals(), 4);
        assert_eq!(amount.to_string(), "25");
    }
}
