#![forbid(unsafe_code)]

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use aditivo_kernel_contracts::{FormatError, TextKind};

pub const BR_DATE_FORMAT: &str = "%d/%m/%Y";
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date-text collaborator: locale text to and from calendar dates.
pub trait DateText {
    fn parse_date(&self, text: &str) -> Result<NaiveDate, FormatError>;
    fn format_date(&self, date: NaiveDate) -> String;

    /// Blank text means "not provided".
    fn parse_optional_date(&self, text: &str) -> Result<Option<NaiveDate>, FormatError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.parse_date(text).map(Some)
    }
}

/// `dd/mm/yyyy`, as typed on the data-entry forms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrDateText;

impl DateText for BrDateText {
    fn parse_date(&self, text: &str) -> Result<NaiveDate, FormatError> {
        NaiveDate::parse_from_str(text.trim(), BR_DATE_FORMAT)
            .map_err(|_| FormatError::new(TextKind::Date, text, "dd/mm/yyyy"))
    }

    fn format_date(&self, date: NaiveDate) -> String {
        date.format(BR_DATE_FORMAT).to_string()
    }
}

/// `yyyy-mm-dd`, as stored by the persistence layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IsoDateText;

impl DateText for IsoDateText {
    fn parse_date(&self, text: &str) -> Result<NaiveDate, FormatError> {
        NaiveDate::parse_from_str(text.trim(), ISO_DATE_FORMAT)
            .map_err(|_| FormatError::new(TextKind::Date, text, "yyyy-mm-dd"))
    }

    fn format_date(&self, date: NaiveDate) -> String {
        date.format(ISO_DATE_FORMAT).to_string()
    }
}

const MONEY_EXPECTED: &str = "an amount such as R$ 1.234,56";

/// Parses Brazilian money text: `R$ 1.234,56`, `1234,56`, `-R$ 10,00`.
///
/// Without a comma, a single dot followed by one or two digits is read as the
/// decimal point (`1234.56`); any other dots are thousands separators.
pub fn parse_brl(text: &str) -> Result<Decimal, FormatError> {
    let err = || FormatError::new(TextKind::Money, text, MONEY_EXPECTED);

    let mut rest = text.trim();
    let mut negative = false;
    if let Some(r) = rest.strip_prefix('-') {
        negative = true;
        rest = r.trim_start();
    }
    if let Some(r) = rest.strip_prefix("R$") {
        rest = r.trim_start();
    }
    if !negative {
        if let Some(r) = rest.strip_prefix('-') {
            negative = true;
            rest = r;
        }
    }
    if rest.is_empty() {
        return Err(err());
    }

    let canonical = if rest.contains(',') {
        let mut parts = rest.split(',');
        let int_part = parts.next().unwrap_or_default();
        let frac_part = parts.next().unwrap_or_default();
        if parts.next().is_some() {
            return Err(err());
        }
        let int_digits = strip_thousands(int_part).ok_or_else(err)?;
        if frac_part.is_empty() || !frac_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        format!("{int_digits}.{frac_part}")
    } else {
        match rest.rsplit_once('.') {
            Some((int_part, frac_part))
                if (1..=2).contains(&frac_part.len()) && !int_part.contains('.') =>
            {
                if !is_digits(int_part) || !is_digits(frac_part) {
                    return Err(err());
                }
                format!("{int_part}.{frac_part}")
            }
            _ => strip_thousands(rest).ok_or_else(err)?,
        }
    };

    let value = Decimal::from_str(&canonical).map_err(|_| err())?;
    Ok(if negative { -value } else { value })
}

/// Blank text means "not provided".
pub fn parse_optional_brl(text: &str) -> Result<Option<Decimal>, FormatError> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    parse_brl(text).map(Some)
}

/// `R$ 1.234,56`; rounds half away from zero to cents.
pub fn format_brl(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {grouped},{frac_part}")
}

pub fn parse_months(text: &str) -> Result<u32, FormatError> {
    text.trim()
        .parse::<u32>()
        .map_err(|_| FormatError::new(TextKind::Months, text, "a whole number of months"))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// `1.234.567` -> `1234567`; groups after the first must be three digits.
fn strip_thousands(s: &str) -> Option<String> {
    let mut groups = s.split('.');
    let first = groups.next()?;
    if !is_digits(first) {
        return None;
    }
    let mut out = first.to_string();
    for g in groups {
        if g.len() != 3 || !is_digits(g) {
            return None;
        }
        out.push_str(g);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn at_text_01_br_dates_round_trip_and_reject_iso() {
        let codec = BrDateText;
        let d = codec.parse_date(" 05/03/2026 ").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2026, 3, 5).unwrap());
        assert_eq!(codec.format_date(d), "05/03/2026");
        assert!(codec.parse_date("2026-03-05").is_err());
        assert_eq!(codec.parse_optional_date("  ").unwrap(), None);
    }

    #[test]
    fn at_text_02_iso_dates() {
        let codec = IsoDateText;
        let d = codec.parse_date("2026-03-05").unwrap();
        assert_eq!(codec.format_date(d), "2026-03-05");
        let err = codec.parse_date("05/03/2026").unwrap_err();
        assert_eq!(err.expected, "yyyy-mm-dd");
    }

    #[test]
    fn at_text_03_brl_parse_accepts_form_spellings() {
        assert_eq!(parse_brl("R$ 1.234,56").unwrap(), dec("1234.56"));
        assert_eq!(parse_brl("1234,5").unwrap(), dec("1234.5"));
        assert_eq!(parse_brl("1234.56").unwrap(), dec("1234.56"));
        assert_eq!(parse_brl("1.234").unwrap(), dec("1234"));
        assert_eq!(parse_brl("R$ 1.000.000,00").unwrap(), dec("1000000.00"));
        assert_eq!(parse_brl("-R$ 10,00").unwrap(), dec("-10.00"));
        assert_eq!(parse_brl("R$ -10,00").unwrap(), dec("-10.00"));
        assert_eq!(parse_brl("200").unwrap(), dec("200"));
    }

    #[test]
    fn at_text_04_brl_parse_rejects_garbage() {
        for bad in ["", "R$", "abc", "1,2,3", "12.34.5", "1.23,", "R$ 1.2,00", "1x0"] {
            let err = parse_brl(bad).unwrap_err();
            assert_eq!(err.kind, TextKind::Money, "input {bad:?}");
        }
        assert_eq!(parse_optional_brl("   ").unwrap(), None);
    }

    #[test]
    fn at_text_05_brl_format() {
        assert_eq!(format_brl(dec("1234.56")), "R$ 1.234,56");
        assert_eq!(format_brl(dec("0")), "R$ 0,00");
        assert_eq!(format_brl(dec("999.999")), "R$ 1.000,00");
        assert_eq!(format_brl(dec("-15000")), "-R$ 15.000,00");
        assert_eq!(format_brl(dec("123456789.1")), "R$ 123.456.789,10");
    }

    #[test]
    fn at_text_06_months() {
        assert_eq!(parse_months(" 12 ").unwrap(), 12);
        assert!(parse_months("-1").is_err());
        assert!(parse_months("doze").is_err());
    }
}
