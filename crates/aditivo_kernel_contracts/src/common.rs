#![forbid(unsafe_code)]

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaVersion(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("{field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    #[error("{field}: required for {required_by}")]
    MissingField {
        field: &'static str,
        required_by: &'static str,
    },
}

pub trait Validate {
    fn validate(&self) -> Result<(), ContractViolation>;
}

/// What a piece of locale text was supposed to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    Date,
    Money,
    Months,
    Modality,
    AmendmentKind,
}

impl fmt::Display for TextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TextKind::Date => "date",
            TextKind::Money => "money",
            TextKind::Months => "month count",
            TextKind::Modality => "modality",
            TextKind::AmendmentKind => "amendment kind",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} text {input:?} is not valid, expected {expected}")]
pub struct FormatError {
    pub kind: TextKind,
    pub input: String,
    pub expected: &'static str,
}

impl FormatError {
    pub fn new(kind: TextKind, input: impl Into<String>, expected: &'static str) -> Self {
        Self {
            kind,
            input: input.into(),
            expected,
        }
    }
}

pub(crate) fn validate_text(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if value.trim().is_empty() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must not be empty",
        });
    }
    if value.len() > max_len {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "exceeds max length",
        });
    }
    Ok(())
}

pub(crate) fn validate_opt_text(
    field: &'static str,
    value: &Option<String>,
    max_len: usize,
) -> Result<(), ContractViolation> {
    if let Some(v) = value {
        validate_text(field, v, max_len)?;
    }
    Ok(())
}

pub(crate) fn validate_non_negative(
    field: &'static str,
    value: Decimal,
) -> Result<(), ContractViolation> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ContractViolation::InvalidValue {
            field,
            reason: "must be >= 0",
        });
    }
    Ok(())
}
