#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::{validate_non_negative, validate_opt_text};
use crate::contract::ContractId;
use crate::{ContractViolation, FormatError, SchemaVersion, TextKind, Validate};

pub const AMENDMENT_RECORD_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AmendmentId(pub u64);

impl fmt::Display for AmendmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Validate for AmendmentId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "amendment_id",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AmendmentKind {
    /// Extends the validity period ("prorrogacao").
    Time,
    /// Changes the monthly rate ("reajuste").
    Value,
    /// Both at once ("ambos").
    TimeAndValue,
}

impl AmendmentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AmendmentKind::Time => "TIME",
            AmendmentKind::Value => "VALUE",
            AmendmentKind::TimeAndValue => "TIME_AND_VALUE",
        }
    }

    pub fn legacy_name(self) -> &'static str {
        match self {
            AmendmentKind::Time => "prorrogacao",
            AmendmentKind::Value => "reajuste",
            AmendmentKind::TimeAndValue => "ambos",
        }
    }

    pub fn changes_term(self) -> bool {
        matches!(self, AmendmentKind::Time | AmendmentKind::TimeAndValue)
    }

    pub fn changes_rate(self) -> bool {
        matches!(self, AmendmentKind::Value | AmendmentKind::TimeAndValue)
    }

    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let normalized = text.trim().to_lowercase().replace('_', " ");
        match normalized.as_str() {
            "time" | "tempo" | "prorrogacao" | "prorrogação" => Ok(AmendmentKind::Time),
            "value" | "valor" | "reajuste" => Ok(AmendmentKind::Value),
            "time and value" | "tempo e valor" | "ambos" => Ok(AmendmentKind::TimeAndValue),
            _ => Err(FormatError::new(
                TextKind::AmendmentKind,
                text,
                "one of TIME, VALUE, TIME_AND_VALUE",
            )),
        }
    }
}

impl fmt::Display for AmendmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AmendmentKind {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AmendmentKind::parse(s)
    }
}

/// Paperwork attached to an amendment. Not used in any computation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendmentMetadata {
    pub oficio: Option<String>,
    pub entry_date: Option<NaiveDate>,
    pub protocol_date: Option<NaiveDate>,
    pub responsible: Option<String>,
}

impl Validate for AmendmentMetadata {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_opt_text("amendment_metadata.oficio", &self.oficio, 64)?;
        validate_opt_text("amendment_metadata.responsible", &self.responsible, 128)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendmentParams {
    pub kind: AmendmentKind,
    pub new_vigency_end: Option<NaiveDate>,
    pub additional_months: Option<u32>,
    pub new_remuneration: Option<Decimal>,
    pub effective_from: Option<NaiveDate>,
    pub complementary_value: Decimal,
    pub metadata: AmendmentMetadata,
}

impl AmendmentParams {
    fn blank(kind: AmendmentKind) -> Self {
        Self {
            kind,
            new_vigency_end: None,
            additional_months: None,
            new_remuneration: None,
            effective_from: None,
            complementary_value: Decimal::ZERO,
            metadata: AmendmentMetadata::default(),
        }
    }

    pub fn time(additional_months: u32, new_vigency_end: Option<NaiveDate>) -> Self {
        Self {
            additional_months: Some(additional_months),
            new_vigency_end,
            ..Self::blank(AmendmentKind::Time)
        }
    }

    pub fn value(new_remuneration: Decimal, effective_from: Option<NaiveDate>) -> Self {
        Self {
            new_remuneration: Some(new_remuneration),
            effective_from,
            ..Self::blank(AmendmentKind::Value)
        }
    }

    pub fn time_and_value(
        additional_months: u32,
        new_vigency_end: Option<NaiveDate>,
        new_remuneration: Decimal,
        effective_from: Option<NaiveDate>,
    ) -> Self {
        Self {
            additional_months: Some(additional_months),
            new_vigency_end,
            new_remuneration: Some(new_remuneration),
            effective_from,
            ..Self::blank(AmendmentKind::TimeAndValue)
        }
    }

    /// Unchecked field-by-field form, for callers decoding loosely typed input.
    /// Run `validate()` (or hand it to the ledger) before trusting it.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        kind: AmendmentKind,
        new_vigency_end: Option<NaiveDate>,
        additional_months: Option<u32>,
        new_remuneration: Option<Decimal>,
        effective_from: Option<NaiveDate>,
        complementary_value: Decimal,
        metadata: AmendmentMetadata,
    ) -> Self {
        Self {
            kind,
            new_vigency_end,
            additional_months,
            new_remuneration,
            effective_from,
            complementary_value,
            metadata,
        }
    }

    pub fn with_complementary_value(mut self, complementary_value: Decimal) -> Self {
        self.complementary_value = complementary_value;
        self
    }

    pub fn with_metadata(mut self, metadata: AmendmentMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl Validate for AmendmentParams {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.kind.changes_term() {
            match self.additional_months {
                None => {
                    return Err(ContractViolation::MissingField {
                        field: "amendment_params.additional_months",
                        required_by: self.kind.as_str(),
                    })
                }
                Some(0) => {
                    return Err(ContractViolation::InvalidValue {
                        field: "amendment_params.additional_months",
                        reason: "must be > 0",
                    })
                }
                Some(_) => {}
            }
        }
        if self.kind.changes_rate() {
            match self.new_remuneration {
                None => {
                    return Err(ContractViolation::MissingField {
                        field: "amendment_params.new_remuneration",
                        required_by: self.kind.as_str(),
                    })
                }
                Some(r) => validate_non_negative("amendment_params.new_remuneration", r)?,
            }
        }
        validate_non_negative(
            "amendment_params.complementary_value",
            self.complementary_value,
        )?;
        self.metadata.validate()
    }
}

/// What the ledger hands to `insert_amendment`: validated parameters plus the
/// value computed against the contract at append time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmendmentRowInput {
    pub schema_version: SchemaVersion,
    pub contract_id: ContractId,
    pub params: AmendmentParams,
    pub computed_value: Decimal,
    pub remaining_months: Option<u32>,
}

impl AmendmentRowInput {
    pub fn v1(
        contract_id: ContractId,
        params: AmendmentParams,
        computed_value: Decimal,
        remaining_months: Option<u32>,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: AMENDMENT_RECORD_VERSION,
            contract_id,
            params,
            computed_value,
            remaining_months,
        };
        r.validate()?;
        Ok(r)
    }
}

impl Validate for AmendmentRowInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != AMENDMENT_RECORD_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "amendment_row_input.schema_version",
                reason: "must match AMENDMENT_RECORD_VERSION",
            });
        }
        self.contract_id.validate()?;
        self.params.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendmentRecord {
    pub schema_version: SchemaVersion,
    pub amendment_id: AmendmentId,
    pub contract_id: ContractId,
    /// Ordering key within a contract's ledger.
    pub creation_seq: u64,
    pub params: AmendmentParams,
    pub computed_value: Decimal,
    pub remaining_months: Option<u32>,
}

impl AmendmentRecord {
    pub fn from_input_v1(
        amendment_id: AmendmentId,
        creation_seq: u64,
        input: AmendmentRowInput,
    ) -> Result<Self, ContractViolation> {
        input.validate()?;
        let row = Self {
            schema_version: AMENDMENT_RECORD_VERSION,
            amendment_id,
            contract_id: input.contract_id,
            creation_seq,
            params: input.params,
            computed_value: input.computed_value,
            remaining_months: input.remaining_months,
        };
        row.validate()?;
        Ok(row)
    }

    pub fn kind(&self) -> AmendmentKind {
        self.params.kind
    }
}

impl Validate for AmendmentRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != AMENDMENT_RECORD_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "amendment_record.schema_version",
                reason: "must match AMENDMENT_RECORD_VERSION",
            });
        }
        self.amendment_id.validate()?;
        self.contract_id.validate()?;
        if self.creation_seq == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "amendment_record.creation_seq",
                reason: "must be > 0",
            });
        }
        self.params.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_amendment_01_kind_accepts_legacy_and_display_names() {
        assert_eq!(AmendmentKind::parse("prorrogacao").unwrap(), AmendmentKind::Time);
        assert_eq!(AmendmentKind::parse("TEMPO").unwrap(), AmendmentKind::Time);
        assert_eq!(AmendmentKind::parse("reajuste").unwrap(), AmendmentKind::Value);
        assert_eq!(AmendmentKind::parse("Valor").unwrap(), AmendmentKind::Value);
        assert_eq!(
            AmendmentKind::parse("ambos").unwrap(),
            AmendmentKind::TimeAndValue
        );
        assert_eq!(
            AmendmentKind::parse("TEMPO E VALOR").unwrap(),
            AmendmentKind::TimeAndValue
        );
        assert_eq!(
            "TIME_AND_VALUE".parse::<AmendmentKind>().unwrap(),
            AmendmentKind::TimeAndValue
        );
        assert!(AmendmentKind::parse("rescisao").is_err());
        assert_eq!(AmendmentKind::Value.legacy_name(), "reajuste");
    }

    #[test]
    fn at_amendment_02_value_requires_new_remuneration() {
        let mut p = AmendmentParams::value(Decimal::from(1200), None);
        p.new_remuneration = None;
        assert_eq!(
            p.validate(),
            Err(ContractViolation::MissingField {
                field: "amendment_params.new_remuneration",
                required_by: "VALUE",
            })
        );
    }

    #[test]
    fn at_amendment_03_term_kinds_require_positive_additional_months() {
        let p = AmendmentParams::from_parts(
            AmendmentKind::TimeAndValue,
            None,
            None,
            Some(Decimal::from(1100)),
            None,
            Decimal::ZERO,
            AmendmentMetadata::default(),
        );
        assert!(matches!(
            p.validate(),
            Err(ContractViolation::MissingField {
                field: "amendment_params.additional_months",
                ..
            })
        ));
        assert!(AmendmentParams::time(0, None).validate().is_err());
        assert!(AmendmentParams::time(3, None).validate().is_ok());
    }

    #[test]
    fn at_amendment_04_record_requires_sequence() {
        let input = AmendmentRowInput::v1(
            ContractId(1),
            AmendmentParams::time(3, None),
            Decimal::from(3000),
            None,
        )
        .unwrap();
        assert!(AmendmentRecord::from_input_v1(AmendmentId(1), 0, input.clone()).is_err());
        let row = AmendmentRecord::from_input_v1(AmendmentId(1), 1, input).unwrap();
        assert_eq!(row.kind(), AmendmentKind::Time);
        assert_eq!(row.computed_value, Decimal::from(3000));
    }
}
