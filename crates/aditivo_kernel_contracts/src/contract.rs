#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::{validate_non_negative, validate_opt_text, validate_text};
use crate::{ContractViolation, FormatError, SchemaVersion, TextKind, Validate};

pub const CONTRACT_RECORD_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContractId(pub u64);

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Validate for ContractId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "contract_id",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

/// Contracting arrangement of an individual contractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Bolsa,
    Produto,
    Rpa,
    Clt,
}

impl Modality {
    pub fn as_str(self) -> &'static str {
        match self {
            Modality::Bolsa => "BOLSA",
            Modality::Produto => "PRODUTO",
            Modality::Rpa => "RPA",
            Modality::Clt => "CLT",
        }
    }

    /// CLT employment is managed outside this ledger: no amendments, no deliverables.
    pub fn accepts_amendments(self) -> bool {
        !matches!(self, Modality::Clt)
    }

    pub fn accepts_products(self) -> bool {
        !matches!(self, Modality::Clt)
    }

    /// Accepts the canonical names plus the spellings found in imported spreadsheets.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let normalized = text.trim().to_uppercase();
        match normalized.as_str() {
            "BOLSA" | "BOLSAS" | "BOLSISTA" | "BOLSISTAS" => Ok(Modality::Bolsa),
            "PRODUTO" | "PRODUTOS" | "PRODUÇÃO" | "PRODUCAO" => Ok(Modality::Produto),
            "RPA" | "RPAS" | "R.P.A" | "R.P.A." => Ok(Modality::Rpa),
            "CLT" | "CELETISTA" | "EMPREGADO" | "FUNCIONARIO" | "FUNCIONÁRIO" => {
                Ok(Modality::Clt)
            }
            _ => Err(FormatError::new(
                TextKind::Modality,
                text,
                "one of BOLSA, PRODUTO, RPA, CLT",
            )),
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Modality::parse(s)
    }
}

/// Terms as registered for a contract. Amendments never touch these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractTerms {
    pub contract_number: String,
    pub modality: Modality,
    pub remuneration: Decimal,
    pub months: u32,
    pub vigency_start: NaiveDate,
    pub vigency_end: NaiveDate,
    pub interstitial: bool,
    pub interstitial_value: Decimal,
    pub complementary_value: Decimal,
    pub observations: Option<String>,
}

impl ContractTerms {
    #[allow(clippy::too_many_arguments)]
    pub fn v1(
        contract_number: impl Into<String>,
        modality: Modality,
        remuneration: Decimal,
        months: u32,
        vigency_start: NaiveDate,
        vigency_end: NaiveDate,
        interstitial: bool,
        interstitial_value: Decimal,
        complementary_value: Decimal,
        observations: Option<String>,
    ) -> Result<Self, ContractViolation> {
        let t = Self {
            contract_number: contract_number.into().trim().to_string(),
            modality,
            remuneration,
            months,
            vigency_start,
            vigency_end,
            interstitial,
            interstitial_value,
            complementary_value,
            observations: observations.filter(|o| !o.trim().is_empty()),
        };
        t.validate()?;
        Ok(t)
    }

    /// Interstitial allowance counted towards the base value.
    pub fn counted_interstitial_value(&self) -> Decimal {
        if self.interstitial {
            self.interstitial_value
        } else {
            Decimal::ZERO
        }
    }
}

impl Validate for ContractTerms {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("contract_terms.contract_number", &self.contract_number, 64)?;
        validate_non_negative("contract_terms.remuneration", self.remuneration)?;
        if self.months == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "contract_terms.months",
                reason: "must be > 0",
            });
        }
        if self.vigency_end < self.vigency_start {
            return Err(ContractViolation::InvalidValue {
                field: "contract_terms.vigency_end",
                reason: "must be >= vigency_start",
            });
        }
        validate_non_negative("contract_terms.interstitial_value", self.interstitial_value)?;
        validate_non_negative(
            "contract_terms.complementary_value",
            self.complementary_value,
        )?;
        validate_opt_text("contract_terms.observations", &self.observations, 4000)?;
        Ok(())
    }
}

/// The fields amendments rewrite: rate, duration and end of validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveTerms {
    pub remuneration: Decimal,
    pub months: u32,
    pub vigency_end: NaiveDate,
}

impl EffectiveTerms {
    pub fn from_terms(terms: &ContractTerms) -> Self {
        Self {
            remuneration: terms.remuneration,
            months: terms.months,
            vigency_end: terms.vigency_end,
        }
    }
}

/// Field map for `update_contract_fields`. `None` leaves the column untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractFieldPatch {
    pub remuneration: Option<Decimal>,
    pub months: Option<u32>,
    pub vigency_end: Option<NaiveDate>,
    pub total_value: Option<Decimal>,
}

impl ContractFieldPatch {
    pub fn total_only(total_value: Decimal) -> Self {
        Self {
            total_value: Some(total_value),
            ..Self::default()
        }
    }

    pub fn with_total(mut self, total_value: Decimal) -> Self {
        self.total_value = Some(total_value);
        self
    }
}

impl Validate for ContractFieldPatch {
    fn validate(&self) -> Result<(), ContractViolation> {
        if let Some(r) = self.remuneration {
            validate_non_negative("contract_field_patch.remuneration", r)?;
        }
        if self.months == Some(0) {
            return Err(ContractViolation::InvalidValue {
                field: "contract_field_patch.months",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub schema_version: SchemaVersion,
    pub contract_id: ContractId,
    pub terms: ContractTerms,
    pub effective: EffectiveTerms,
    pub total_value: Decimal,
}

impl ContractRecord {
    pub fn from_terms_v1(
        contract_id: ContractId,
        terms: ContractTerms,
        total_value: Decimal,
    ) -> Result<Self, ContractViolation> {
        let r = Self {
            schema_version: CONTRACT_RECORD_VERSION,
            contract_id,
            effective: EffectiveTerms::from_terms(&terms),
            terms,
            total_value,
        };
        r.validate()?;
        Ok(r)
    }

    pub fn modality(&self) -> Modality {
        self.terms.modality
    }

    pub fn apply_patch(&mut self, patch: &ContractFieldPatch) {
        if let Some(r) = patch.remuneration {
            self.effective.remuneration = r;
        }
        if let Some(m) = patch.months {
            self.effective.months = m;
        }
        if let Some(d) = patch.vigency_end {
            self.effective.vigency_end = d;
        }
        if let Some(t) = patch.total_value {
            self.total_value = t;
        }
    }
}

impl Validate for ContractRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != CONTRACT_RECORD_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "contract_record.schema_version",
                reason: "must match CONTRACT_RECORD_VERSION",
            });
        }
        self.contract_id.validate()?;
        self.terms.validate()?;
        validate_non_negative(
            "contract_record.effective.remuneration",
            self.effective.remuneration,
        )?;
        if self.effective.months == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "contract_record.effective.months",
                reason: "must be > 0",
            });
        }
        Ok(())
    }
}
