#![forbid(unsafe_code)]

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aditivo_kernel_contracts::amendment::{AmendmentKind, AmendmentParams};
use aditivo_kernel_contracts::contract::{ContractFieldPatch, ContractRecord, ContractTerms};
use aditivo_kernel_contracts::{ContractViolation, Validate};

use crate::date_span::{add_months, months_between};
use crate::money::{add_amounts, rate_times_months, sub_amounts, sum_amounts};

/// How a rate change without an effective-from date is prorated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndatedRateChangePolicy {
    /// VALUE prorates the rate delta over the contract's current duration;
    /// TIME_AND_VALUE charges the new rate on the added months only.
    #[default]
    Standard,
    /// Both kinds prorate the rate delta over the current duration, and
    /// TIME_AND_VALUE still charges the new rate on the added months.
    WholeTerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    pub undated_rate_change: UndatedRateChangePolicy,
}

impl ValuationConfig {
    pub fn mvp_v1() -> Self {
        Self {
            undated_rate_change: UndatedRateChangePolicy::Standard,
        }
    }
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self::mvp_v1()
    }
}

/// Result of valuing one amendment against a contract.
///
/// `patch` declares the field mutations the amendment implies; nothing here
/// has been applied to any stored contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmendmentValuation {
    pub kind: AmendmentKind,
    pub computed_value: Decimal,
    pub rate_delta: Option<Decimal>,
    pub remaining_months: Option<u32>,
    pub patch: ContractFieldPatch,
}

/// Value of the contracted terms alone, without any amendment.
pub fn base_value(contract: &ContractRecord) -> Result<Decimal, ContractViolation> {
    terms_base_value(&contract.terms)
}

pub fn terms_base_value(terms: &ContractTerms) -> Result<Decimal, ContractViolation> {
    const FIELD: &str = "contract_terms.remuneration";
    sum_amounts(
        FIELD,
        [
            rate_times_months(FIELD, terms.remuneration, terms.months)?,
            terms.counted_interstitial_value(),
            terms.complementary_value,
        ],
    )
}

/// Values an amendment with the default configuration.
pub fn compute_amendment_value(
    contract: &ContractRecord,
    params: &AmendmentParams,
) -> Result<AmendmentValuation, ContractViolation> {
    AmendmentValuationEngine::new(ValuationConfig::mvp_v1()).value(contract, params)
}

#[derive(Debug, Clone)]
pub struct AmendmentValuationEngine {
    config: ValuationConfig,
}

impl AmendmentValuationEngine {
    pub fn new(config: ValuationConfig) -> Self {
        Self { config }
    }

    /// Pure function of the contract's effective terms and the amendment
    /// parameters. The value may be negative (rate decrease) and is never clamped.
    pub fn value(
        &self,
        contract: &ContractRecord,
        params: &AmendmentParams,
    ) -> Result<AmendmentValuation, ContractViolation> {
        params.validate()?;
        match params.kind {
            AmendmentKind::Time => self.value_time(contract, params),
            AmendmentKind::Value => self.value_rate(contract, params),
            AmendmentKind::TimeAndValue => self.value_time_and_rate(contract, params),
        }
    }

    fn value_time(
        &self,
        contract: &ContractRecord,
        params: &AmendmentParams,
    ) -> Result<AmendmentValuation, ContractViolation> {
        let added = required_months(params)?;
        let current = &contract.effective;
        let computed_value = add_amounts(
            "amendment_params.complementary_value",
            rate_times_months("amendment_params.additional_months", current.remuneration, added)?,
            params.complementary_value,
        )?;
        Ok(AmendmentValuation {
            kind: params.kind,
            computed_value,
            rate_delta: None,
            remaining_months: None,
            patch: term_patch(contract, params, added)?,
        })
    }

    fn value_rate(
        &self,
        contract: &ContractRecord,
        params: &AmendmentParams,
    ) -> Result<AmendmentValuation, ContractViolation> {
        let new_rate = required_rate(params)?;
        let current = &contract.effective;
        let delta = sub_amounts(
            "amendment_params.new_remuneration",
            new_rate,
            current.remuneration,
        )?;
        let remaining = match params.effective_from {
            Some(from) => months_between(from, current.vigency_end),
            None => current.months,
        };
        let computed_value = add_amounts(
            "amendment_params.complementary_value",
            rate_times_months("amendment_params.new_remuneration", delta, remaining)?,
            params.complementary_value,
        )?;
        Ok(AmendmentValuation {
            kind: params.kind,
            computed_value,
            rate_delta: Some(delta),
            remaining_months: Some(remaining),
            patch: ContractFieldPatch {
                remuneration: Some(new_rate),
                ..ContractFieldPatch::default()
            },
        })
    }

    fn value_time_and_rate(
        &self,
        contract: &ContractRecord,
        params: &AmendmentParams,
    ) -> Result<AmendmentValuation, ContractViolation> {
        let added = required_months(params)?;
        let new_rate = required_rate(params)?;
        let current = &contract.effective;
        let delta = sub_amounts(
            "amendment_params.new_remuneration",
            new_rate,
            current.remuneration,
        )?;

        // Months still running at the old end date, repriced at the new rate.
        let remaining = match (params.effective_from, self.config.undated_rate_change) {
            (Some(from), _) => Some(months_between(from, current.vigency_end)),
            (None, UndatedRateChangePolicy::Standard) => None,
            (None, UndatedRateChangePolicy::WholeTerm) => Some(current.months),
        };
        let repriced = match remaining {
            Some(m) => rate_times_months("amendment_params.new_remuneration", delta, m)?,
            None => Decimal::ZERO,
        };

        let computed_value = sum_amounts(
            "amendment_params.new_remuneration",
            [
                repriced,
                rate_times_months("amendment_params.new_remuneration", new_rate, added)?,
                params.complementary_value,
            ],
        )?;
        let mut patch = term_patch(contract, params, added)?;
        patch.remuneration = Some(new_rate);
        Ok(AmendmentValuation {
            kind: params.kind,
            computed_value,
            rate_delta: Some(delta),
            remaining_months: remaining,
            patch,
        })
    }
}

fn required_months(params: &AmendmentParams) -> Result<u32, ContractViolation> {
    params
        .additional_months
        .ok_or(ContractViolation::MissingField {
            field: "amendment_params.additional_months",
            required_by: params.kind.as_str(),
        })
}

fn required_rate(params: &AmendmentParams) -> Result<Decimal, ContractViolation> {
    params
        .new_remuneration
        .ok_or(ContractViolation::MissingField {
            field: "amendment_params.new_remuneration",
            required_by: params.kind.as_str(),
        })
}

/// Extension of the validity period. Without an explicit new end date the
/// current end is pushed forward by the added months. An explicit end may not
/// fall before the current effective end.
fn term_patch(
    contract: &ContractRecord,
    params: &AmendmentParams,
    added: u32,
) -> Result<ContractFieldPatch, ContractViolation> {
    let current = &contract.effective;
    let months = current
        .months
        .checked_add(added)
        .ok_or(ContractViolation::InvalidValue {
            field: "amendment_params.additional_months",
            reason: "duration overflows",
        })?;
    let vigency_end = match params.new_vigency_end {
        Some(d) => d,
        None => add_months(current.vigency_end, added).ok_or(
            ContractViolation::InvalidValue {
                field: "amendment_params.new_vigency_end",
                reason: "outside the calendar range",
            },
        )?,
    };
    if vigency_end < current.vigency_end {
        return Err(ContractViolation::InvalidValue {
            field: "amendment_params.new_vigency_end",
            reason: "must be >= current vigency_end",
        });
    }
    Ok(ContractFieldPatch {
        months: Some(months),
        vigency_end: Some(vigency_end),
        ..ContractFieldPatch::default()
    })
}
