#![forbid(unsafe_code)]

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use aditivo_engines::base_value;
use aditivo_engines::money::{add_amounts, sub_amounts, sum_amounts};
use aditivo_kernel_contracts::contract::{ContractFieldPatch, ContractId};
use aditivo_kernel_contracts::Validate;
use aditivo_storage::ContractLedgerRepo;

use crate::audit::{ActorContext, AuditAction, AuditEntry, AuditRuntime};
use crate::config::EngineConfig;
use crate::errors::EngineError;

/// Total re-derived from the contracted terms and the full ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedTotal {
    pub base_value: Decimal,
    pub amendments_value: Decimal,
    pub amendment_count: usize,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TotalCheck {
    pub stored: Decimal,
    pub derived: DerivedTotal,
    /// `stored - derived.total_value`.
    pub drift: Decimal,
}

pub fn derive_total<R: ContractLedgerRepo>(
    repo: &R,
    contract_id: ContractId,
) -> Result<DerivedTotal, EngineError> {
    let contract = repo
        .contract_row(contract_id)
        .ok_or_else(|| EngineError::contract_not_found(contract_id))?;
    let rows = repo.amendment_rows_for_contract(contract_id);
    let amendments_value = sum_amounts(
        "amendment_record.computed_value",
        rows.iter().map(|a| a.computed_value),
    )?;
    let base = base_value(contract)?;
    Ok(DerivedTotal {
        base_value: base,
        amendments_value,
        amendment_count: rows.len(),
        total_value: add_amounts("contract.total_value", base, amendments_value)?,
    })
}

#[derive(Debug, Clone)]
pub struct TotalConsistencyRuntime {
    config: EngineConfig,
}

impl TotalConsistencyRuntime {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Writes the re-derived total back. Idempotent.
    pub fn recompute_contract_total<R: ContractLedgerRepo>(
        &self,
        repo: &mut R,
        actor: &ActorContext,
        contract_id: ContractId,
    ) -> Result<Decimal, EngineError> {
        let (previous, derived) = repo.atomically(|tx| {
            let previous = tx
                .contract_row(contract_id)
                .map(|c| c.total_value)
                .ok_or_else(|| EngineError::contract_not_found(contract_id))?;
            let derived = derive_total(&*tx, contract_id)?;
            tx.update_contract_fields(
                contract_id,
                &ContractFieldPatch::total_only(derived.total_value),
            )?;
            Ok::<_, EngineError>((previous, derived))
        })?;

        if previous != derived.total_value {
            warn!(
                contract_id = contract_id.0,
                previous = %previous,
                derived = %derived.total_value,
                "stored total differed from derived total; overwritten"
            );
        }
        info!(
            contract_id = contract_id.0,
            total_value = %derived.total_value,
            amendments = derived.amendment_count,
            "contract total recomputed"
        );
        AuditRuntime::emit(
            actor,
            &AuditEntry::contract(AuditAction::TotalRecomputed, contract_id)
                .with_total(derived.total_value),
        );
        Ok(derived.total_value)
    }

    /// Read-only reconciliation; fails when the stored total drifts past the epsilon.
    pub fn verify_contract_total<R: ContractLedgerRepo>(
        &self,
        repo: &R,
        contract_id: ContractId,
    ) -> Result<TotalCheck, EngineError> {
        let check = self.check_contract_total(repo, contract_id)?;
        if check.drift.abs() > self.config.consistency_epsilon {
            warn!(
                contract_id = contract_id.0,
                stored = %check.stored,
                derived = %check.derived.total_value,
                "contract total drift"
            );
            return Err(EngineError::Consistency {
                contract_id,
                stored: check.stored,
                derived: check.derived.total_value,
            });
        }
        Ok(check)
    }

    /// Like `verify_contract_total` but reports drift instead of failing.
    pub fn check_contract_total<R: ContractLedgerRepo>(
        &self,
        repo: &R,
        contract_id: ContractId,
    ) -> Result<TotalCheck, EngineError> {
        let stored = repo
            .contract_row(contract_id)
            .map(|c| c.total_value)
            .ok_or_else(|| EngineError::contract_not_found(contract_id))?;
        let derived = derive_total(repo, contract_id)?;
        Ok(TotalCheck {
            stored,
            derived,
            drift: sub_amounts("contract.total_value", stored, derived.total_value)?,
        })
    }

    /// Post-mutation hook run inside a unit of work.
    pub(crate) fn verify_if_enabled<R: ContractLedgerRepo>(
        &self,
        repo: &R,
        contract_id: ContractId,
    ) -> Result<(), EngineError> {
        if self.config.verify_after_mutation {
            self.verify_contract_total(repo, contract_id)?;
        }
        Ok(())
    }
}
