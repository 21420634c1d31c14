#![forbid(unsafe_code)]

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use aditivo_engines::money::{add_amounts, sub_amounts};
use aditivo_engines::{AmendmentValuation, AmendmentValuationEngine};
use aditivo_kernel_contracts::amendment::{
    AmendmentId, AmendmentParams, AmendmentRecord, AmendmentRowInput,
};
use aditivo_kernel_contracts::contract::{ContractFieldPatch, ContractId};
use aditivo_kernel_contracts::Validate;
use aditivo_storage::ContractLedgerRepo;

use crate::audit::{ActorContext, AuditAction, AuditEntry, AuditRuntime};
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::totals::TotalConsistencyRuntime;

/// Outcome of a committed append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendedAmendment {
    pub amendment_id: AmendmentId,
    pub valuation: AmendmentValuation,
    pub total_value: Decimal,
}

/// Ordered amendment history per contract, with last-only removal.
#[derive(Debug, Clone)]
pub struct AmendmentLedgerRuntime {
    valuation: AmendmentValuationEngine,
    totals: TotalConsistencyRuntime,
}

impl AmendmentLedgerRuntime {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            valuation: AmendmentValuationEngine::new(config.valuation),
            totals: TotalConsistencyRuntime::new(config)?,
        })
    }

    pub fn append_amendment<R: ContractLedgerRepo>(
        &self,
        repo: &mut R,
        actor: &ActorContext,
        contract_id: ContractId,
        params: AmendmentParams,
    ) -> Result<AmendmentId, EngineError> {
        self.append_amendment_detailed(repo, actor, contract_id, params)
            .map(|a| a.amendment_id)
    }

    /// Appends a new tail amendment: values it against the contract's effective
    /// terms, applies the declared field changes and adds its value to the total.
    pub fn append_amendment_detailed<R: ContractLedgerRepo>(
        &self,
        repo: &mut R,
        actor: &ActorContext,
        contract_id: ContractId,
        params: AmendmentParams,
    ) -> Result<AppendedAmendment, EngineError> {
        let appended = repo
            .atomically(|tx| {
                let contract = tx
                    .contract_row(contract_id)
                    .cloned()
                    .ok_or_else(|| EngineError::contract_not_found(contract_id))?;
                if !contract.modality().accepts_amendments() {
                    return Err(EngineError::IneligibleModality {
                        contract_id,
                        modality: contract.modality(),
                    });
                }
                params.validate()?;

                let valuation = self.valuation.value(&contract, &params)?;
                debug!(
                    contract_id = contract_id.0,
                    kind = valuation.kind.as_str(),
                    computed_value = %valuation.computed_value,
                    rate_delta = ?valuation.rate_delta,
                    remaining_months = ?valuation.remaining_months,
                    "amendment valued"
                );

                let total_value = add_amounts(
                    "contract.total_value",
                    contract.total_value,
                    valuation.computed_value,
                )?;
                let patch: ContractFieldPatch = valuation.patch.with_total(total_value);
                tx.update_contract_fields(contract_id, &patch)?;
                let amendment_id = tx.insert_amendment_row(AmendmentRowInput::v1(
                    contract_id,
                    params,
                    valuation.computed_value,
                    valuation.remaining_months,
                )?)?;
                self.totals.verify_if_enabled(&*tx, contract_id)?;

                Ok(AppendedAmendment {
                    amendment_id,
                    valuation,
                    total_value,
                })
            })
            .inspect_err(|e| {
                warn!(contract_id = contract_id.0, error = %e, "amendment append refused");
            })?;

        info!(
            contract_id = contract_id.0,
            amendment_id = appended.amendment_id.0,
            kind = appended.valuation.kind.as_str(),
            computed_value = %appended.valuation.computed_value,
            total_value = %appended.total_value,
            "amendment appended"
        );
        AuditRuntime::emit(
            actor,
            &AuditEntry::contract(AuditAction::AmendmentAppended, contract_id)
                .with_amendment(appended.amendment_id)
                .with_total(appended.total_value),
        );
        Ok(appended)
    }

    /// Removes the tail amendment and subtracts its stored value from the total.
    /// Field changes the amendment made to the contract stay in place.
    pub fn remove_amendment<R: ContractLedgerRepo>(
        &self,
        repo: &mut R,
        actor: &ActorContext,
        amendment_id: AmendmentId,
    ) -> Result<AmendmentRecord, EngineError> {
        let (removed, total_value) = repo
            .atomically(|tx| {
                let row = tx
                    .amendment_row(amendment_id)
                    .cloned()
                    .ok_or_else(|| EngineError::amendment_not_found(amendment_id))?;
                let tail = tx
                    .amendment_tail_row(row.contract_id)
                    .map(|t| t.amendment_id);
                if tail != Some(amendment_id) {
                    return Err(EngineError::OrderViolation { amendment_id, tail });
                }
                let stored_total = tx
                    .contract_row(row.contract_id)
                    .map(|c| c.total_value)
                    .ok_or_else(|| EngineError::contract_not_found(row.contract_id))?;

                let removed = tx.delete_amendment_row(amendment_id)?;
                let total_value =
                    sub_amounts("contract.total_value", stored_total, removed.computed_value)?;
                tx.update_contract_fields(
                    removed.contract_id,
                    &ContractFieldPatch::total_only(total_value),
                )?;
                self.totals.verify_if_enabled(&*tx, removed.contract_id)?;
                Ok((removed, total_value))
            })
            .inspect_err(|e| {
                warn!(amendment_id = amendment_id.0, error = %e, "amendment removal refused");
            })?;

        info!(
            contract_id = removed.contract_id.0,
            amendment_id = amendment_id.0,
            computed_value = %removed.computed_value,
            total_value = %total_value,
            "amendment removed"
        );
        AuditRuntime::emit(
            actor,
            &AuditEntry::contract(AuditAction::AmendmentRemoved, removed.contract_id)
                .with_amendment(amendment_id)
                .with_total(total_value),
        );
        Ok(removed)
    }

    /// Amendments of a contract in creation order.
    pub fn list_amendments<R: ContractLedgerRepo>(
        &self,
        repo: &R,
        contract_id: ContractId,
    ) -> Result<Vec<AmendmentRecord>, EngineError> {
        if repo.contract_row(contract_id).is_none() {
            return Err(EngineError::contract_not_found(contract_id));
        }
        Ok(repo
            .amendment_rows_for_contract(contract_id)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn ledger_tail<R: ContractLedgerRepo>(
        &self,
        repo: &R,
        contract_id: ContractId,
    ) -> Result<Option<AmendmentRecord>, EngineError> {
        if repo.contract_row(contract_id).is_none() {
            return Err(EngineError::contract_not_found(contract_id));
        }
        Ok(repo.amendment_tail_row(contract_id).cloned())
    }
}
