#![forbid(unsafe_code)]

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use aditivo_engines::terms_base_value;
use aditivo_kernel_contracts::amendment::AmendmentRecord;
use aditivo_kernel_contracts::contract::{ContractId, ContractRecord, ContractTerms};
use aditivo_kernel_contracts::{ContractViolation, Validate};
use aditivo_storage::ContractLedgerRepo;

use crate::audit::{ActorContext, AuditAction, AuditEntry, AuditRuntime};
use crate::config::EngineConfig;
use crate::errors::EngineError;
use crate::totals::{TotalCheck, TotalConsistencyRuntime};

/// Contract with its ordered ledger and reconciliation figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractStatement {
    pub contract: ContractRecord,
    pub amendments: Vec<AmendmentRecord>,
    pub check: TotalCheck,
}

#[derive(Debug, Clone)]
pub struct ContractRegistryRuntime {
    totals: TotalConsistencyRuntime,
}

impl ContractRegistryRuntime {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            totals: TotalConsistencyRuntime::new(config)?,
        })
    }

    /// Stores a new contract whose total is the base value of its terms.
    pub fn register_contract<R: ContractLedgerRepo>(
        &self,
        repo: &mut R,
        actor: &ActorContext,
        terms: ContractTerms,
    ) -> Result<ContractId, EngineError> {
        terms.validate()?;
        let number = terms.contract_number.clone();
        let (contract_id, total_value) = repo
            .atomically(|tx| {
                let total_value = terms_base_value(&terms)?;
                let contract_id = tx.insert_contract_row(terms, total_value)?;
                Ok::<_, EngineError>((contract_id, total_value))
            })
            .inspect_err(|e| warn!(contract_number = %number, error = %e, "contract registration refused"))?;

        info!(
            contract_id = contract_id.0,
            contract_number = %number,
            total_value = %total_value,
            "contract registered"
        );
        AuditRuntime::emit(
            actor,
            &AuditEntry::contract(AuditAction::ContractRegistered, contract_id)
                .with_total(total_value),
        );
        Ok(contract_id)
    }

    /// Replaces the contracted terms. Only allowed while the ledger is empty,
    /// since amendments were valued against the terms in force at the time.
    pub fn revise_contract_terms<R: ContractLedgerRepo>(
        &self,
        repo: &mut R,
        actor: &ActorContext,
        contract_id: ContractId,
        terms: ContractTerms,
    ) -> Result<Decimal, EngineError> {
        terms.validate()?;
        let total_value = repo.atomically(|tx| {
            if tx.contract_row(contract_id).is_none() {
                return Err(EngineError::contract_not_found(contract_id));
            }
            if !tx.amendment_rows_for_contract(contract_id).is_empty() {
                return Err(EngineError::Validation(ContractViolation::InvalidValue {
                    field: "contract_terms",
                    reason: "cannot be revised once amendments exist",
                }));
            }
            let total_value = terms_base_value(&terms)?;
            tx.replace_contract_terms_row(contract_id, terms, total_value)?;
            self.totals.verify_if_enabled(&*tx, contract_id)?;
            Ok(total_value)
        })
        .inspect_err(|e| warn!(contract_id = contract_id.0, error = %e, "contract revision refused"))?;

        info!(
            contract_id = contract_id.0,
            total_value = %total_value,
            "contract terms revised"
        );
        AuditRuntime::emit(
            actor,
            &AuditEntry::contract(AuditAction::ContractRevised, contract_id)
                .with_total(total_value),
        );
        Ok(total_value)
    }

    pub fn delete_contract<R: ContractLedgerRepo>(
        &self,
        repo: &mut R,
        actor: &ActorContext,
        contract_id: ContractId,
    ) -> Result<ContractRecord, EngineError> {
        let removed = repo
            .atomically(|tx| {
                if tx.contract_row(contract_id).is_none() {
                    return Err(EngineError::contract_not_found(contract_id));
                }
                if !tx.amendment_rows_for_contract(contract_id).is_empty() {
                    return Err(EngineError::Validation(ContractViolation::InvalidValue {
                        field: "contract_id",
                        reason: "contract has linked amendments",
                    }));
                }
                Ok(tx.delete_contract_row(contract_id)?)
            })
            .inspect_err(|e| warn!(contract_id = contract_id.0, error = %e, "contract deletion refused"))?;

        info!(contract_id = contract_id.0, "contract deleted");
        AuditRuntime::emit(
            actor,
            &AuditEntry::contract(AuditAction::ContractDeleted, contract_id),
        );
        Ok(removed)
    }

    pub fn contract_statement<R: ContractLedgerRepo>(
        &self,
        repo: &R,
        contract_id: ContractId,
    ) -> Result<ContractStatement, EngineError> {
        let contract = repo
            .contract_row(contract_id)
            .cloned()
            .ok_or_else(|| EngineError::contract_not_found(contract_id))?;
        let amendments = repo
            .amendment_rows_for_contract(contract_id)
            .into_iter()
            .cloned()
            .collect();
        let check = self.totals.check_contract_total(repo, contract_id)?;
        Ok(ContractStatement {
            contract,
            amendments,
            check,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AmendmentLedgerRuntime;
    use aditivo_kernel_contracts::amendment::AmendmentParams;
    use aditivo_kernel_contracts::contract::Modality;
    use aditivo_storage::ContractStore;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn terms(number: &str, remuneration: i64, interstitial: bool) -> ContractTerms {
        ContractTerms::v1(
            number,
            Modality::Bolsa,
            Decimal::from(remuneration),
            10,
            date(2026, 3, 1),
            date(2026, 12, 31),
            interstitial,
            Decimal::from(300),
            Decimal::from(25),
            Some("bolsa de pesquisa".to_string()),
        )
        .unwrap()
    }

    fn runtime() -> ContractRegistryRuntime {
        ContractRegistryRuntime::new(EngineConfig::mvp_v1()).unwrap()
    }

    #[test]
    fn at_registry_01_register_sets_total_to_base_value() {
        let mut s = ContractStore::new_in_memory();
        let id = runtime()
            .register_contract(&mut s, &ActorContext::system(), terms("CT-1", 800, true))
            .unwrap();
        // 800 * 10 + 300 + 25
        assert_eq!(s.get_contract(id).unwrap().total_value, Decimal::from(8325));
    }

    #[test]
    fn at_registry_02_duplicate_number_is_refused_without_writes() {
        let mut s = ContractStore::new_in_memory();
        let rt = runtime();
        let actor = ActorContext::system();
        rt.register_contract(&mut s, &actor, terms("CT-1", 800, false))
            .unwrap();
        let before = s.clone();
        let err = rt
            .register_contract(&mut s, &actor, terms("CT-1", 900, false))
            .unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(s, before);
    }

    #[test]
    fn at_registry_03_revise_only_while_ledger_is_empty() {
        let mut s = ContractStore::new_in_memory();
        let rt = runtime();
        let actor = ActorContext::system();
        let id = rt
            .register_contract(&mut s, &actor, terms("CT-1", 800, false))
            .unwrap();
        let total = rt
            .revise_contract_terms(&mut s, &actor, id, terms("CT-1", 1000, false))
            .unwrap();
        assert_eq!(total, Decimal::from(10025));
        assert_eq!(s.get_contract(id).unwrap().effective.remuneration, Decimal::from(1000));

        let ledger = AmendmentLedgerRuntime::new(EngineConfig::mvp_v1()).unwrap();
        ledger
            .append_amendment(&mut s, &actor, id, AmendmentParams::time(2, None))
            .unwrap();
        let before = s.clone();
        let err = rt
            .revise_contract_terms(&mut s, &actor, id, terms("CT-1", 1200, false))
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(s, before);
    }

    #[test]
    fn at_registry_04_delete_refused_while_amendments_exist() {
        let mut s = ContractStore::new_in_memory();
        let rt = runtime();
        let ledger = AmendmentLedgerRuntime::new(EngineConfig::mvp_v1()).unwrap();
        let actor = ActorContext::system();
        let id = rt
            .register_contract(&mut s, &actor, terms("CT-1", 800, false))
            .unwrap();
        let a = ledger
            .append_amendment(&mut s, &actor, id, AmendmentParams::time(1, None))
            .unwrap();

        let err = rt.delete_contract(&mut s, &actor, id).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert!(s.get_contract(id).is_some());

        ledger.remove_amendment(&mut s, &actor, a).unwrap();
        rt.delete_contract(&mut s, &actor, id).unwrap();
        assert_eq!(
            rt.delete_contract(&mut s, &actor, id).unwrap_err().kind(),
            "NotFoundError"
        );
    }

    #[test]
    fn at_registry_05_statement_lists_ledger_and_reconciles() {
        let mut s = ContractStore::new_in_memory();
        let rt = runtime();
        let ledger = AmendmentLedgerRuntime::new(EngineConfig::mvp_v1()).unwrap();
        let actor = ActorContext::system();
        let id = rt
            .register_contract(&mut s, &actor, terms("CT-1", 800, false))
            .unwrap();
        ledger
            .append_amendment(&mut s, &actor, id, AmendmentParams::time(1, None))
            .unwrap();
        ledger
            .append_amendment(
                &mut s,
                &actor,
                id,
                AmendmentParams::value(Decimal::from(1000), Some(date(2026, 10, 31))),
            )
            .unwrap();

        let st = rt.contract_statement(&s, id).unwrap();
        assert_eq!(st.amendments.len(), 2);
        assert!(st.amendments[0].creation_seq < st.amendments[1].creation_seq);
        // base 8025, +800 (one month), +200 * 3 (Oct 31 to Jan 31)
        assert_eq!(st.check.derived.total_value, Decimal::from(9425));
        assert_eq!(st.check.drift, Decimal::ZERO);
        assert_eq!(st.contract.total_value, Decimal::from(9425));
    }

    #[test]
    fn at_registry_06_overflowing_terms_are_refused_without_writes() {
        let mut s = ContractStore::new_in_memory();
        let rt = runtime();
        let actor = ActorContext::system();
        let mut huge = terms("CT-1", 0, false);
        huge.remuneration = Decimal::MAX;
        assert!(huge.validate().is_ok());

        let err = rt.register_contract(&mut s, &actor, huge.clone()).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(s, ContractStore::new_in_memory());

        let id = rt
            .register_contract(&mut s, &actor, terms("CT-1", 800, false))
            .unwrap();
        let before = s.clone();
        let err = rt.revise_contract_terms(&mut s, &actor, id, huge).unwrap_err();
        assert_eq!(err.kind(), "ValidationError");
        assert_eq!(s, before);
    }
}
