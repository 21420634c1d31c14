#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use aditivo_kernel_contracts::amendment::{AmendmentId, AmendmentRecord, AmendmentRowInput};
use aditivo_kernel_contracts::contract::{
    ContractFieldPatch, ContractId, ContractRecord, ContractTerms,
};
use aditivo_kernel_contracts::{ContractViolation, Validate};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("{table}: no row for key {key}")]
    NotFound { table: &'static str, key: String },
    #[error("{table}: key {key} already exists")]
    DuplicateKey { table: &'static str, key: String },
    #[error("{table}: key {key} is still referenced or does not resolve")]
    ForeignKeyViolation { table: &'static str, key: String },
    #[error("{table} is append-only")]
    AppendOnlyViolation { table: &'static str },
    #[error(transparent)]
    ContractViolation(#[from] ContractViolation),
}

/// In-memory contract and amendment tables.
///
/// Cloning the store is how a unit of work snapshots state; see
/// [`ContractStore::atomically`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractStore {
    contracts: BTreeMap<ContractId, ContractRecord>,
    contract_number_index: BTreeMap<String, ContractId>,
    amendments: BTreeMap<AmendmentId, AmendmentRecord>,
    // Creation order per contract; the last entry is the ledger tail.
    amendments_by_contract: BTreeMap<ContractId, Vec<AmendmentId>>,
    next_contract_id: u64,
    next_amendment_id: u64,
    next_creation_seq: u64,
}

impl Default for ContractStore {
    fn default() -> Self {
        Self::new_in_memory()
    }
}

impl ContractStore {
    pub fn new_in_memory() -> Self {
        Self {
            contracts: BTreeMap::new(),
            contract_number_index: BTreeMap::new(),
            amendments: BTreeMap::new(),
            amendments_by_contract: BTreeMap::new(),
            next_contract_id: 1,
            next_amendment_id: 1,
            next_creation_seq: 1,
        }
    }

    /// Runs `f` as one unit of work: any `Err` restores the state from before the call.
    ///
    /// The snapshot is a full clone of the store, so every unit of work costs
    /// time proportional to all rows. Fine for the in-memory store only; a
    /// durable backend should use its own transactions.
    pub fn atomically<T, E>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<T, E> {
        let snapshot = self.clone();
        let out = f(self);
        if out.is_err() {
            *self = snapshot;
        }
        out
    }

    pub fn insert_contract(
        &mut self,
        terms: ContractTerms,
        total_value: Decimal,
    ) -> Result<ContractId, StorageError> {
        terms.validate()?;
        if self.contract_number_index.contains_key(&terms.contract_number) {
            return Err(StorageError::DuplicateKey {
                table: "contracts.contract_number",
                key: terms.contract_number,
            });
        }

        let contract_id = ContractId(self.next_contract_id);
        let record = ContractRecord::from_terms_v1(contract_id, terms, total_value)?;
        self.next_contract_id = self.next_contract_id.saturating_add(1);

        self.contract_number_index
            .insert(record.terms.contract_number.clone(), contract_id);
        self.contracts.insert(contract_id, record);
        Ok(contract_id)
    }

    pub fn get_contract(&self, contract_id: ContractId) -> Option<&ContractRecord> {
        self.contracts.get(&contract_id)
    }

    pub fn contract_by_number(&self, contract_number: &str) -> Option<&ContractRecord> {
        self.contract_number_index
            .get(contract_number.trim())
            .and_then(|id| self.contracts.get(id))
    }

    pub fn contracts(&self) -> &BTreeMap<ContractId, ContractRecord> {
        &self.contracts
    }

    /// Writes the effective fields and/or the stored total. Contracted terms are untouched.
    pub fn update_contract_fields(
        &mut self,
        contract_id: ContractId,
        patch: &ContractFieldPatch,
    ) -> Result<(), StorageError> {
        patch.validate()?;
        let record = self
            .contracts
            .get_mut(&contract_id)
            .ok_or_else(|| contract_not_found(contract_id))?;
        if let Some(end) = patch.vigency_end {
            if end < record.terms.vigency_start {
                return Err(StorageError::ContractViolation(
                    ContractViolation::InvalidValue {
                        field: "contract_field_patch.vigency_end",
                        reason: "must be >= contract vigency_start",
                    },
                ));
            }
        }
        record.apply_patch(patch);
        Ok(())
    }

    /// Replaces the contracted terms; effective terms restart from them.
    pub fn replace_contract_terms(
        &mut self,
        contract_id: ContractId,
        terms: ContractTerms,
        total_value: Decimal,
    ) -> Result<(), StorageError> {
        terms.validate()?;
        let current_number = self
            .contracts
            .get(&contract_id)
            .map(|r| r.terms.contract_number.clone())
            .ok_or_else(|| contract_not_found(contract_id))?;
        if let Some(owner) = self.contract_number_index.get(&terms.contract_number) {
            if *owner != contract_id {
                return Err(StorageError::DuplicateKey {
                    table: "contracts.contract_number",
                    key: terms.contract_number,
                });
            }
        }

        let record = ContractRecord::from_terms_v1(contract_id, terms, total_value)?;
        self.contract_number_index.remove(&current_number);
        self.contract_number_index
            .insert(record.terms.contract_number.clone(), contract_id);
        self.contracts.insert(contract_id, record);
        Ok(())
    }

    pub fn delete_contract(&mut self, contract_id: ContractId) -> Result<ContractRecord, StorageError> {
        if !self.contracts.contains_key(&contract_id) {
            return Err(contract_not_found(contract_id));
        }
        if self
            .amendments_by_contract
            .get(&contract_id)
            .is_some_and(|ids| !ids.is_empty())
        {
            return Err(StorageError::ForeignKeyViolation {
                table: "amendments.contract_id",
                key: contract_id.to_string(),
            });
        }
        self.amendments_by_contract.remove(&contract_id);
        let record = self
            .contracts
            .remove(&contract_id)
            .ok_or_else(|| contract_not_found(contract_id))?;
        self.contract_number_index
            .remove(&record.terms.contract_number);
        Ok(record)
    }

    pub fn insert_amendment(
        &mut self,
        input: AmendmentRowInput,
    ) -> Result<AmendmentId, StorageError> {
        input.validate()?;
        if !self.contracts.contains_key(&input.contract_id) {
            return Err(StorageError::ForeignKeyViolation {
                table: "amendments.contract_id",
                key: input.contract_id.to_string(),
            });
        }

        let amendment_id = AmendmentId(self.next_amendment_id);
        let seq = self.next_creation_seq;
        let row = AmendmentRecord::from_input_v1(amendment_id, seq, input)?;
        self.next_amendment_id = self.next_amendment_id.saturating_add(1);
        self.next_creation_seq = self.next_creation_seq.saturating_add(1);

        self.amendments_by_contract
            .entry(row.contract_id)
            .or_default()
            .push(amendment_id);
        self.amendments.insert(amendment_id, row);
        Ok(amendment_id)
    }

    pub fn get_amendment(&self, amendment_id: AmendmentId) -> Option<&AmendmentRecord> {
        self.amendments.get(&amendment_id)
    }

    /// Removes a row regardless of its position; tail ordering is the ledger's rule.
    pub fn delete_amendment(
        &mut self,
        amendment_id: AmendmentId,
    ) -> Result<AmendmentRecord, StorageError> {
        let row = self
            .amendments
            .remove(&amendment_id)
            .ok_or_else(|| StorageError::NotFound {
                table: "amendments",
                key: amendment_id.to_string(),
            })?;
        if let Some(ids) = self.amendments_by_contract.get_mut(&row.contract_id) {
            ids.retain(|id| *id != amendment_id);
        }
        Ok(row)
    }

    /// Amendments of one contract in creation order.
    pub fn list_amendments(&self, contract_id: ContractId) -> Vec<&AmendmentRecord> {
        self.amendments_by_contract
            .get(&contract_id)
            .map(|ids| ids.iter().filter_map(|id| self.amendments.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn amendment_tail(&self, contract_id: ContractId) -> Option<&AmendmentRecord> {
        self.amendments_by_contract
            .get(&contract_id)
            .and_then(|ids| ids.last())
            .and_then(|id| self.amendments.get(id))
    }

    pub fn amendment_count(&self, contract_id: ContractId) -> usize {
        self.amendments_by_contract
            .get(&contract_id)
            .map_or(0, Vec::len)
    }

    /// Computed values are fixed at creation; rows are never rewritten in place.
    pub fn attempt_overwrite_amendment(
        &mut self,
        _amendment_id: AmendmentId,
    ) -> Result<(), StorageError> {
        Err(StorageError::AppendOnlyViolation {
            table: "amendments",
        })
    }
}

fn contract_not_found(contract_id: ContractId) -> StorageError {
    StorageError::NotFound {
        table: "contracts",
        key: contract_id.to_string(),
    }
}
