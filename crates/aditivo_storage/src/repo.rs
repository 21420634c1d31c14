#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use aditivo_kernel_contracts::amendment::{AmendmentId, AmendmentRecord, AmendmentRowInput};
use aditivo_kernel_contracts::contract::{
    ContractFieldPatch, ContractId, ContractRecord, ContractTerms,
};

use crate::contract_ledger::{ContractStore, StorageError};

/// Typed repository interface the runtimes persist contracts and amendments through.
///
/// Every mutating runtime call wraps its writes in [`ContractLedgerRepo::atomically`].
pub trait ContractLedgerRepo {
    fn atomically<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E>
    where
        Self: Sized;

    fn insert_contract_row(
        &mut self,
        terms: ContractTerms,
        total_value: Decimal,
    ) -> Result<ContractId, StorageError>;
    fn contract_row(&self, contract_id: ContractId) -> Option<&ContractRecord>;
    fn contract_rows(&self) -> &BTreeMap<ContractId, ContractRecord>;
    fn update_contract_fields(
        &mut self,
        contract_id: ContractId,
        patch: &ContractFieldPatch,
    ) -> Result<(), StorageError>;
    fn replace_contract_terms_row(
        &mut self,
        contract_id: ContractId,
        terms: ContractTerms,
        total_value: Decimal,
    ) -> Result<(), StorageError>;
    fn delete_contract_row(&mut self, contract_id: ContractId)
        -> Result<ContractRecord, StorageError>;

    fn insert_amendment_row(&mut self, input: AmendmentRowInput)
        -> Result<AmendmentId, StorageError>;
    fn amendment_row(&self, amendment_id: AmendmentId) -> Option<&AmendmentRecord>;
    fn delete_amendment_row(
        &mut self,
        amendment_id: AmendmentId,
    ) -> Result<AmendmentRecord, StorageError>;
    fn amendment_rows_for_contract(&self, contract_id: ContractId) -> Vec<&AmendmentRecord>;
    fn amendment_tail_row(&self, contract_id: ContractId) -> Option<&AmendmentRecord>;
}

impl ContractLedgerRepo for ContractStore {
    fn atomically<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E> {
        ContractStore::atomically(self, f)
    }

    fn insert_contract_row(
        &mut self,
        terms: ContractTerms,
        total_value: Decimal,
    ) -> Result<ContractId, StorageError> {
        self.insert_contract(terms, total_value)
    }

    fn contract_row(&self, contract_id: ContractId) -> Option<&ContractRecord> {
        self.get_contract(contract_id)
    }

    fn contract_rows(&self) -> &BTreeMap<ContractId, ContractRecord> {
        self.contracts()
    }

    fn update_contract_fields(
        &mut self,
        contract_id: ContractId,
        patch: &ContractFieldPatch,
    ) -> Result<(), StorageError> {
        ContractStore::update_contract_fields(self, contract_id, patch)
    }

    fn replace_contract_terms_row(
        &mut self,
        contract_id: ContractId,
        terms: ContractTerms,
        total_value: Decimal,
    ) -> Result<(), StorageError> {
        self.replace_contract_terms(contract_id, terms, total_value)
    }

    fn delete_contract_row(
        &mut self,
        contract_id: ContractId,
    ) -> Result<ContractRecord, StorageError> {
        self.delete_contract(contract_id)
    }

    fn insert_amendment_row(
        &mut self,
        input: AmendmentRowInput,
    ) -> Result<AmendmentId, StorageError> {
        self.insert_amendment(input)
    }

    fn amendment_row(&self, amendment_id: AmendmentId) -> Option<&AmendmentRecord> {
        self.get_amendment(amendment_id)
    }

    fn delete_amendment_row(
        &mut self,
        amendment_id: AmendmentId,
    ) -> Result<AmendmentRecord, StorageError> {
        self.delete_amendment(amendment_id)
    }

    fn amendment_rows_for_contract(&self, contract_id: ContractId) -> Vec<&AmendmentRecord> {
        self.list_amendments(contract_id)
    }

    fn amendment_tail_row(&self, contract_id: ContractId) -> Option<&AmendmentRecord> {
        self.amendment_tail(contract_id)
    }
}
