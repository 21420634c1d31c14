#![forbid(unsafe_code)]

pub mod contract_ledger;
pub mod repo;

pub use contract_ledger::{ContractStore, StorageError};
pub use repo::ContractLedgerRepo;
