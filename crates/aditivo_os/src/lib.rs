#![forbid(unsafe_code)]

pub mod audit;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod registry;
pub mod totals;

pub use audit::{ActorContext, AuditRuntime};
pub use config::{ConfigError, EngineConfig};
pub use errors::EngineError;
pub use ledger::{AmendmentLedgerRuntime, AppendedAmendment};
pub use registry::{ContractRegistryRuntime, ContractStatement};
pub use totals::{derive_total, DerivedTotal, TotalCheck, TotalConsistencyRuntime};
