#![forbid(unsafe_code)]

pub mod amendment;
pub mod common;
pub mod contract;

pub use common::{ContractViolation, FormatError, SchemaVersion, TextKind, Validate};
