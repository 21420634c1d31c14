#![forbid(unsafe_code)]

use rust_decimal::Decimal;

use aditivo_kernel_contracts::amendment::AmendmentId;
use aditivo_kernel_contracts::contract::{ContractId, Modality};
use aditivo_kernel_contracts::{ContractViolation, FormatError};
use aditivo_storage::StorageError;

/// Error taxonomy of the public runtime operations.
///
/// Every variant is raised before the unit of work commits, so the store is
/// left exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(#[from] ContractViolation),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("contract {contract_id} has modality {modality}, which does not accept amendments")]
    IneligibleModality {
        contract_id: ContractId,
        modality: Modality,
    },
    #[error("amendment {amendment_id} is not the last amendment of its contract (last is {tail:?})")]
    OrderViolation {
        amendment_id: AmendmentId,
        tail: Option<AmendmentId>,
    },
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },
    #[error("contract {contract_id} stores total {stored} but its terms and ledger derive {derived}")]
    Consistency {
        contract_id: ContractId,
        stored: Decimal,
        derived: Decimal,
    },
    #[error("storage: {0}")]
    Storage(StorageError),
}

impl EngineError {
    pub fn contract_not_found(contract_id: ContractId) -> Self {
        EngineError::NotFound {
            entity: "contract",
            key: contract_id.to_string(),
        }
    }

    pub fn amendment_not_found(amendment_id: AmendmentId) -> Self {
        EngineError::NotFound {
            entity: "amendment",
            key: amendment_id.to_string(),
        }
    }

    /// Stable name of the error kind, for batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "ValidationError",
            EngineError::Format(_) => "FormatError",
            EngineError::IneligibleModality { .. } => "IneligibleModalityError",
            EngineError::OrderViolation { .. } => "OrderViolationError",
            EngineError::NotFound { .. } => "NotFoundError",
            EngineError::Consistency { .. } => "ConsistencyError",
            EngineError::Storage(StorageError::DuplicateKey { .. })
            | EngineError::Storage(StorageError::ForeignKeyViolation { .. }) => "ValidationError",
            EngineError::Storage(_) => "StorageError",
        }
    }
}

impl From<StorageError> for EngineError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound { table, key } => EngineError::NotFound { entity: table, key },
            StorageError::ContractViolation(v) => EngineError::Validation(v),
            other => EngineError::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_errors_01_storage_errors_map_onto_engine_taxonomy() {
        let e: EngineError = StorageError::NotFound {
            table: "contracts",
            key: "4".to_string(),
        }
        .into();
        assert_eq!(e.kind(), "NotFoundError");

        let e: EngineError = StorageError::ContractViolation(ContractViolation::InvalidValue {
            field: "x",
            reason: "y",
        })
        .into();
        assert!(matches!(e, EngineError::Validation(_)));

        let e: EngineError = StorageError::DuplicateKey {
            table: "contracts.contract_number",
            key: "CT-1".to_string(),
        }
        .into();
        assert_eq!(e.kind(), "ValidationError");

        let e: EngineError = StorageError::AppendOnlyViolation {
            table: "amendments",
        }
        .into();
        assert_eq!(e.kind(), "StorageError");
    }

    #[test]
    fn at_errors_02_messages_name_the_offending_ids() {
        let e = EngineError::OrderViolation {
            amendment_id: AmendmentId(3),
            tail: Some(AmendmentId(5)),
        };
        assert_eq!(
            e.to_string(),
            "amendment 3 is not the last amendment of its contract (last is Some(AmendmentId(5)))"
        );
        assert_eq!(
            EngineError::contract_not_found(ContractId(9)).to_string(),
            "contract 9 not found"
        );
    }
}
