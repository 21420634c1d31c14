#![forbid(unsafe_code)]

use std::fmt;

use rust_decimal::Decimal;
use tracing::info;

use aditivo_kernel_contracts::amendment::AmendmentId;
use aditivo_kernel_contracts::contract::ContractId;
use aditivo_kernel_contracts::{ContractViolation, Validate};

pub const AUDIT_TARGET: &str = "aditivo::audit";

/// The user on whose behalf a mutating call runs. Only ever written to audit lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorContext {
    user: String,
}

impl ActorContext {
    pub fn v1(user: impl Into<String>) -> Result<Self, ContractViolation> {
        let actor = Self {
            user: user.into().trim().to_string(),
        };
        actor.validate()?;
        Ok(actor)
    }

    /// Actor for batch jobs and maintenance runs.
    pub fn system() -> Self {
        Self {
            user: "system".to_string(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }
}

impl Validate for ActorContext {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.user.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "actor_context.user",
                reason: "must not be empty",
            });
        }
        if self.user.len() > 128 {
            return Err(ContractViolation::InvalidValue {
                field: "actor_context.user",
                reason: "must be <= 128 chars",
            });
        }
        Ok(())
    }
}

impl fmt::Display for ActorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    ContractRegistered,
    ContractRevised,
    ContractDeleted,
    AmendmentAppended,
    AmendmentRemoved,
    TotalRecomputed,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::ContractRegistered => "contract_registered",
            AuditAction::ContractRevised => "contract_revised",
            AuditAction::ContractDeleted => "contract_deleted",
            AuditAction::AmendmentAppended => "amendment_appended",
            AuditAction::AmendmentRemoved => "amendment_removed",
            AuditAction::TotalRecomputed => "total_recomputed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub action: AuditAction,
    pub contract_id: ContractId,
    pub amendment_id: Option<AmendmentId>,
    pub total_value: Option<Decimal>,
}

impl AuditEntry {
    pub fn contract(action: AuditAction, contract_id: ContractId) -> Self {
        Self {
            action,
            contract_id,
            amendment_id: None,
            total_value: None,
        }
    }

    pub fn with_amendment(mut self, amendment_id: AmendmentId) -> Self {
        self.amendment_id = Some(amendment_id);
        self
    }

    pub fn with_total(mut self, total_value: Decimal) -> Self {
        self.total_value = Some(total_value);
        self
    }
}

/// Audit writer. Entries are emitted only after the unit of work has committed;
/// persistence of the audit trail is left to whatever subscriber is installed.
#[derive(Debug, Default)]
pub struct AuditRuntime;

impl AuditRuntime {
    pub fn emit(actor: &ActorContext, entry: &AuditEntry) {
        info!(
            target: AUDIT_TARGET,
            actor = %actor,
            action = entry.action.as_str(),
            contract_id = entry.contract_id.0,
            amendment_id = ?entry.amendment_id.map(|a| a.0),
            total_value = ?entry.total_value,
            "committed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_audit_01_actor_is_trimmed_and_required() {
        assert_eq!(ActorContext::v1("  maria ").unwrap().user(), "maria");
        assert!(ActorContext::v1("   ").is_err());
        assert!(ActorContext::v1("x".repeat(129)).is_err());
        assert_eq!(ActorContext::system().to_string(), "system");
    }

    #[test]
    fn at_audit_02_entry_builder() {
        let e = AuditEntry::contract(AuditAction::AmendmentAppended, ContractId(2))
            .with_amendment(AmendmentId(5))
            .with_total(Decimal::from(10));
        assert_eq!(e.amendment_id, Some(AmendmentId(5)));
        assert_eq!(e.total_value, Some(Decimal::from(10)));
        assert_eq!(e.action.as_str(), "amendment_appended");
        AuditRuntime::emit(&ActorContext::system(), &e);
    }
}
