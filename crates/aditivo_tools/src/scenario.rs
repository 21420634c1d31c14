#![forbid(unsafe_code)]

//! Batch replay of contract/amendment operations written as form text.
//!
//! A scenario registers its contracts up front, then runs its steps in order
//! against a [`ContractStore`]. Steps may declare the error kind they expect;
//! the report records whether each step behaved as declared.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use aditivo_engines::locale_text::{
    format_brl, parse_brl, parse_months, parse_optional_brl, BrDateText, DateText, IsoDateText,
};
use aditivo_kernel_contracts::amendment::{
    AmendmentId, AmendmentKind, AmendmentMetadata, AmendmentParams,
};
use aditivo_kernel_contracts::contract::{ContractId, ContractTerms, Modality};
use aditivo_kernel_contracts::FormatError;
use aditivo_os::{
    ActorContext, AmendmentLedgerRuntime, ConfigError, ContractRegistryRuntime, EngineConfig,
    EngineError, TotalConsistencyRuntime,
};
use aditivo_storage::ContractStore;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("contract {key:?} could not be registered: {source}")]
    Setup {
        key: String,
        #[source]
        source: EngineError,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateStyle {
    /// `dd/mm/yyyy`
    #[default]
    Br,
    /// `yyyy-mm-dd`
    Iso,
}

impl DateStyle {
    pub fn codec(self) -> &'static dyn DateText {
        match self {
            DateStyle::Br => &BrDateText,
            DateStyle::Iso => &IsoDateText,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub date_style: DateStyle,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub contracts: Vec<ContractSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json_str(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

/// Contract terms exactly as typed on the registration form.
#[derive(Debug, Clone, Deserialize)]
pub struct TermsText {
    pub number: String,
    pub modality: String,
    pub remuneration: String,
    pub months: String,
    pub vigency_start: String,
    pub vigency_end: String,
    #[serde(default)]
    pub interstitial: bool,
    #[serde(default)]
    pub interstitial_value: String,
    #[serde(default)]
    pub complementary_value: String,
    #[serde(default)]
    pub observations: Option<String>,
}

impl TermsText {
    pub fn decode(&self, codec: &dyn DateText) -> Result<ContractTerms, EngineError> {
        Ok(ContractTerms::v1(
            self.number.as_str(),
            Modality::parse(&self.modality)?,
            parse_brl(&self.remuneration)?,
            parse_months(&self.months)?,
            codec.parse_date(&self.vigency_start)?,
            codec.parse_date(&self.vigency_end)?,
            self.interstitial,
            parse_optional_brl(&self.interstitial_value)?.unwrap_or_default(),
            parse_optional_brl(&self.complementary_value)?.unwrap_or_default(),
            self.observations.clone(),
        )?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractSpec {
    pub key: String,
    #[serde(flatten)]
    pub terms: TermsText,
}

/// Amendment form fields. Blank text means "not provided".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AmendmentText {
    pub kind: String,
    pub additional_months: String,
    pub new_vigency_end: String,
    pub new_remuneration: String,
    pub effective_from: String,
    pub complementary_value: String,
    pub oficio: String,
    pub entry_date: String,
    pub protocol_date: String,
    pub responsible: String,
}

impl AmendmentText {
    pub fn decode(&self, codec: &dyn DateText) -> Result<AmendmentParams, FormatError> {
        let additional_months = if self.additional_months.trim().is_empty() {
            None
        } else {
            Some(parse_months(&self.additional_months)?)
        };
        let metadata = AmendmentMetadata {
            oficio: non_blank(&self.oficio),
            entry_date: codec.parse_optional_date(&self.entry_date)?,
            protocol_date: codec.parse_optional_date(&self.protocol_date)?,
            responsible: non_blank(&self.responsible),
        };
        Ok(AmendmentParams::from_parts(
            AmendmentKind::parse(&self.kind)?,
            codec.parse_optional_date(&self.new_vigency_end)?,
            additional_months,
            parse_optional_brl(&self.new_remuneration)?,
            codec.parse_optional_date(&self.effective_from)?,
            parse_optional_brl(&self.complementary_value)?.unwrap_or_default(),
            metadata,
        ))
    }
}

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_string())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum StepOp {
    Append {
        contract: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(flatten)]
        amendment: AmendmentText,
    },
    Remove {
        amendment: String,
    },
    Recompute {
        contract: String,
    },
    Verify {
        contract: String,
    },
    Revise {
        contract: String,
        #[serde(flatten)]
        terms: TermsText,
    },
    DeleteContract {
        contract: String,
    },
}

impl StepOp {
    pub fn name(&self) -> &'static str {
        match self {
            StepOp::Append { .. } => "append",
            StepOp::Remove { .. } => "remove",
            StepOp::Recompute { .. } => "recompute",
            StepOp::Verify { .. } => "verify",
            StepOp::Revise { .. } => "revise",
            StepOp::DeleteContract { .. } => "delete_contract",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    #[serde(flatten)]
    pub op: StepOp,
    /// Error kind the step is expected to fail with, e.g. `OrderViolationError`.
    #[serde(default)]
    pub expect_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub op: &'static str,
    pub failure: Option<StepFailure>,
    pub expected_error: Option<String>,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AmendmentSummary {
    pub amendment_id: u64,
    pub label: Option<String>,
    pub kind: AmendmentKind,
    pub computed_value: String,
    pub remaining_months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractSummary {
    pub key: String,
    pub contract_id: u64,
    pub contract_number: String,
    pub modality: Modality,
    pub remuneration: String,
    pub months: u32,
    pub vigency_end: String,
    pub total_value: String,
    pub drift: String,
    pub amendments: Vec<AmendmentSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    pub steps: Vec<StepOutcome>,
    pub contracts: Vec<ContractSummary>,
}

impl ScenarioReport {
    pub fn mismatches(&self) -> usize {
        self.steps.iter().filter(|s| !s.matched).count()
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for s in &self.steps {
            let status = match (&s.failure, s.matched) {
                (None, _) => "ok".to_string(),
                (Some(f), true) => format!("refused as expected ({})", f.kind),
                (Some(f), false) => format!("FAILED {}: {}", f.kind, f.message),
            };
            let status = match (&s.expected_error, &s.failure) {
                (Some(kind), None) => format!("UNEXPECTED SUCCESS (expected {kind})"),
                _ => status,
            };
            out.push_str(&format!("step {:>3} {:<15} {status}\n", s.index, s.op));
        }
        for c in &self.contracts {
            out.push_str(&format!(
                "\n{} [{}] {} | {} x {} months until {} | total {} (drift {})\n",
                c.contract_number,
                c.key,
                c.modality,
                c.remuneration,
                c.months,
                c.vigency_end,
                c.total_value,
                c.drift
            ));
            for a in &c.amendments {
                out.push_str(&format!(
                    "  #{} {:<15} {:>18}{}\n",
                    a.amendment_id,
                    a.kind.as_str(),
                    a.computed_value,
                    a.label
                        .as_deref()
                        .map(|l| format!("  ({l})"))
                        .unwrap_or_default()
                ));
            }
        }
        out
    }
}

#[derive(Default)]
struct References {
    contracts: BTreeMap<String, ContractId>,
    amendments: BTreeMap<String, AmendmentId>,
    labels: BTreeMap<AmendmentId, String>,
}

impl References {
    fn contract(&self, key: &str) -> Result<ContractId, EngineError> {
        self.contracts
            .get(key)
            .copied()
            .ok_or_else(|| EngineError::NotFound {
                entity: "scenario contract",
                key: key.to_string(),
            })
    }

    fn amendment(&self, key: &str) -> Result<AmendmentId, EngineError> {
        self.amendments
            .get(key)
            .copied()
            .ok_or_else(|| EngineError::NotFound {
                entity: "scenario amendment",
                key: key.to_string(),
            })
    }
}

pub struct ScenarioRunner {
    registry: ContractRegistryRuntime,
    ledger: AmendmentLedgerRuntime,
    totals: TotalConsistencyRuntime,
}

impl ScenarioRunner {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            registry: ContractRegistryRuntime::new(config)?,
            ledger: AmendmentLedgerRuntime::new(config)?,
            totals: TotalConsistencyRuntime::new(config)?,
        })
    }

    pub fn run(
        &self,
        scenario: &Scenario,
        store: &mut ContractStore,
    ) -> Result<ScenarioReport, ScenarioError> {
        let actor = match &scenario.actor {
            Some(user) => ActorContext::v1(user.as_str()).map_err(EngineError::from)?,
            None => ActorContext::system(),
        };
        let codec = scenario.date_style.codec();
        let mut refs = References::default();

        for spec in &scenario.contracts {
            let id = spec
                .terms
                .decode(codec)
                .and_then(|terms| self.registry.register_contract(store, &actor, terms))
                .map_err(|source| ScenarioError::Setup {
                    key: spec.key.clone(),
                    source,
                })?;
            refs.contracts.insert(spec.key.clone(), id);
        }

        let mut steps = Vec::with_capacity(scenario.steps.len());
        for (i, step) in scenario.steps.iter().enumerate() {
            let index = i + 1;
            let failure = self
                .apply(&step.op, store, &actor, codec, &mut refs)
                .err()
                .map(|e| StepFailure {
                    kind: e.kind(),
                    message: e.to_string(),
                });
            let matched = match (&failure, &step.expect_error) {
                (None, None) => true,
                (Some(f), Some(expected)) => f.kind == expected.as_str(),
                _ => false,
            };
            if !matched {
                tracing::warn!(step = index, op = step.op.name(), "step did not behave as declared");
            }
            steps.push(StepOutcome {
                index,
                op: step.op.name(),
                failure,
                expected_error: step.expect_error.clone(),
                matched,
            });
        }

        let contracts = self.summarize(store, codec, &refs)?;
        Ok(ScenarioReport { steps, contracts })
    }

    fn apply(
        &self,
        op: &StepOp,
        store: &mut ContractStore,
        actor: &ActorContext,
        codec: &dyn DateText,
        refs: &mut References,
    ) -> Result<(), EngineError> {
        match op {
            StepOp::Append {
                contract,
                label,
                amendment,
            } => {
                let contract_id = refs.contract(contract)?;
                let params = amendment.decode(codec)?;
                let amendment_id = self
                    .ledger
                    .append_amendment(store, actor, contract_id, params)?;
                if let Some(label) = label {
                    refs.amendments.insert(label.clone(), amendment_id);
                    refs.labels.insert(amendment_id, label.clone());
                }
            }
            StepOp::Remove { amendment } => {
                let amendment_id = refs.amendment(amendment)?;
                self.ledger.remove_amendment(store, actor, amendment_id)?;
            }
            StepOp::Recompute { contract } => {
                let contract_id = refs.contract(contract)?;
                self.totals
                    .recompute_contract_total(store, actor, contract_id)?;
            }
            StepOp::Verify { contract } => {
                let contract_id = refs.contract(contract)?;
                self.totals.verify_contract_total(&*store, contract_id)?;
            }
            StepOp::Revise { contract, terms } => {
                let contract_id = refs.contract(contract)?;
                let terms = terms.decode(codec)?;
                self.registry
                    .revise_contract_terms(store, actor, contract_id, terms)?;
            }
            StepOp::DeleteContract { contract } => {
                let contract_id = refs.contract(contract)?;
                self.registry.delete_contract(store, actor, contract_id)?;
                refs.contracts.remove(contract);
            }
        }
        Ok(())
    }

    fn summarize(
        &self,
        store: &ContractStore,
        codec: &dyn DateText,
        refs: &References,
    ) -> Result<Vec<ContractSummary>, EngineError> {
        let mut out = Vec::with_capacity(refs.contracts.len());
        for (key, id) in &refs.contracts {
            let st = self.registry.contract_statement(store, *id)?;
            out.push(ContractSummary {
                key: key.clone(),
                contract_id: id.0,
                contract_number: st.contract.terms.contract_number.clone(),
                modality: st.contract.modality(),
                remuneration: format_brl(st.contract.effective.remuneration),
                months: st.contract.effective.months,
                vigency_end: codec.format_date(st.contract.effective.vigency_end),
                total_value: format_brl(st.contract.total_value),
                drift: format_brl(st.check.drift),
                amendments: st
                    .amendments
                    .iter()
                    .map(|a| AmendmentSummary {
                        amendment_id: a.amendment_id.0,
                        label: refs.labels.get(&a.amendment_id).cloned(),
                        kind: a.kind(),
                        computed_value: format_brl(a.computed_value),
                        remaining_months: a.remaining_months,
                    })
                    .collect(),
            });
        }
        Ok(out)
    }
}
