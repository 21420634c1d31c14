#![forbid(unsafe_code)]

pub mod scenario;

pub use scenario::{Scenario, ScenarioError, ScenarioReport, ScenarioRunner};
