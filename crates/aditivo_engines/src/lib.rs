#![forbid(unsafe_code)]

pub mod date_span;
pub mod locale_text;
pub mod money;
pub mod valuation;

pub use date_span::{add_months, months_between, months_between_text};
pub use valuation::{
    base_value, compute_amendment_value, terms_base_value, AmendmentValuation, AmendmentValuationEngine,
    UndatedRateChangePolicy, ValuationConfig,
};
