#![forbid(unsafe_code)]

//! Checked money arithmetic. Validated amounts are unbounded `Decimal`s, so
//! every product and sum that feeds a stored total goes through here.

use rust_decimal::Decimal;

use aditivo_kernel_contracts::ContractViolation;

fn overflow(field: &'static str) -> ContractViolation {
    ContractViolation::InvalidValue {
        field,
        reason: "amount overflows",
    }
}

pub fn add_amounts(
    field: &'static str,
    a: Decimal,
    b: Decimal,
) -> Result<Decimal, ContractViolation> {
    a.checked_add(b).ok_or_else(|| overflow(field))
}

pub fn sub_amounts(
    field: &'static str,
    a: Decimal,
    b: Decimal,
) -> Result<Decimal, ContractViolation> {
    a.checked_sub(b).ok_or_else(|| overflow(field))
}

/// `rate * months`.
pub fn rate_times_months(
    field: &'static str,
    rate: Decimal,
    months: u32,
) -> Result<Decimal, ContractViolation> {
    rate.checked_mul(Decimal::from(months))
        .ok_or_else(|| overflow(field))
}

pub fn sum_amounts(
    field: &'static str,
    amounts: impl IntoIterator<Item = Decimal>,
) -> Result<Decimal, ContractViolation> {
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| add_amounts(field, acc, v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn at_money_01_in_range_arithmetic() {
        assert_eq!(
            rate_times_months("x", Decimal::new(125050, 2), 3).unwrap(),
            Decimal::new(375150, 2)
        );
        assert_eq!(
            sum_amounts("x", [Decimal::ONE, Decimal::TWO, Decimal::NEGATIVE_ONE]).unwrap(),
            Decimal::TWO
        );
        assert_eq!(sum_amounts("x", Vec::new()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn at_money_02_overflow_is_a_violation() {
        let err = rate_times_months("contract_terms.remuneration", Decimal::MAX, 12).unwrap_err();
        assert_eq!(
            err,
            ContractViolation::InvalidValue {
                field: "contract_terms.remuneration",
                reason: "amount overflows"
            }
        );
        assert!(add_amounts("x", Decimal::MAX, Decimal::ONE).is_err());
        assert!(sub_amounts("x", Decimal::MIN, Decimal::ONE).is_err());
        assert!(sum_amounts("x", [Decimal::MAX, Decimal::MAX]).is_err());
    }
}
