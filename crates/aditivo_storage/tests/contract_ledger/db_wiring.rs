#![forbid(unsafe_code)]

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

use aditivo_kernel_contracts::amendment::{AmendmentId, AmendmentParams, AmendmentRowInput};
use aditivo_kernel_contracts::contract::{ContractFieldPatch, ContractId, ContractTerms, Modality};
use aditivo_kernel_contracts::ContractViolation;
use aditivo_storage::contract_ledger::{ContractStore, StorageError};
use aditivo_storage::repo::ContractLedgerRepo;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn terms(number: &str) -> ContractTerms {
    ContractTerms::v1(
        number,
        Modality::Produto,
        Decimal::from(2000),
        6,
        date(2026, 1, 1),
        date(2026, 6, 30),
        false,
        Decimal::ZERO,
        Decimal::ZERO,
        None,
    )
    .unwrap()
}

fn time_row(contract_id: ContractId, months: u32, value: i64) -> AmendmentRowInput {
    AmendmentRowInput::v1(
        contract_id,
        AmendmentParams::time(months, None),
        Decimal::from(value),
        None,
    )
    .unwrap()
}

fn store_with_contract() -> (ContractStore, ContractId) {
    let mut s = ContractStore::new_in_memory();
    let id = s
        .insert_contract_row(terms("CT-1/2026"), Decimal::from(12000))
        .unwrap();
    (s, id)
}

#[test]
fn at_db_01_contract_numbers_are_unique() {
    let (mut s, id) = store_with_contract();
    assert_eq!(id, ContractId(1));
    let err = s
        .insert_contract_row(terms(" CT-1/2026 "), Decimal::ZERO)
        .unwrap_err();
    assert!(matches!(err, StorageError::DuplicateKey { .. }));
    assert_eq!(s.contract_by_number("CT-1/2026").unwrap().contract_id, id);
    assert_eq!(s.contract_rows().len(), 1);
}

#[test]
fn at_db_02_amendments_list_in_creation_order_with_tail() {
    let (mut s, c1) = store_with_contract();
    let c2 = s
        .insert_contract_row(terms("CT-2/2026"), Decimal::ZERO)
        .unwrap();

    let a1 = s.insert_amendment_row(time_row(c1, 1, 2000)).unwrap();
    let b1 = s.insert_amendment_row(time_row(c2, 1, 2000)).unwrap();
    let a2 = s.insert_amendment_row(time_row(c1, 2, 4000)).unwrap();

    let ids: Vec<AmendmentId> = s
        .amendment_rows_for_contract(c1)
        .iter()
        .map(|r| r.amendment_id)
        .collect();
    assert_eq!(ids, vec![a1, a2]);
    assert_eq!(s.amendment_tail_row(c1).unwrap().amendment_id, a2);
    assert_eq!(s.amendment_tail_row(c2).unwrap().amendment_id, b1);
    assert!(
        s.amendment_row(a1).unwrap().creation_seq < s.amendment_row(a2).unwrap().creation_seq
    );

    s.delete_amendment_row(a2).unwrap();
    assert_eq!(s.amendment_tail_row(c1).unwrap().amendment_id, a1);
    assert_eq!(s.amendment_count(c1), 1);
}

#[test]
fn at_db_03_amendment_requires_existing_contract() {
    let mut s = ContractStore::new_in_memory();
    let err = s
        .insert_amendment_row(time_row(ContractId(9), 1, 100))
        .unwrap_err();
    assert!(matches!(err, StorageError::ForeignKeyViolation { .. }));
}

#[test]
fn at_db_04_delete_contract_refused_while_amendments_exist() {
    let (mut s, c1) = store_with_contract();
    let a1 = s.insert_amendment_row(time_row(c1, 1, 2000)).unwrap();
    assert!(matches!(
        s.delete_contract_row(c1),
        Err(StorageError::ForeignKeyViolation { .. })
    ));
    s.delete_amendment_row(a1).unwrap();
    let removed = s.delete_contract_row(c1).unwrap();
    assert_eq!(removed.contract_id, c1);
    assert!(s.contract_row(c1).is_none());
    assert!(s.contract_by_number("CT-1/2026").is_none());
    assert!(matches!(
        s.delete_contract_row(c1),
        Err(StorageError::NotFound { .. })
    ));
}

#[test]
fn at_db_05_field_patch_touches_effective_terms_and_total() {
    let (mut s, c1) = store_with_contract();
    s.update_contract_fields(
        c1,
        &ContractFieldPatch {
            months: Some(8),
            vigency_end: Some(date(2026, 8, 31)),
            ..ContractFieldPatch::default()
        }
        .with_total(Decimal::from(16000)),
    )
    .unwrap();
    let row = s.contract_row(c1).unwrap();
    assert_eq!(row.effective.months, 8);
    assert_eq!(row.terms.months, 6);
    assert_eq!(row.total_value, Decimal::from(16000));

    let err = s
        .update_contract_fields(
            c1,
            &ContractFieldPatch {
                vigency_end: Some(date(2025, 12, 31)),
                ..ContractFieldPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::ContractViolation(ContractViolation::InvalidValue { .. })
    ));
    assert!(matches!(
        s.update_contract_fields(ContractId(42), &ContractFieldPatch::total_only(Decimal::ONE)),
        Err(StorageError::NotFound { .. })
    ));
}

#[test]
fn at_db_06_replace_terms_resets_effective_and_reindexes_number() {
    let (mut s, c1) = store_with_contract();
    s.update_contract_fields(
        c1,
        &ContractFieldPatch {
            remuneration: Some(Decimal::from(9)),
            ..ContractFieldPatch::default()
        },
    )
    .unwrap();
    s.replace_contract_terms_row(c1, terms("CT-1A/2026"), Decimal::from(12000))
        .unwrap();
    let row = s.contract_row(c1).unwrap();
    assert_eq!(row.effective.remuneration, Decimal::from(2000));
    assert!(s.contract_by_number("CT-1/2026").is_none());
    assert_eq!(s.contract_by_number("CT-1A/2026").unwrap().contract_id, c1);

    let c2 = s
        .insert_contract_row(terms("CT-2/2026"), Decimal::ZERO)
        .unwrap();
    assert!(matches!(
        s.replace_contract_terms_row(c2, terms("CT-1A/2026"), Decimal::ZERO),
        Err(StorageError::DuplicateKey { .. })
    ));
}

#[test]
fn at_db_07_unit_of_work_rolls_back_every_write_on_error() {
    let (mut s, c1) = store_with_contract();
    let before = s.clone();
    let out: Result<(), StorageError> = s.atomically(|tx| {
        tx.insert_amendment_row(time_row(c1, 1, 2000))?;
        tx.update_contract_fields(c1, &ContractFieldPatch::total_only(Decimal::from(14000)))?;
        tx.delete_amendment_row(AmendmentId(77))?;
        Ok(())
    });
    assert!(matches!(out, Err(StorageError::NotFound { .. })));
    assert_eq!(s, before);

    let id = s
        .atomically(|tx| tx.insert_amendment_row(time_row(c1, 1, 2000)))
        .unwrap();
    assert_eq!(s.amendment_tail_row(c1).unwrap().amendment_id, id);
}

#[test]
fn at_db_08_amendment_rows_are_append_only() {
    let (mut s, c1) = store_with_contract();
    let a1 = s.insert_amendment_row(time_row(c1, 1, 2000)).unwrap();
    assert_eq!(
        s.attempt_overwrite_amendment(a1),
        Err(StorageError::AppendOnlyViolation {
            table: "amendments"
        })
    );
    assert!(matches!(
        s.delete_amendment_row(AmendmentId(99)),
        Err(StorageError::NotFound { .. })
    ));
}
