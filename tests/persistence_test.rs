#![cfg(feature = "storage-rocksdb")]

mod common;

use assert_cmd::cargo_bin;
use bankcore::application::engine::BankEngine;
use bankcore::config::BankConfig;
use bankcore::domain::loan::{LoanDecision, LoanStatus};
use bankcore::infrastructure::rocksdb::RocksDbStore;
use rust_decimal_macros::dec;
use std::process::Command;
use std::sync::Arc;
use tempfile::tempdir;

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");
    let account = common::number(1);

    // 1. First run: open and deposit
    let mut csv1 = tempfile::NamedTempFile::new().unwrap();
    common::write_commands(
        &mut csv1,
        &[
            &format!("open,{account},,,,Jan Kowalski"),
            &format!("deposit,{account},,100.0,,"),
        ],
    )
    .unwrap();

    let output1 = Command::new(cargo_bin!("bankcore"))
        .arg(csv1.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains(&format!("{account},Jan Kowalski,400.00,false")));

    // 2. Second run: the account is found again by number
    let mut csv2 = tempfile::NamedTempFile::new().unwrap();
    common::write_commands(&mut csv2, &[&format!("deposit,{account},,50.0,,")]).unwrap();

    let output2 = Command::new(cargo_bin!("bankcore"))
        .arg(csv2.path())
        .arg("--db-path")
        .arg(&db_path)
        .output()
        .expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);
    assert!(stdout2.contains(&format!("{account},Jan Kowalski,450.00,false")));
}

#[tokio::test]
async fn test_rocksdb_engine_reopen_keeps_loan_and_history() {
    let dir = tempdir().unwrap();

    let (account_id, loan_id) = {
        let store = Arc::new(RocksDbStore::open(dir.path()).unwrap());
        let engine = BankEngine::new(store, BankConfig::default());
        let account = common::open(&engine, "Jan", "Kowalski").await;
        let loan = engine
            .apply_loan(account.id, "cash", dec!(1000), 12)
            .await
            .unwrap();
        engine.review_loan(loan.id, LoanDecision::Accept).await.unwrap();
        engine.pay_installment(account.id).await.unwrap();
        (account.id, loan.id)
    };

    let store = Arc::new(RocksDbStore::open(dir.path()).unwrap());
    let engine = BankEngine::new(store, BankConfig::default());

    let loan = engine.get_loan(account_id).await.unwrap();
    assert_eq!(loan.id, loan_id);
    assert_eq!(loan.status, LoanStatus::Accepted);
    assert_eq!(loan.payment_remaining, dec!(1027.32) - dec!(85.61));

    let history = engine.last_transactions(account_id, 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].id > history[1].id);

    // Sequences continue after reopening.
    let other = common::open(&engine, "Ewa", "Lis").await;
    assert!(other.id > account_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rocksdb_concurrent_open_same_number() {
    use bankcore::domain::account::{AccountNumber, Holder};
    use bankcore::error::BankError;

    let dir = tempdir().unwrap();
    let store = Arc::new(RocksDbStore::open(dir.path()).unwrap());
    let engine = Arc::new(BankEngine::new(store, BankConfig::default()));
    let number = AccountNumber::parse(&common::number(42)).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            let number = number.clone();
            tokio::spawn(async move {
                engine
                    .open_account(Holder::new("Holder", i.to_string()), Some(number))
                    .await
            })
        })
        .collect();
    let mut opened = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(account) => opened.push(account),
            Err(BankError::DuplicateAccountNumber(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(opened.len(), 1);
    assert_eq!(engine.accounts().await.unwrap().len(), 1);
    assert_eq!(
        engine.find_account_by_number(number.as_str()).await.unwrap().id,
        opened[0].id
    );
}
