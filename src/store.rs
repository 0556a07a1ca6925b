use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use hourglass_rs::SafeTimeProvider;

use crate::account::{CapitalRepayment, ContractAccount, ContractSnapshot};
use crate::contract::{ContractTerms, Installment, Payment};
use crate::decimal::Money;
use crate::errors::{ContractError, Result};
use crate::types::{ContractId, ContractStatus, InstallmentId, PaymentId};

/// in-memory contract store enforcing the transaction boundary
///
/// Each mutating operation locks exactly one contract, runs on a clone of
/// its aggregate, and swaps the clone in only after the reconciliation
/// invariant passes, so a failed operation leaves no partial effects.
/// Mutations against the same contract serialize on its mutex; different
/// contracts proceed fully in parallel.
#[derive(Default)]
pub struct ContractStore {
    accounts: RwLock<HashMap<ContractId, Arc<Mutex<ContractAccount>>>>,
}

impl ContractStore {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// reservation: create the contract, seed its schedule, register it
    pub fn create_contract(
        &self,
        terms: ContractTerms,
        time: &SafeTimeProvider,
    ) -> Result<ContractSnapshot> {
        let account = ContractAccount::reserve(terms, time)?;
        let snapshot = account.snapshot();
        let id = account.contract.id;

        let mut accounts = lock_write(&self.accounts);
        accounts.insert(id, Arc::new(Mutex::new(account)));
        Ok(snapshot)
    }

    /// read-only snapshot: contract + schedule + ledger + version
    pub fn get_contract(&self, contract_id: ContractId) -> Result<ContractSnapshot> {
        let account = self.account(contract_id)?;
        let guard = lock(&account);
        Ok(guard.snapshot())
    }

    pub fn apply_payment(
        &self,
        contract_id: ContractId,
        installment_id: InstallmentId,
        principal: Money,
        interest: Money,
        time: &SafeTimeProvider,
    ) -> Result<(Payment, ContractSnapshot)> {
        self.mutate(contract_id, |account| {
            account.apply_payment(installment_id, principal, interest, time)
        })
    }

    pub fn undo_payment(
        &self,
        contract_id: ContractId,
        payment_id: PaymentId,
        time: &SafeTimeProvider,
    ) -> Result<ContractSnapshot> {
        let ((), snapshot) = self.mutate(contract_id, |account| {
            account.undo_payment(payment_id, time)
        })?;
        Ok(snapshot)
    }

    pub fn apply_capital_repayment(
        &self,
        contract_id: ContractId,
        amount: Money,
        time: &SafeTimeProvider,
    ) -> Result<(CapitalRepayment, ContractSnapshot)> {
        self.mutate(contract_id, |account| {
            account.apply_capital_repayment(amount, time)
        })
    }

    pub fn update_moratory(
        &self,
        contract_id: ContractId,
        installment_id: InstallmentId,
        new_interest: Money,
        time: &SafeTimeProvider,
    ) -> Result<Installment> {
        let (installment, _) = self.mutate(contract_id, |account| {
            account.update_moratory(installment_id, new_interest, time)
        })?;
        Ok(installment)
    }

    pub fn update_status(
        &self,
        contract_id: ContractId,
        new_status: ContractStatus,
        time: &SafeTimeProvider,
    ) -> Result<ContractSnapshot> {
        let ((), snapshot) = self.mutate(contract_id, |account| {
            account.update_status(new_status, time)
        })?;
        Ok(snapshot)
    }

    pub fn close_contract(
        &self,
        contract_id: ContractId,
        time: &SafeTimeProvider,
    ) -> Result<ContractSnapshot> {
        let ((), snapshot) = self.mutate(contract_id, |account| account.close(time))?;
        Ok(snapshot)
    }

    /// periodic consistency audit; fails loudly on drift
    pub fn reconcile(&self, contract_id: ContractId) -> Result<()> {
        let account = self.account(contract_id)?;
        let guard = lock(&account);
        guard.reconcile()
    }

    fn account(&self, contract_id: ContractId) -> Result<Arc<Mutex<ContractAccount>>> {
        let accounts = lock_read(&self.accounts);
        accounts
            .get(&contract_id)
            .cloned()
            .ok_or(ContractError::ContractNotFound { id: contract_id })
    }

    /// atomic read-modify-write against one contract: clone, mutate, verify,
    /// commit. On any error the clone is dropped and the committed state
    /// stays untouched.
    fn mutate<T>(
        &self,
        contract_id: ContractId,
        op: impl FnOnce(&mut ContractAccount) -> Result<T>,
    ) -> Result<(T, ContractSnapshot)> {
        let account = self.account(contract_id)?;
        let mut guard = lock(&account);

        let mut working = guard.clone();
        let out = op(&mut working)?;
        working.reconcile()?;
        working.version += 1;

        let snapshot = working.snapshot();
        *guard = working;
        Ok((out, snapshot))
    }
}

// committed state is only ever replaced wholesale, so a poisoned lock still
// holds a consistent aggregate and can be recovered
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn lock_read<T>(rwlock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    rwlock.read().unwrap_or_else(|e| e.into_inner())
}

fn lock_write<T>(rwlock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    rwlock.write().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use chrono::{NaiveDate, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn test_time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        ))
    }

    fn direct_terms(amount: i64, term: u32) -> ContractTerms {
        ContractTerms::direct(
            Money::from_major(amount),
            Money::ZERO,
            Money::ZERO,
            term,
            Rate::from_percentage(12),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        )
    }

    #[test]
    fn test_create_and_get_round_trip() {
        let store = ContractStore::new();
        let time = test_time();

        let created = store.create_contract(direct_terms(90_000, 12), &time).unwrap();
        let fetched = store.get_contract(created.contract.id).unwrap();

        assert_eq!(created, fetched);
        assert_eq!(fetched.version, 0);
        assert_eq!(fetched.installments.len(), 12);
    }

    #[test]
    fn test_unknown_contract_is_not_found() {
        let store = ContractStore::new();
        let err = store.get_contract(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ContractError::ContractNotFound { .. }));
    }

    #[test]
    fn test_mutation_bumps_version() {
        let store = ContractStore::new();
        let time = test_time();

        let snapshot = store.create_contract(direct_terms(90_000, 12), &time).unwrap();
        let contract_id = snapshot.contract.id;
        let first = snapshot.installments[0].id;

        let (_, after) = store
            .apply_payment(contract_id, first, Money::from_major(7_500), Money::ZERO, &time)
            .unwrap();
        assert_eq!(after.version, 1);

        let (_, after) = store
            .apply_capital_repayment(contract_id, Money::from_major(5_000), &time)
            .unwrap();
        assert_eq!(after.version, 2);
    }

    #[test]
    fn test_failed_operation_commits_nothing() {
        let store = ContractStore::new();
        let time = test_time();

        let snapshot = store.create_contract(direct_terms(90_000, 12), &time).unwrap();
        let contract_id = snapshot.contract.id;
        let first = snapshot.installments[0].id;

        // non-positive amount is rejected before any mutation
        let err = store
            .apply_payment(contract_id, first, Money::ZERO, Money::ZERO, &time)
            .unwrap_err();
        assert!(matches!(err, ContractError::NonPositiveAmount { .. }));

        let after = store.get_contract(contract_id).unwrap();
        assert_eq!(after.version, 0);
        assert_eq!(after.contract.balance, Money::from_major(90_000));
        assert!(after.ledger.is_empty());
    }

    #[test]
    fn test_mutations_on_different_contracts_run_in_parallel() {
        let store = Arc::new(ContractStore::new());
        let time = test_time();

        let a = store.create_contract(direct_terms(90_000, 12), &time).unwrap();
        let b = store.create_contract(direct_terms(60_000, 6), &time).unwrap();

        let handles: Vec<_> = [a.clone(), b.clone()]
            .into_iter()
            .map(|snapshot| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let time = test_time();
                    for installment in &snapshot.installments {
                        store
                            .apply_payment(
                                snapshot.contract.id,
                                installment.id,
                                installment.amount,
                                Money::ZERO,
                                &time,
                            )
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for id in [a.contract.id, b.contract.id] {
            let snapshot = store.get_contract(id).unwrap();
            assert_eq!(snapshot.contract.balance, Money::ZERO);
            store.reconcile(id).unwrap();
        }
    }

    #[test]
    fn test_concurrent_capital_repayments_serialize() {
        let store = Arc::new(ContractStore::new());
        let time = test_time();

        let snapshot = store.create_contract(direct_terms(90_000, 12), &time).unwrap();
        let contract_id = snapshot.contract.id;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let time = test_time();
                    store
                        .apply_capital_repayment(contract_id, Money::from_major(5_000), &time)
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // all four redistributions observed a consistent pending set
        let snapshot = store.get_contract(contract_id).unwrap();
        assert_eq!(snapshot.contract.balance, Money::from_major(70_000));
        assert_eq!(snapshot.version, 4);
        let pending_sum: Money = snapshot
            .installments
            .iter()
            .filter(|i| i.status == crate::types::InstallmentStatus::Pending)
            .filter(|i| i.payment_type == crate::types::PaymentType::Installment)
            .map(|i| i.amount)
            .sum();
        assert_eq!(pending_sum, Money::from_major(70_000));
        store.reconcile(contract_id).unwrap();
    }
}
