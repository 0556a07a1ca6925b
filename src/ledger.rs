use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contract::Contract;
use crate::decimal::Money;
use crate::errors::{ContractError, Result};
use crate::types::{EntryId, EntryType, PaymentId};

/// an immutable, signed ledger record
///
/// Positive amounts are cash received, negative amounts are charges or
/// reversals. Entries are never mutated or deleted; corrections append a
/// compensating entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub entry_date: DateTime<Utc>,
    /// signed: positive = payment received, negative = charge/reversal
    pub amount: Money,
    pub entry_type: EntryType,
    /// non-owning back-reference to the payment that produced this entry
    pub payment_id: Option<PaymentId>,
    pub description: String,
}

impl LedgerEntry {
    pub fn new(
        entry_type: EntryType,
        amount: Money,
        payment_id: Option<PaymentId>,
        description: String,
        entry_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            entry_date,
            amount,
            entry_type,
            payment_id,
            description,
        }
    }
}

/// append-only ledger owned by one contract
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// signed sum of all entries in chronological order
    pub fn sum(&self) -> Money {
        self.entries.iter().map(|e| e.amount).sum()
    }

    fn append(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }
}

/// the single choke point through which every balance mutation passes
///
/// No other component writes `contract.balance`. Posting appends the entry
/// and rederives the balance from the ledger sum; `verify` recomputes the
/// sum independently and fails loudly on drift instead of correcting it.
pub struct Reconciler;

impl Reconciler {
    /// append an entry and update the contract balance atomically
    pub fn post(contract: &mut Contract, ledger: &mut Ledger, entry: LedgerEntry) -> Result<()> {
        ledger.append(entry);
        contract.balance = Self::expected_balance(contract, ledger);
        Ok(())
    }

    /// read-only consistency audit: sum all entries, compare to the balance
    pub fn verify(contract: &Contract, ledger: &Ledger) -> Result<()> {
        let expected = Self::expected_balance(contract, ledger);
        if contract.balance != expected {
            return Err(ContractError::LedgerMismatch {
                expected,
                actual: contract.balance,
            });
        }
        Ok(())
    }

    /// `amount - sum(entries)`, clamped at zero when overpayment drives the
    /// received total past the sale price
    fn expected_balance(contract: &Contract, ledger: &Ledger) -> Money {
        (contract.amount - ledger.sum()).max(Money::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::types::{ContractStatus, FinancingType};
    use chrono::NaiveDate;

    fn test_contract(amount: i64) -> Contract {
        Contract {
            id: Uuid::new_v4(),
            amount: Money::from_major(amount),
            reserve_amount: Money::ZERO,
            down_payment: Money::ZERO,
            financing_type: FinancingType::Direct,
            payment_term: Some(12),
            interest_rate: Rate::ZERO,
            status: ContractStatus::Pending,
            balance: Money::from_major(amount),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            max_payment_date: None,
        }
    }

    fn entry(entry_type: EntryType, amount: Money) -> LedgerEntry {
        LedgerEntry::new(entry_type, amount, None, String::new(), Utc::now())
    }

    #[test]
    fn test_post_updates_balance() {
        let mut contract = test_contract(90_000);
        let mut ledger = Ledger::new();

        Reconciler::post(
            &mut contract,
            &mut ledger,
            entry(EntryType::Payment, Money::from_major(7_500)),
        )
        .unwrap();

        assert_eq!(contract.balance, Money::from_major(82_500));
        assert_eq!(ledger.sum(), Money::from_major(7_500));
        Reconciler::verify(&contract, &ledger).unwrap();
    }

    #[test]
    fn test_reversal_restores_balance() {
        let mut contract = test_contract(90_000);
        let mut ledger = Ledger::new();

        Reconciler::post(
            &mut contract,
            &mut ledger,
            entry(EntryType::Payment, Money::from_major(7_500)),
        )
        .unwrap();
        Reconciler::post(
            &mut contract,
            &mut ledger,
            entry(EntryType::Reversal, -Money::from_major(7_500)),
        )
        .unwrap();

        assert_eq!(contract.balance, Money::from_major(90_000));
        assert_eq!(ledger.len(), 2);
        Reconciler::verify(&contract, &ledger).unwrap();
    }

    #[test]
    fn test_balance_clamped_at_zero() {
        let mut contract = test_contract(1_000);
        let mut ledger = Ledger::new();

        Reconciler::post(
            &mut contract,
            &mut ledger,
            entry(EntryType::Payment, Money::from_major(1_500)),
        )
        .unwrap();

        assert_eq!(contract.balance, Money::ZERO);
        Reconciler::verify(&contract, &ledger).unwrap();
    }

    #[test]
    fn test_verify_fails_loudly_on_drift() {
        let mut contract = test_contract(90_000);
        let mut ledger = Ledger::new();

        Reconciler::post(
            &mut contract,
            &mut ledger,
            entry(EntryType::Payment, Money::from_major(7_500)),
        )
        .unwrap();

        // simulate an out-of-band balance write
        contract.balance = Money::from_major(80_000);

        let err = Reconciler::verify(&contract, &ledger).unwrap_err();
        match err {
            ContractError::LedgerMismatch { expected, actual } => {
                assert_eq!(expected, Money::from_major(82_500));
                assert_eq!(actual, Money::from_major(80_000));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
