use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::contract::{
    Contract, ContractTerms, Installment, Payment, CAPITAL_REPAYMENT_NUMBER,
};
use crate::decimal::Money;
use crate::errors::{ContractError, Result};
use crate::events::{Event, EventStore};
use crate::ledger::{Ledger, LedgerEntry, Reconciler};
use crate::moratory;
use crate::schedule;
use crate::types::{
    ContractStatus, EntryType, InstallmentId, InstallmentStatus, PaymentId, PaymentStatus,
    PaymentType,
};

/// one contract plus everything it owns: schedule, payments, ledger
///
/// All mutation goes through the operation methods below; each one ends by
/// re-verifying the reconciliation invariant so a buggy path fails loudly
/// instead of committing drift. The store clones the aggregate, runs the
/// operation on the clone, and swaps it in only on success.
#[derive(Debug, Clone)]
pub struct ContractAccount {
    pub contract: Contract,
    installments: Vec<Installment>,
    payments: Vec<Payment>,
    ledger: Ledger,
    pub events: EventStore,
    pub version: u64,
}

/// superseded/replacement pair produced by a re-amortization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadjustedInstallment {
    pub superseded: Installment,
    pub replacement: Installment,
}

/// result of an out-of-schedule principal reduction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalRepayment {
    pub payment_id: PaymentId,
    pub amount: Money,
    pub new_balance: Money,
    pub affected_installments: u32,
    pub installments: Vec<ReadjustedInstallment>,
}

/// read-only view returned to callers after every operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSnapshot {
    pub contract: Contract,
    pub installments: Vec<Installment>,
    pub ledger: Vec<LedgerEntry>,
    pub version: u64,
}

impl ContractAccount {
    /// create a contract from reservation terms and seed its schedule
    pub fn reserve(terms: ContractTerms, time: &SafeTimeProvider) -> Result<Self> {
        if !terms.amount.is_positive() {
            return Err(ContractError::NonPositiveAmount { amount: terms.amount });
        }

        let contract = Contract {
            id: Uuid::new_v4(),
            amount: terms.amount,
            reserve_amount: terms.reserve_amount,
            down_payment: terms.down_payment,
            financing_type: terms.financing_type,
            payment_term: terms.payment_term,
            interest_rate: terms.interest_rate,
            status: ContractStatus::Pending,
            balance: terms.amount,
            start_date: terms.start_date,
            max_payment_date: terms.max_payment_date,
        };

        let installments = schedule::generate(&contract)?;

        let mut account = Self {
            contract,
            installments,
            payments: Vec::new(),
            ledger: Ledger::new(),
            events: EventStore::new(),
            version: 0,
        };

        account.events.emit(Event::ContractReserved {
            contract_id: account.contract.id,
            amount: account.contract.amount,
            financed_principal: account.contract.financed_principal(),
            installment_count: account.installments.len() as u32,
            timestamp: time.now(),
        });

        Ok(account)
    }

    pub fn installments(&self) -> &[Installment] {
        &self.installments
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn find_installment(&self, id: InstallmentId) -> Option<&Installment> {
        self.installments.iter().find(|i| i.id == id)
    }

    pub fn find_payment(&self, id: PaymentId) -> Option<&Payment> {
        self.payments.iter().find(|p| p.id == id)
    }

    /// pending rows past their due date at `as_of`, with the derived day
    /// count; paid and readjusted rows never count as overdue
    pub fn overdue_installments(&self, as_of: chrono::NaiveDate) -> Vec<(InstallmentId, u32)> {
        self.installments
            .iter()
            .filter(|i| moratory::is_overdue(i, as_of))
            .map(|i| (i.id, moratory::overdue_days(i.due_date, as_of)))
            .collect()
    }

    /// sum of actionable periodic obligations still outstanding
    pub fn pending_sum(&self) -> Money {
        self.pending_schedule_indexes()
            .into_iter()
            .map(|i| self.installments[i].amount)
            .sum()
    }

    pub fn snapshot(&self) -> ContractSnapshot {
        ContractSnapshot {
            contract: self.contract.clone(),
            installments: self.installments.clone(),
            ledger: self.ledger.entries().to_vec(),
            version: self.version,
        }
    }

    /// read-only consistency audit
    pub fn reconcile(&self) -> Result<()> {
        Reconciler::verify(&self.contract, &self.ledger)
    }

    /// apply a payment against one pending installment
    pub fn apply_payment(
        &mut self,
        installment_id: InstallmentId,
        principal: Money,
        interest: Money,
        time: &SafeTimeProvider,
    ) -> Result<Payment> {
        self.ensure_open()?;

        let idx = self.installment_index(installment_id)?;
        match self.installments[idx].status {
            InstallmentStatus::Pending => {}
            InstallmentStatus::Paid => {
                return Err(ContractError::AlreadyPaid { id: installment_id })
            }
            InstallmentStatus::Readjustment => {
                return Err(ContractError::ReadjustedInstallment { id: installment_id })
            }
        }

        let paid_amount = principal + interest;
        if !paid_amount.is_positive() {
            return Err(ContractError::NonPositiveAmount { amount: paid_amount });
        }

        let now = time.now();
        let payment = Payment {
            id: Uuid::new_v4(),
            installment_id,
            amount: principal,
            interest_amount: interest,
            paid_amount,
            status: PaymentStatus::Paid,
            payment_date: now,
            approved_at: Some(now),
        };

        {
            let installment = &mut self.installments[idx];
            installment.paid_amount = paid_amount;
            installment.status = InstallmentStatus::Paid;
            installment.payment_id = Some(payment.id);
            installment.payment_date = Some(now);
        }

        self.post_entry(
            EntryType::Payment,
            paid_amount,
            Some(payment.id),
            format!("payment on installment #{}", self.installments[idx].number),
            now,
        )?;

        self.events.emit(Event::PaymentApplied {
            contract_id: self.contract.id,
            installment_id,
            payment_id: payment.id,
            paid_amount,
            extra_amount: self.installments[idx].extra_amount(),
            new_balance: self.contract.balance,
            timestamp: now,
        });

        self.payments.push(payment.clone());
        self.reconcile()?;
        Ok(payment)
    }

    /// revert a payment, appending a compensating ledger entry
    ///
    /// Undo on an already-pending installment is `NotPaid`, never a silent
    /// success; a second undo would double-credit the balance.
    pub fn undo_payment(&mut self, payment_id: PaymentId, time: &SafeTimeProvider) -> Result<()> {
        self.ensure_open()?;

        let payment_idx = self
            .payments
            .iter()
            .position(|p| p.id == payment_id)
            .ok_or(ContractError::PaymentNotFound { id: payment_id })?;
        let installment_id = self.payments[payment_idx].installment_id;
        let idx = self.installment_index(installment_id)?;

        if self.installments[idx].payment_type == PaymentType::CapitalRepayment {
            return Err(ContractError::CapitalRepaymentNotReversible { id: payment_id });
        }
        // a stale payment (reversed earlier, or superseded) no longer owns the row
        if !self.installments[idx].is_paid()
            || self.installments[idx].payment_id != Some(payment_id)
        {
            return Err(ContractError::NotPaid { id: installment_id });
        }

        let reversed_amount = self.payments[payment_idx].paid_amount;
        let now = time.now();

        {
            let installment = &mut self.installments[idx];
            installment.status = InstallmentStatus::Pending;
            installment.paid_amount = Money::ZERO;
            installment.payment_id = None;
            installment.payment_date = None;
        }
        self.payments[payment_idx].status = PaymentStatus::Pending;

        self.post_entry(
            EntryType::Reversal,
            -reversed_amount,
            Some(payment_id),
            format!("reversal of payment on installment #{}", self.installments[idx].number),
            now,
        )?;

        self.events.emit(Event::PaymentReversed {
            contract_id: self.contract.id,
            installment_id,
            payment_id,
            amount: reversed_amount,
            new_balance: self.contract.balance,
            timestamp: now,
        });

        self.reconcile()
    }

    /// apply an out-of-schedule principal reduction and re-amortize the
    /// remaining pending installments
    ///
    /// Pending rows are never edited in place: each one is frozen as
    /// `Readjustment` and replaced by a new pending row carrying the
    /// recomputed amount and the original due date, so every
    /// re-amortization generation stays auditable. Paid history is
    /// untouched. A full payoff leaves zero-amount replacement rows in
    /// place rather than dropping them.
    pub fn apply_capital_repayment(
        &mut self,
        extra_principal: Money,
        time: &SafeTimeProvider,
    ) -> Result<CapitalRepayment> {
        if !extra_principal.is_positive() {
            return Err(ContractError::NonPositiveAmount { amount: extra_principal });
        }
        self.ensure_open()?;
        if !self.contract.can_edit_schedule() {
            return Err(ContractError::ScheduleLocked { status: self.contract.status });
        }

        let pending = self.pending_schedule_indexes();
        if pending.is_empty() {
            return Err(ContractError::NoPendingInstallments);
        }

        let old_pending_sum: Money = pending.iter().map(|&i| self.installments[i].amount).sum();
        let new_remaining = (old_pending_sum - extra_principal).max(Money::ZERO);
        let shares = new_remaining
            .split_even(pending.len() as u32)
            .ok_or_else(|| ContractError::CalculationError {
                message: format!(
                    "cannot split {new_remaining} across {} installments",
                    pending.len()
                ),
            })?;

        let now = time.now();
        let today = now.date_naive();

        // the repayment itself is recorded as a paid sentinel row plus a
        // payment, so the cash received shows up in the schedule history
        let capital_row_id = Uuid::new_v4();
        let payment = Payment {
            id: Uuid::new_v4(),
            installment_id: capital_row_id,
            amount: extra_principal,
            interest_amount: Money::ZERO,
            paid_amount: extra_principal,
            status: PaymentStatus::Paid,
            payment_date: now,
            approved_at: Some(now),
        };
        let capital_row = Installment {
            id: capital_row_id,
            number: CAPITAL_REPAYMENT_NUMBER,
            due_date: today,
            amount: extra_principal,
            interest_amount: Money::ZERO,
            paid_amount: extra_principal,
            status: InstallmentStatus::Paid,
            payment_type: PaymentType::CapitalRepayment,
            payment_id: Some(payment.id),
            replaces: None,
            payment_date: Some(now),
        };

        self.post_entry(
            EntryType::CapitalRepayment,
            extra_principal,
            Some(payment.id),
            "capital repayment against outstanding principal".to_string(),
            now,
        )?;

        let mut pairs = Vec::with_capacity(pending.len());
        let mut replacements = Vec::with_capacity(pending.len());
        for (&idx, share) in pending.iter().zip(shares) {
            let superseded = {
                let row = &mut self.installments[idx];
                row.status = InstallmentStatus::Readjustment;
                row.clone()
            };

            let replacement = Installment {
                id: Uuid::new_v4(),
                number: superseded.number,
                due_date: superseded.due_date,
                amount: share,
                interest_amount: superseded.interest_amount,
                paid_amount: Money::ZERO,
                status: InstallmentStatus::Pending,
                payment_type: PaymentType::Installment,
                payment_id: None,
                replaces: Some(superseded.id),
                payment_date: None,
            };

            self.events.emit(Event::InstallmentReadjusted {
                contract_id: self.contract.id,
                superseded: superseded.id,
                replacement: replacement.id,
                old_amount: superseded.amount,
                new_amount: replacement.amount,
                timestamp: now,
            });

            pairs.push(ReadjustedInstallment {
                superseded,
                replacement: replacement.clone(),
            });
            replacements.push(replacement);
        }

        self.installments.push(capital_row);
        self.installments.extend(replacements);
        self.payments.push(payment.clone());

        self.events.emit(Event::CapitalRepaymentApplied {
            contract_id: self.contract.id,
            payment_id: payment.id,
            amount: extra_principal,
            new_balance: self.contract.balance,
            affected_installments: pairs.len() as u32,
            timestamp: now,
        });

        self.reconcile()?;
        Ok(CapitalRepayment {
            payment_id: payment.id,
            amount: extra_principal,
            new_balance: self.contract.balance,
            affected_installments: pairs.len() as u32,
            installments: pairs,
        })
    }

    /// manual, audited override of an installment's moratory interest
    pub fn update_moratory(
        &mut self,
        installment_id: InstallmentId,
        new_interest: Money,
        time: &SafeTimeProvider,
    ) -> Result<Installment> {
        self.ensure_open()?;
        if new_interest.is_negative() {
            return Err(ContractError::NonPositiveAmount { amount: new_interest });
        }

        let idx = self.installment_index(installment_id)?;
        match self.installments[idx].status {
            InstallmentStatus::Pending => {}
            InstallmentStatus::Paid => {
                return Err(ContractError::AlreadyPaid { id: installment_id })
            }
            InstallmentStatus::Readjustment => {
                return Err(ContractError::ReadjustedInstallment { id: installment_id })
            }
        }

        let old_interest = self.installments[idx].interest_amount;
        self.installments[idx].interest_amount = new_interest;

        self.events.emit(Event::MoratoryUpdated {
            contract_id: self.contract.id,
            installment_id,
            old_interest,
            new_interest,
            timestamp: time.now(),
        });

        Ok(self.installments[idx].clone())
    }

    /// administrative status change; closing goes through `close`
    pub fn update_status(
        &mut self,
        new_status: ContractStatus,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        self.ensure_open()?;
        if new_status == ContractStatus::Closed {
            return self.close(time);
        }

        let old_status = self.contract.status;
        self.contract.status = new_status;
        self.events.emit(Event::StatusChanged {
            contract_id: self.contract.id,
            old_status,
            new_status,
            timestamp: time.now(),
        });
        Ok(())
    }

    /// close a fully-paid contract; closed contracts are immutable
    pub fn close(&mut self, time: &SafeTimeProvider) -> Result<()> {
        self.ensure_open()?;
        if !self.contract.balance.is_zero() {
            return Err(ContractError::BalanceOutstanding {
                balance: self.contract.balance,
            });
        }

        let old_status = self.contract.status;
        self.contract.status = ContractStatus::Closed;
        let now = time.now();
        self.events.emit(Event::StatusChanged {
            contract_id: self.contract.id,
            old_status,
            new_status: ContractStatus::Closed,
            timestamp: now,
        });
        self.events.emit(Event::ContractClosed {
            contract_id: self.contract.id,
            timestamp: now,
        });
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.contract.is_closed() {
            return Err(ContractError::ContractClosed { id: self.contract.id });
        }
        Ok(())
    }

    fn installment_index(&self, id: InstallmentId) -> Result<usize> {
        self.installments
            .iter()
            .position(|i| i.id == id)
            .ok_or(ContractError::InstallmentNotFound { id })
    }

    /// ordered indexes of the actionable periodic rows, the subset the
    /// re-amortizer may redistribute over
    fn pending_schedule_indexes(&self) -> Vec<usize> {
        let mut indexes: Vec<usize> = self
            .installments
            .iter()
            .enumerate()
            .filter(|(_, i)| i.is_pending() && i.payment_type == PaymentType::Installment)
            .map(|(idx, _)| idx)
            .collect();
        indexes.sort_by_key(|&idx| self.installments[idx].number);
        indexes
    }

    fn post_entry(
        &mut self,
        entry_type: EntryType,
        amount: Money,
        payment_id: Option<PaymentId>,
        description: String,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let entry = LedgerEntry::new(entry_type, amount, payment_id, description, now);
        let entry_id = entry.id;
        Reconciler::post(&mut self.contract, &mut self.ledger, entry)?;
        self.events.emit(Event::LedgerEntryPosted {
            contract_id: self.contract.id,
            entry_id,
            entry_type,
            amount,
            new_balance: self.contract.balance,
            timestamp: now,
        });
        Ok(())
    }
}
