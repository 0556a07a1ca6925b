use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{
    ContractId, ContractStatus, FinancingType, InstallmentId, InstallmentStatus, PaymentId,
    PaymentStatus, PaymentType,
};

/// ordinal used for out-of-schedule capital-repayment rows
pub const CAPITAL_REPAYMENT_NUMBER: u32 = 0;

/// a financed sale contract
///
/// `balance` is the authoritative remaining debt; it is written only by the
/// ledger reconciler so that `balance == amount - sum(ledger entries)` holds
/// after every operation (clamped at zero on overpayment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    /// total sale price
    pub amount: Money,
    pub reserve_amount: Money,
    pub down_payment: Money,
    pub financing_type: FinancingType,
    /// months, direct financing only
    pub payment_term: Option<u32>,
    pub interest_rate: Rate,
    pub status: ContractStatus,
    /// authoritative remaining debt
    pub balance: Money,
    pub start_date: NaiveDate,
    /// single balance-due deadline for bank/cash financing
    pub max_payment_date: Option<NaiveDate>,
}

impl Contract {
    /// principal covered by the periodic schedule
    pub fn financed_principal(&self) -> Money {
        let deductions = match self.financing_type {
            FinancingType::Direct => self.reserve_amount + self.down_payment,
            FinancingType::Bank | FinancingType::Cash => self.reserve_amount,
        };
        self.amount - deductions
    }

    pub fn can_edit_schedule(&self) -> bool {
        self.status.can_edit_schedule()
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_closed()
    }
}

/// terms supplied at reservation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractTerms {
    pub amount: Money,
    pub reserve_amount: Money,
    pub down_payment: Money,
    pub financing_type: FinancingType,
    pub payment_term: Option<u32>,
    pub interest_rate: Rate,
    pub start_date: NaiveDate,
    pub max_payment_date: Option<NaiveDate>,
}

impl ContractTerms {
    /// seller-financed sale with a periodic schedule
    pub fn direct(
        amount: Money,
        reserve_amount: Money,
        down_payment: Money,
        payment_term: u32,
        interest_rate: Rate,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            amount,
            reserve_amount,
            down_payment,
            financing_type: FinancingType::Direct,
            payment_term: Some(payment_term),
            interest_rate,
            start_date,
            max_payment_date: None,
        }
    }

    /// bank-financed sale, single balance-due deadline
    pub fn bank(
        amount: Money,
        reserve_amount: Money,
        start_date: NaiveDate,
        max_payment_date: NaiveDate,
    ) -> Self {
        Self {
            amount,
            reserve_amount,
            down_payment: Money::ZERO,
            financing_type: FinancingType::Bank,
            payment_term: None,
            interest_rate: Rate::ZERO,
            start_date,
            max_payment_date: Some(max_payment_date),
        }
    }

    /// cash sale, single balance-due deadline
    pub fn cash(
        amount: Money,
        reserve_amount: Money,
        start_date: NaiveDate,
        max_payment_date: NaiveDate,
    ) -> Self {
        Self {
            amount,
            reserve_amount,
            down_payment: Money::ZERO,
            financing_type: FinancingType::Cash,
            payment_term: None,
            interest_rate: Rate::ZERO,
            start_date,
            max_payment_date: Some(max_payment_date),
        }
    }
}

/// one scheduled obligation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    /// ordinal within the schedule; 0 for capital-repayment rows
    pub number: u32,
    pub due_date: NaiveDate,
    /// principal portion
    pub amount: Money,
    /// moratory/penalty portion
    pub interest_amount: Money,
    pub paid_amount: Money,
    pub status: InstallmentStatus,
    pub payment_type: PaymentType,
    /// active satisfying payment, at most one at a time
    pub payment_id: Option<PaymentId>,
    /// frozen row this one replaced during a re-amortization
    pub replaces: Option<InstallmentId>,
    pub payment_date: Option<DateTime<Utc>>,
}

impl Installment {
    pub fn expected_total(&self) -> Money {
        self.amount + self.interest_amount
    }

    /// overpayment retained on this installment, zero when not overpaid
    pub fn extra_amount(&self) -> Money {
        (self.paid_amount - self.expected_total()).max(Money::ZERO)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status, InstallmentStatus::Pending)
    }

    pub fn is_paid(&self) -> bool {
        matches!(self.status, InstallmentStatus::Paid)
    }

    /// frozen rows are excluded from payment, undo, and moratory operations
    pub fn is_readjusted(&self) -> bool {
        matches!(self.status, InstallmentStatus::Readjustment)
    }
}

/// a payment application event, the unit the undo operation targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub installment_id: InstallmentId,
    /// principal portion
    pub amount: Money,
    /// moratory portion
    pub interest_amount: Money,
    /// actual cash received: amount + interest_amount
    pub paid_amount: Money,
    pub status: PaymentStatus,
    pub payment_date: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl Payment {
    pub fn is_active(&self) -> bool {
        matches!(self.status, PaymentStatus::Paid)
    }
}
