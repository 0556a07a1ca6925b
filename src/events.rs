use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    ContractId, ContractStatus, EntryId, EntryType, InstallmentId, PaymentId,
};

/// all events emitted by contract operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // lifecycle events
    ContractReserved {
        contract_id: ContractId,
        amount: Money,
        financed_principal: Money,
        installment_count: u32,
        timestamp: DateTime<Utc>,
    },
    ContractClosed {
        contract_id: ContractId,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        contract_id: ContractId,
        old_status: ContractStatus,
        new_status: ContractStatus,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentApplied {
        contract_id: ContractId,
        installment_id: InstallmentId,
        payment_id: PaymentId,
        paid_amount: Money,
        extra_amount: Money,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },
    PaymentReversed {
        contract_id: ContractId,
        installment_id: InstallmentId,
        payment_id: PaymentId,
        amount: Money,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },

    // re-amortization events
    CapitalRepaymentApplied {
        contract_id: ContractId,
        payment_id: PaymentId,
        amount: Money,
        new_balance: Money,
        affected_installments: u32,
        timestamp: DateTime<Utc>,
    },
    InstallmentReadjusted {
        contract_id: ContractId,
        superseded: InstallmentId,
        replacement: InstallmentId,
        old_amount: Money,
        new_amount: Money,
        timestamp: DateTime<Utc>,
    },

    // moratory events
    MoratoryUpdated {
        contract_id: ContractId,
        installment_id: InstallmentId,
        old_interest: Money,
        new_interest: Money,
        timestamp: DateTime<Utc>,
    },

    // ledger events
    LedgerEntryPosted {
        contract_id: ContractId,
        entry_id: EntryId,
        entry_type: EntryType,
        amount: Money,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
