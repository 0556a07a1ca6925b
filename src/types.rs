use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a contract
pub type ContractId = Uuid;

/// unique identifier for a schedule installment
pub type InstallmentId = Uuid;

/// unique identifier for a payment
pub type PaymentId = Uuid;

/// unique identifier for a ledger entry
pub type EntryId = Uuid;

/// how a sale is financed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancingType {
    /// seller-financed, periodic installment schedule
    Direct,
    /// bank financing, single balance-due deadline
    Bank,
    /// cash sale, single balance-due deadline
    Cash,
}

/// contract lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Pending,
    Submitted,
    Approved,
    Rejected,
    Closed,
    Cancelled,
}

impl ContractStatus {
    /// statuses under which the installment schedule may still be edited
    pub fn can_edit_schedule(&self) -> bool {
        matches!(
            self,
            ContractStatus::Pending | ContractStatus::Rejected | ContractStatus::Submitted
        )
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, ContractStatus::Closed)
    }
}

/// schedule row status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    /// unpaid, actionable obligation
    Pending,
    /// satisfied by an active payment
    Paid,
    /// superseded by a re-amortization, frozen for audit
    Readjustment,
}

/// what kind of obligation a schedule row represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Reservation,
    DownPayment,
    Installment,
    CapitalRepayment,
}

/// payment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// not active (never approved, or reversed by undo)
    Pending,
    Paid,
}

/// signed ledger entry classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// debt incurred (negative amount)
    Charge,
    /// cash received against an installment (positive amount)
    Payment,
    /// compensating entry appended by undo (negative amount)
    Reversal,
    /// out-of-schedule principal reduction (positive amount)
    CapitalRepayment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_edit_permissions() {
        assert!(ContractStatus::Pending.can_edit_schedule());
        assert!(ContractStatus::Submitted.can_edit_schedule());
        assert!(ContractStatus::Rejected.can_edit_schedule());
        assert!(!ContractStatus::Approved.can_edit_schedule());
        assert!(!ContractStatus::Closed.can_edit_schedule());
        assert!(!ContractStatus::Cancelled.can_edit_schedule());
    }

    #[test]
    fn test_entry_type_wire_names() {
        let json = serde_json::to_string(&EntryType::CapitalRepayment).unwrap();
        assert_eq!(json, "\"capital_repayment\"");
        let json = serde_json::to_string(&EntryType::Reversal).unwrap();
        assert_eq!(json, "\"reversal\"");
    }
}
