use thiserror::Error;

use crate::decimal::Money;
use crate::types::{ContractId, ContractStatus, InstallmentId, PaymentId};

#[derive(Error, Debug)]
pub enum ContractError {
    // validation errors: rejected before any mutation
    #[error("non-positive amount: {amount}")]
    NonPositiveAmount { amount: Money },

    #[error("invalid payment term: {term} months")]
    InvalidTerm { term: u32 },

    #[error("insufficient principal to finance: {principal}")]
    InsufficientPrincipal { principal: Money },

    // state errors: specific kinds so callers can render a precise message
    #[error("installment already paid: {id}")]
    AlreadyPaid { id: InstallmentId },

    #[error("installment not paid: {id}")]
    NotPaid { id: InstallmentId },

    #[error("contract is closed: {id}")]
    ContractClosed { id: ContractId },

    #[error("schedule locked: contract status {status:?} does not permit edits")]
    ScheduleLocked { status: ContractStatus },

    #[error("installment superseded by readjustment: {id}")]
    ReadjustedInstallment { id: InstallmentId },

    #[error("capital repayment is not reversible: {id}")]
    CapitalRepaymentNotReversible { id: PaymentId },

    #[error("no pending installments to readjust")]
    NoPendingInstallments,

    #[error("balance outstanding: {balance}")]
    BalanceOutstanding { balance: Money },

    // lookup errors
    #[error("contract not found: {id}")]
    ContractNotFound { id: ContractId },

    #[error("installment not found: {id}")]
    InstallmentNotFound { id: InstallmentId },

    #[error("payment not found: {id}")]
    PaymentNotFound { id: PaymentId },

    // consistency errors: fatal to the operation, never auto-corrected
    #[error("ledger mismatch: expected balance {expected}, found {actual}")]
    LedgerMismatch { expected: Money, actual: Money },

    #[error("calculation error: {message}")]
    CalculationError { message: String },
}

pub type Result<T> = std::result::Result<T, ContractError>;
