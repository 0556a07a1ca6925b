pub mod account;
pub mod contract;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod moratory;
pub mod schedule;
pub mod store;
pub mod types;

// re-export key types
pub use account::{CapitalRepayment, ContractAccount, ContractSnapshot, ReadjustedInstallment};
pub use contract::{Contract, ContractTerms, Installment, Payment, CAPITAL_REPAYMENT_NUMBER};
pub use decimal::{Money, Rate};
pub use errors::{ContractError, Result};
pub use events::{Event, EventStore};
pub use ledger::{Ledger, LedgerEntry, Reconciler};
pub use moratory::{is_overdue, overdue_days, suggested_moratory};
pub use store::ContractStore;
pub use types::{
    ContractId, ContractStatus, EntryId, EntryType, FinancingType, InstallmentId,
    InstallmentStatus, PaymentId, PaymentStatus, PaymentType,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
