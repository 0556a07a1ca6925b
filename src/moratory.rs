use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::contract::Installment;
use crate::decimal::{Money, Rate};

/// days an obligation has been overdue at `as_of`; zero when not yet due
pub fn overdue_days(due_date: NaiveDate, as_of: NaiveDate) -> u32 {
    (as_of - due_date).num_days().max(0) as u32
}

/// an installment is overdue iff it is still pending and past its due date
///
/// Paid and readjusted rows never count as overdue; the re-amortizer relies
/// on the same gate to leave them untouched.
pub fn is_overdue(installment: &Installment, as_of: NaiveDate) -> bool {
    installment.is_pending() && overdue_days(installment.due_date, as_of) > 0
}

/// advisory moratory interest at a simple daily rate
///
/// The engine never charges this on its own; the charged `interest_amount`
/// is a manual, audited override. This figure is surfaced alongside the
/// day count for display.
pub fn suggested_moratory(principal: Money, annual_rate: Rate, days: u32) -> Money {
    if days == 0 {
        return Money::ZERO;
    }
    let accrued =
        principal.as_decimal() * annual_rate.daily_rate().as_decimal() * Decimal::from(days);
    Money::from_decimal(accrued)
}
