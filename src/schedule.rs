use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::contract::Contract;
use crate::contract::Installment;
use crate::decimal::Money;
use crate::errors::{ContractError, Result};
use crate::types::{FinancingType, InstallmentStatus, PaymentType};

/// build the initial ordered installment schedule from contract terms
///
/// Direct financing produces `payment_term` rows of
/// `financed_principal / payment_term` each, Money-safe division with the
/// remainder on the last row so the rows sum exactly to the principal.
/// Bank/cash financing produces no periodic rows; the contract's
/// `max_payment_date` tracks the single balance-due deadline instead.
pub fn generate(contract: &Contract) -> Result<Vec<Installment>> {
    match contract.financing_type {
        FinancingType::Direct => generate_direct(contract),
        FinancingType::Bank | FinancingType::Cash => Ok(Vec::new()),
    }
}

fn generate_direct(contract: &Contract) -> Result<Vec<Installment>> {
    let term = contract.payment_term.unwrap_or(0);
    if term == 0 {
        return Err(ContractError::InvalidTerm { term });
    }

    let principal = contract.financed_principal();
    if !principal.is_positive() {
        return Err(ContractError::InsufficientPrincipal { principal });
    }

    let amounts = principal
        .split_even(term)
        .ok_or_else(|| ContractError::CalculationError {
            message: format!("cannot split {principal} into {term} installments"),
        })?;

    let installments = amounts
        .into_iter()
        .enumerate()
        .map(|(i, amount)| Installment {
            id: Uuid::new_v4(),
            number: i as u32 + 1,
            due_date: add_months(contract.start_date, i as u32 + 1),
            amount,
            interest_amount: Money::ZERO,
            paid_amount: Money::ZERO,
            status: InstallmentStatus::Pending,
            payment_type: PaymentType::Installment,
            payment_id: None,
            replaces: None,
            payment_date: None,
        })
        .collect();

    Ok(installments)
}

/// calendar month addition, clamping the day to the target month's length
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::types::ContractStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn direct_contract(amount: i64, reserve: i64, down: i64, term: u32) -> Contract {
        Contract {
            id: Uuid::new_v4(),
            amount: Money::from_major(amount),
            reserve_amount: Money::from_major(reserve),
            down_payment: Money::from_major(down),
            financing_type: FinancingType::Direct,
            payment_term: Some(term),
            interest_rate: Rate::ZERO,
            status: ContractStatus::Pending,
            balance: Money::from_major(amount),
            start_date: date(2025, 1, 15),
            max_payment_date: None,
        }
    }

    #[test]
    fn test_even_schedule() {
        let contract = direct_contract(90_000, 0, 0, 12);
        let schedule = generate(&contract).unwrap();

        assert_eq!(schedule.len(), 12);
        for (i, row) in schedule.iter().enumerate() {
            assert_eq!(row.number, i as u32 + 1);
            assert_eq!(row.amount, Money::from_major(7_500));
            assert_eq!(row.status, InstallmentStatus::Pending);
            assert_eq!(row.payment_type, PaymentType::Installment);
        }
        assert_eq!(schedule[0].due_date, date(2025, 2, 15));
        assert_eq!(schedule[11].due_date, date(2026, 1, 15));
    }

    #[test]
    fn test_remainder_lands_on_last_row() {
        // 70000 - 10000 reserve - 10000 down = 50000 over 7 months
        let contract = direct_contract(70_000, 10_000, 10_000, 7);
        let schedule = generate(&contract).unwrap();

        assert_eq!(schedule.len(), 7);
        let total: Money = schedule.iter().map(|r| r.amount).sum();
        assert_eq!(total, Money::from_major(50_000));

        let head = schedule[0].amount;
        for row in &schedule[..6] {
            assert_eq!(row.amount, head);
        }
        assert!(schedule[6].amount >= head);
    }

    #[test]
    fn test_due_dates_clamp_month_end() {
        let mut contract = direct_contract(12_000, 0, 0, 3);
        contract.start_date = date(2025, 1, 31);
        let schedule = generate(&contract).unwrap();

        assert_eq!(schedule[0].due_date, date(2025, 2, 28));
        assert_eq!(schedule[1].due_date, date(2025, 3, 31));
        assert_eq!(schedule[2].due_date, date(2025, 4, 30));
    }

    #[test]
    fn test_zero_term_rejected() {
        let contract = direct_contract(90_000, 0, 0, 0);
        assert!(matches!(
            generate(&contract),
            Err(ContractError::InvalidTerm { term: 0 })
        ));
    }

    #[test]
    fn test_non_positive_principal_rejected() {
        let contract = direct_contract(10_000, 6_000, 4_000, 12);
        assert!(matches!(
            generate(&contract),
            Err(ContractError::InsufficientPrincipal { .. })
        ));
    }

    #[test]
    fn test_bank_financing_has_no_periodic_rows() {
        let contract = Contract {
            financing_type: FinancingType::Bank,
            payment_term: None,
            max_payment_date: Some(date(2025, 12, 1)),
            ..direct_contract(90_000, 0, 0, 12)
        };
        assert!(generate(&contract).unwrap().is_empty());
    }

    #[test]
    fn test_add_months_across_year_and_leap() {
        assert_eq!(add_months(date(2025, 11, 30), 3), date(2026, 2, 28));
        assert_eq!(add_months(date(2023, 12, 31), 2), date(2024, 2, 29));
        assert_eq!(add_months(date(2025, 6, 10), 12), date(2026, 6, 10));
    }
}
