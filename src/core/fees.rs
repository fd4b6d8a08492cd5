//! Transfer fee policy
//!
//! Fees are keyed by the type of the account the money leaves. The computed fee
//! is rounded to cents, half away from zero, and is retained by the bank: the
//! source is debited amount + fee, the destination credited amount.

use crate::types::AccountType;
use rust_decimal::{Decimal, RoundingStrategy};

/// Savings accounts pay 1.5% on outgoing internal transfers
pub const DEFAULT_SAVINGS_FEE_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 3);

const FEE_SCALE: u32 = 2;

pub trait FeePolicy: Send + Sync {
    /// Fee charged for moving `amount` out of an account of `account_type`
    fn fee(&self, account_type: AccountType, amount: Decimal) -> Decimal;
}

/// Flat percentage per account type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccountTypeFeePolicy {
    chequing_rate: Decimal,
    savings_rate: Decimal,
}

impl AccountTypeFeePolicy {
    pub fn new(chequing_rate: Decimal, savings_rate: Decimal) -> Self {
        Self {
            chequing_rate,
            savings_rate,
        }
    }

    fn rate(&self, account_type: AccountType) -> Decimal {
        match account_type {
            AccountType::Chequing => self.chequing_rate,
            AccountType::Savings => self.savings_rate,
        }
    }
}

impl Default for AccountTypeFeePolicy {
    fn default() -> Self {
        Self::new(Decimal::ZERO, DEFAULT_SAVINGS_FEE_RATE)
    }
}

impl FeePolicy for AccountTypeFeePolicy {
    fn fee(&self, account_type: AccountType, amount: Decimal) -> Decimal {
        let rate = self.rate(account_type);
        if rate.is_zero() {
            return Decimal::ZERO;
        }
        amount
            .checked_mul(rate)
            .map(|fee| {
                fee.round_dp_with_strategy(FEE_SCALE, RoundingStrategy::MidpointAwayFromZero)
            })
            // An amount too large to multiply cannot be covered by any balance either
            .unwrap_or(Decimal::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_savings_rate_is_one_and_a_half_percent() {
        assert_eq!(DEFAULT_SAVINGS_FEE_RATE, dec!(0.015));
    }

    #[rstest]
    #[case::savings_round_amount(AccountType::Savings, dec!(100), dec!(1.50))]
    #[case::savings_rounds_half_up(AccountType::Savings, dec!(3), dec!(0.05))]
    #[case::savings_rounds_down(AccountType::Savings, dec!(0.20), dec!(0.00))]
    #[case::savings_large(AccountType::Savings, dec!(12345.67), dec!(185.19))]
    #[case::chequing_is_free(AccountType::Chequing, dec!(100), dec!(0))]
    fn test_default_fees(
        #[case] account_type: AccountType,
        #[case] amount: Decimal,
        #[case] expected: Decimal,
    ) {
        let policy = AccountTypeFeePolicy::default();
        assert_eq!(policy.fee(account_type, amount), expected);
    }

    #[test]
    fn test_custom_rates() {
        let policy = AccountTypeFeePolicy::new(dec!(0.01), dec!(0.02));
        assert_eq!(policy.fee(AccountType::Chequing, dec!(50)), dec!(0.50));
        assert_eq!(policy.fee(AccountType::Savings, dec!(50)), dec!(1.00));
    }
}
