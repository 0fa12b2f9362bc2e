use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::BuildoutError;
use crate::types::{Money, Rate};
use crate::BuildoutResult;

/// Compounding factor (1 + rate)^periods for a whole number of periods.
pub fn compound_factor(rate: Rate, periods: i64) -> BuildoutResult<Decimal> {
    if rate <= dec!(-1) {
        return Err(BuildoutError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }
    (Decimal::ONE + rate)
        .checked_powi(periods)
        .ok_or_else(|| BuildoutError::InvalidInput {
            field: "periods".into(),
            reason: format!("Compounding over {periods} periods overflows"),
        })
}

/// Present value of a single amount received `periods` years from the base.
pub fn present_value(amount: Money, rate: Rate, periods: i64) -> BuildoutResult<Money> {
    let factor = compound_factor(rate, periods)?;
    if factor.is_zero() {
        return Err(BuildoutError::DivisionByZero {
            context: format!("discount factor at period {periods}"),
        });
    }
    amount
        .checked_div(factor)
        .ok_or_else(|| BuildoutError::InvalidInput {
            field: "amount".into(),
            reason: format!("Discounting over {periods} periods overflows"),
        })
}

/// Gordon growth terminal value: CF * (1 + g) / (r - g).
pub fn gordon_terminal_value(last_cash_flow: Money, rate: Rate, growth: Rate) -> BuildoutResult<Money> {
    let spread = rate - growth;
    if spread <= Decimal::ZERO {
        return Err(BuildoutError::FinancialImpossibility(format!(
            "Discount rate ({rate}) must exceed terminal growth ({growth})"
        )));
    }
    last_cash_flow
        .checked_mul(Decimal::ONE + growth)
        .and_then(|grown| grown.checked_div(spread))
        .ok_or_else(|| {
            BuildoutError::FinancialImpossibility(format!(
                "Terminal value overflows: spread between discount rate ({rate}) and terminal growth ({growth}) is too narrow"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compound_factor() {
        assert_eq!(compound_factor(dec!(0.10), 2).unwrap(), dec!(1.21));
        assert_eq!(compound_factor(dec!(0.10), 0).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_present_value_one_period() {
        assert_eq!(present_value(dec!(110), dec!(0.10), 1).unwrap(), dec!(100));
    }

    #[test]
    fn test_rate_at_minus_one_rejected() {
        assert!(present_value(dec!(100), dec!(-1), 3).is_err());
    }

    #[test]
    fn test_gordon_terminal_value() {
        // 100 * 1.03 / 0.07 ≈ 1471.43
        let tv = gordon_terminal_value(dec!(100), dec!(0.10), dec!(0.03)).unwrap();
        assert!((tv - dec!(1471.43)).abs() < dec!(0.01));
    }

    #[test]
    fn test_gordon_growth_not_below_rate_rejected() {
        let err = gordon_terminal_value(dec!(100), dec!(0.05), dec!(0.05)).unwrap_err();
        assert!(matches!(err, BuildoutError::FinancialImpossibility(_)));
        assert!(gordon_terminal_value(dec!(100), dec!(0.05), dec!(0.06)).is_err());
    }

    #[test]
    fn test_gordon_vanishing_spread_is_an_error() {
        let err = gordon_terminal_value(
            dec!(154.128),
            dec!(0.10),
            dec!(0.0999999999999999999999999999),
        )
        .unwrap_err();
        assert!(matches!(err, BuildoutError::FinancialImpossibility(_)));
    }

    #[test]
    fn test_gordon_narrow_spread_still_computes() {
        let tv = gordon_terminal_value(dec!(1), dec!(0.10), dec!(0.0999999)).unwrap();
        assert!(tv > dec!(1_000_000));
    }
}
