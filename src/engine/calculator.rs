use crate::domain::{CommissionRule, Decimal};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalculationError {
    #[error("unit price must be >= 0, got {0}")]
    NegativePrice(Decimal),
    #[error("quantity must be >= 0, got {0}")]
    NegativeQuantity(i64),
    #[error("commission amount overflowed")]
    Overflow,
}

/// Commission owed for one order line, rounded half-up to whole units.
///
/// - fixed: `fixed_amount * quantity`
/// - percentage: `unit_price * quantity * rate / 100`
///
/// # Errors
/// Rejects negative price or quantity, and arithmetic overflow.
pub fn calculate(
    rule: &CommissionRule,
    unit_price: Decimal,
    quantity: i64,
) -> Result<Decimal, CalculationError> {
    if unit_price.is_negative() {
        return Err(CalculationError::NegativePrice(unit_price));
    }
    if quantity < 0 {
        return Err(CalculationError::NegativeQuantity(quantity));
    }
    let qty = Decimal::from_units(quantity);

    let raw = match *rule {
        CommissionRule::Fixed { amount } => amount.checked_mul(qty),
        CommissionRule::Percentage { rate } => unit_price
            .checked_mul(qty)
            .and_then(|line_total| line_total.checked_mul(rate))
            .and_then(|scaled| scaled.checked_div(Decimal::hundred())),
    }
    .ok_or(CalculationError::Overflow)?;

    Ok(raw.round_half_up())
}
