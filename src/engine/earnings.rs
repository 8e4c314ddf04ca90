use crate::domain::{CommissionStatus, Decimal, EarningsSummary};

/// Fold (status, amount) rows into an earnings summary.
///
/// Cancelled records count towards `commissions_count` only.
pub fn summarize_amounts(rows: &[(CommissionStatus, Decimal)]) -> EarningsSummary {
    let mut total_pending = Decimal::zero();
    let mut total_approved = Decimal::zero();

    for (status, amount) in rows {
        match status {
            CommissionStatus::Pending => total_pending = total_pending + *amount,
            CommissionStatus::Approved => total_approved = total_approved + *amount,
            CommissionStatus::Cancelled => {}
        }
    }

    EarningsSummary {
        total_pending,
        total_approved,
        total_earnings: total_pending + total_approved,
        commissions_count: rows.len() as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(summarize_amounts(&[]), EarningsSummary::default());
    }

    #[test]
    fn test_cancelled_excluded_from_totals() {
        let rows = vec![
            (CommissionStatus::Pending, Decimal::from_units(3000)),
            (CommissionStatus::Approved, Decimal::from_units(1200)),
            (CommissionStatus::Cancelled, Decimal::from_units(9999)),
            (CommissionStatus::Pending, Decimal::from_units(500)),
        ];
        let summary = summarize_amounts(&rows);
        assert_eq!(summary.total_pending, Decimal::from_units(3500));
        assert_eq!(summary.total_approved, Decimal::from_units(1200));
        assert_eq!(summary.total_earnings, Decimal::from_units(4700));
        assert_eq!(summary.commissions_count, 4);
    }
}
