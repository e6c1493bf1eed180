//! Expected profit-share calculation
//!
//! `expected = principal x annual rate x period_days / year_days`, computed
//! at full decimal precision. Rounding happens only in
//! [`round_for_report`], never mid-calculation, so aggregated figures do not
//! accumulate rounding error.

use bigdecimal::rounding::RoundingMode;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::profile::BankProfile;
use crate::types::DepositRecord;

/// Fallback annual rate (9%) when a profile's nisbah table has no entry for
/// a record's deposit type. Substitution is flagged so a MissingRate anomaly
/// lands on the affected outcome.
pub fn default_nisbah() -> BigDecimal {
    BigDecimal::from(9) / BigDecimal::from(100)
}

/// Result of the expected-value formula for one record
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedProfitShare {
    /// Expected amount at full precision
    pub amount: BigDecimal,
    /// Annual rate that was applied
    pub rate: BigDecimal,
    /// Day count that was applied
    pub period_days: i64,
    /// Whether the default rate was substituted for a missing table entry
    pub rate_fallback: bool,
}

/// Compute the profit share a bank should owe for one record
///
/// The placement period is the record's own `period_days` when the source
/// carried both dates; otherwise it is counted from the placement date
/// (exclusive) to the caller's reporting cutoff (inclusive), i.e. the plain
/// calendar-day difference. A non-positive period yields a zero expectation
/// rather than a negative one.
pub fn expected_profit_share(
    record: &DepositRecord,
    profile: &BankProfile,
    cutoff: NaiveDate,
) -> ExpectedProfitShare {
    let period_days = record.period_days.unwrap_or_else(|| {
        cutoff
            .signed_duration_since(record.placement_date)
            .num_days()
    });

    let (rate, rate_fallback) = match profile.nisbah_rate(record.deposit_type) {
        Some(rate) => (rate.clone(), false),
        None => (default_nisbah(), true),
    };

    let amount = if period_days > 0 {
        &record.principal * &rate * BigDecimal::from(period_days)
            / BigDecimal::from(profile.year_days)
    } else {
        BigDecimal::from(0)
    };

    ExpectedProfitShare {
        amount,
        rate,
        period_days,
        rate_fallback,
    }
}

/// Round an amount for report rendering: two fractional digits, half-up
pub fn round_for_report(amount: &BigDecimal) -> BigDecimal {
    amount.with_scale_round(2, RoundingMode::HalfUp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::presets;
    use crate::types::{DepositType, Provenance};

    fn record(principal: i64, period_days: Option<i64>) -> DepositRecord {
        DepositRecord {
            bank_code: "BTPN".to_string(),
            bilyet: "B001".to_string(),
            account_number: "7100012345".to_string(),
            principal: BigDecimal::from(principal),
            reported_profit_share: BigDecimal::from(0),
            deposit_type: DepositType::SetoranAwal,
            placement_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            maturity_date: None,
            period_days,
            provenance: Provenance::Bank,
        }
    }

    #[test]
    fn test_reference_scenario() {
        // 1,000,000 x 0.093 x 30 / 360 = 7,750
        let profile = presets::btpn_syariah();
        let expected = expected_profit_share(
            &record(1_000_000, Some(30)),
            &profile,
            NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
        );

        assert_eq!(expected.amount, BigDecimal::from(7_750));
        assert_eq!(expected.period_days, 30);
        assert!(!expected.rate_fallback);
    }

    #[test]
    fn test_linear_in_principal() {
        let profile = presets::btpn_syariah();
        let cutoff = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();

        let single = expected_profit_share(&record(1_000_000, Some(30)), &profile, cutoff);
        let double = expected_profit_share(&record(2_000_000, Some(30)), &profile, cutoff);

        assert_eq!(double.amount, single.amount * BigDecimal::from(2));
    }

    #[test]
    fn test_period_from_cutoff_when_dates_absent() {
        // Placement 01/04, cutoff 01/05: 30 days, placement date exclusive
        let profile = presets::btpn_syariah();
        let expected = expected_profit_share(
            &record(1_000_000, None),
            &profile,
            NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        );

        assert_eq!(expected.period_days, 30);
        assert_eq!(expected.amount, BigDecimal::from(7_750));
    }

    #[test]
    fn test_nonpositive_period_yields_zero() {
        let profile = presets::btpn_syariah();
        let expected = expected_profit_share(
            &record(1_000_000, None),
            &profile,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        );

        assert_eq!(expected.amount, BigDecimal::from(0));
        assert!(expected.period_days < 0);
    }

    #[test]
    fn test_missing_rate_falls_back_with_flag() {
        // BTPN's table has no DAU entry
        let profile = presets::btpn_syariah();
        let mut dau = record(1_000_000, Some(30));
        dau.deposit_type = DepositType::Dau;

        let expected = expected_profit_share(&dau, &profile, NaiveDate::MAX);
        assert!(expected.rate_fallback);
        assert_eq!(expected.rate, default_nisbah());
        // 1,000,000 x 0.09 x 30 / 360 = 7,500
        assert_eq!(expected.amount, BigDecimal::from(7_500));
    }

    #[test]
    fn test_no_rounding_mid_calculation() {
        // 100 x 0.093 x 7 / 360 is non-terminating at 2 digits; the full
        // value must be preserved and only the report helper may round.
        let profile = presets::btpn_syariah();
        let expected = expected_profit_share(&record(100, Some(7)), &profile, NaiveDate::MAX);

        assert_ne!(expected.amount, round_for_report(&expected.amount));
        assert_eq!(
            round_for_report(&expected.amount),
            BigDecimal::from(18) / BigDecimal::from(100)
        );
    }
}
