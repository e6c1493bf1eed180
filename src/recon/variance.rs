//! Variance computation and severity classification
//!
//! Thresholds are configuration, not constants: the severity ladder is
//! tunable per deployment without touching the engine.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    DepositRecord, Provenance, RekonAnomaly, RekonError, RekonResult, RekonStatus,
    ReconciliationOutcome, Severity,
};

use super::matcher::MatchedPair;

/// Severity thresholds on the absolute percentage variance
///
/// A matched pair is EXCELLENT up to `excellent_max`, GOOD up to `good_max`,
/// WARNING up to `warning_max`, CRITICAL beyond. Values are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VarianceThresholds {
    pub excellent_max: BigDecimal,
    pub good_max: BigDecimal,
    pub warning_max: BigDecimal,
}

impl Default for VarianceThresholds {
    /// 0.1% / 0.5% / 1.0%
    fn default() -> Self {
        Self {
            excellent_max: BigDecimal::from(1) / BigDecimal::from(10),
            good_max: BigDecimal::from(5) / BigDecimal::from(10),
            warning_max: BigDecimal::from(1),
        }
    }
}

impl VarianceThresholds {
    /// Validate that the ladder is positive and strictly ascending
    pub fn validate(&self) -> RekonResult<()> {
        if self.excellent_max <= BigDecimal::from(0) {
            return Err(RekonError::Config(
                "excellent_max must be positive".to_string(),
            ));
        }
        if self.good_max <= self.excellent_max || self.warning_max <= self.good_max {
            return Err(RekonError::Config(format!(
                "thresholds must ascend: excellent_max {} < good_max {} < warning_max {}",
                self.excellent_max, self.good_max, self.warning_max
            )));
        }
        Ok(())
    }

    fn severity_for(&self, pct_abs: &BigDecimal) -> Severity {
        if *pct_abs <= self.excellent_max {
            Severity::Excellent
        } else if *pct_abs <= self.good_max {
            Severity::Good
        } else if *pct_abs <= self.warning_max {
            Severity::Warning
        } else {
            Severity::Critical
        }
    }
}

/// Classifies matched pairs and orphans into final outcomes
#[derive(Debug, Clone)]
pub struct VarianceClassifier {
    thresholds: VarianceThresholds,
}

impl Default for VarianceClassifier {
    fn default() -> Self {
        Self {
            thresholds: VarianceThresholds::default(),
        }
    }
}

impl VarianceClassifier {
    /// Create a classifier with validated thresholds
    pub fn new(thresholds: VarianceThresholds) -> RekonResult<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &VarianceThresholds {
        &self.thresholds
    }

    /// Classify a matched pair
    ///
    /// `difference = bank - bpkh`; the percentage uses the BPKH amount as
    /// denominator. A zero BPKH amount leaves the percentage undefined and
    /// forces DIFFERENCE/CRITICAL. Status is MATCHED exactly when severity
    /// is EXCELLENT or GOOD.
    pub fn classify_pair(
        &self,
        pair: &MatchedPair,
        expected_amount: Option<BigDecimal>,
        anomalies: Vec<RekonAnomaly>,
    ) -> ReconciliationOutcome {
        let bank_amount = pair.bank.reported_profit_share.clone();
        let bpkh_amount = pair.bpkh.reported_profit_share.clone();
        let difference = &bank_amount - &bpkh_amount;

        let zero = BigDecimal::from(0);
        let (percentage, severity) = if bpkh_amount == zero {
            (None, Severity::Critical)
        } else {
            let pct = &difference / &bpkh_amount * BigDecimal::from(100);
            let severity = self.thresholds.severity_for(&pct.abs());
            (Some(pct), severity)
        };

        let status = match severity {
            Severity::Excellent | Severity::Good => RekonStatus::Matched,
            Severity::Warning | Severity::Critical => RekonStatus::Difference,
        };

        ReconciliationOutcome {
            bank_code: pair.bank.bank_code.clone(),
            bilyet: pair.bank.bilyet.clone(),
            account_number: pair.bank.account_number.clone(),
            deposit_type: pair.bank.deposit_type,
            principal: pair.bank.principal.clone(),
            bank_amount: Some(bank_amount),
            bpkh_amount: Some(bpkh_amount),
            expected_amount,
            difference,
            percentage,
            status,
            severity: Some(severity),
            period: pair.bank.period_label(),
            anomalies,
        }
    }

    /// Outcome for a record present on one side only
    ///
    /// The record's provenance determines the not-found status. Severity and
    /// percentage stay undefined; the signed difference treats the missing
    /// side as zero.
    pub fn classify_orphan(
        &self,
        record: &DepositRecord,
        expected_amount: Option<BigDecimal>,
        anomalies: Vec<RekonAnomaly>,
    ) -> ReconciliationOutcome {
        let amount = record.reported_profit_share.clone();
        let (status, bank_amount, bpkh_amount, difference) = match record.provenance {
            Provenance::Bank => (
                RekonStatus::NotFoundInBpkh,
                Some(amount.clone()),
                None,
                amount,
            ),
            Provenance::Bpkh => (
                RekonStatus::NotFoundInBank,
                None,
                Some(amount.clone()),
                -amount,
            ),
        };

        ReconciliationOutcome {
            bank_code: record.bank_code.clone(),
            bilyet: record.bilyet.clone(),
            account_number: record.account_number.clone(),
            deposit_type: record.deposit_type,
            principal: record.principal.clone(),
            bank_amount,
            bpkh_amount,
            expected_amount,
            difference,
            percentage: None,
            status,
            severity: None,
            period: record.period_label(),
            anomalies,
        }
    }
}
