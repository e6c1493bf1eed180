//! Multi-bank orchestration and result aggregation
//!
//! Runs the adapt -> match -> classify pipeline once per requested bank.
//! Each bank is fully isolated: a profile or ingestion failure produces a
//! structured per-bank failure report and the remaining banks still run.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::profile::{BankProfile, ProfileRegistry};
use crate::traits::RowSource;
use crate::types::{
    DepositType, Provenance, RekonAnomaly, RekonError, RekonResult, RekonStatus,
    ReconciliationOutcome, Severity, SkippedRow,
};

use super::adapter::RecordAdapter;
use super::expected::expected_profit_share;
use super::matcher::{pair_records, MatchSet};
use super::variance::{VarianceClassifier, VarianceThresholds};

/// Per-deposit-type slice of a bank summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeBreakdown {
    pub count: usize,
    pub total_principal: BigDecimal,
    pub total_bank_amount: BigDecimal,
    pub total_bpkh_amount: BigDecimal,
    pub total_variance: BigDecimal,
}

impl TypeBreakdown {
    fn zero() -> Self {
        Self {
            count: 0,
            total_principal: BigDecimal::from(0),
            total_bank_amount: BigDecimal::from(0),
            total_bpkh_amount: BigDecimal::from(0),
            total_variance: BigDecimal::from(0),
        }
    }
}

/// Summary statistics for one bank's outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankSummary {
    pub bank_code: String,
    pub bank_name: String,
    pub total_outcomes: usize,
    pub matched: usize,
    pub difference: usize,
    pub not_found_in_bpkh: usize,
    pub not_found_in_bank: usize,
    pub excellent: usize,
    pub good: usize,
    pub warning: usize,
    pub critical: usize,
    /// Matched outcomes as a percentage of all outcomes
    pub match_rate: BigDecimal,
    pub total_principal: BigDecimal,
    pub total_bank_amount: BigDecimal,
    pub total_bpkh_amount: BigDecimal,
    /// Sum of signed differences
    pub total_variance: BigDecimal,
    /// Total variance as a percentage of the bank-reported total, when defined
    pub variance_pct: Option<BigDecimal>,
    pub by_type: HashMap<DepositType, TypeBreakdown>,
}

impl BankSummary {
    /// Aggregate one bank's outcome list
    pub fn from_outcomes(
        bank_code: &str,
        bank_name: &str,
        outcomes: &[ReconciliationOutcome],
    ) -> Self {
        let zero = BigDecimal::from(0);
        let mut summary = Self {
            bank_code: bank_code.to_string(),
            bank_name: bank_name.to_string(),
            total_outcomes: outcomes.len(),
            matched: 0,
            difference: 0,
            not_found_in_bpkh: 0,
            not_found_in_bank: 0,
            excellent: 0,
            good: 0,
            warning: 0,
            critical: 0,
            match_rate: zero.clone(),
            total_principal: zero.clone(),
            total_bank_amount: zero.clone(),
            total_bpkh_amount: zero.clone(),
            total_variance: zero.clone(),
            variance_pct: None,
            by_type: HashMap::new(),
        };

        for outcome in outcomes {
            match outcome.status {
                RekonStatus::Matched => summary.matched += 1,
                RekonStatus::Difference => summary.difference += 1,
                RekonStatus::NotFoundInBpkh => summary.not_found_in_bpkh += 1,
                RekonStatus::NotFoundInBank => summary.not_found_in_bank += 1,
            }
            match outcome.severity {
                Some(Severity::Excellent) => summary.excellent += 1,
                Some(Severity::Good) => summary.good += 1,
                Some(Severity::Warning) => summary.warning += 1,
                Some(Severity::Critical) => summary.critical += 1,
                None => {}
            }

            summary.total_principal += &outcome.principal;
            if let Some(amount) = &outcome.bank_amount {
                summary.total_bank_amount += amount;
            }
            if let Some(amount) = &outcome.bpkh_amount {
                summary.total_bpkh_amount += amount;
            }
            summary.total_variance += &outcome.difference;

            let slot = summary
                .by_type
                .entry(outcome.deposit_type)
                .or_insert_with(TypeBreakdown::zero);
            slot.count += 1;
            slot.total_principal += &outcome.principal;
            if let Some(amount) = &outcome.bank_amount {
                slot.total_bank_amount += amount;
            }
            if let Some(amount) = &outcome.bpkh_amount {
                slot.total_bpkh_amount += amount;
            }
            slot.total_variance += &outcome.difference;
        }

        if !outcomes.is_empty() {
            summary.match_rate = BigDecimal::from(summary.matched as u64)
                / BigDecimal::from(summary.total_outcomes as u64)
                * BigDecimal::from(100);
        }
        if summary.total_bank_amount != zero {
            summary.variance_pct = Some(
                &summary.total_variance / &summary.total_bank_amount * BigDecimal::from(100),
            );
        }

        summary
    }
}

/// Result of one bank's pipeline, success or failure
///
/// A failed bank carries an empty outcome list and the rendered error;
/// the engine never raises past this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankRunReport {
    pub bank_code: String,
    pub bank_name: String,
    pub outcomes: Vec<ReconciliationOutcome>,
    /// Absent when the bank failed before producing outcomes
    pub summary: Option<BankSummary>,
    /// Normalized record counts per side
    pub bank_record_count: usize,
    pub bpkh_record_count: usize,
    /// Rows skipped by the adapter, both sides
    pub skipped: Vec<SkippedRow>,
    /// Bank-level failure, when the pipeline aborted
    pub error: Option<String>,
}

impl BankRunReport {
    /// Whether this bank's pipeline ran to completion
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    fn failed(bank_code: &str, error: &RekonError) -> Self {
        Self {
            bank_code: bank_code.to_string(),
            bank_name: bank_code.to_string(),
            outcomes: Vec::new(),
            summary: None,
            bank_record_count: 0,
            bpkh_record_count: 0,
            skipped: Vec::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Overall quality rating for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KpiRating {
    #[serde(rename = "EXCELLENT")]
    Excellent,
    #[serde(rename = "GOOD")]
    Good,
    #[serde(rename = "FAIR")]
    Fair,
    #[serde(rename = "POOR")]
    Poor,
}

/// Cross-bank key performance indicators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RekonKpis {
    pub total_outcomes: usize,
    pub total_matched: usize,
    pub match_rate: BigDecimal,
    pub total_variance: BigDecimal,
    /// Absolute total variance over the bank-reported total, as a percentage
    pub variance_rate: BigDecimal,
    pub accuracy_score: BigDecimal,
    pub quality_score: BigDecimal,
    pub overall_score: BigDecimal,
    pub rating: KpiRating,
}

/// Aggregate report over a whole multi-bank run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiBankReport {
    pub run_id: Uuid,
    pub cutoff_date: NaiveDate,
    /// Per-bank results, in requested order (failed banks included)
    pub runs: Vec<BankRunReport>,
    /// All outcomes, stably ordered by bank code then bilyet
    pub consolidated: Vec<ReconciliationOutcome>,
}

impl MultiBankReport {
    /// Summaries of the banks that completed
    pub fn summaries(&self) -> Vec<&BankSummary> {
        self.runs.iter().filter_map(|r| r.summary.as_ref()).collect()
    }

    /// Banks whose pipeline failed
    pub fn failed_banks(&self) -> Vec<&BankRunReport> {
        self.runs.iter().filter(|r| !r.succeeded()).collect()
    }

    /// Outcomes with WARNING or CRITICAL severity, for exception reporting
    pub fn exceptions(&self) -> Vec<&ReconciliationOutcome> {
        self.consolidated
            .iter()
            .filter(|o| o.is_exception())
            .collect()
    }

    /// Key performance indicators across the completed banks
    pub fn kpis(&self) -> RekonKpis {
        let zero = BigDecimal::from(0);
        let hundred = BigDecimal::from(100);

        let mut total_outcomes = 0usize;
        let mut total_matched = 0usize;
        let mut total_variance = zero.clone();
        let mut total_bank_amount = zero.clone();

        for summary in self.summaries() {
            total_outcomes += summary.total_outcomes;
            total_matched += summary.matched;
            total_variance += &summary.total_variance;
            total_bank_amount += &summary.total_bank_amount;
        }

        let match_rate = if total_outcomes > 0 {
            BigDecimal::from(total_matched as u64) / BigDecimal::from(total_outcomes as u64)
                * &hundred
        } else {
            zero.clone()
        };

        let variance_rate = if total_bank_amount != zero {
            (&total_variance / &total_bank_amount * &hundred).abs()
        } else {
            zero.clone()
        };

        // One point off the quality score per 0.01% of variance
        let accuracy_score = match_rate.clone();
        let mut quality_score = &hundred - &variance_rate * &hundred;
        if quality_score < zero {
            quality_score = zero;
        }
        let overall_score = &accuracy_score * BigDecimal::from(6) / BigDecimal::from(10)
            + &quality_score * BigDecimal::from(4) / BigDecimal::from(10);

        let rating = if overall_score >= BigDecimal::from(95) {
            KpiRating::Excellent
        } else if overall_score >= BigDecimal::from(85) {
            KpiRating::Good
        } else if overall_score >= BigDecimal::from(70) {
            KpiRating::Fair
        } else {
            KpiRating::Poor
        };

        RekonKpis {
            total_outcomes,
            total_matched,
            match_rate,
            total_variance,
            variance_rate,
            accuracy_score,
            quality_score,
            overall_score,
            rating,
        }
    }

    /// Opaque JSON payload for the narrative-analysis collaborator
    ///
    /// Summary and KPI data only; the collaborator sees no row-level detail.
    pub fn narrative_payload(&self) -> RekonResult<String> {
        #[derive(Serialize)]
        struct Payload<'a> {
            run_id: &'a Uuid,
            cutoff_date: &'a NaiveDate,
            summaries: Vec<&'a BankSummary>,
            kpis: RekonKpis,
            exception_count: usize,
            failed_banks: Vec<&'a str>,
        }

        let payload = Payload {
            run_id: &self.run_id,
            cutoff_date: &self.cutoff_date,
            summaries: self.summaries(),
            kpis: self.kpis(),
            exception_count: self.exceptions().len(),
            failed_banks: self
                .failed_banks()
                .iter()
                .map(|r| r.bank_code.as_str())
                .collect(),
        };

        serde_json::to_string_pretty(&payload).map_err(|e| RekonError::Config(e.to_string()))
    }
}

/// Runs the reconciliation pipeline across a set of banks
///
/// Banks share no mutable state during a run; the default execution is
/// sequential but callers may fan individual banks out to parallel tasks
/// and merge the reports afterwards.
pub struct MultiBankOrchestrator<S: RowSource> {
    registry: ProfileRegistry,
    source: S,
    classifier: VarianceClassifier,
}

impl<S: RowSource> MultiBankOrchestrator<S> {
    /// Create an orchestrator with the default severity thresholds
    pub fn new(registry: ProfileRegistry, source: S) -> Self {
        Self {
            registry,
            source,
            classifier: VarianceClassifier::default(),
        }
    }

    /// Create an orchestrator with custom severity thresholds
    pub fn with_thresholds(
        registry: ProfileRegistry,
        source: S,
        thresholds: VarianceThresholds,
    ) -> RekonResult<Self> {
        Ok(Self {
            registry,
            source,
            classifier: VarianceClassifier::new(thresholds)?,
        })
    }

    pub fn registry(&self) -> &ProfileRegistry {
        &self.registry
    }

    /// Reconcile one bank, catching bank-level failures into the report
    pub async fn reconcile_bank(&self, bank_code: &str, cutoff: NaiveDate) -> BankRunReport {
        match self.run_bank(bank_code, cutoff).await {
            Ok(report) => report,
            Err(error) => {
                tracing::error!(bank = %bank_code, %error, "bank reconciliation failed");
                BankRunReport::failed(bank_code, &error)
            }
        }
    }

    /// Reconcile every requested bank and aggregate the results
    ///
    /// One bank's failure never prevents the others from running.
    pub async fn reconcile_all(&self, bank_codes: &[&str], cutoff: NaiveDate) -> MultiBankReport {
        let mut runs = Vec::with_capacity(bank_codes.len());
        for bank_code in bank_codes {
            runs.push(self.reconcile_bank(bank_code, cutoff).await);
        }

        let mut consolidated: Vec<ReconciliationOutcome> = runs
            .iter()
            .flat_map(|run| run.outcomes.iter().cloned())
            .collect();
        consolidated.sort_by(|a, b| {
            a.bank_code
                .cmp(&b.bank_code)
                .then_with(|| a.bilyet.cmp(&b.bilyet))
        });

        let report = MultiBankReport {
            run_id: Uuid::new_v4(),
            cutoff_date: cutoff,
            runs,
            consolidated,
        };
        tracing::info!(
            run_id = %report.run_id,
            banks = bank_codes.len(),
            outcomes = report.consolidated.len(),
            exceptions = report.exceptions().len(),
            "multi-bank reconciliation complete"
        );
        report
    }

    async fn run_bank(&self, bank_code: &str, cutoff: NaiveDate) -> RekonResult<BankRunReport> {
        let profile = self.registry.get(bank_code)?;
        tracing::info!(bank = %bank_code, "starting reconciliation");

        let bank_rows = self.source.fetch_rows(bank_code, Provenance::Bank).await?;
        let bpkh_rows = self.source.fetch_rows(bank_code, Provenance::Bpkh).await?;

        let adapter = RecordAdapter::new(profile);
        let bank_batch = adapter.adapt(&bank_rows, Provenance::Bank);
        let bpkh_batch = adapter.adapt(&bpkh_rows, Provenance::Bpkh);

        let bank_record_count = bank_batch.records.len();
        let bpkh_record_count = bpkh_batch.records.len();
        let mut skipped = bank_batch.skipped;
        skipped.extend(bpkh_batch.skipped);
        tracing::info!(
            bank = %bank_code,
            bank_records = bank_record_count,
            bpkh_records = bpkh_record_count,
            skipped = skipped.len(),
            "normalized record batches"
        );

        let matches = pair_records(bank_batch.records, bpkh_batch.records);
        let outcomes = self.assemble_outcomes(profile, &matches, cutoff);
        let summary =
            BankSummary::from_outcomes(&profile.bank_code, &profile.bank_name, &outcomes);
        tracing::info!(
            bank = %bank_code,
            outcomes = outcomes.len(),
            matched = summary.matched,
            "reconciliation finished"
        );

        Ok(BankRunReport {
            bank_code: profile.bank_code.clone(),
            bank_name: profile.bank_name.clone(),
            outcomes,
            summary: Some(summary),
            bank_record_count,
            bpkh_record_count,
            skipped,
            error: None,
        })
    }

    /// Turn a match set into the final outcome list
    ///
    /// Expected profit share is computed for every bank-side record so that
    /// missing-rate anomalies land on the outcomes they affect.
    fn assemble_outcomes(
        &self,
        profile: &BankProfile,
        matches: &MatchSet,
        cutoff: NaiveDate,
    ) -> Vec<ReconciliationOutcome> {
        let capacity =
            matches.pairs.len() + matches.bank_only.len() + matches.bpkh_only.len();
        let mut outcomes = Vec::with_capacity(capacity);

        for pair in &matches.pairs {
            let expected = expected_profit_share(&pair.bank, profile, cutoff);
            let mut anomalies = matches.anomalies_for(&pair.bank.bilyet);
            if expected.rate_fallback {
                anomalies.push(self.missing_rate(profile, &pair.bank.bilyet, pair.bank.deposit_type));
            }
            outcomes.push(
                self.classifier
                    .classify_pair(pair, Some(expected.amount), anomalies),
            );
        }

        for record in &matches.bank_only {
            let expected = expected_profit_share(record, profile, cutoff);
            let mut anomalies = matches.anomalies_for(&record.bilyet);
            if expected.rate_fallback {
                anomalies.push(self.missing_rate(profile, &record.bilyet, record.deposit_type));
            }
            outcomes.push(
                self.classifier
                    .classify_orphan(record, Some(expected.amount), anomalies),
            );
        }

        for record in &matches.bpkh_only {
            let anomalies = matches.anomalies_for(&record.bilyet);
            outcomes.push(self.classifier.classify_orphan(record, None, anomalies));
        }

        outcomes
    }

    fn missing_rate(
        &self,
        profile: &BankProfile,
        bilyet: &str,
        deposit_type: DepositType,
    ) -> RekonAnomaly {
        tracing::warn!(
            bank = %profile.bank_code,
            bilyet = %bilyet,
            deposit_type = %deposit_type,
            "no nisbah rate configured, default applied"
        );
        RekonAnomaly::MissingRate { deposit_type }
    }
}
