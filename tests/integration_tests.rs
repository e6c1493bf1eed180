//! Integration tests for rekon-core

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::collections::HashSet;

use rekon_core::profile::{presets, ProfileRegistry};
use rekon_core::utils::MemoryRowSource;
use rekon_core::{
    DepositType, KpiRating, MultiBankOrchestrator, MultiBankReport, NarrativeAnalyzer, Provenance,
    RawRow, RawValue, RekonAnomaly, RekonResult, RekonStatus, ReportSink, Severity,
    VarianceThresholds,
};

fn row(cells: &[(&str, RawValue)]) -> RawRow {
    cells
        .iter()
        .map(|(label, value)| (label.to_string(), value.clone()))
        .collect()
}

fn btpn_row(bilyet: &str, principal: f64, profit: f64, deposit_type: &str) -> RawRow {
    row(&[
        ("Nomor Bilyet", RawValue::from(bilyet)),
        ("Nomor Rekening", RawValue::from("7100012345")),
        ("Nominal Deposito", RawValue::from(principal)),
        ("Nominal Imbal Hasil", RawValue::from(profit)),
        ("Jenis Deposito", RawValue::from(deposit_type)),
        ("Tanggal Penempatan", RawValue::from("01/04/2025")),
        ("Tanggal Jatuh Tempo", RawValue::from("01/05/2025")),
    ])
}

fn bps_row(bilyet: &str, principal: f64, profit: f64) -> RawRow {
    row(&[
        ("Nomor Bilyet", RawValue::from(bilyet)),
        ("Nomor Rekening", RawValue::from("8200054321")),
        ("Nominal Deposito", RawValue::from(principal)),
        ("Nominal Imbal Hasil", RawValue::from(profit)),
        ("Jenis Dana", RawValue::from("Setoran Awal")),
        ("Tanggal Penempatan", RawValue::from("01/04/2025")),
        ("Tanggal Cair", RawValue::from("01/05/2025")),
    ])
}

/// Two-bank fixture exercising matches, orphans, duplicates, a zero BPKH
/// amount, and a missing nisbah rate.
fn fixture() -> MemoryRowSource {
    let source = MemoryRowSource::new();

    source.push_batch(
        "BTPN",
        Provenance::Bank,
        vec![
            btpn_row("B001", 1_000_000.0, 7_750.0, "SA"),
            // Duplicate bilyet: the first row wins, this one becomes an anomaly
            btpn_row("B001", 1_000_000.0, 9_999.0, "SA"),
            btpn_row("B002", 2_000_000.0, 15_500.0, "Setoran Lunas"),
            btpn_row("B003", 750_000.0, 5_000.0, "SA"),
            btpn_row("B005", 900_000.0, 8_000.0, "SA"),
            // BTPN's table has no DAU rate
            btpn_row("B006", 500_000.0, 3_750.0, "DAU"),
        ],
    );
    source.push_batch(
        "BTPN",
        Provenance::Bpkh,
        vec![
            btpn_row("B001", 1_000_000.0, 7_730.0, "SA"),
            btpn_row("B002", 2_000_000.0, 15_500.0, "SL"),
            btpn_row("B004", 600_000.0, 4_200.0, "SA"),
            btpn_row("B005", 900_000.0, 0.0, "SA"),
            btpn_row("B006", 500_000.0, 3_750.0, "DAU"),
        ],
    );

    source.push_batch(
        "BPS",
        Provenance::Bank,
        vec![
            bps_row("P001", 5_000_000.0, 19_791.67),
            bps_row("P002", 3_000_000.0, 10_500.0),
        ],
    );
    source.push_batch(
        "BPS",
        Provenance::Bpkh,
        vec![
            bps_row("P001", 5_000_000.0, 19_791.67),
            bps_row("P002", 3_000_000.0, 10_000.0),
        ],
    );

    source
}

fn orchestrator(source: MemoryRowSource) -> MultiBankOrchestrator<MemoryRowSource> {
    let registry = ProfileRegistry::from_profiles(presets::all()).unwrap();
    MultiBankOrchestrator::new(registry, source)
}

fn cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, 31).unwrap()
}

#[tokio::test]
async fn test_full_multi_bank_workflow() {
    let orchestrator = orchestrator(fixture());
    let report = orchestrator.reconcile_all(&["BTPN", "BPS"], cutoff()).await;

    assert_eq!(report.runs.len(), 2);
    assert!(report.runs.iter().all(|run| run.succeeded()));

    let btpn = &report.runs[0];
    assert_eq!(btpn.bank_name, "Bank BTPN Syariah");
    // The duplicate row adapts fine; it is the matcher that collapses it
    assert_eq!(btpn.bank_record_count, 6);
    assert_eq!(btpn.outcomes.len(), 6);

    let summary = btpn.summary.as_ref().unwrap();
    assert_eq!(summary.matched, 3); // B001 GOOD, B002 + B006 EXCELLENT
    assert_eq!(summary.difference, 1); // B005 zero-denominator
    assert_eq!(summary.not_found_in_bpkh, 1);
    assert_eq!(summary.not_found_in_bank, 1);
    assert_eq!(summary.critical, 1);
}

#[tokio::test]
async fn test_partition_property() {
    // Every bilyet seen on either side maps to exactly one outcome
    let orchestrator = orchestrator(fixture());
    let report = orchestrator.reconcile_all(&["BTPN", "BPS"], cutoff()).await;

    for run in &report.runs {
        let bilyets: Vec<&str> = run.outcomes.iter().map(|o| o.bilyet.as_str()).collect();
        let distinct: HashSet<&str> = bilyets.iter().copied().collect();
        assert_eq!(bilyets.len(), distinct.len(), "bank {}", run.bank_code);
    }

    let btpn_bilyets: HashSet<&str> = report.runs[0]
        .outcomes
        .iter()
        .map(|o| o.bilyet.as_str())
        .collect();
    let expected: HashSet<&str> = ["B001", "B002", "B003", "B004", "B005", "B006"]
        .into_iter()
        .collect();
    assert_eq!(btpn_bilyets, expected);
}

#[tokio::test]
async fn test_status_iff_severity() {
    let orchestrator = orchestrator(fixture());
    let report = orchestrator.reconcile_all(&["BTPN", "BPS"], cutoff()).await;

    for outcome in &report.consolidated {
        let negligible = matches!(
            outcome.severity,
            Some(Severity::Excellent) | Some(Severity::Good)
        );
        assert_eq!(
            outcome.status == RekonStatus::Matched,
            negligible,
            "bilyet {}",
            outcome.bilyet
        );

        // Not-found outcomes carry no severity and no percentage
        if matches!(
            outcome.status,
            RekonStatus::NotFoundInBank | RekonStatus::NotFoundInBpkh
        ) {
            assert_eq!(outcome.severity, None);
            assert_eq!(outcome.percentage, None);
        }
    }
}

#[tokio::test]
async fn test_reference_scenario_values() {
    let orchestrator = orchestrator(fixture());
    let report = orchestrator.reconcile_all(&["BTPN"], cutoff()).await;

    let b001 = report
        .consolidated
        .iter()
        .find(|o| o.bilyet == "B001")
        .unwrap();
    assert_eq!(b001.bank_amount, Some(BigDecimal::from(7_750)));
    assert_eq!(b001.bpkh_amount, Some(BigDecimal::from(7_730)));
    assert_eq!(b001.difference, BigDecimal::from(20));
    assert_eq!(b001.severity, Some(Severity::Good));
    assert_eq!(b001.status, RekonStatus::Matched);
    // 1,000,000 x 0.093 x 30 / 360
    assert_eq!(b001.expected_amount, Some(BigDecimal::from(7_750)));
    assert_eq!(b001.period, "Apr-25");
}

#[tokio::test]
async fn test_zero_bpkh_amount_is_critical() {
    let orchestrator = orchestrator(fixture());
    let report = orchestrator.reconcile_all(&["BTPN"], cutoff()).await;

    let b005 = report
        .consolidated
        .iter()
        .find(|o| o.bilyet == "B005")
        .unwrap();
    assert_eq!(b005.bpkh_amount, Some(BigDecimal::from(0)));
    assert_eq!(b005.percentage, None);
    assert_eq!(b005.severity, Some(Severity::Critical));
    assert_eq!(b005.status, RekonStatus::Difference);
}

#[tokio::test]
async fn test_duplicate_key_anomaly_attached() {
    let orchestrator = orchestrator(fixture());
    let report = orchestrator.reconcile_all(&["BTPN"], cutoff()).await;

    let b001 = report
        .consolidated
        .iter()
        .find(|o| o.bilyet == "B001")
        .unwrap();
    // First occurrence won
    assert_eq!(b001.bank_amount, Some(BigDecimal::from(7_750)));
    assert!(b001.anomalies.contains(&RekonAnomaly::DuplicateKey {
        provenance: Provenance::Bank,
        bilyet: "B001".to_string(),
    }));
}

#[tokio::test]
async fn test_missing_rate_anomaly_attached() {
    let orchestrator = orchestrator(fixture());
    let report = orchestrator.reconcile_all(&["BTPN"], cutoff()).await;

    let b006 = report
        .consolidated
        .iter()
        .find(|o| o.bilyet == "B006")
        .unwrap();
    assert!(b006.anomalies.contains(&RekonAnomaly::MissingRate {
        deposit_type: DepositType::Dau,
    }));
    // 500,000 x 0.09 (default) x 30 / 360
    assert_eq!(b006.expected_amount, Some(BigDecimal::from(3_750)));
}

#[tokio::test]
async fn test_consolidated_ordering() {
    let orchestrator = orchestrator(fixture());
    // Requested order deliberately differs from the sorted order
    let report = orchestrator.reconcile_all(&["BTPN", "BPS"], cutoff()).await;

    let keys: Vec<(String, String)> = report
        .consolidated
        .iter()
        .map(|o| (o.bank_code.clone(), o.bilyet.clone()))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(report.consolidated[0].bank_code, "BPS");
}

#[tokio::test]
async fn test_exception_subset() {
    let orchestrator = orchestrator(fixture());
    let report = orchestrator.reconcile_all(&["BTPN", "BPS"], cutoff()).await;

    let exceptions = report.exceptions();
    let bilyets: Vec<&str> = exceptions.iter().map(|o| o.bilyet.as_str()).collect();
    // B005 (zero denominator) and P002 (5% variance) are CRITICAL
    assert_eq!(bilyets, vec!["P002", "B005"]);
    assert!(exceptions.iter().all(|o| o.is_exception()));
}

#[tokio::test]
async fn test_failed_bank_does_not_stop_the_run() {
    let source = fixture();
    source.fail_bank("BPS");
    let orchestrator = orchestrator(source);

    let report = orchestrator.reconcile_all(&["BPS", "BTPN"], cutoff()).await;
    assert_eq!(report.runs.len(), 2);

    let failed = &report.runs[0];
    assert!(!failed.succeeded());
    assert!(failed.outcomes.is_empty());
    assert!(failed.error.as_ref().unwrap().contains("ingestion"));

    let btpn = &report.runs[1];
    assert!(btpn.succeeded());
    assert_eq!(btpn.outcomes.len(), 6);

    assert_eq!(report.failed_banks().len(), 1);
    // Consolidated list only carries the completed banks
    assert!(report.consolidated.iter().all(|o| o.bank_code == "BTPN"));
}

#[tokio::test]
async fn test_unknown_bank_is_a_per_bank_failure() {
    let orchestrator = orchestrator(fixture());
    let report = orchestrator.reconcile_all(&["ZZZ", "BTPN"], cutoff()).await;

    let unknown = &report.runs[0];
    assert!(!unknown.succeeded());
    assert!(unknown.error.as_ref().unwrap().contains("not registered"));
    assert!(report.runs[1].succeeded());
}

#[tokio::test]
async fn test_idempotent_runs() {
    let orchestrator = orchestrator(fixture());

    let first = orchestrator.reconcile_all(&["BTPN", "BPS"], cutoff()).await;
    let second = orchestrator.reconcile_all(&["BTPN", "BPS"], cutoff()).await;

    // Same order, same values; only the run id differs
    assert_eq!(first.runs, second.runs);
    assert_eq!(first.consolidated, second.consolidated);
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn test_skipped_rows_are_surfaced() {
    let source = fixture();
    let mut bad = btpn_row("B999", 100_000.0, 500.0, "SA");
    bad.remove("Nomor Rekening");
    source.push_batch("BTPN", Provenance::Bank, vec![bad]);

    let orchestrator = orchestrator(source);
    let report = orchestrator.reconcile_all(&["BTPN"], cutoff()).await;

    let btpn = &report.runs[0];
    assert_eq!(btpn.skipped.len(), 1);
    assert!(btpn.skipped[0].reason.contains("Nomor Rekening"));
    // The bad row produced no outcome
    assert!(btpn.outcomes.iter().all(|o| o.bilyet != "B999"));
}

#[tokio::test]
async fn test_custom_thresholds() {
    // Tighten the ladder: 0.2% variance is no longer a match
    let thresholds = VarianceThresholds {
        excellent_max: BigDecimal::from(1) / BigDecimal::from(100),
        good_max: BigDecimal::from(2) / BigDecimal::from(100),
        warning_max: BigDecimal::from(5) / BigDecimal::from(100),
    };
    let registry = ProfileRegistry::from_profiles(presets::all()).unwrap();
    let orchestrator =
        MultiBankOrchestrator::with_thresholds(registry, fixture(), thresholds).unwrap();

    let report = orchestrator.reconcile_all(&["BTPN"], cutoff()).await;
    let b001 = report
        .consolidated
        .iter()
        .find(|o| o.bilyet == "B001")
        .unwrap();
    assert_eq!(b001.severity, Some(Severity::Critical));
    assert_eq!(b001.status, RekonStatus::Difference);
}

/// Captures published reports, standing in for the rendering collaborator
struct CapturingSink {
    published: Vec<MultiBankReport>,
}

#[async_trait::async_trait]
impl ReportSink for CapturingSink {
    async fn publish(&mut self, report: &MultiBankReport) -> RekonResult<()> {
        self.published.push(report.clone());
        Ok(())
    }
}

/// Echoes the payload size, standing in for the AI collaborator
struct EchoAnalyzer;

#[async_trait::async_trait]
impl NarrativeAnalyzer for EchoAnalyzer {
    async fn analyze(&self, payload: &str) -> RekonResult<String> {
        Ok(format!("analyzed {} bytes", payload.len()))
    }
}

#[tokio::test]
async fn test_downstream_collaborator_seams() {
    let orchestrator = orchestrator(fixture());
    let report = orchestrator.reconcile_all(&["BTPN", "BPS"], cutoff()).await;

    let mut sink = CapturingSink {
        published: Vec::new(),
    };
    sink.publish(&report).await.unwrap();
    assert_eq!(sink.published.len(), 1);
    assert_eq!(sink.published[0].consolidated, report.consolidated);

    // The narrative collaborator consumes the payload after the run
    let payload = report.narrative_payload().unwrap();
    let narrative = EchoAnalyzer.analyze(&payload).await.unwrap();
    assert!(narrative.contains("bytes"));
}

#[tokio::test]
async fn test_kpis_and_narrative_payload() {
    let orchestrator = orchestrator(fixture());
    let report = orchestrator.reconcile_all(&["BTPN", "BPS"], cutoff()).await;

    let kpis = report.kpis();
    assert_eq!(kpis.total_outcomes, 8);
    assert_eq!(kpis.total_matched, 4);
    assert_eq!(kpis.match_rate, BigDecimal::from(50));
    // The orphans and the zero-denominator case swamp the quality score
    assert_eq!(kpis.rating, KpiRating::Poor);

    let payload = report.narrative_payload().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(parsed["exception_count"], 2);
    assert_eq!(parsed["summaries"].as_array().unwrap().len(), 2);
    assert_eq!(parsed["kpis"]["total_outcomes"], 8);
}
