//! Multi-bank reconciliation walkthrough

use chrono::NaiveDate;

use rekon_core::profile::{presets, ProfileRegistry};
use rekon_core::recon::round_for_report;
use rekon_core::utils::MemoryRowSource;
use rekon_core::{MultiBankOrchestrator, Provenance, RawRow, RawValue};

fn btpn_row(bilyet: &str, principal: f64, profit: f64, deposit_type: &str) -> RawRow {
    [
        ("Nomor Bilyet", RawValue::from(bilyet)),
        ("Nomor Rekening", RawValue::from("7100012345")),
        ("Nominal Deposito", RawValue::from(principal)),
        ("Nominal Imbal Hasil", RawValue::from(profit)),
        ("Jenis Deposito", RawValue::from(deposit_type)),
        ("Tanggal Penempatan", RawValue::from("01/04/2025")),
        ("Tanggal Jatuh Tempo", RawValue::from("01/05/2025")),
    ]
    .into_iter()
    .map(|(label, value)| (label.to_string(), value))
    .collect()
}

fn bps_row(bilyet: &str, principal: f64, profit: f64) -> RawRow {
    [
        ("Nomor Bilyet", RawValue::from(bilyet)),
        ("Nomor Rekening", RawValue::from("8200054321")),
        ("Nominal Deposito", RawValue::from(principal)),
        ("Nominal Imbal Hasil", RawValue::from(profit)),
        ("Jenis Dana", RawValue::from("Setoran Awal")),
        ("Tanggal Penempatan", RawValue::from("01/04/2025")),
        ("Tanggal Cair", RawValue::from("01/05/2025")),
    ]
    .into_iter()
    .map(|(label, value)| (label.to_string(), value))
    .collect()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🏦 Rekon Core - Multi-Bank Reconciliation Example\n");

    // 1. In-memory ingestion stand-in; production wires a real RowSource
    let source = MemoryRowSource::new();

    source.push_batch(
        "BTPN",
        Provenance::Bank,
        vec![
            btpn_row("B001", 1_000_000.0, 7_750.0, "SA"),
            btpn_row("B002", 2_000_000.0, 15_500.0, "SL"),
            btpn_row("B003", 750_000.0, 5_000.0, "SA"),
        ],
    );
    source.push_batch(
        "BTPN",
        Provenance::Bpkh,
        vec![
            btpn_row("B001", 1_000_000.0, 7_730.0, "SA"),
            btpn_row("B002", 2_000_000.0, 15_800.0, "SL"),
            btpn_row("B004", 600_000.0, 4_200.0, "SA"),
        ],
    );
    source.push_batch(
        "BPS",
        Provenance::Bank,
        vec![bps_row("P001", 5_000_000.0, 19_791.67)],
    );
    source.push_batch(
        "BPS",
        Provenance::Bpkh,
        vec![bps_row("P001", 5_000_000.0, 19_791.67)],
    );

    // 2. Profiles for the participating banks
    let registry = ProfileRegistry::from_profiles(presets::all())?;
    let orchestrator = MultiBankOrchestrator::new(registry, source);

    // 3. Run reconciliation for the reporting period
    let cutoff = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
    println!("📊 Reconciling up to {}...\n", cutoff);
    let report = orchestrator.reconcile_all(&["BTPN", "BPS"], cutoff).await;

    // 4. Per-bank summaries
    for summary in report.summaries() {
        println!(
            "  {} ({}): {} outcomes, {} matched, match rate {}%",
            summary.bank_code,
            summary.bank_name,
            summary.total_outcomes,
            summary.matched,
            round_for_report(&summary.match_rate),
        );
        println!(
            "      total deposito Rp {}, total selisih Rp {}",
            round_for_report(&summary.total_principal),
            round_for_report(&summary.total_variance),
        );
    }

    // 5. Consolidated outcomes
    println!("\n📋 Consolidated outcomes:");
    for outcome in &report.consolidated {
        println!(
            "  {} {} [{}] {:?} {:?} selisih Rp {}",
            outcome.bank_code,
            outcome.bilyet,
            outcome.deposit_type,
            outcome.status,
            outcome.severity,
            round_for_report(&outcome.difference),
        );
    }

    // 6. Exceptions for follow-up
    let exceptions = report.exceptions();
    println!("\n⚠️  {} exception(s) need follow-up", exceptions.len());
    for outcome in exceptions {
        let pct = outcome
            .percentage
            .as_ref()
            .map(round_for_report)
            .map(|p| format!("{}%", p))
            .unwrap_or_else(|| "n/a".to_string());
        println!("  {} {}: variance {}", outcome.bank_code, outcome.bilyet, pct);
    }

    // 7. Run KPIs and the payload handed to the narrative collaborator
    let kpis = report.kpis();
    println!(
        "\n🎯 Overall score {} ({:?})",
        round_for_report(&kpis.overall_score),
        kpis.rating
    );

    let payload = report.narrative_payload()?;
    println!(
        "✉️  Narrative payload ready ({} bytes for the AI collaborator)",
        payload.len()
    );

    Ok(())
}
