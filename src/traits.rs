//! Traits for the external collaborators surrounding the engine
//!
//! The core never opens files, renders reports, or calls the AI service
//! itself; those concerns live behind these seams.

use async_trait::async_trait;

use crate::recon::MultiBankReport;
use crate::types::{Provenance, RawRow, RekonResult};

/// Ingestion collaborator: supplies already-parsed raw rows
///
/// Implementations own the spreadsheet/CSV mechanics. The engine only asks
/// for the rows belonging to one bank and one reporting side; ingestion
/// failures surface as a source error and abort that bank only.
#[async_trait]
pub trait RowSource: Send + Sync {
    /// Fetch the raw rows for one bank and provenance
    async fn fetch_rows(&self, bank_code: &str, provenance: Provenance)
        -> RekonResult<Vec<RawRow>>;
}

/// Reporting collaborator: renders the finished run
///
/// Consumes the consolidated outcome list, summary comparison, and exception
/// subset carried by the report; rendering (spreadsheet, CSV, dashboard) is
/// its concern entirely.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Publish a completed multi-bank report
    async fn publish(&mut self, report: &MultiBankReport) -> RekonResult<()>;
}

/// Narrative-analysis collaborator (AI)
///
/// Receives the opaque JSON payload produced by
/// [`MultiBankReport::narrative_payload`] and returns free text. The engine
/// never awaits this inside reconciliation; it is a downstream consumer,
/// not a dependency.
#[async_trait]
pub trait NarrativeAnalyzer: Send + Sync {
    /// Produce a free-text analysis of the summary payload
    async fn analyze(&self, payload: &str) -> RekonResult<String>;
}
