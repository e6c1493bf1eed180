//! Core types and data structures for the reconciliation engine

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Deposito placement types recognized by BPKH
///
/// The set is fixed; source files refer to these by short code or by the
/// long-form Indonesian label, both of which [`DepositType::from_label`]
/// accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepositType {
    /// Setoran Awal - initial pilgrim deposits
    #[serde(rename = "SA")]
    SetoranAwal,
    /// Setoran Lunas - fully paid deposits
    #[serde(rename = "SL")]
    SetoranLunas,
    /// Nilai Manfaat - benefit value placements
    #[serde(rename = "NM")]
    NilaiManfaat,
    /// LPS guarantee placements
    #[serde(rename = "LPS")]
    Lps,
    /// DAU (Dana Abadi Umat) placements
    #[serde(rename = "DAU")]
    Dau,
}

impl DepositType {
    /// All deposit types, in reporting order
    pub const ALL: [DepositType; 5] = [
        DepositType::SetoranAwal,
        DepositType::SetoranLunas,
        DepositType::NilaiManfaat,
        DepositType::Lps,
        DepositType::Dau,
    ];

    /// Short code used in rate tables and reports
    pub fn code(&self) -> &'static str {
        match self {
            DepositType::SetoranAwal => "SA",
            DepositType::SetoranLunas => "SL",
            DepositType::NilaiManfaat => "NM",
            DepositType::Lps => "LPS",
            DepositType::Dau => "DAU",
        }
    }

    /// Map a source-file label onto a deposit type
    ///
    /// Accepts the short codes as well as the long-form labels that appear in
    /// bank and BPKH workbooks ("Setoran Awal", "Dana Nilai Manfaat", ...).
    /// Returns `None` for anything else; callers must treat that as a
    /// coercion failure, not substitute a default.
    pub fn from_label(label: &str) -> Option<DepositType> {
        match label.trim().to_uppercase().as_str() {
            "SA" | "SETORAN AWAL" | "DANA SETORAN AWAL" => Some(DepositType::SetoranAwal),
            "SL" | "SETORAN LUNAS" | "DANA SETORAN LUNAS" => Some(DepositType::SetoranLunas),
            "NM" | "NILAI MANFAAT" | "DANA NILAI MANFAAT" => Some(DepositType::NilaiManfaat),
            "LPS" => Some(DepositType::Lps),
            "DAU" => Some(DepositType::Dau),
            _ => None,
        }
    }
}

impl fmt::Display for DepositType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Which reporting side a record batch came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// Reported by the bank
    #[serde(rename = "bank-source")]
    Bank,
    /// Reported by BPKH
    #[serde(rename = "bpkh-source")]
    Bpkh,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Bank => "bank-source",
            Provenance::Bpkh => "bpkh-source",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciliation status of a single bilyet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RekonStatus {
    /// Found on both sides with negligible variance
    #[serde(rename = "MATCHED")]
    Matched,
    /// Found on both sides with material variance
    #[serde(rename = "DIFFERENCE")]
    Difference,
    /// Present in the bank data only
    #[serde(rename = "NOT_FOUND_IN_BPKH")]
    NotFoundInBpkh,
    /// Present in the BPKH data only
    #[serde(rename = "NOT_FOUND_IN_BANK")]
    NotFoundInBank,
}

/// Severity bucket assigned from the absolute percentage variance
///
/// Undefined (absent) for the two not-found statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    #[serde(rename = "EXCELLENT")]
    Excellent,
    #[serde(rename = "GOOD")]
    Good,
    #[serde(rename = "WARNING")]
    Warning,
    #[serde(rename = "CRITICAL")]
    Critical,
}

impl Severity {
    /// Whether this severity belongs in the exception subset
    pub fn is_exception(&self) -> bool {
        matches!(self, Severity::Warning | Severity::Critical)
    }
}

/// A single cell value as delivered by the ingestion collaborator
///
/// Spreadsheet cells arrive either already typed (numbers, dates) or as raw
/// text the adapter still has to coerce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Date(NaiveDate),
    Text(String),
    Empty,
}

impl RawValue {
    pub fn is_empty(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<NaiveDate> for RawValue {
    fn from(d: NaiveDate) -> Self {
        RawValue::Date(d)
    }
}

/// One raw tabular row: source column label to cell value
pub type RawRow = HashMap<String, RawValue>;

/// Normalized deposito record produced by the adapter
///
/// Immutable once built; two records sharing (bank code, bilyet, provenance)
/// are a duplicate-key anomaly handled by the matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositRecord {
    /// Bank this record belongs to
    pub bank_code: String,
    /// Bilyet (certificate) number - the natural matching key
    pub bilyet: String,
    /// Account number the placement settles against
    pub account_number: String,
    /// Principal amount, nonnegative
    pub principal: BigDecimal,
    /// Profit share as reported by the source
    pub reported_profit_share: BigDecimal,
    /// Deposit type
    pub deposit_type: DepositType,
    /// Placement date
    pub placement_date: NaiveDate,
    /// Maturity / realization date, when the source carries one
    pub maturity_date: Option<NaiveDate>,
    /// Placement period in days, derived from the dates when available
    pub period_days: Option<i64>,
    /// Which side reported this record
    pub provenance: Provenance,
}

impl DepositRecord {
    /// Reporting-period label derived from the placement date, e.g. "Apr-25"
    pub fn period_label(&self) -> String {
        self.placement_date.format("%b-%y").to_string()
    }
}

/// Non-fatal data problem recorded on an outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RekonAnomaly {
    /// A later row reused an already-seen bilyet; the first occurrence won
    DuplicateKey {
        provenance: Provenance,
        bilyet: String,
    },
    /// The profile's nisbah table had no rate for this type; the default was used
    MissingRate { deposit_type: DepositType },
}

impl fmt::Display for RekonAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RekonAnomaly::DuplicateKey { provenance, bilyet } => {
                write!(f, "duplicate bilyet '{}' in {} data", bilyet, provenance)
            }
            RekonAnomaly::MissingRate { deposit_type } => {
                write!(f, "no nisbah rate configured for type {}", deposit_type)
            }
        }
    }
}

/// Final verdict for one bilyet number
///
/// Exactly one outcome is produced per distinct bilyet seen on either side;
/// together the outcomes partition the union of both sources' bilyets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    pub bank_code: String,
    pub bilyet: String,
    pub account_number: String,
    pub deposit_type: DepositType,
    /// Principal from whichever side carried the record
    pub principal: BigDecimal,
    /// Profit share reported by the bank, absent for NOT_FOUND_IN_BANK
    pub bank_amount: Option<BigDecimal>,
    /// Profit share reported by BPKH, absent for NOT_FOUND_IN_BPKH
    pub bpkh_amount: Option<BigDecimal>,
    /// Expected profit share from the nisbah formula, for bank-side records
    pub expected_amount: Option<BigDecimal>,
    /// Signed difference, bank minus BPKH (missing side counted as zero)
    pub difference: BigDecimal,
    /// Percentage difference on the BPKH denominator; absent when undefined
    pub percentage: Option<BigDecimal>,
    pub status: RekonStatus,
    /// Absent for the two not-found statuses
    pub severity: Option<Severity>,
    /// Placement period label, e.g. "Apr-25"
    pub period: String,
    /// Anomalies recorded against this bilyet
    pub anomalies: Vec<RekonAnomaly>,
}

impl ReconciliationOutcome {
    /// Whether this outcome belongs in the exception subset
    pub fn is_exception(&self) -> bool {
        self.severity.map(|s| s.is_exception()).unwrap_or(false)
    }
}

/// Row-level failure: the row is skipped and recorded, never fatal
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("column '{column}' missing from row")]
    FieldMissing { column: String },
    #[error("cannot read '{value}' in column '{column}' as {expected}")]
    TypeCoercion {
        column: String,
        value: String,
        expected: &'static str,
    },
}

/// Record of one skipped row, surfaced in the per-bank report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRow {
    /// Zero-based index of the row within its batch
    pub row_index: usize,
    pub provenance: Provenance,
    /// Rendered [`RowError`]
    pub reason: String,
}

/// Errors that abort a single bank's pipeline
///
/// Nothing in this enum ever aborts the whole multi-bank run; the
/// orchestrator catches these per bank and carries on.
#[derive(Debug, thiserror::Error)]
pub enum RekonError {
    #[error("invalid profile for bank '{bank}': {reason}")]
    Profile { bank: String, reason: String },
    #[error("bank '{0}' is not registered")]
    UnknownBank(String),
    #[error("ingestion error: {0}")]
    Source(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for reconciliation operations
pub type RekonResult<T> = Result<T, RekonError>;
