//! Profile-driven adapter from raw tabular rows to normalized records
//!
//! One adapter serves every bank: the mapping-and-coercion logic is
//! identical, only the [`BankProfile`]'s column labels, date format, and
//! separators vary. Bad rows are skipped and recorded, never silently
//! dropped and never fatal to the batch.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::profile::BankProfile;
use crate::types::{
    DepositRecord, DepositType, Provenance, RawRow, RawValue, RowError, SkippedRow,
};

/// Result of adapting one batch of raw rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterOutput {
    /// Successfully normalized records, in input order
    pub records: Vec<DepositRecord>,
    /// Rows that could not be normalized, with their reasons
    pub skipped: Vec<SkippedRow>,
}

/// Converts raw rows into [`DepositRecord`]s using a bank's profile
pub struct RecordAdapter<'a> {
    profile: &'a BankProfile,
}

impl<'a> RecordAdapter<'a> {
    pub fn new(profile: &'a BankProfile) -> Self {
        Self { profile }
    }

    /// Adapt a whole batch, recording every skip
    pub fn adapt(&self, rows: &[RawRow], provenance: Provenance) -> AdapterOutput {
        let mut records = Vec::with_capacity(rows.len());
        let mut skipped = Vec::new();

        for (row_index, row) in rows.iter().enumerate() {
            match self.adapt_row(row, provenance) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(
                        bank = %self.profile.bank_code,
                        provenance = %provenance,
                        row = row_index,
                        reason = %err,
                        "skipping row"
                    );
                    skipped.push(SkippedRow {
                        row_index,
                        provenance,
                        reason: err.to_string(),
                    });
                }
            }
        }

        AdapterOutput { records, skipped }
    }

    fn adapt_row(&self, row: &RawRow, provenance: Provenance) -> Result<DepositRecord, RowError> {
        let columns = &self.profile.columns;

        let bilyet = self.text_field(row, &columns.bilyet)?;
        let account_number = self.text_field(row, &columns.account_number)?;
        let principal = self.decimal_field(row, &columns.principal)?;
        if principal < BigDecimal::from(0) {
            return Err(RowError::TypeCoercion {
                column: columns.principal.clone(),
                value: principal.to_string(),
                expected: "nonnegative amount",
            });
        }
        // Negative reported profit share is a data anomaly but still a valid
        // record; the variance classifier will surface it.
        let reported_profit_share = self.decimal_field(row, &columns.profit_share)?;
        let deposit_type = self.type_field(row, &columns.deposit_type)?;
        let placement_date = self.date_field(row, &columns.placement_date)?;

        let maturity_date = match &columns.maturity_date {
            Some(column) if row.get(column).is_some_and(|v| !v.is_empty()) => {
                Some(self.date_field(row, column)?)
            }
            _ => None,
        };

        let period_days = maturity_date
            .map(|maturity| maturity.signed_duration_since(placement_date).num_days())
            .filter(|days| *days > 0);

        Ok(DepositRecord {
            bank_code: self.profile.bank_code.clone(),
            bilyet,
            account_number,
            principal,
            reported_profit_share,
            deposit_type,
            placement_date,
            maturity_date,
            period_days,
            provenance,
        })
    }

    fn cell<'r>(&self, row: &'r RawRow, column: &str) -> Result<&'r RawValue, RowError> {
        match row.get(column) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(RowError::FieldMissing {
                column: column.to_string(),
            }),
        }
    }

    fn text_field(&self, row: &RawRow, column: &str) -> Result<String, RowError> {
        match self.cell(row, column)? {
            RawValue::Text(s) => Ok(s.trim().to_string()),
            // Account numbers in particular often arrive as numeric cells
            RawValue::Number(n) if n.fract() == 0.0 => Ok(format!("{}", *n as i64)),
            other => Err(RowError::TypeCoercion {
                column: column.to_string(),
                value: format!("{:?}", other),
                expected: "text",
            }),
        }
    }

    fn decimal_field(&self, row: &RawRow, column: &str) -> Result<BigDecimal, RowError> {
        // A blank amount cell reads as zero, matching how the source
        // workbooks leave unrealized amounts empty. A missing column is a
        // mapping problem and skips the row.
        let value = match row.get(column) {
            None => {
                return Err(RowError::FieldMissing {
                    column: column.to_string(),
                })
            }
            Some(RawValue::Empty) => return Ok(BigDecimal::from(0)),
            Some(RawValue::Text(s)) if s.trim().is_empty() => return Ok(BigDecimal::from(0)),
            Some(value) => value,
        };

        match value {
            RawValue::Number(n) => {
                BigDecimal::try_from(*n).map_err(|_| RowError::TypeCoercion {
                    column: column.to_string(),
                    value: n.to_string(),
                    expected: "decimal amount",
                })
            }
            RawValue::Text(s) => self.parse_localized_decimal(s).ok_or_else(|| {
                RowError::TypeCoercion {
                    column: column.to_string(),
                    value: s.clone(),
                    expected: "decimal amount",
                }
            }),
            other => Err(RowError::TypeCoercion {
                column: column.to_string(),
                value: format!("{:?}", other),
                expected: "decimal amount",
            }),
        }
    }

    /// Parse an amount written with the profile's separators, e.g.
    /// "1.234.567,89" for Indonesian-formatted files
    fn parse_localized_decimal(&self, text: &str) -> Option<BigDecimal> {
        let normalized: String = text
            .trim()
            .chars()
            .filter(|c| *c != self.profile.thousand_separator && !c.is_whitespace())
            .map(|c| {
                if c == self.profile.decimal_separator {
                    '.'
                } else {
                    c
                }
            })
            .collect();

        if normalized.is_empty() {
            return None;
        }

        BigDecimal::from_str(&normalized).ok()
    }

    fn date_field(&self, row: &RawRow, column: &str) -> Result<NaiveDate, RowError> {
        match self.cell(row, column)? {
            RawValue::Date(date) => Ok(*date),
            RawValue::Text(s) => NaiveDate::parse_from_str(s.trim(), &self.profile.date_format)
                .map_err(|_| RowError::TypeCoercion {
                    column: column.to_string(),
                    value: s.clone(),
                    expected: "date",
                }),
            other => Err(RowError::TypeCoercion {
                column: column.to_string(),
                value: format!("{:?}", other),
                expected: "date",
            }),
        }
    }

    fn type_field(&self, row: &RawRow, column: &str) -> Result<DepositType, RowError> {
        let label = self.text_field(row, column)?;
        DepositType::from_label(&label).ok_or_else(|| RowError::TypeCoercion {
            column: column.to_string(),
            value: label,
            expected: "deposit type (SA/SL/NM/LPS/DAU)",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::presets;

    fn btpn_row(bilyet: &str) -> RawRow {
        let mut row = RawRow::new();
        row.insert("Nomor Bilyet".to_string(), RawValue::from(bilyet));
        row.insert("Nomor Rekening".to_string(), RawValue::from("7100012345"));
        row.insert(
            "Nominal Deposito".to_string(),
            RawValue::from("1.000.000,00"),
        );
        row.insert("Nominal Imbal Hasil".to_string(), RawValue::from(7750.0));
        row.insert("Jenis Deposito".to_string(), RawValue::from("SA"));
        row.insert(
            "Tanggal Penempatan".to_string(),
            RawValue::from("01/04/2025"),
        );
        row.insert(
            "Tanggal Jatuh Tempo".to_string(),
            RawValue::from("01/05/2025"),
        );
        row
    }

    #[test]
    fn test_adapts_well_formed_row() {
        let profile = presets::btpn_syariah();
        let adapter = RecordAdapter::new(&profile);

        let output = adapter.adapt(&[btpn_row("B001")], Provenance::Bank);
        assert!(output.skipped.is_empty());
        assert_eq!(output.records.len(), 1);

        let record = &output.records[0];
        assert_eq!(record.bilyet, "B001");
        assert_eq!(record.principal, BigDecimal::from(1_000_000));
        assert_eq!(record.deposit_type, DepositType::SetoranAwal);
        assert_eq!(record.period_days, Some(30));
        assert_eq!(record.provenance, Provenance::Bank);
    }

    #[test]
    fn test_missing_mapped_column_skips_row_only() {
        let profile = presets::btpn_syariah();
        let adapter = RecordAdapter::new(&profile);

        let mut bad = btpn_row("B002");
        bad.remove("Nomor Rekening");

        let output = adapter.adapt(&[btpn_row("B001"), bad], Provenance::Bank);
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.skipped.len(), 1);
        assert_eq!(output.skipped[0].row_index, 1);
        assert!(output.skipped[0].reason.contains("Nomor Rekening"));
    }

    #[test]
    fn test_unparseable_amount_skips_row() {
        let profile = presets::btpn_syariah();
        let adapter = RecordAdapter::new(&profile);

        let mut bad = btpn_row("B003");
        bad.insert(
            "Nominal Deposito".to_string(),
            RawValue::from("one million"),
        );

        let output = adapter.adapt(&[bad], Provenance::Bank);
        assert!(output.records.is_empty());
        assert!(output.skipped[0].reason.contains("decimal amount"));
    }

    #[test]
    fn test_unknown_deposit_type_is_not_defaulted() {
        let profile = presets::btpn_syariah();
        let adapter = RecordAdapter::new(&profile);

        let mut bad = btpn_row("B004");
        bad.insert("Jenis Deposito".to_string(), RawValue::from("GIRO"));

        let output = adapter.adapt(&[bad], Provenance::Bank);
        assert!(output.records.is_empty());
        assert!(output.skipped[0].reason.contains("GIRO"));
    }

    #[test]
    fn test_negative_principal_rejected() {
        let profile = presets::btpn_syariah();
        let adapter = RecordAdapter::new(&profile);

        let mut bad = btpn_row("B005");
        bad.insert("Nominal Deposito".to_string(), RawValue::from(-500.0));

        let output = adapter.adapt(&[bad], Provenance::Bank);
        assert!(output.records.is_empty());
        assert_eq!(output.skipped.len(), 1);
    }

    #[test]
    fn test_empty_amount_reads_as_zero() {
        let profile = presets::btpn_syariah();
        let adapter = RecordAdapter::new(&profile);

        let mut row = btpn_row("B006");
        row.insert("Nominal Imbal Hasil".to_string(), RawValue::Empty);

        let output = adapter.adapt(&[row], Provenance::Bpkh);
        assert_eq!(
            output.records[0].reported_profit_share,
            BigDecimal::from(0)
        );
    }

    #[test]
    fn test_missing_maturity_leaves_period_unset() {
        let profile = presets::btpn_syariah();
        let adapter = RecordAdapter::new(&profile);

        let mut row = btpn_row("B007");
        row.remove("Tanggal Jatuh Tempo");

        let output = adapter.adapt(&[row], Provenance::Bank);
        assert_eq!(output.records[0].maturity_date, None);
        assert_eq!(output.records[0].period_days, None);
    }

    #[test]
    fn test_typed_date_cells_pass_through() {
        let profile = presets::btpn_syariah();
        let adapter = RecordAdapter::new(&profile);

        let mut row = btpn_row("B008");
        row.insert(
            "Tanggal Penempatan".to_string(),
            RawValue::from(NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()),
        );

        let output = adapter.adapt(&[row], Provenance::Bank);
        assert_eq!(
            output.records[0].placement_date,
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap()
        );
    }
}
