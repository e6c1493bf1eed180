//! Pairing of bank-side and BPKH-side records by bilyet number

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::types::{DepositRecord, Provenance, RekonAnomaly};

/// A bank record paired with its BPKH counterpart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub bank: DepositRecord,
    pub bpkh: DepositRecord,
}

/// Output of one matching pass
///
/// `pairs`, `bank_only`, and `bpkh_only` together cover every distinct
/// bilyet exactly once; duplicates within a side are recorded here and
/// attached to the surviving outcome downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSet {
    pub pairs: Vec<MatchedPair>,
    /// Bank records with no BPKH counterpart, in input order
    pub bank_only: Vec<DepositRecord>,
    /// BPKH records never consumed by a bank record, in input order
    pub bpkh_only: Vec<DepositRecord>,
    /// Duplicate-key anomalies keyed by the surviving bilyet
    pub duplicates: Vec<RekonAnomaly>,
}

impl MatchSet {
    /// Anomalies recorded against one bilyet
    pub fn anomalies_for(&self, bilyet: &str) -> Vec<RekonAnomaly> {
        self.duplicates
            .iter()
            .filter(|anomaly| {
                matches!(anomaly, RekonAnomaly::DuplicateKey { bilyet: b, .. } if b == bilyet)
            })
            .cloned()
            .collect()
    }
}

/// Deduplicate one side by bilyet, first occurrence winning
///
/// Input order is preserved, which keeps the whole pass deterministic.
fn dedupe_side(
    records: Vec<DepositRecord>,
    provenance: Provenance,
    duplicates: &mut Vec<RekonAnomaly>,
) -> Vec<DepositRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    let mut unique = Vec::with_capacity(records.len());

    for record in records {
        if seen.insert(record.bilyet.clone()) {
            unique.push(record);
        } else {
            duplicates.push(RekonAnomaly::DuplicateKey {
                provenance,
                bilyet: record.bilyet.clone(),
            });
        }
    }

    unique
}

/// Pair bank-side and BPKH-side records by bilyet number
///
/// Builds a lookup over the BPKH side, walks the bank side in input order,
/// and classifies whatever is left on either side as an orphan.
pub fn pair_records(
    bank_records: Vec<DepositRecord>,
    bpkh_records: Vec<DepositRecord>,
) -> MatchSet {
    let mut duplicates = Vec::new();

    let bank_records = dedupe_side(bank_records, Provenance::Bank, &mut duplicates);
    let bpkh_records = dedupe_side(bpkh_records, Provenance::Bpkh, &mut duplicates);

    let mut bpkh_index: HashMap<&str, usize> = HashMap::with_capacity(bpkh_records.len());
    for (idx, record) in bpkh_records.iter().enumerate() {
        bpkh_index.insert(record.bilyet.as_str(), idx);
    }

    let mut consumed = vec![false; bpkh_records.len()];
    let mut pairs = Vec::new();
    let mut bank_only = Vec::new();

    for bank_record in bank_records {
        match bpkh_index.get(bank_record.bilyet.as_str()) {
            Some(&idx) => {
                consumed[idx] = true;
                pairs.push(MatchedPair {
                    bank: bank_record,
                    bpkh: bpkh_records[idx].clone(),
                });
            }
            None => bank_only.push(bank_record),
        }
    }

    let bpkh_only = bpkh_records
        .into_iter()
        .zip(consumed)
        .filter_map(|(record, used)| (!used).then_some(record))
        .collect();

    MatchSet {
        pairs,
        bank_only,
        bpkh_only,
        duplicates,
    }
}
