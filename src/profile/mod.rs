//! Bank profiles: per-bank configuration records and the immutable registry
//!
//! A [`BankProfile`] carries everything that differs between banks - column
//! labels, the nisbah rate table, date format, separators, and the year-day
//! convention. Adding a bank means adding a profile, not a type.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{DepositType, RekonError, RekonResult};
use crate::utils::validation::{
    validate_bank_code, validate_date_format, validate_rate_fraction, validate_year_days,
};

/// Semantic field to source column label mapping
///
/// Labels are matched verbatim against the raw row's column names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMap {
    /// Bilyet (certificate) number column
    pub bilyet: String,
    /// Account number column
    pub account_number: String,
    /// Principal amount column
    pub principal: String,
    /// Reported profit-share column
    pub profit_share: String,
    /// Deposit type column
    pub deposit_type: String,
    /// Placement date column
    pub placement_date: String,
    /// Maturity / realization date column, when the source has one
    #[serde(default)]
    pub maturity_date: Option<String>,
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_decimal_separator() -> char {
    ','
}

fn default_thousand_separator() -> char {
    '.'
}

fn default_year_days() -> u32 {
    360
}

/// Per-bank configuration record
///
/// Loaded once per run and immutable thereafter. Unknown fields and unknown
/// deposit-type keys in the rate table are rejected at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BankProfile {
    /// Short identifier, e.g. "BTPN"
    pub bank_code: String,
    /// Display name
    pub bank_name: String,
    /// Column mapping for this bank's source files
    pub columns: ColumnMap,
    /// Annual nisbah rate per deposit type, as a fraction (0.093 = 9.3%)
    pub nisbah_rates: HashMap<DepositType, BigDecimal>,
    /// Sheet-name hints for the ingestion collaborator
    #[serde(default)]
    pub sheet_names: HashMap<String, String>,
    /// chrono format pattern for date cells arriving as text
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Decimal separator in numeric text cells (Indonesian files use ',')
    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: char,
    /// Thousand separator in numeric text cells
    #[serde(default = "default_thousand_separator")]
    pub thousand_separator: char,
    /// Day-count basis for the nisbah formula, 360 (syariah) or 365
    #[serde(default = "default_year_days")]
    pub year_days: u32,
}

impl BankProfile {
    /// Load a profile from its JSON configuration record
    pub fn from_json(json: &str) -> RekonResult<Self> {
        let profile: BankProfile =
            serde_json::from_str(json).map_err(|e| RekonError::Config(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    /// Validate the profile's invariants
    ///
    /// Schema violations are a per-bank configuration error; the orchestrator
    /// reports them without touching other banks.
    pub fn validate(&self) -> RekonResult<()> {
        let fail = |reason: String| RekonError::Profile {
            bank: self.bank_code.clone(),
            reason,
        };

        validate_bank_code(&self.bank_code).map_err(&fail)?;
        if self.bank_name.trim().is_empty() {
            return Err(fail("bank name cannot be empty".to_string()));
        }
        validate_year_days(self.year_days).map_err(&fail)?;
        validate_date_format(&self.date_format).map_err(&fail)?;
        if self.decimal_separator == self.thousand_separator {
            return Err(fail(format!(
                "decimal and thousand separators are both '{}'",
                self.decimal_separator
            )));
        }
        for (deposit_type, rate) in &self.nisbah_rates {
            validate_rate_fraction(rate)
                .map_err(|reason| fail(format!("rate for {}: {}", deposit_type, reason)))?;
        }
        Ok(())
    }

    /// Annual nisbah rate for a deposit type, if configured
    pub fn nisbah_rate(&self, deposit_type: DepositType) -> Option<&BigDecimal> {
        self.nisbah_rates.get(&deposit_type)
    }
}

/// Immutable set of bank profiles for one reconciliation run
///
/// Built once at run start; configuration reloads happen between runs, never
/// while a run is active.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: HashMap<String, BankProfile>,
}

impl ProfileRegistry {
    /// Build a registry, validating every profile
    pub fn from_profiles(profiles: Vec<BankProfile>) -> RekonResult<Self> {
        let mut map = HashMap::new();
        for profile in profiles {
            profile.validate()?;
            let code = profile.bank_code.clone();
            if map.insert(code.clone(), profile).is_some() {
                return Err(RekonError::Profile {
                    bank: code,
                    reason: "duplicate bank code in registry".to_string(),
                });
            }
        }
        Ok(Self { profiles: map })
    }

    /// Look up a profile by bank code
    pub fn get(&self, bank_code: &str) -> RekonResult<&BankProfile> {
        self.profiles
            .get(bank_code)
            .ok_or_else(|| RekonError::UnknownBank(bank_code.to_string()))
    }

    /// Registered bank codes, sorted
    pub fn bank_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Built-in profiles for the banks currently under reconciliation
pub mod presets {
    use super::*;

    /// Rate fraction from basis points: 930 -> 0.0930
    fn basis_points(bp: i64) -> BigDecimal {
        BigDecimal::from(bp) / BigDecimal::from(10_000)
    }

    fn rates(pairs: &[(DepositType, i64)]) -> HashMap<DepositType, BigDecimal> {
        pairs
            .iter()
            .map(|(t, bp)| (*t, basis_points(*bp)))
            .collect()
    }

    fn sheets(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Bank BTPN Syariah
    pub fn btpn_syariah() -> BankProfile {
        BankProfile {
            bank_code: "BTPN".to_string(),
            bank_name: "Bank BTPN Syariah".to_string(),
            columns: ColumnMap {
                bilyet: "Nomor Bilyet".to_string(),
                account_number: "Nomor Rekening".to_string(),
                principal: "Nominal Deposito".to_string(),
                profit_share: "Nominal Imbal Hasil".to_string(),
                deposit_type: "Jenis Deposito".to_string(),
                placement_date: "Tanggal Penempatan".to_string(),
                maturity_date: Some("Tanggal Jatuh Tempo".to_string()),
            },
            nisbah_rates: rates(&[
                (DepositType::SetoranAwal, 930),
                (DepositType::SetoranLunas, 930),
                (DepositType::NilaiManfaat, 835),
                (DepositType::Lps, 450),
            ]),
            sheet_names: sheets(&[
                ("setoran_awal", "Setoran Awal"),
                ("setoran_lunas", "Setoran Lunas"),
                ("nilai_manfaat", "Nilai Manfaat"),
            ]),
            date_format: "%d/%m/%Y".to_string(),
            decimal_separator: ',',
            thousand_separator: '.',
            year_days: 360,
        }
    }

    /// Bank Pembangunan Syariah
    pub fn bps() -> BankProfile {
        BankProfile {
            bank_code: "BPS".to_string(),
            bank_name: "Bank Pembangunan Syariah".to_string(),
            columns: ColumnMap {
                bilyet: "Nomor Bilyet".to_string(),
                account_number: "Nomor Rekening".to_string(),
                principal: "Nominal Deposito".to_string(),
                profit_share: "Nominal Imbal Hasil".to_string(),
                deposit_type: "Jenis Dana".to_string(),
                placement_date: "Tanggal Penempatan".to_string(),
                maturity_date: Some("Tanggal Cair".to_string()),
            },
            nisbah_rates: rates(&[
                (DepositType::SetoranAwal, 475),
                (DepositType::SetoranLunas, 475),
                (DepositType::NilaiManfaat, 500),
                (DepositType::Lps, 450),
            ]),
            sheet_names: sheets(&[("summary", "Lampiran"), ("detail", "Monitoring")]),
            date_format: "%d/%m/%Y".to_string(),
            decimal_separator: ',',
            thousand_separator: '.',
            year_days: 360,
        }
    }

    /// BNI Syariah
    pub fn bni_syariah() -> BankProfile {
        BankProfile {
            bank_code: "BNIS".to_string(),
            bank_name: "BNI Syariah".to_string(),
            columns: ColumnMap {
                bilyet: "Nomor Bilyet".to_string(),
                account_number: "Nomor Rekening".to_string(),
                principal: "Pokok Deposito".to_string(),
                profit_share: "Bagi Hasil".to_string(),
                deposit_type: "Tipe Deposito".to_string(),
                placement_date: "Tanggal Mulai".to_string(),
                maturity_date: Some("Tanggal Berakhir".to_string()),
            },
            nisbah_rates: rates(&[
                (DepositType::SetoranAwal, 485),
                (DepositType::SetoranLunas, 485),
                (DepositType::NilaiManfaat, 515),
                (DepositType::Lps, 450),
            ]),
            sheet_names: sheets(&[("summary", "Summary"), ("detail", "Detail Deposito")]),
            date_format: "%d/%m/%Y".to_string(),
            decimal_separator: ',',
            thousand_separator: '.',
            year_days: 360,
        }
    }

    /// Bank Mandiri Syariah
    pub fn mandiri_syariah() -> BankProfile {
        BankProfile {
            bank_code: "MSI".to_string(),
            bank_name: "Bank Mandiri Syariah".to_string(),
            columns: ColumnMap {
                bilyet: "No. Bilyet".to_string(),
                account_number: "No. Rekening".to_string(),
                principal: "Nominal".to_string(),
                profit_share: "Bagi Hasil".to_string(),
                deposit_type: "Jenis".to_string(),
                placement_date: "Tgl. Penempatan".to_string(),
                maturity_date: Some("Tgl. Jatuh Tempo".to_string()),
            },
            nisbah_rates: rates(&[
                (DepositType::SetoranAwal, 480),
                (DepositType::SetoranLunas, 480),
                (DepositType::NilaiManfaat, 510),
                (DepositType::Lps, 450),
            ]),
            sheet_names: sheets(&[("rekap", "Rekap"), ("detail", "Detail")]),
            date_format: "%d/%m/%Y".to_string(),
            decimal_separator: ',',
            thousand_separator: '.',
            year_days: 360,
        }
    }

    /// All built-in profiles
    pub fn all() -> Vec<BankProfile> {
        vec![btpn_syariah(), bps(), bni_syariah(), mandiri_syariah()]
    }
}
