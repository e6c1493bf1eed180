//! # Rekon Core
//!
//! Reconciliation engine for hajj fund deposito placements: matches deposit
//! records reported by each bank against the figures reported by BPKH, the
//! supervising treasury body, and classifies every variance.
//!
//! ## Features
//!
//! - **Profile-driven normalization**: one adapter serves every bank; column
//!   layouts, nisbah rate tables, and date formats live in per-bank profiles
//! - **Expected profit share**: `principal x nisbah x days / year basis` at
//!   full decimal precision
//! - **Bilyet matching**: deterministic pairing with orphan and
//!   duplicate-key classification
//! - **Tunable severity ladder**: EXCELLENT/GOOD/WARNING/CRITICAL thresholds
//!   as configuration, not code
//! - **Multi-bank orchestration**: per-bank failure isolation, consolidated
//!   and summary reporting, exception subsets, run KPIs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rekon_core::profile::{presets, ProfileRegistry};
//! use rekon_core::utils::MemoryRowSource;
//! use rekon_core::MultiBankOrchestrator;
//! use chrono::NaiveDate;
//!
//! # async fn run() {
//! let registry = ProfileRegistry::from_profiles(presets::all()).unwrap();
//! let source = MemoryRowSource::new(); // or any RowSource implementation
//! let orchestrator = MultiBankOrchestrator::new(registry, source);
//!
//! let cutoff = NaiveDate::from_ymd_opt(2025, 5, 31).unwrap();
//! let report = orchestrator.reconcile_all(&["BTPN", "BPS"], cutoff).await;
//! println!("{} exceptions", report.exceptions().len());
//! # }
//! ```

pub mod profile;
pub mod recon;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use profile::{BankProfile, ColumnMap, ProfileRegistry};
pub use recon::*;
pub use traits::*;
pub use types::*;
