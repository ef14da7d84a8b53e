//! Scheduler license tokens derived from the wafer entries.
//!
//! Per wafer, in canonical wafer order:
//!
//! 1. every FPGA: its own license, then its trigger group license,
//! 2. every Ananas board: `<board>:<slice count>`,
//! 3. every ADC: the ADC serial,
//! 4. wafers at or above [`MULTI_CHIP_WAFER_THRESHOLD`]: the aggregator `W<id>M0`.
//!
//! Duplicates across all wafers are dropped, keeping the first occurrence.

use std::io;
use std::path::Path;

use chrono::Local;
use indexmap::IndexSet;

use hwdb_types::{AnanasGlobal, AnanasSliceOnAnanas, FPGAGlobal};
use hwdb_utils::atomic_write;

use crate::store::Database;

/// Wafer ids from here on denote HX multi-chip setups with an aggregator.
pub const MULTI_CHIP_WAFER_THRESHOLD: u32 = 80;

const LICENSES_PREFIX: &str = "Licenses=";
const TRES_PREFIX: &str = "AccountingStorageTRES=";
const TRES_ITEM_PREFIX: &str = "License/";

/// Ordered, deduplicated license tokens of all wafers.
#[must_use]
pub fn license_tokens(db: &Database) -> Vec<String> {
    let mut tokens: IndexSet<String> = IndexSet::new();

    for (wafer, entry) in db.wafers() {
        for fpga in entry.fpgas.keys() {
            let fpga = FPGAGlobal::new(*fpga, wafer);
            tokens.insert(fpga.slurm_license());
            tokens.insert(fpga.to_trigger().slurm_license());
        }
        for ananas in entry.ananas.keys() {
            let ananas = AnanasGlobal::new(*ananas, wafer);
            tokens.insert(format!(
                "{}:{}",
                ananas.slurm_license(),
                AnanasSliceOnAnanas::SIZE
            ));
        }
        for adc in entry.adcs.values() {
            tokens.insert(adc.coord.clone());
        }
        if wafer.value() >= MULTI_CHIP_WAFER_THRESHOLD {
            tokens.insert(format!("{wafer}M0"));
        }
    }

    tokens.into_iter().collect()
}

/// The two lines handed to the scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseStrings {
    /// `Licenses=<token>,...`
    pub licenses: String,
    /// `AccountingStorageTRES=License/<token>,...`
    pub tres: String,
}

#[must_use]
pub fn generate_license_strings(db: &Database) -> LicenseStrings {
    let tokens = license_tokens(db);
    let tres: Vec<String> = tokens
        .iter()
        .map(|token| format!("{TRES_ITEM_PREFIX}{token}"))
        .collect();

    LicenseStrings {
        licenses: format!("{LICENSES_PREFIX}{}", tokens.join(",")),
        tres: format!("{TRES_PREFIX}{}", tres.join(",")),
    }
}

fn file_header() -> String {
    format!(
        "# file generated on: {}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

/// Write the license and TRES files, each with a timestamp header.
pub fn write_license_files(
    db: &Database,
    license_path: &Path,
    tres_path: &Path,
) -> io::Result<LicenseStrings> {
    let strings = generate_license_strings(db);
    let header = file_header();

    atomic_write(license_path, format!("{header}{}", strings.licenses).as_bytes())?;
    atomic_write(tres_path, format!("{header}{}", strings.tres).as_bytes())?;

    tracing::debug!(
        licenses = %license_path.display(),
        tres = %tres_path.display(),
        "Wrote license files"
    );
    Ok(strings)
}
