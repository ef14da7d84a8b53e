use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};

use hwdb_core::{Database, HXCubeSetups, QueryError, generate_license_strings, write_license_files};
use hwdb_types::{BranchIdentifier, CarrierKind, Coordinate, HXCubeId, JboaId};

fn load(database: &Path) -> Result<Database> {
    Ok(hwdb_persist::load(database)?)
}

pub(crate) fn query(database: &Path, coordinate: &Coordinate, property: &str) -> Result<ExitCode> {
    let db = load(database)?;
    let entry = db.resolve(coordinate)?;
    match entry.attribute(property) {
        Ok(value) => {
            println!("{value}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err @ QueryError::UnknownAttribute { .. }) => {
            eprintln!("{err}");
            Ok(ExitCode::FAILURE)
        }
        Err(err) => Err(err.into()),
    }
}

pub(crate) fn print_licenses(database: &Path) -> Result<ExitCode> {
    let strings = generate_license_strings(&load(database)?);
    println!("{}", strings.licenses);
    println!("{}", strings.tres);
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn write_licenses(
    database: &Path,
    license_file: &Path,
    tres_file: &Path,
) -> Result<ExitCode> {
    let db = load(database)?;
    write_license_files(&db, license_file, tres_file).with_context(|| {
        format!(
            "failed to write {} and {}",
            license_file.display(),
            tres_file.display()
        )
    })?;
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn entries(database: &Path, node: &str, query: &str) -> Result<ExitCode> {
    let text = hwdb_persist::yaml_entries(database, node, query)?;
    if !text.is_empty() {
        println!("{text}");
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn branch_encode(
    database: &Path,
    carrier: CarrierKind,
    carrier_id: u32,
    chip_serial: u32,
    board_slot: Option<u8>,
    legacy: bool,
) -> Result<ExitCode> {
    let identifier = if let Some(slot) = board_slot {
        BranchIdentifier::new(carrier, carrier_id, Some(slot), chip_serial, 1)?
    } else {
        let db = load(database)?;
        match carrier {
            CarrierKind::HXCube if legacy => db
                .get::<HXCubeSetups>(&HXCubeId::new(carrier_id))?
                .legacy_branch_identifier(chip_serial)?,
            CarrierKind::HXCube => {
                db.hxcube_branch_identifier(HXCubeId::new(carrier_id), chip_serial)?
            }
            CarrierKind::Jboa if legacy => {
                anyhow::bail!("Jboa identifiers have no legacy form");
            }
            CarrierKind::Jboa => db.jboa_branch_identifier(JboaId::new(carrier_id), chip_serial)?,
        }
    };
    println!("{identifier}");
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn branch_decode(identifier: &BranchIdentifier) {
    println!("carrier: {}", identifier.carrier());
    println!("carrier_id: {}", identifier.carrier_id());
    if let Some(slot) = identifier.board_slot() {
        println!("fpga: {slot}");
    }
    println!("chip_serial: {}", identifier.chip_serial());
    println!("disambiguator: {}", identifier.disambiguator());
}
