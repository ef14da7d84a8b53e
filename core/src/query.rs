//! Read access to single entry attributes by name, as used by the CLI.

use std::fmt::Display;

use hwdb_types::{
    AnanasEntry, AnanasGlobal, Coordinate, DNCGlobal, FPGAEntry, FPGAGlobal, HICANNEntry,
    HICANNGlobal, ReticleEntry, Wafer, WaferEntry,
};

use crate::error::StoreError;
use crate::store::{AnanasBoards, Database, Fpgas, Hicanns, Reticles, Wafers};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("no hwdb entry assigned to {0}")]
    NoEntryKind(Coordinate),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("unknown property '{name}', available properties are: {}", available.join(", "))]
    UnknownAttribute {
        name: String,
        available: &'static [&'static str],
    },
}

/// A borrowed entry resolved from a coordinate.
#[derive(Debug, Clone, Copy)]
pub enum EntryRef<'db> {
    Wafer(Wafer, &'db WaferEntry),
    Fpga(FPGAGlobal, &'db FPGAEntry),
    Hicann(HICANNGlobal, &'db HICANNEntry),
    Reticle(DNCGlobal, &'db ReticleEntry),
    Ananas(AnanasGlobal, &'db AnanasEntry),
}

const WAFER_ATTRIBUTES: &[&str] = &[
    "setup_type",
    "macu",
    "macu_version",
    "fpgas",
    "reticles",
    "ananas",
    "adcs",
    "hicanns",
];
const FPGA_ATTRIBUTES: &[&str] = &["ip", "highspeed", "trigger", "reticle"];
const HICANN_ATTRIBUTES: &[&str] = &["version", "label", "fpga", "reticle"];
const RETICLE_ATTRIBUTES: &[&str] = &["to_be_powered", "fpga"];
const ANANAS_ATTRIBUTES: &[&str] = &["ip", "baseport_data", "baseport_reset"];

fn join<T: Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl EntryRef<'_> {
    #[must_use]
    pub fn attribute_names(&self) -> &'static [&'static str] {
        match self {
            Self::Wafer(..) => WAFER_ATTRIBUTES,
            Self::Fpga(..) => FPGA_ATTRIBUTES,
            Self::Hicann(..) => HICANN_ATTRIBUTES,
            Self::Reticle(..) => RETICLE_ATTRIBUTES,
            Self::Ananas(..) => ANANAS_ATTRIBUTES,
        }
    }

    /// Render one attribute as text. Collections render as comma-separated
    /// short forms.
    pub fn attribute(&self, name: &str) -> Result<String, QueryError> {
        let value = match (self, name) {
            (Self::Wafer(_, e), "setup_type") => e.setup_type.to_string(),
            (Self::Wafer(_, e), "macu") => e.macu.to_string(),
            (Self::Wafer(_, e), "macu_version") => e.macu_version.to_string(),
            (Self::Wafer(w, e), "fpgas") => join(e.fpgas.keys().map(|f| FPGAGlobal::new(*f, *w))),
            (Self::Wafer(w, e), "reticles") => {
                join(e.reticles.keys().map(|d| DNCGlobal::new(*d, *w)))
            }
            (Self::Wafer(w, e), "ananas") => {
                join(e.ananas.keys().map(|a| AnanasGlobal::new(*a, *w)))
            }
            (Self::Wafer(_, e), "adcs") => join(e.adcs.values().map(|adc| &adc.coord)),
            (Self::Wafer(w, e), "hicanns") => {
                join(e.hicanns.keys().map(|h| HICANNGlobal::new(*h, *w)))
            }

            (Self::Fpga(_, e), "ip") => e.ip.to_string(),
            (Self::Fpga(_, e), "highspeed") => e.highspeed.to_string(),
            (Self::Fpga(c, _), "trigger") => c.to_trigger().to_string(),
            (Self::Fpga(c, _), "reticle") => c.to_dnc().to_string(),

            (Self::Hicann(_, e), "version") => e.version.to_string(),
            (Self::Hicann(_, e), "label") => e.label.clone(),
            (Self::Hicann(c, _), "fpga") => c.to_fpga().to_string(),
            (Self::Hicann(c, _), "reticle") => c.to_dnc().to_string(),

            (Self::Reticle(_, e), "to_be_powered") => e.to_be_powered.to_string(),
            (Self::Reticle(c, _), "fpga") => c.to_fpga().to_string(),

            (Self::Ananas(_, e), "ip") => e.ip.to_string(),
            (Self::Ananas(_, e), "baseport_data") => e.baseport_data.to_string(),
            (Self::Ananas(_, e), "baseport_reset") => e.baseport_reset.to_string(),

            _ => {
                return Err(QueryError::UnknownAttribute {
                    name: name.to_string(),
                    available: self.attribute_names(),
                });
            }
        };
        Ok(value)
    }
}

impl Database {
    /// The entry addressed by `coordinate`; the coordinate kind selects the
    /// entry kind.
    pub fn resolve(&self, coordinate: &Coordinate) -> Result<EntryRef<'_>, QueryError> {
        Ok(match *coordinate {
            Coordinate::Wafer(w) => EntryRef::Wafer(w, self.get::<Wafers>(&w)?),
            Coordinate::Fpga(f) => EntryRef::Fpga(f, self.get::<Fpgas>(&f)?),
            Coordinate::Hicann(h) => EntryRef::Hicann(h, self.get::<Hicanns>(&h)?),
            Coordinate::Reticle(d) => EntryRef::Reticle(d, self.get::<Reticles>(&d)?),
            Coordinate::Ananas(a) => EntryRef::Ananas(a, self.get::<AnanasBoards>(&a)?),
            Coordinate::Trigger(_) => return Err(QueryError::NoEntryKind(*coordinate)),
        })
    }
}
