//! Core domain types for the hardware database.
//!
//! This crate contains pure domain types with no IO: coordinates, carrier
//! ids, entry records and the branch identifier codec. Everything here can be
//! used from any layer of the workspace.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

pub mod branch;
pub mod coords;
pub mod entries;
pub mod ids;

pub use branch::{
    BranchIdError, BranchIdentifier, CarrierKind, ChipCarrier, MAX_HANDWRITTEN_CHIP_SERIAL,
    MIN_HANDWRITTEN_CHIP_SERIAL, validate_chip_serial,
};
pub use coords::{
    AdcGlobal, AnalogOnHICANN, AnanasGlobal, AnanasOnWafer, AnanasSliceOnAnanas, ChannelOnADC,
    Coordinate, CoordinateError, DNCGlobal, DNCOnWafer, FPGAGlobal, FPGAOnWafer, HICANNGlobal,
    HICANNOnWafer, TriggerGlobal, TriggerOnADC, TriggerOnWafer, Wafer,
};
pub use entries::{
    ADCEntry, AdcSlot, AnanasEntry, CalibrationMode, DLSSetupEntry, FPGAEntry, HICANNEntry,
    HXCubeFPGAEntry, HXCubeSetupEntry, HXCubeWingEntry, JboaAggregatorEntry, JboaSetupEntry,
    ReticleEntry, SetupType, SynramTiming, UnknownVariant, WaferEntry,
};
pub use ids::{HXCubeId, JboaId};
