//! Entry records: the mutable metadata attached to each physical asset.
//!
//! Entries are plain values. The store owns them once added; wafer-scoped
//! children live inside their [`WaferEntry`] so that a wafer is the aggregate
//! root of everything addressed by a global coordinate on it.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::coords::{
    AnalogOnHICANN, AnanasOnWafer, ChannelOnADC, DNCOnWafer, FPGAOnWafer, HICANNOnWafer,
    TriggerOnADC,
};
use crate::ids::{HXCubeId, JboaId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

// ── Wafer scope ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum SetupType {
    #[default]
    VSetup,
    FacetsWafer,
    CubeSetup,
    BSSWafer,
    Jboa,
}

impl SetupType {
    pub const ALL: [SetupType; 5] = [
        Self::VSetup,
        Self::FacetsWafer,
        Self::CubeSetup,
        Self::BSSWafer,
        Self::Jboa,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VSetup => "vsetup",
            Self::FacetsWafer => "facetswafer",
            Self::CubeSetup => "cubesetup",
            Self::BSSWafer => "bsswafer",
            Self::Jboa => "jboa",
        }
    }
}

impl fmt::Display for SetupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SetupType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant {
                kind: "setup type",
                value: s.to_string(),
            })
    }
}

/// Key of an ADC connection inside a wafer: the analog output of an FPGA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AdcSlot {
    pub fpga: FPGAOnWafer,
    pub analog: AnalogOnHICANN,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaferEntry {
    pub setup_type: SetupType,
    /// Main system control unit.
    pub macu: Ipv4Addr,
    pub macu_version: u32,
    pub fpgas: BTreeMap<FPGAOnWafer, FPGAEntry>,
    pub reticles: BTreeMap<DNCOnWafer, ReticleEntry>,
    pub ananas: BTreeMap<AnanasOnWafer, AnanasEntry>,
    pub adcs: BTreeMap<AdcSlot, ADCEntry>,
    pub hicanns: BTreeMap<HICANNOnWafer, HICANNEntry>,
}

impl Default for WaferEntry {
    fn default() -> Self {
        Self {
            setup_type: SetupType::default(),
            macu: Ipv4Addr::UNSPECIFIED,
            macu_version: 0,
            fpgas: BTreeMap::new(),
            reticles: BTreeMap::new(),
            ananas: BTreeMap::new(),
            adcs: BTreeMap::new(),
            hicanns: BTreeMap::new(),
        }
    }
}

impl WaferEntry {
    #[must_use]
    pub fn new(setup_type: SetupType) -> Self {
        Self {
            setup_type,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FPGAEntry {
    pub ip: Ipv4Addr,
    /// Whether a physical highspeed link is connected.
    pub highspeed: bool,
}

impl Default for FPGAEntry {
    fn default() -> Self {
        Self {
            ip: Ipv4Addr::UNSPECIFIED,
            highspeed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReticleEntry {
    pub to_be_powered: bool,
}

impl Default for ReticleEntry {
    fn default() -> Self {
        Self {
            to_be_powered: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnanasEntry {
    pub ip: Ipv4Addr,
    pub baseport_data: u16,
    pub baseport_reset: u16,
}

impl Default for AnanasEntry {
    fn default() -> Self {
        Self {
            ip: Ipv4Addr::UNSPECIFIED,
            baseport_data: 0,
            baseport_reset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HICANNEntry {
    pub version: u32,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum CalibrationMode {
    Load,
    Ess,
    #[default]
    Default,
}

impl CalibrationMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Ess => "ess",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for CalibrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalibrationMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Self::Load, Self::Ess, Self::Default]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownVariant {
                kind: "calibration mode",
                value: s.to_string(),
            })
    }
}

/// Connection between an FPGA analog output and an ADC input channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ADCEntry {
    pub calibration: CalibrationMode,
    /// Serial of the ADC board.
    pub coord: String,
    pub channel: ChannelOnADC,
    pub trigger: TriggerOnADC,
    /// Remote host the ADC is attached to; unspecified for local ADCs.
    pub remote_ip: Ipv4Addr,
    pub remote_port: u16,
}

impl ADCEntry {
    #[must_use]
    pub fn new(coord: impl Into<String>, channel: ChannelOnADC, trigger: TriggerOnADC) -> Self {
        Self {
            calibration: CalibrationMode::default(),
            coord: coord.into(),
            channel,
            trigger,
            remote_ip: Ipv4Addr::UNSPECIFIED,
            remote_port: 0,
        }
    }
}

// ── Single-chip setups ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DLSSetupEntry {
    pub fpga_name: String,
    pub board_name: String,
    pub board_version: u32,
    pub chip_id: u32,
    pub chip_version: u32,
    /// Networked power switch serving the setup.
    pub ntpwr_ip: Option<Ipv4Addr>,
    pub ntpwr_slot: u32,
}

// ── Multi-chip carriers ───────────────────────────────────────────────────

/// SRAM timing configuration per hemisphere and controller.
pub type SynramTiming = [[u16; 2]; 2];

/// Chip carrier board ("wing") plugged into an HX FPGA.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HXCubeWingEntry {
    pub handwritten_chip_serial: u32,
    pub chip_revision: u32,
    pub eeprom_chip_serial: Option<u32>,
    pub ldo_version: Option<u32>,
    pub synram_timing_pcconf: Option<SynramTiming>,
    pub synram_timing_wconf: Option<SynramTiming>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HXCubeFPGAEntry {
    pub ip: Ipv4Addr,
    pub ci_test_node: bool,
    pub fuse_dna: Option<u64>,
    pub extoll_node_id: Option<u16>,
    pub wing: Option<HXCubeWingEntry>,
}

impl Default for HXCubeFPGAEntry {
    fn default() -> Self {
        Self {
            ip: Ipv4Addr::UNSPECIFIED,
            ci_test_node: false,
            fuse_dna: None,
            extoll_node_id: None,
            wing: None,
        }
    }
}

const DNA_PORT_BITS: u32 = 57;

impl HXCubeFPGAEntry {
    /// DNA as read through the FPGA's DNA port: the fuse DNA bit-reversed
    /// and truncated to 57 bits.
    #[must_use]
    pub fn dna_port(&self) -> Option<u64> {
        self.fuse_dna
            .map(|dna| dna.reverse_bits() & ((1u64 << DNA_PORT_BITS) - 1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HXCubeSetupEntry {
    pub hxcube_id: HXCubeId,
    pub fpgas: BTreeMap<u8, HXCubeFPGAEntry>,
    pub usb_host: String,
    pub usb_serial: String,
    pub xilinx_hw_server: Option<String>,
}

impl HXCubeSetupEntry {
    #[must_use]
    pub fn new(hxcube_id: HXCubeId) -> Self {
        Self {
            hxcube_id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JboaAggregatorEntry {
    pub ip: Ipv4Addr,
    pub ci_test_node: bool,
}

impl Default for JboaAggregatorEntry {
    fn default() -> Self {
        Self {
            ip: Ipv4Addr::UNSPECIFIED,
            ci_test_node: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JboaSetupEntry {
    pub jboa_id: JboaId,
    pub fpgas: BTreeMap<u8, HXCubeFPGAEntry>,
    pub aggregators: BTreeMap<u8, JboaAggregatorEntry>,
    pub xilinx_hw_server: Option<String>,
}

impl JboaSetupEntry {
    #[must_use]
    pub fn new(jboa_id: JboaId) -> Self {
        Self {
            jboa_id,
            ..Self::default()
        }
    }
}
