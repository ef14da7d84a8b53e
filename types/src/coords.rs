//! Physical coordinates of the wafer-scale system.
//!
//! Every on-wafer index is a bounded newtype: constructing one out of range
//! fails, so a value of type [`HICANNOnWafer`] is always a valid chip slot.
//! Global coordinates pair an on-wafer index with its [`Wafer`] and order
//! wafer-first.
//!
//! Short forms (`W5`, `W5F3`, `W5H144`, `W5D14`, `W5A0`, `W5T8`) are the
//! canonical string representation and double as scheduler license names.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    #[error("{kind} index {value} out of range (size {size})")]
    OutOfRange {
        kind: &'static str,
        value: usize,
        size: usize,
    },
    #[error("malformed coordinate '{0}'")]
    Malformed(String),
}

macro_rules! bounded_index {
    ($(#[$meta:meta])* $name:ident, $size:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u16);

        impl $name {
            pub const SIZE: usize = $size;

            pub fn new(value: usize) -> Result<Self, CoordinateError> {
                if value < Self::SIZE {
                    Ok(Self(value as u16))
                } else {
                    Err(CoordinateError::OutOfRange {
                        kind: stringify!($name),
                        value,
                        size: Self::SIZE,
                    })
                }
            }

            #[must_use]
            pub fn value(self) -> usize {
                usize::from(self.0)
            }

            pub fn iter_all() -> impl Iterator<Item = Self> {
                (0..Self::SIZE).map(|i| Self(i as u16))
            }
        }

        impl TryFrom<usize> for $name {
            type Error = CoordinateError;

            fn try_from(value: usize) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

bounded_index!(
    /// FPGA slot on a wafer module.
    FPGAOnWafer,
    48
);
bounded_index!(
    /// Reticle (DNC) on a wafer; a block of eight HICANNs served by one FPGA.
    DNCOnWafer,
    48
);
bounded_index!(
    /// HICANN chip slot, enumerated row by row over the wafer.
    HICANNOnWafer,
    384
);
bounded_index!(
    /// Ananas trigger board of a wafer module.
    AnanasOnWafer,
    2
);
bounded_index!(TriggerOnWafer, 12);
bounded_index!(
    /// Analog readout line of a HICANN (and of the FPGA serving it).
    AnalogOnHICANN,
    2
);
bounded_index!(ChannelOnADC, 8);
bounded_index!(TriggerOnADC, 2);

/// Slices of one Ananas board; each slice serves one trigger group.
pub struct AnanasSliceOnAnanas;

impl AnanasSliceOnAnanas {
    pub const SIZE: usize = TriggerOnWafer::SIZE / AnanasOnWafer::SIZE;
}

// ── Wiring tables ─────────────────────────────────────────────────────────

/// HICANN row widths, top to bottom, centred in a grid of 36 columns.
const HICANN_ROW_WIDTHS: [usize; 16] = [12, 12, 20, 20, 28, 28, 36, 36, 36, 36, 28, 28, 20, 20, 12, 12];
const HICANN_COLUMNS: usize = 36;

/// Reticle row widths, centred in a grid of 9 columns. A reticle spans
/// 4 x 2 HICANNs.
const RETICLE_ROW_WIDTHS: [usize; 8] = [3, 5, 7, 9, 9, 7, 5, 3];
const RETICLE_COLUMNS: usize = 9;
const HICANNS_PER_RETICLE_X: usize = 4;
const HICANNS_PER_RETICLE_Y: usize = 2;

/// Reticle served by each FPGA slot.
const FPGA_TO_DNC: [u16; 48] = [
    21, 22, 13, 14, 30, 31, 23, 24, 32, 33, 15, 16, //
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, //
    17, 18, 19, 20, 25, 26, 27, 28, 29, //
    34, 35, 36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 46, 47,
];

const FPGAS_PER_TRIGGER: usize = 4;

/// Trigger group of each quad of consecutive FPGA slots.
const TRIGGER_OF_QUAD: [u16; 12] = [8, 9, 10, 5, 2, 3, 4, 11, 6, 7, 0, 1];

fn row_start(widths: &[usize], row: usize) -> usize {
    widths[..row].iter().sum()
}

/// Locate `index` in a centred row layout, returning `(x, y)` grid position.
fn grid_position(widths: &[usize], columns: usize, index: usize) -> (usize, usize) {
    let mut remaining = index;
    for (y, &width) in widths.iter().enumerate() {
        if remaining < width {
            return ((columns - width) / 2 + remaining, y);
        }
        remaining -= width;
    }
    unreachable!("index bounded by construction")
}

fn grid_index(widths: &[usize], columns: usize, x: usize, y: usize) -> Option<usize> {
    let width = *widths.get(y)?;
    let offset = (columns - width) / 2;
    if x < offset || x >= offset + width {
        return None;
    }
    Some(row_start(widths, y) + x - offset)
}

// ── Conversions ───────────────────────────────────────────────────────────

impl HICANNOnWafer {
    /// Grid position `(x, y)`.
    #[must_use]
    pub fn position(self) -> (usize, usize) {
        grid_position(&HICANN_ROW_WIDTHS, HICANN_COLUMNS, self.value())
    }

    #[must_use]
    pub fn from_position(x: usize, y: usize) -> Option<Self> {
        grid_index(&HICANN_ROW_WIDTHS, HICANN_COLUMNS, x, y).map(|i| Self(i as u16))
    }

    #[must_use]
    pub fn to_dnc(self) -> DNCOnWafer {
        let (x, y) = self.position();
        let index = grid_index(
            &RETICLE_ROW_WIDTHS,
            RETICLE_COLUMNS,
            x / HICANNS_PER_RETICLE_X,
            y / HICANNS_PER_RETICLE_Y,
        );
        match index {
            Some(i) => DNCOnWafer(i as u16),
            None => unreachable!("every HICANN lies on a reticle"),
        }
    }

    #[must_use]
    pub fn to_fpga(self) -> FPGAOnWafer {
        self.to_dnc().to_fpga()
    }

    fn neighbour(self, dx: isize, dy: isize) -> Option<Self> {
        let (x, y) = self.position();
        let x = x.checked_add_signed(dx)?;
        let y = y.checked_add_signed(dy)?;
        Self::from_position(x, y)
    }

    #[must_use]
    pub fn north(self) -> Option<Self> {
        self.neighbour(0, -1)
    }

    #[must_use]
    pub fn east(self) -> Option<Self> {
        self.neighbour(1, 0)
    }

    #[must_use]
    pub fn south(self) -> Option<Self> {
        self.neighbour(0, 1)
    }

    #[must_use]
    pub fn west(self) -> Option<Self> {
        self.neighbour(-1, 0)
    }
}

impl DNCOnWafer {
    #[must_use]
    pub fn to_fpga(self) -> FPGAOnWafer {
        match FPGA_TO_DNC.iter().position(|&dnc| dnc == self.0) {
            Some(fpga) => FPGAOnWafer(fpga as u16),
            None => unreachable!("wiring table is a permutation"),
        }
    }

    /// The eight HICANNs on this reticle, in enumeration order.
    pub fn hicanns(self) -> impl Iterator<Item = HICANNOnWafer> {
        let (rx, ry) = grid_position(&RETICLE_ROW_WIDTHS, RETICLE_COLUMNS, self.value());
        (0..HICANNS_PER_RETICLE_Y).flat_map(move |dy| {
            (0..HICANNS_PER_RETICLE_X).filter_map(move |dx| {
                HICANNOnWafer::from_position(
                    rx * HICANNS_PER_RETICLE_X + dx,
                    ry * HICANNS_PER_RETICLE_Y + dy,
                )
            })
        })
    }
}

impl FPGAOnWafer {
    #[must_use]
    pub fn to_dnc(self) -> DNCOnWafer {
        DNCOnWafer(FPGA_TO_DNC[self.value()])
    }

    #[must_use]
    pub fn to_trigger(self) -> TriggerOnWafer {
        TriggerOnWafer(TRIGGER_OF_QUAD[self.value() / FPGAS_PER_TRIGGER])
    }

    pub fn hicanns(self) -> impl Iterator<Item = HICANNOnWafer> {
        self.to_dnc().hicanns()
    }
}

impl TriggerOnWafer {
    #[must_use]
    pub fn to_ananas(self) -> AnanasOnWafer {
        AnanasOnWafer((self.value() / AnanasSliceOnAnanas::SIZE) as u16)
    }
}

// ── Wafer and global coordinates ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Wafer(u32);

impl Wafer {
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }

    #[must_use]
    pub fn slurm_license(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Wafer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W{}", self.0)
    }
}

macro_rules! global_coordinate {
    ($(#[$meta:meta])* $name:ident, $local:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            wafer: Wafer,
            local: $local,
        }

        impl $name {
            #[must_use]
            pub fn new(local: $local, wafer: Wafer) -> Self {
                Self { wafer, local }
            }

            #[must_use]
            pub fn wafer(self) -> Wafer {
                self.wafer
            }

            #[must_use]
            pub fn on_wafer(self) -> $local {
                self.local
            }

            /// Name of the scheduler license reserving this resource.
            #[must_use]
            pub fn slurm_license(self) -> String {
                self.to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}{}", self.wafer, $tag, self.local)
            }
        }
    };
}

global_coordinate!(FPGAGlobal, FPGAOnWafer, "F");
global_coordinate!(HICANNGlobal, HICANNOnWafer, "H");
global_coordinate!(
    /// A reticle of a wafer.
    DNCGlobal,
    DNCOnWafer,
    "D"
);
global_coordinate!(AnanasGlobal, AnanasOnWafer, "A");
global_coordinate!(TriggerGlobal, TriggerOnWafer, "T");

impl FPGAGlobal {
    #[must_use]
    pub fn to_trigger(self) -> TriggerGlobal {
        TriggerGlobal::new(self.local.to_trigger(), self.wafer)
    }

    #[must_use]
    pub fn to_dnc(self) -> DNCGlobal {
        DNCGlobal::new(self.local.to_dnc(), self.wafer)
    }
}

impl HICANNGlobal {
    #[must_use]
    pub fn to_fpga(self) -> FPGAGlobal {
        FPGAGlobal::new(self.local.to_fpga(), self.wafer)
    }

    #[must_use]
    pub fn to_dnc(self) -> DNCGlobal {
        DNCGlobal::new(self.local.to_dnc(), self.wafer)
    }
}

impl DNCGlobal {
    #[must_use]
    pub fn to_fpga(self) -> FPGAGlobal {
        FPGAGlobal::new(self.local.to_fpga(), self.wafer)
    }
}

/// Analog output of one FPGA; the key of an ADC connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AdcGlobal {
    pub fpga: FPGAGlobal,
    pub analog: AnalogOnHICANN,
}

impl AdcGlobal {
    #[must_use]
    pub fn new(fpga: FPGAGlobal, analog: AnalogOnHICANN) -> Self {
        Self { fpga, analog }
    }

    #[must_use]
    pub fn wafer(self) -> Wafer {
        self.fpga.wafer()
    }
}

impl fmt::Display for AdcGlobal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/analog{}", self.fpga, self.analog)
    }
}

// ── Short-form parsing ────────────────────────────────────────────────────

/// Any coordinate that has a short form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coordinate {
    Wafer(Wafer),
    Fpga(FPGAGlobal),
    Hicann(HICANNGlobal),
    Reticle(DNCGlobal),
    Ananas(AnanasGlobal),
    Trigger(TriggerGlobal),
}

static SHORT_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^W(\d+)(?:([FHDAT])(\d+))?$").expect("valid short-form regex")
});

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CoordinateError::Malformed(s.to_string());
        let caps = SHORT_FORM.captures(s.trim()).ok_or_else(malformed)?;
        let wafer = Wafer::new(caps[1].parse().map_err(|_| malformed())?);

        let (Some(tag), Some(index)) = (caps.get(2), caps.get(3)) else {
            return Ok(Self::Wafer(wafer));
        };
        let index: usize = index.as_str().parse().map_err(|_| malformed())?;

        Ok(match tag.as_str() {
            "F" => Self::Fpga(FPGAGlobal::new(FPGAOnWafer::new(index)?, wafer)),
            "H" => Self::Hicann(HICANNGlobal::new(HICANNOnWafer::new(index)?, wafer)),
            "D" => Self::Reticle(DNCGlobal::new(DNCOnWafer::new(index)?, wafer)),
            "A" => Self::Ananas(AnanasGlobal::new(AnanasOnWafer::new(index)?, wafer)),
            "T" => Self::Trigger(TriggerGlobal::new(TriggerOnWafer::new(index)?, wafer)),
            _ => return Err(malformed()),
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wafer(c) => c.fmt(f),
            Self::Fpga(c) => c.fmt(f),
            Self::Hicann(c) => c.fmt(f),
            Self::Reticle(c) => c.fmt(f),
            Self::Ananas(c) => c.fmt(f),
            Self::Trigger(c) => c.fmt(f),
        }
    }
}
