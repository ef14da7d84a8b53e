//! Branch identifiers: human-readable names for one chip inside a
//! multi-chip carrier.
//!
//! ```text
//! hxcube9fpga0chip12_1      nested form (carrier, board slot, chip, disambiguator)
//! jboa7fpga12chip13_1       Jboa always carries the board slot
//! hxcube9chip12_1           legacy flat HX-cube form, no board slot
//! ```
//!
//! The chip number is the serial handwritten on the chip carrier. Those
//! labels are two decimal digits, so serials outside
//! `1..=MAX_HANDWRITTEN_CHIP_SERIAL` are rejected on both encode and decode.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::entries::{HXCubeFPGAEntry, HXCubeSetupEntry, HXCubeWingEntry, JboaSetupEntry};

pub const MIN_HANDWRITTEN_CHIP_SERIAL: u32 = 1;
pub const MAX_HANDWRITTEN_CHIP_SERIAL: u32 = 99;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BranchIdError {
    #[error("malformed branch identifier '{0}'")]
    MalformedIdentifier(String),
    #[error(
        "chip serial {0} outside handwritten serial range \
         {MIN_HANDWRITTEN_CHIP_SERIAL}..={MAX_HANDWRITTEN_CHIP_SERIAL}"
    )]
    InvalidSerial(u32),
    #[error("no chip with serial {chip_serial} found on {carrier} {carrier_id}")]
    ChipNotFound {
        carrier: CarrierKind,
        carrier_id: u32,
        chip_serial: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CarrierKind {
    HXCube,
    Jboa,
}

impl CarrierKind {
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::HXCube => "hxcube",
            Self::Jboa => "jboa",
        }
    }

    /// Jboa identifiers always name the board slot; HX-cube identifiers may
    /// use the legacy flat form.
    #[must_use]
    pub fn requires_board_slot(self) -> bool {
        matches!(self, Self::Jboa)
    }
}

impl fmt::Display for CarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Decoded form of a branch identifier.
///
/// Invariant: the chip serial lies in the handwritten serial range, the
/// disambiguator is at least 1 and Jboa identifiers carry a board slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchIdentifier {
    carrier: CarrierKind,
    carrier_id: u32,
    board_slot: Option<u8>,
    chip_serial: u32,
    disambiguator: u32,
}

pub fn validate_chip_serial(chip_serial: u32) -> Result<u32, BranchIdError> {
    if (MIN_HANDWRITTEN_CHIP_SERIAL..=MAX_HANDWRITTEN_CHIP_SERIAL).contains(&chip_serial) {
        Ok(chip_serial)
    } else {
        Err(BranchIdError::InvalidSerial(chip_serial))
    }
}

impl BranchIdentifier {
    pub fn new(
        carrier: CarrierKind,
        carrier_id: u32,
        board_slot: Option<u8>,
        chip_serial: u32,
        disambiguator: u32,
    ) -> Result<Self, BranchIdError> {
        let chip_serial = validate_chip_serial(chip_serial)?;
        let identifier = Self {
            carrier,
            carrier_id,
            board_slot,
            chip_serial,
            disambiguator,
        };
        if disambiguator == 0 || (carrier.requires_board_slot() && board_slot.is_none()) {
            return Err(BranchIdError::MalformedIdentifier(identifier.to_string()));
        }
        Ok(identifier)
    }

    #[must_use]
    pub fn carrier(&self) -> CarrierKind {
        self.carrier
    }

    #[must_use]
    pub fn carrier_id(&self) -> u32 {
        self.carrier_id
    }

    #[must_use]
    pub fn board_slot(&self) -> Option<u8> {
        self.board_slot
    }

    #[must_use]
    pub fn chip_serial(&self) -> u32 {
        self.chip_serial
    }

    #[must_use]
    pub fn disambiguator(&self) -> u32 {
        self.disambiguator
    }

    /// Everything but the disambiguator; identifiers sharing a prefix collide.
    fn prefix(&self) -> String {
        let mut out = format!("{}{}", self.carrier.prefix(), self.carrier_id);
        if let Some(slot) = self.board_slot {
            out.push_str(&format!("fpga{slot}"));
        }
        out.push_str(&format!("chip{}", self.chip_serial));
        out
    }
}

impl fmt::Display for BranchIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.prefix(), self.disambiguator)
    }
}

static BRANCH_IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(hxcube|jboa)(\d+)(?:fpga(\d+))?chip(\d+)_(\d+)$")
        .expect("valid branch identifier regex")
});

impl FromStr for BranchIdentifier {
    type Err = BranchIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || BranchIdError::MalformedIdentifier(s.to_string());
        let caps = BRANCH_IDENTIFIER.captures(s).ok_or_else(malformed)?;

        let carrier = match &caps[1] {
            "hxcube" => CarrierKind::HXCube,
            _ => CarrierKind::Jboa,
        };
        let carrier_id = caps[2].parse().map_err(|_| malformed())?;
        let board_slot = caps
            .get(3)
            .map(|m| m.as_str().parse::<u8>())
            .transpose()
            .map_err(|_| malformed())?;
        let chip_serial = caps[4].parse().map_err(|_| malformed())?;
        let disambiguator = caps[5].parse().map_err(|_| malformed())?;

        let identifier =
            Self::new(carrier, carrier_id, board_slot, chip_serial, disambiguator)?;
        // Reject non-canonical spellings such as leading zeros.
        if identifier.to_string() != s {
            return Err(malformed());
        }
        Ok(identifier)
    }
}

// ── Carrier lookup ────────────────────────────────────────────────────────

/// A multi-chip carrier whose FPGA boards hold chip wings.
pub trait ChipCarrier {
    const KIND: CarrierKind;

    fn carrier_id(&self) -> u32;

    fn boards(&self) -> &BTreeMap<u8, HXCubeFPGAEntry>;

    /// Wing holding the chip with `chip_serial`, by EEPROM serial first and
    /// handwritten serial second.
    fn find_chip(&self, chip_serial: u32) -> Result<(u8, &HXCubeWingEntry), BranchIdError> {
        let wings = || {
            self.boards()
                .iter()
                .filter_map(|(slot, fpga)| fpga.wing.as_ref().map(|wing| (*slot, wing)))
        };

        if let Some(found) = wings().find(|(_, w)| w.eeprom_chip_serial == Some(chip_serial)) {
            return Ok(found);
        }
        let chip_serial = validate_chip_serial(chip_serial)?;
        wings()
            .find(|(_, w)| w.handwritten_chip_serial == chip_serial)
            .ok_or(BranchIdError::ChipNotFound {
                carrier: Self::KIND,
                carrier_id: self.carrier_id(),
                chip_serial,
            })
    }

    /// Branch identifier of the chip with `chip_serial` in nested form.
    fn unique_branch_identifier(&self, chip_serial: u32) -> Result<BranchIdentifier, BranchIdError> {
        let (slot, wing) = self.find_chip(chip_serial)?;
        let draft = BranchIdentifier::new(
            Self::KIND,
            self.carrier_id(),
            Some(slot),
            wing.handwritten_chip_serial,
            1,
        )?;
        Ok(BranchIdentifier {
            disambiguator: disambiguator(self.boards(), slot, |s, w| {
                BranchIdentifier::new(
                    Self::KIND,
                    self.carrier_id(),
                    Some(s),
                    w.handwritten_chip_serial,
                    1,
                )
                .is_ok_and(|other| other.prefix() == draft.prefix())
            }),
            ..draft
        })
    }
}

/// 1 + number of wings on lower slots whose identifier collides with the
/// one being assigned at `slot`.
fn disambiguator(
    boards: &BTreeMap<u8, HXCubeFPGAEntry>,
    slot: u8,
    collides: impl Fn(u8, &HXCubeWingEntry) -> bool,
) -> u32 {
    let earlier = boards
        .range(..slot)
        .filter_map(|(s, fpga)| fpga.wing.as_ref().map(|wing| (*s, wing)))
        .filter(|(s, wing)| collides(*s, wing))
        .count();
    earlier as u32 + 1
}

impl ChipCarrier for HXCubeSetupEntry {
    const KIND: CarrierKind = CarrierKind::HXCube;

    fn carrier_id(&self) -> u32 {
        self.hxcube_id.value()
    }

    fn boards(&self) -> &BTreeMap<u8, HXCubeFPGAEntry> {
        &self.fpgas
    }
}

impl HXCubeSetupEntry {
    /// Branch identifier in the legacy flat form, without board slot. Two
    /// wings with the same handwritten serial are told apart by the
    /// disambiguator.
    pub fn legacy_branch_identifier(
        &self,
        chip_serial: u32,
    ) -> Result<BranchIdentifier, BranchIdError> {
        let (slot, wing) = self.find_chip(chip_serial)?;
        let serial = wing.handwritten_chip_serial;
        let disambiguator = disambiguator(&self.fpgas, slot, |_, other| {
            other.handwritten_chip_serial == serial
        });
        BranchIdentifier::new(
            CarrierKind::HXCube,
            self.hxcube_id.value(),
            None,
            serial,
            disambiguator,
        )
    }
}

impl ChipCarrier for JboaSetupEntry {
    const KIND: CarrierKind = CarrierKind::Jboa;

    fn carrier_id(&self) -> u32 {
        self.jboa_id.value()
    }

    fn boards(&self) -> &BTreeMap<u8, HXCubeFPGAEntry> {
        &self.fpgas
    }
}
