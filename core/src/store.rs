//! The entry store.
//!
//! # Ownership model
//!
//! A [`WaferEntry`] owns every entry addressed by a global coordinate on its
//! wafer. The FPGA, reticle, Ananas, ADC and HICANN kinds are views into the
//! owning wafer, so there is exactly one index per asset: removing a wafer
//! removes its children and nothing can drift between two maps.
//!
//! Carrier-scoped kinds (DLS, HX-cube, Jboa) are independent top-level maps.
//!
//! # Access
//!
//! All kinds share one interface parameterised by a kind marker:
//!
//! ```ignore
//! db.add::<Wafers>(wafer, WaferEntry::default())?;
//! db.add::<Fpgas>(FPGAGlobal::new(fpga, wafer), FPGAEntry::default())?;
//! let ip = db.get::<Fpgas>(&FPGAGlobal::new(fpga, wafer))?.ip;
//! ```
//!
//! References returned by [`Database::get`] borrow the store; the borrow
//! checker rejects mutation while they are alive.
//!
//! Leaf kinds can be edited in place through [`Database::get_mut`]. Wafers
//! and carriers hold invariants across their fields (served HICANNs, the
//! carrier id), so they are edited with [`Database::update`], which checks
//! the edited entry like [`Database::add`] does.
//!
//! [`Database::keys`] returns keys in canonical order (ascending coordinate,
//! wafer first; ascending id or name for carriers).

use std::collections::BTreeMap;
use std::fmt;

use hwdb_types::{
    ADCEntry, AdcGlobal, AdcSlot, AnanasEntry, AnanasGlobal, AnanasOnWafer, BranchIdentifier,
    ChipCarrier, DLSSetupEntry, DNCGlobal, DNCOnWafer, FPGAEntry, FPGAGlobal, FPGAOnWafer,
    HICANNEntry, HICANNGlobal, HICANNOnWafer, HXCubeId, HXCubeSetupEntry, JboaId, JboaSetupEntry,
    ReticleEntry, Wafer, WaferEntry,
};
use tracing::debug;

use crate::error::StoreError;

mod sealed {
    pub trait Sealed {}
}

/// One kind of entry held by the [`Database`].
///
/// Implemented only by the marker types of this module.
pub trait EntryKind: sealed::Sealed {
    type Key: Clone + Ord + fmt::Display;
    type Entry: Clone;

    /// Human-readable kind name used in errors.
    const NAME: &'static str;

    #[doc(hidden)]
    fn lookup<'db>(db: &'db Database, key: &Self::Key) -> Option<&'db Self::Entry>;
    #[doc(hidden)]
    fn lookup_mut<'db>(db: &'db mut Database, key: &Self::Key) -> Option<&'db mut Self::Entry>;
    #[doc(hidden)]
    fn insert(db: &mut Database, key: Self::Key, entry: Self::Entry) -> Result<(), StoreError>;
    #[doc(hidden)]
    fn take(db: &mut Database, key: &Self::Key) -> Option<Self::Entry>;
    #[doc(hidden)]
    fn keys(db: &Database) -> Vec<Self::Key>;
}

/// Kinds whose entries have no invariants beyond their key and may be
/// mutated through a plain reference.
pub trait EditInPlace: EntryKind {}

/// In-memory hardware database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Database {
    wafers: BTreeMap<Wafer, WaferEntry>,
    dls_setups: BTreeMap<String, DLSSetupEntry>,
    hxcubes: BTreeMap<HXCubeId, HXCubeSetupEntry>,
    jboas: BTreeMap<JboaId, JboaSetupEntry>,
}

impl Database {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn has<K: EntryKind>(&self, key: &K::Key) -> bool {
        K::lookup(self, key).is_some()
    }

    pub fn get<K: EntryKind>(&self, key: &K::Key) -> Result<&K::Entry, StoreError> {
        K::lookup(self, key).ok_or_else(|| StoreError::not_found(K::NAME, key))
    }

    pub fn get_mut<K: EditInPlace>(&mut self, key: &K::Key) -> Result<&mut K::Entry, StoreError> {
        K::lookup_mut(self, key).ok_or_else(|| StoreError::not_found(K::NAME, key))
    }

    /// Apply `edit` to a copy of the entry at `key` and store the result
    /// with the checks of [`Database::add`]. On error the store is unchanged.
    pub fn update<K: EntryKind>(
        &mut self,
        key: &K::Key,
        edit: impl FnOnce(&mut K::Entry),
    ) -> Result<(), StoreError> {
        let mut entry = self.get::<K>(key)?.clone();
        edit(&mut entry);
        K::insert(self, key.clone(), entry)
    }

    /// Insert or replace the entry at `key`.
    ///
    /// Wafer-scoped kinds require their wafer; HICANNs additionally require
    /// the FPGA serving them, also when they arrive inside a whole
    /// [`WaferEntry`]. Carrier entries take their id from `key`.
    pub fn add<K: EntryKind>(&mut self, key: K::Key, entry: K::Entry) -> Result<(), StoreError> {
        K::insert(self, key, entry)
    }

    /// Remove and return the entry at `key`, including everything it owns.
    /// Removing an FPGA also removes the HICANNs it serves.
    pub fn remove<K: EntryKind>(&mut self, key: &K::Key) -> Result<K::Entry, StoreError> {
        K::take(self, key).ok_or_else(|| StoreError::not_found(K::NAME, key))
    }

    /// All present keys of one kind, in canonical order.
    #[must_use]
    pub fn keys<K: EntryKind>(&self) -> Vec<K::Key> {
        K::keys(self)
    }

    pub fn clear(&mut self) {
        self.wafers.clear();
        self.dls_setups.clear();
        self.hxcubes.clear();
        self.jboas.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.wafers.is_empty()
            && self.dls_setups.is_empty()
            && self.hxcubes.is_empty()
            && self.jboas.is_empty()
    }

    pub fn wafers(&self) -> impl Iterator<Item = (Wafer, &WaferEntry)> {
        self.wafers.iter().map(|(wafer, entry)| (*wafer, entry))
    }

    pub fn dls_setups(&self) -> impl Iterator<Item = (&str, &DLSSetupEntry)> {
        self.dls_setups.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    pub fn hxcubes(&self) -> impl Iterator<Item = (HXCubeId, &HXCubeSetupEntry)> {
        self.hxcubes.iter().map(|(id, entry)| (*id, entry))
    }

    pub fn jboas(&self) -> impl Iterator<Item = (JboaId, &JboaSetupEntry)> {
        self.jboas.iter().map(|(id, entry)| (*id, entry))
    }

    /// HICANN entries served by `fpga`.
    #[must_use]
    pub fn hicanns_of_fpga(&self, fpga: FPGAGlobal) -> Vec<(HICANNGlobal, &HICANNEntry)> {
        let Some(wafer) = self.wafers.get(&fpga.wafer()) else {
            return Vec::new();
        };
        let mut hicanns: Vec<_> = fpga
            .on_wafer()
            .hicanns()
            .filter_map(|h| {
                wafer
                    .hicanns
                    .get(&h)
                    .map(|entry| (HICANNGlobal::new(h, fpga.wafer()), entry))
            })
            .collect();
        hicanns.sort_by_key(|(h, _)| *h);
        hicanns
    }

    /// ADC connections on the analog outputs of `fpga`.
    #[must_use]
    pub fn adcs_of_fpga(&self, fpga: FPGAGlobal) -> Vec<(AdcGlobal, &ADCEntry)> {
        let Some(wafer) = self.wafers.get(&fpga.wafer()) else {
            return Vec::new();
        };
        wafer
            .adcs
            .iter()
            .filter(|(slot, _)| slot.fpga == fpga.on_wafer())
            .map(|(slot, entry)| (AdcGlobal::new(fpga, slot.analog), entry))
            .collect()
    }

    pub fn hxcube_branch_identifier(
        &self,
        hxcube: HXCubeId,
        chip_serial: u32,
    ) -> Result<BranchIdentifier, StoreError> {
        let cube = self.get::<HXCubeSetups>(&hxcube)?;
        Ok(cube.unique_branch_identifier(chip_serial)?)
    }

    pub fn jboa_branch_identifier(
        &self,
        jboa: JboaId,
        chip_serial: u32,
    ) -> Result<BranchIdentifier, StoreError> {
        let setup = self.get::<JboaSetups>(&jboa)?;
        Ok(setup.unique_branch_identifier(chip_serial)?)
    }
}

// ── Top-level kinds ───────────────────────────────────────────────────────

macro_rules! top_level_kind {
    (
        $(#[$meta:meta])* $kind:ident, $name:literal, $key:ty, $entry:ty, $field:ident
        $(, admit = $admit:path)?
    ) => {
        $(#[$meta])*
        pub enum $kind {}

        impl sealed::Sealed for $kind {}

        impl EntryKind for $kind {
            type Key = $key;
            type Entry = $entry;
            const NAME: &'static str = $name;

            fn lookup<'db>(db: &'db Database, key: &$key) -> Option<&'db $entry> {
                db.$field.get(key)
            }

            fn lookup_mut<'db>(db: &'db mut Database, key: &$key) -> Option<&'db mut $entry> {
                db.$field.get_mut(key)
            }

            fn insert(db: &mut Database, key: $key, entry: $entry) -> Result<(), StoreError> {
                $(let entry = $admit(&key, entry)?;)?
                db.$field.insert(key, entry);
                Ok(())
            }

            fn take(db: &mut Database, key: &$key) -> Option<$entry> {
                db.$field.remove(key)
            }

            fn keys(db: &Database) -> Vec<$key> {
                db.$field.keys().cloned().collect()
            }
        }
    };
}

/// Every HICANN inside `entry` must be served by an FPGA of the same entry.
fn admit_wafer(wafer: &Wafer, entry: WaferEntry) -> Result<WaferEntry, StoreError> {
    let unserved = entry
        .hicanns
        .keys()
        .find(|hicann| !entry.fpgas.contains_key(&hicann.to_fpga()));
    if let Some(hicann) = unserved {
        return Err(StoreError::MissingParent {
            kind: Hicanns::NAME,
            key: HICANNGlobal::new(*hicann, *wafer).to_string(),
            parent: Fpgas::NAME,
            parent_key: FPGAGlobal::new(hicann.to_fpga(), *wafer).to_string(),
        });
    }
    Ok(entry)
}

fn admit_hxcube(
    id: &HXCubeId,
    mut entry: HXCubeSetupEntry,
) -> Result<HXCubeSetupEntry, StoreError> {
    entry.hxcube_id = *id;
    Ok(entry)
}

fn admit_jboa(id: &JboaId, mut entry: JboaSetupEntry) -> Result<JboaSetupEntry, StoreError> {
    entry.jboa_id = *id;
    Ok(entry)
}

top_level_kind!(
    /// Wafer modules; the aggregate root of all coordinate-addressed entries.
    Wafers,
    "wafer",
    Wafer,
    WaferEntry,
    wafers,
    admit = admit_wafer
);
top_level_kind!(
    /// Single-chip lab setups keyed by name.
    DlsSetups,
    "DLS setup",
    String,
    DLSSetupEntry,
    dls_setups
);
top_level_kind!(
    HXCubeSetups,
    "HX-cube setup",
    HXCubeId,
    HXCubeSetupEntry,
    hxcubes,
    admit = admit_hxcube
);
top_level_kind!(
    JboaSetups,
    "Jboa setup",
    JboaId,
    JboaSetupEntry,
    jboas,
    admit = admit_jboa
);

impl EditInPlace for DlsSetups {}

// ── Wafer-scoped kinds ────────────────────────────────────────────────────

/// A global coordinate whose entry lives inside a [`WaferEntry`].
trait WaferScoped: Copy + Ord + fmt::Display {
    type Slot: Copy + Ord + 'static;
    type Entry: 'static;

    fn owner(self) -> Wafer;
    fn slot(self) -> Self::Slot;
    fn join(wafer: Wafer, slot: Self::Slot) -> Self;
    fn children(wafer: &WaferEntry) -> &BTreeMap<Self::Slot, Self::Entry>;
    fn children_mut(wafer: &mut WaferEntry) -> &mut BTreeMap<Self::Slot, Self::Entry>;

    /// FPGA that must exist besides the wafer.
    fn serving_fpga(self) -> Option<FPGAGlobal> {
        None
    }

    /// Clean up entries that depend on the removed one.
    fn on_removed(self, _wafer: &mut WaferEntry) {}
}

macro_rules! wafer_scoped {
    ($slot:ty, $entry:ty, $field:ident) => {
        fn owner(self) -> Wafer {
            self.wafer()
        }

        fn children(wafer: &WaferEntry) -> &BTreeMap<$slot, $entry> {
            &wafer.$field
        }

        fn children_mut(wafer: &mut WaferEntry) -> &mut BTreeMap<$slot, $entry> {
            &mut wafer.$field
        }
    };
}

impl WaferScoped for FPGAGlobal {
    type Slot = FPGAOnWafer;
    type Entry = FPGAEntry;

    wafer_scoped!(FPGAOnWafer, FPGAEntry, fpgas);

    fn slot(self) -> FPGAOnWafer {
        self.on_wafer()
    }

    fn join(wafer: Wafer, slot: FPGAOnWafer) -> Self {
        Self::new(slot, wafer)
    }

    fn on_removed(self, wafer: &mut WaferEntry) {
        let dropped = self
            .on_wafer()
            .hicanns()
            .filter(|hicann| wafer.hicanns.remove(hicann).is_some())
            .count();
        if dropped > 0 {
            debug!(fpga = %self, dropped, "removed HICANN entries served by FPGA");
        }
    }
}

impl WaferScoped for DNCGlobal {
    type Slot = DNCOnWafer;
    type Entry = ReticleEntry;

    wafer_scoped!(DNCOnWafer, ReticleEntry, reticles);

    fn slot(self) -> DNCOnWafer {
        self.on_wafer()
    }

    fn join(wafer: Wafer, slot: DNCOnWafer) -> Self {
        Self::new(slot, wafer)
    }
}

impl WaferScoped for AnanasGlobal {
    type Slot = AnanasOnWafer;
    type Entry = AnanasEntry;

    wafer_scoped!(AnanasOnWafer, AnanasEntry, ananas);

    fn slot(self) -> AnanasOnWafer {
        self.on_wafer()
    }

    fn join(wafer: Wafer, slot: AnanasOnWafer) -> Self {
        Self::new(slot, wafer)
    }
}

impl WaferScoped for HICANNGlobal {
    type Slot = HICANNOnWafer;
    type Entry = HICANNEntry;

    wafer_scoped!(HICANNOnWafer, HICANNEntry, hicanns);

    fn slot(self) -> HICANNOnWafer {
        self.on_wafer()
    }

    fn join(wafer: Wafer, slot: HICANNOnWafer) -> Self {
        Self::new(slot, wafer)
    }

    fn serving_fpga(self) -> Option<FPGAGlobal> {
        Some(self.to_fpga())
    }
}

impl WaferScoped for AdcGlobal {
    type Slot = AdcSlot;
    type Entry = ADCEntry;

    wafer_scoped!(AdcSlot, ADCEntry, adcs);

    fn slot(self) -> AdcSlot {
        AdcSlot {
            fpga: self.fpga.on_wafer(),
            analog: self.analog,
        }
    }

    fn join(wafer: Wafer, slot: AdcSlot) -> Self {
        Self::new(FPGAGlobal::new(slot.fpga, wafer), slot.analog)
    }
}

fn scoped_lookup<K: WaferScoped>(db: &Database, key: K) -> Option<&K::Entry> {
    K::children(db.wafers.get(&key.owner())?).get(&key.slot())
}

fn scoped_lookup_mut<K: WaferScoped>(db: &mut Database, key: K) -> Option<&mut K::Entry> {
    K::children_mut(db.wafers.get_mut(&key.owner())?).get_mut(&key.slot())
}

fn scoped_insert<K: WaferScoped>(
    db: &mut Database,
    kind: &'static str,
    key: K,
    entry: K::Entry,
) -> Result<(), StoreError> {
    let missing = |parent: &'static str, parent_key: String| StoreError::MissingParent {
        kind,
        key: key.to_string(),
        parent,
        parent_key,
    };

    let wafer = db
        .wafers
        .get_mut(&key.owner())
        .ok_or_else(|| missing(Wafers::NAME, key.owner().to_string()))?;
    if let Some(fpga) = key.serving_fpga()
        && !wafer.fpgas.contains_key(&fpga.on_wafer())
    {
        return Err(missing(Fpgas::NAME, fpga.to_string()));
    }
    K::children_mut(wafer).insert(key.slot(), entry);
    Ok(())
}

fn scoped_take<K: WaferScoped>(db: &mut Database, key: K) -> Option<K::Entry> {
    let wafer = db.wafers.get_mut(&key.owner())?;
    let entry = K::children_mut(wafer).remove(&key.slot())?;
    key.on_removed(wafer);
    Some(entry)
}

fn scoped_keys<K: WaferScoped>(db: &Database) -> Vec<K> {
    db.wafers
        .iter()
        .flat_map(|(wafer, entry)| K::children(entry).keys().map(|slot| K::join(*wafer, *slot)))
        .collect()
}

macro_rules! wafer_scoped_kind {
    ($(#[$meta:meta])* $kind:ident, $name:literal, $key:ty, $entry:ty) => {
        $(#[$meta])*
        pub enum $kind {}

        impl sealed::Sealed for $kind {}

        impl EntryKind for $kind {
            type Key = $key;
            type Entry = $entry;
            const NAME: &'static str = $name;

            fn lookup<'db>(db: &'db Database, key: &$key) -> Option<&'db $entry> {
                scoped_lookup(db, *key)
            }

            fn lookup_mut<'db>(db: &'db mut Database, key: &$key) -> Option<&'db mut $entry> {
                scoped_lookup_mut(db, *key)
            }

            fn insert(db: &mut Database, key: $key, entry: $entry) -> Result<(), StoreError> {
                scoped_insert(db, Self::NAME, key, entry)
            }

            fn take(db: &mut Database, key: &$key) -> Option<$entry> {
                scoped_take(db, *key)
            }

            fn keys(db: &Database) -> Vec<$key> {
                scoped_keys(db)
            }
        }
    };
}

wafer_scoped_kind!(Fpgas, "FPGA", FPGAGlobal, FPGAEntry);
wafer_scoped_kind!(
    /// Reticles, addressed by their DNC coordinate.
    Reticles,
    "reticle",
    DNCGlobal,
    ReticleEntry
);
wafer_scoped_kind!(AnanasBoards, "Ananas", AnanasGlobal, AnanasEntry);
wafer_scoped_kind!(Hicanns, "HICANN", HICANNGlobal, HICANNEntry);
wafer_scoped_kind!(Adcs, "ADC", AdcGlobal, ADCEntry);

impl EditInPlace for Fpgas {}
impl EditInPlace for Reticles {}
impl EditInPlace for AnanasBoards {}
impl EditInPlace for Hicanns {}
impl EditInPlace for Adcs {}
