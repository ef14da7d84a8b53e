//! Serde records mirroring the YAML documents, and their conversion to and
//! from store entries.
//!
//! A database file is a stream of documents. The kind of each document is
//! decided by the first of these keys it contains: `wafer`, `dls_setup`,
//! `hxcube_id`, `jboa_id`. Everything is added through [`Database::add`], so a
//! HICANN without its FPGA fails the load like it would fail an API call.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use hwdb_core::{
    Adcs, AnanasBoards, Database, DlsSetups, Fpgas, HXCubeSetups, Hicanns, JboaSetups, Reticles,
    Wafers,
};
use hwdb_types::{
    ADCEntry, AdcGlobal, AdcSlot, AnalogOnHICANN, AnanasEntry, AnanasGlobal, AnanasOnWafer,
    CalibrationMode, ChannelOnADC, DLSSetupEntry, DNCGlobal, DNCOnWafer, FPGAEntry, FPGAGlobal,
    FPGAOnWafer, HICANNEntry, HICANNGlobal, HICANNOnWafer, HXCubeFPGAEntry, HXCubeId,
    HXCubeSetupEntry, HXCubeWingEntry, JboaAggregatorEntry, JboaId, JboaSetupEntry, ReticleEntry,
    SetupType, SynramTiming, TriggerOnADC, Wafer, WaferEntry,
};

use crate::error::DocumentError;

// ── Field helpers ─────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Scalars that hand-edited files write both quoted and unquoted, such as
/// `chip_id: '20'` next to `chip_id: 20`.
mod lenient {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Int(u64),
        Text(String),
    }

    fn parse_u32(text: &str) -> Option<u32> {
        let text = text.trim();
        match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => text.parse().ok(),
        }
    }

    pub(super) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Scalar::deserialize(deserializer)? {
            Scalar::Int(value) => value.to_string(),
            Scalar::Text(text) => text,
        })
    }

    pub(super) fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        match Scalar::deserialize(deserializer)? {
            Scalar::Int(value) => u32::try_from(value).map_err(D::Error::custom),
            Scalar::Text(text) => parse_u32(&text)
                .ok_or_else(|| D::Error::custom(format!("invalid integer '{text}'"))),
        }
    }
}

// ── Wafer documents ───────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct FpgaRecord {
    fpga: usize,
    ip: Ipv4Addr,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    highspeed: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ReticleRecord {
    reticle: usize,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    to_be_powered: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct AnanasRecord {
    ananas: usize,
    ip: Ipv4Addr,
    #[serde(default)]
    baseport_data: u16,
    #[serde(default)]
    baseport_reset: u16,
}

#[derive(Debug, Serialize, Deserialize)]
struct AdcRecord {
    fpga: usize,
    analog: usize,
    #[serde(deserialize_with = "lenient::string")]
    adc: String,
    channel: usize,
    trigger: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    calibration: Option<String>,
    /// Only present on files of old FACETS systems.
    #[serde(default, skip_serializing)]
    #[allow(dead_code)]
    dnc_on_fpga: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remote_ip: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remote_port: Option<u16>,
}

impl AdcRecord {
    /// The remote endpoint is written when either half of it is set.
    fn from_entry(slot: AdcSlot, entry: &ADCEntry) -> Self {
        let remote_ip = (entry.remote_ip != Ipv4Addr::UNSPECIFIED).then_some(entry.remote_ip);
        let remote_port =
            (remote_ip.is_some() || entry.remote_port != 0).then_some(entry.remote_port);
        Self {
            fpga: slot.fpga.value(),
            analog: slot.analog.value(),
            adc: entry.coord.clone(),
            channel: entry.channel.value(),
            trigger: entry.trigger.value(),
            calibration: (entry.calibration != CalibrationMode::Default)
                .then(|| entry.calibration.to_string()),
            dnc_on_fpga: None,
            remote_ip,
            remote_port,
        }
    }

    fn into_entry(self, wafer: Wafer) -> Result<(AdcGlobal, ADCEntry), DocumentError> {
        let fpga = FPGAGlobal::new(FPGAOnWafer::new(self.fpga)?, wafer);
        let key = AdcGlobal::new(fpga, AnalogOnHICANN::new(self.analog)?);
        let mut entry = ADCEntry::new(
            self.adc,
            ChannelOnADC::new(self.channel)?,
            TriggerOnADC::new(self.trigger)?,
        );
        if let Some(calibration) = self.calibration {
            entry.calibration = calibration.parse()?;
        }
        if let Some(ip) = self.remote_ip {
            entry.remote_ip = ip;
        }
        if let Some(port) = self.remote_port {
            entry.remote_port = port;
        }
        Ok((key, entry))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct HicannRecord {
    hicann: usize,
    version: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    label: String,
}

/// Shorthand for "every HICANN served by a present FPGA".
#[derive(Debug, Serialize, Deserialize)]
struct HicannDefaults {
    version: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    label: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum HicannsRecord {
    List(Vec<HicannRecord>),
    All(HicannDefaults),
}

impl HicannsRecord {
    fn from_entries(hicanns: &BTreeMap<HICANNOnWafer, HICANNEntry>) -> Option<Self> {
        let first = hicanns.values().next()?;
        if hicanns.len() == HICANNOnWafer::SIZE && hicanns.values().all(|h| h == first) {
            return Some(Self::All(HicannDefaults {
                version: first.version,
                label: first.label.clone(),
            }));
        }
        Some(Self::List(
            hicanns
                .iter()
                .map(|(hicann, entry)| HicannRecord {
                    hicann: hicann.value(),
                    version: entry.version,
                    label: entry.label.clone(),
                })
                .collect(),
        ))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WaferDocument {
    wafer: u32,
    setuptype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    macu: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    macuversion: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fpgas: Vec<FpgaRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    reticles: Vec<ReticleRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    ananas: Vec<AnanasRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    adcs: Vec<AdcRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hicanns: Option<HicannsRecord>,
}

impl WaferDocument {
    fn from_entry(wafer: Wafer, entry: &WaferEntry) -> Self {
        Self {
            wafer: wafer.value(),
            setuptype: entry.setup_type.to_string(),
            macu: Some(entry.macu),
            macuversion: Some(entry.macu_version),
            fpgas: entry
                .fpgas
                .iter()
                .map(|(fpga, e)| FpgaRecord {
                    fpga: fpga.value(),
                    ip: e.ip,
                    highspeed: e.highspeed,
                })
                .collect(),
            reticles: entry
                .reticles
                .iter()
                .map(|(dnc, e)| ReticleRecord {
                    reticle: dnc.value(),
                    to_be_powered: e.to_be_powered,
                })
                .collect(),
            ananas: entry
                .ananas
                .iter()
                .map(|(ananas, e)| AnanasRecord {
                    ananas: ananas.value(),
                    ip: e.ip,
                    baseport_data: e.baseport_data,
                    baseport_reset: e.baseport_reset,
                })
                .collect(),
            adcs: entry
                .adcs
                .iter()
                .map(|(slot, e)| AdcRecord::from_entry(*slot, e))
                .collect(),
            hicanns: HicannsRecord::from_entries(&entry.hicanns),
        }
    }

    fn apply(self, db: &mut Database) -> Result<(), DocumentError> {
        let wafer = Wafer::new(self.wafer);
        let setup_type: SetupType = self.setuptype.parse()?;

        let mut entry = WaferEntry::new(setup_type);
        match (self.macu, self.macuversion) {
            (Some(macu), Some(version)) => {
                entry.macu = macu;
                entry.macu_version = version;
            }
            _ if setup_type == SetupType::BSSWafer => {
                return Err(DocumentError::Invalid(format!(
                    "{setup_type} {wafer} requires macu and macuversion"
                )));
            }
            (macu, version) => {
                entry.macu = macu.unwrap_or(Ipv4Addr::UNSPECIFIED);
                entry.macu_version = version.unwrap_or_default();
            }
        }
        db.add::<Wafers>(wafer, entry)?;

        for fpga in self.fpgas {
            db.add::<Fpgas>(
                FPGAGlobal::new(FPGAOnWafer::new(fpga.fpga)?, wafer),
                FPGAEntry {
                    ip: fpga.ip,
                    highspeed: fpga.highspeed,
                },
            )?;
        }
        for reticle in self.reticles {
            db.add::<Reticles>(
                DNCGlobal::new(DNCOnWafer::new(reticle.reticle)?, wafer),
                ReticleEntry {
                    to_be_powered: reticle.to_be_powered,
                },
            )?;
        }
        for ananas in self.ananas {
            db.add::<AnanasBoards>(
                AnanasGlobal::new(AnanasOnWafer::new(ananas.ananas)?, wafer),
                AnanasEntry {
                    ip: ananas.ip,
                    baseport_data: ananas.baseport_data,
                    baseport_reset: ananas.baseport_reset,
                },
            )?;
        }
        for adc in self.adcs {
            let (key, entry) = adc.into_entry(wafer)?;
            db.add::<Adcs>(key, entry)?;
        }

        match self.hicanns {
            None => {}
            Some(HicannsRecord::List(hicanns)) => {
                for hicann in hicanns {
                    db.add::<Hicanns>(
                        HICANNGlobal::new(HICANNOnWafer::new(hicann.hicann)?, wafer),
                        HICANNEntry {
                            version: hicann.version,
                            label: hicann.label,
                        },
                    )?;
                }
            }
            Some(HicannsRecord::All(defaults)) => {
                let served: Vec<HICANNGlobal> = HICANNOnWafer::iter_all()
                    .map(|hicann| HICANNGlobal::new(hicann, wafer))
                    .filter(|hicann| db.has::<Fpgas>(&hicann.to_fpga()))
                    .collect();
                for hicann in served {
                    db.add::<Hicanns>(
                        hicann,
                        HICANNEntry {
                            version: defaults.version,
                            label: defaults.label.clone(),
                        },
                    )?;
                }
            }
        }
        Ok(())
    }
}

// ── DLS documents ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct DlsDocument {
    #[serde(deserialize_with = "lenient::string")]
    dls_setup: String,
    #[serde(default, deserialize_with = "lenient::string")]
    fpga_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    board_name: String,
    #[serde(default, deserialize_with = "lenient::number")]
    board_version: u32,
    #[serde(default, deserialize_with = "lenient::number")]
    chip_id: u32,
    #[serde(default, deserialize_with = "lenient::number")]
    chip_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ntpwr_ip: Option<Ipv4Addr>,
    #[serde(default, skip_serializing_if = "is_zero")]
    ntpwr_slot: u32,
}

impl DlsDocument {
    fn from_entry(setup: &str, entry: &DLSSetupEntry) -> Self {
        Self {
            dls_setup: setup.to_string(),
            fpga_name: entry.fpga_name.clone(),
            board_name: entry.board_name.clone(),
            board_version: entry.board_version,
            chip_id: entry.chip_id,
            chip_version: entry.chip_version,
            ntpwr_ip: entry.ntpwr_ip,
            ntpwr_slot: entry.ntpwr_slot,
        }
    }

    fn apply(self, db: &mut Database) -> Result<(), DocumentError> {
        db.add::<DlsSetups>(
            self.dls_setup,
            DLSSetupEntry {
                fpga_name: self.fpga_name,
                board_name: self.board_name,
                board_version: self.board_version,
                chip_id: self.chip_id,
                chip_version: self.chip_version,
                ntpwr_ip: self.ntpwr_ip,
                ntpwr_slot: self.ntpwr_slot,
            },
        )?;
        Ok(())
    }
}

// ── Multi-chip carrier documents ──────────────────────────────────────────

/// One FPGA of an HX-cube or Jboa, flattened together with its wing.
#[derive(Debug, Serialize, Deserialize)]
struct CarrierFpgaRecord {
    fpga: u8,
    ip: Ipv4Addr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fuse_dna: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    extoll_node_id: Option<u16>,
    #[serde(default, skip_serializing_if = "is_false")]
    ci_test_node: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    handwritten_chip_serial: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chip_revision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    eeprom_chip_serial: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ldo_version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    synram_timing_pcconf: Option<SynramTiming>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    synram_timing_wconf: Option<SynramTiming>,
}

impl CarrierFpgaRecord {
    fn from_entry(slot: u8, entry: &HXCubeFPGAEntry) -> Self {
        let wing = entry.wing.as_ref();
        Self {
            fpga: slot,
            ip: entry.ip,
            fuse_dna: entry.fuse_dna,
            extoll_node_id: entry.extoll_node_id,
            ci_test_node: entry.ci_test_node,
            handwritten_chip_serial: wing.map(|w| w.handwritten_chip_serial),
            chip_revision: wing.map(|w| w.chip_revision),
            eeprom_chip_serial: wing.and_then(|w| w.eeprom_chip_serial),
            ldo_version: wing.and_then(|w| w.ldo_version),
            synram_timing_pcconf: wing.and_then(|w| w.synram_timing_pcconf),
            synram_timing_wconf: wing.and_then(|w| w.synram_timing_wconf),
        }
    }

    fn into_entry(self) -> Result<(u8, HXCubeFPGAEntry), DocumentError> {
        let wing = match (self.handwritten_chip_serial, self.chip_revision) {
            (Some(handwritten_chip_serial), Some(chip_revision)) => Some(HXCubeWingEntry {
                handwritten_chip_serial,
                chip_revision,
                eeprom_chip_serial: self.eeprom_chip_serial,
                ldo_version: self.ldo_version,
                synram_timing_pcconf: self.synram_timing_pcconf,
                synram_timing_wconf: self.synram_timing_wconf,
            }),
            (None, None) => {
                let wing_only = self.eeprom_chip_serial.is_some()
                    || self.ldo_version.is_some()
                    || self.synram_timing_pcconf.is_some()
                    || self.synram_timing_wconf.is_some();
                if wing_only {
                    return Err(DocumentError::Invalid(format!(
                        "fpga {}: wing fields given without handwritten_chip_serial and chip_revision",
                        self.fpga
                    )));
                }
                None
            }
            _ => {
                return Err(DocumentError::Invalid(format!(
                    "fpga {}: handwritten_chip_serial and chip_revision must be given together",
                    self.fpga
                )));
            }
        };

        Ok((
            self.fpga,
            HXCubeFPGAEntry {
                ip: self.ip,
                ci_test_node: self.ci_test_node,
                fuse_dna: self.fuse_dna,
                extoll_node_id: self.extoll_node_id,
                wing,
            },
        ))
    }
}

fn carrier_fpgas(
    records: Vec<CarrierFpgaRecord>,
) -> Result<BTreeMap<u8, HXCubeFPGAEntry>, DocumentError> {
    records.into_iter().map(CarrierFpgaRecord::into_entry).collect()
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct HXCubeDocument {
    hxcube_id: HXCubeId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fpgas: Vec<CarrierFpgaRecord>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    usb_host: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    usb_serial: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xilinx_hw_server: Option<String>,
}

impl HXCubeDocument {
    fn from_entry(hxcube_id: HXCubeId, entry: &HXCubeSetupEntry) -> Self {
        Self {
            hxcube_id,
            fpgas: entry
                .fpgas
                .iter()
                .map(|(slot, fpga)| CarrierFpgaRecord::from_entry(*slot, fpga))
                .collect(),
            usb_host: entry.usb_host.clone(),
            usb_serial: entry.usb_serial.clone(),
            xilinx_hw_server: entry.xilinx_hw_server.clone(),
        }
    }

    fn apply(self, db: &mut Database) -> Result<(), DocumentError> {
        let entry = HXCubeSetupEntry {
            hxcube_id: self.hxcube_id,
            fpgas: carrier_fpgas(self.fpgas)?,
            usb_host: self.usb_host,
            usb_serial: self.usb_serial,
            xilinx_hw_server: self.xilinx_hw_server,
        };
        db.add::<HXCubeSetups>(self.hxcube_id, entry)?;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AggregatorRecord {
    aggregator: u8,
    ip: Ipv4Addr,
    #[serde(default, skip_serializing_if = "is_false")]
    ci_test_node: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct JboaDocument {
    jboa_id: JboaId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fpgas: Vec<CarrierFpgaRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    aggregators: Vec<AggregatorRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    xilinx_hw_server: Option<String>,
}

impl JboaDocument {
    fn from_entry(jboa_id: JboaId, entry: &JboaSetupEntry) -> Self {
        Self {
            jboa_id,
            fpgas: entry
                .fpgas
                .iter()
                .map(|(slot, fpga)| CarrierFpgaRecord::from_entry(*slot, fpga))
                .collect(),
            aggregators: entry
                .aggregators
                .iter()
                .map(|(slot, aggregator)| AggregatorRecord {
                    aggregator: *slot,
                    ip: aggregator.ip,
                    ci_test_node: aggregator.ci_test_node,
                })
                .collect(),
            xilinx_hw_server: entry.xilinx_hw_server.clone(),
        }
    }

    fn apply(self, db: &mut Database) -> Result<(), DocumentError> {
        let entry = JboaSetupEntry {
            jboa_id: self.jboa_id,
            fpgas: carrier_fpgas(self.fpgas)?,
            aggregators: self
                .aggregators
                .into_iter()
                .map(|record| {
                    (
                        record.aggregator,
                        JboaAggregatorEntry {
                            ip: record.ip,
                            ci_test_node: record.ci_test_node,
                        },
                    )
                })
                .collect(),
            xilinx_hw_server: self.xilinx_hw_server,
        };
        db.add::<JboaSetups>(self.jboa_id, entry)?;
        Ok(())
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Wafer,
    Dls,
    HXCube,
    Jboa,
}

const DOCUMENT_KEYS: [(&str, DocumentKind); 4] = [
    ("wafer", DocumentKind::Wafer),
    ("dls_setup", DocumentKind::Dls),
    ("hxcube_id", DocumentKind::HXCube),
    ("jboa_id", DocumentKind::Jboa),
];

/// Add the entries of one parsed document to `db`.
///
/// Returns `false` when the document is of no known kind and was skipped.
pub(crate) fn apply(db: &mut Database, document: Value) -> Result<bool, DocumentError> {
    let kind = DOCUMENT_KEYS
        .iter()
        .find(|(key, _)| document.get(*key).is_some())
        .map(|(_, kind)| *kind);

    match kind {
        Some(DocumentKind::Wafer) => serde_yaml::from_value::<WaferDocument>(document)?.apply(db)?,
        Some(DocumentKind::Dls) => serde_yaml::from_value::<DlsDocument>(document)?.apply(db)?,
        Some(DocumentKind::HXCube) => {
            serde_yaml::from_value::<HXCubeDocument>(document)?.apply(db)?;
        }
        Some(DocumentKind::Jboa) => serde_yaml::from_value::<JboaDocument>(document)?.apply(db)?,
        None => return Ok(false),
    }
    Ok(true)
}

/// One output document; serializes as the inner record.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum Document {
    Wafer(WaferDocument),
    Dls(DlsDocument),
    HXCube(HXCubeDocument),
    Jboa(JboaDocument),
}

/// All documents of `db`: wafers, then DLS setups, HX-cubes and Jboas, each
/// in canonical key order.
pub(crate) fn documents(db: &Database) -> Vec<Document> {
    let wafers = db
        .wafers()
        .map(|(wafer, entry)| Document::Wafer(WaferDocument::from_entry(wafer, entry)));
    let dls = db
        .dls_setups()
        .map(|(setup, entry)| Document::Dls(DlsDocument::from_entry(setup, entry)));
    let hxcubes = db
        .hxcubes()
        .map(|(id, entry)| Document::HXCube(HXCubeDocument::from_entry(id, entry)));
    let jboas = db
        .jboas()
        .map(|(id, entry)| Document::Jboa(JboaDocument::from_entry(id, entry)));

    wafers.chain(dls).chain(hxcubes).chain(jboas).collect()
}
