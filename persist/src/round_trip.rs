//! Dump and reparse of generated databases.

use std::net::Ipv4Addr;

use proptest::collection::btree_map;
use proptest::option;
use proptest::prelude::*;

use hwdb_core::{Database, DlsSetups, HXCubeSetups, JboaSetups, Wafers};
use hwdb_types::{
    ADCEntry, AdcSlot, AnalogOnHICANN, AnanasEntry, AnanasOnWafer, CalibrationMode, ChannelOnADC,
    DLSSetupEntry, DNCOnWafer, FPGAEntry, FPGAOnWafer, HICANNEntry, HICANNOnWafer,
    HXCubeFPGAEntry, HXCubeId, HXCubeSetupEntry, HXCubeWingEntry, JboaAggregatorEntry, JboaId,
    JboaSetupEntry, ReticleEntry, SetupType, SynramTiming, TriggerOnADC, Wafer, WaferEntry,
};

use crate::{dump, parse};

fn ip() -> impl Strategy<Value = Ipv4Addr> {
    prop_oneof![
        Just(Ipv4Addr::UNSPECIFIED),
        any::<[u8; 4]>().prop_map(Ipv4Addr::from),
    ]
}

fn name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,7}"
}

fn maybe_empty_name() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), name()]
}

// ── Wafers ──

fn fpga_entry() -> impl Strategy<Value = FPGAEntry> {
    (ip(), any::<bool>()).prop_map(|(ip, highspeed)| FPGAEntry { ip, highspeed })
}

fn ananas_entry() -> impl Strategy<Value = AnanasEntry> {
    (ip(), any::<u16>(), any::<u16>()).prop_map(|(ip, baseport_data, baseport_reset)| {
        AnanasEntry {
            ip,
            baseport_data,
            baseport_reset,
        }
    })
}

fn hicann_entry() -> impl Strategy<Value = HICANNEntry> {
    (any::<u32>(), maybe_empty_name()).prop_map(|(version, label)| HICANNEntry { version, label })
}

fn adc_entry() -> impl Strategy<Value = ADCEntry> {
    (
        prop::sample::select(vec![
            CalibrationMode::Load,
            CalibrationMode::Ess,
            CalibrationMode::Default,
        ]),
        name(),
        0..ChannelOnADC::SIZE,
        0..TriggerOnADC::SIZE,
        ip(),
        prop_oneof![Just(0u16), any::<u16>()],
    )
        .prop_map(
            |(calibration, coord, channel, trigger, remote_ip, remote_port)| ADCEntry {
                calibration,
                coord,
                channel: ChannelOnADC::new(channel).expect("channel"),
                trigger: TriggerOnADC::new(trigger).expect("trigger"),
                remote_ip,
                remote_port,
            },
        )
}

/// A wafer whose HICANNs are all served. With `full` set, every FPGA is
/// present and all HICANNs share one entry.
fn wafer_entry() -> impl Strategy<Value = WaferEntry> {
    let meta = (
        prop::sample::select(SetupType::ALL.to_vec()),
        ip(),
        any::<u32>(),
    );
    let children = (
        btree_map(0..FPGAOnWafer::SIZE, fpga_entry(), 0..6),
        btree_map(0..DNCOnWafer::SIZE, any::<bool>(), 0..4),
        btree_map(0..AnanasOnWafer::SIZE, ananas_entry(), 0..=AnanasOnWafer::SIZE),
        btree_map(
            (0..FPGAOnWafer::SIZE, 0..AnalogOnHICANN::SIZE),
            adc_entry(),
            0..4,
        ),
        btree_map(0..HICANNOnWafer::SIZE, hicann_entry(), 0..24),
        option::weighted(0.2, hicann_entry()),
    );

    (meta, children).prop_map(
        |((setup_type, macu, macu_version), (fpgas, reticles, ananas, adcs, hicanns, full))| {
            let mut entry = WaferEntry {
                setup_type,
                macu,
                macu_version,
                ..WaferEntry::default()
            };
            entry.fpgas = fpgas
                .into_iter()
                .map(|(f, fpga)| (FPGAOnWafer::new(f).expect("fpga"), fpga))
                .collect();
            entry.reticles = reticles
                .into_iter()
                .map(|(d, to_be_powered)| {
                    (
                        DNCOnWafer::new(d).expect("reticle"),
                        ReticleEntry { to_be_powered },
                    )
                })
                .collect();
            entry.ananas = ananas
                .into_iter()
                .map(|(a, board)| (AnanasOnWafer::new(a).expect("ananas"), board))
                .collect();
            entry.adcs = adcs
                .into_iter()
                .map(|((f, a), adc)| {
                    let slot = AdcSlot {
                        fpga: FPGAOnWafer::new(f).expect("fpga"),
                        analog: AnalogOnHICANN::new(a).expect("analog"),
                    };
                    (slot, adc)
                })
                .collect();

            if let Some(shared) = full {
                for f in FPGAOnWafer::iter_all() {
                    entry.fpgas.entry(f).or_default();
                }
                entry.hicanns = HICANNOnWafer::iter_all()
                    .map(|h| (h, shared.clone()))
                    .collect();
            } else {
                let served: Vec<_> = hicanns
                    .into_iter()
                    .map(|(h, hicann)| (HICANNOnWafer::new(h).expect("hicann"), hicann))
                    .filter(|(h, _)| entry.fpgas.contains_key(&h.to_fpga()))
                    .collect();
                entry.hicanns = served.into_iter().collect();
            }
            entry
        },
    )
}

// ── Carriers and DLS setups ──

fn synram_timing() -> impl Strategy<Value = Option<SynramTiming>> {
    option::of(any::<SynramTiming>())
}

fn wing() -> impl Strategy<Value = HXCubeWingEntry> {
    (
        any::<u32>(),
        any::<u32>(),
        option::of(any::<u32>()),
        option::of(any::<u32>()),
        synram_timing(),
        synram_timing(),
    )
        .prop_map(
            |(
                handwritten_chip_serial,
                chip_revision,
                eeprom_chip_serial,
                ldo_version,
                synram_timing_pcconf,
                synram_timing_wconf,
            )| HXCubeWingEntry {
                handwritten_chip_serial,
                chip_revision,
                eeprom_chip_serial,
                ldo_version,
                synram_timing_pcconf,
                synram_timing_wconf,
            },
        )
}

fn carrier_fpga() -> impl Strategy<Value = HXCubeFPGAEntry> {
    (
        ip(),
        any::<bool>(),
        option::of(any::<u64>()),
        option::of(any::<u16>()),
        option::of(wing()),
    )
        .prop_map(
            |(ip, ci_test_node, fuse_dna, extoll_node_id, wing)| HXCubeFPGAEntry {
                ip,
                ci_test_node,
                fuse_dna,
                extoll_node_id,
                wing,
            },
        )
}

/// The embedded id is drawn independently of the key the entry is stored
/// under.
fn hxcube() -> impl Strategy<Value = HXCubeSetupEntry> {
    (
        any::<u32>(),
        btree_map(any::<u8>(), carrier_fpga(), 0..4),
        maybe_empty_name(),
        maybe_empty_name(),
        option::of(name()),
    )
        .prop_map(
            |(id, fpgas, usb_host, usb_serial, xilinx_hw_server)| HXCubeSetupEntry {
                hxcube_id: HXCubeId::new(id),
                fpgas,
                usb_host,
                usb_serial,
                xilinx_hw_server,
            },
        )
}

fn jboa() -> impl Strategy<Value = JboaSetupEntry> {
    let aggregator = (ip(), any::<bool>())
        .prop_map(|(ip, ci_test_node)| JboaAggregatorEntry { ip, ci_test_node });
    (
        any::<u32>(),
        btree_map(any::<u8>(), carrier_fpga(), 0..4),
        btree_map(any::<u8>(), aggregator, 0..3),
        option::of(name()),
    )
        .prop_map(|(id, fpgas, aggregators, xilinx_hw_server)| JboaSetupEntry {
            jboa_id: JboaId::new(id),
            fpgas,
            aggregators,
            xilinx_hw_server,
        })
}

fn dls_setup() -> impl Strategy<Value = DLSSetupEntry> {
    (
        maybe_empty_name(),
        maybe_empty_name(),
        any::<u32>(),
        any::<u32>(),
        any::<u32>(),
        option::of(ip()),
        any::<u32>(),
    )
        .prop_map(
            |(fpga_name, board_name, board_version, chip_id, chip_version, ntpwr_ip, ntpwr_slot)| {
                DLSSetupEntry {
                    fpga_name,
                    board_name,
                    board_version,
                    chip_id,
                    chip_version,
                    ntpwr_ip,
                    ntpwr_slot,
                }
            },
        )
}

fn database() -> impl Strategy<Value = Database> {
    (
        btree_map(0..100u32, wafer_entry(), 0..3),
        btree_map(name(), dls_setup(), 0..3),
        btree_map(0..20u32, hxcube(), 0..3),
        btree_map(0..20u32, jboa(), 0..3),
    )
        .prop_map(|(wafers, dls_setups, hxcubes, jboas)| {
            let mut db = Database::new();
            for (wafer, entry) in wafers {
                db.add::<Wafers>(Wafer::new(wafer), entry).expect("wafer");
            }
            for (setup, entry) in dls_setups {
                db.add::<DlsSetups>(setup, entry).expect("dls setup");
            }
            for (id, entry) in hxcubes {
                db.add::<HXCubeSetups>(HXCubeId::new(id), entry)
                    .expect("hxcube");
            }
            for (id, entry) in jboas {
                db.add::<JboaSetups>(JboaId::new(id), entry).expect("jboa");
            }
            db
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_dump_then_parse_restores_database(db in database()) {
        let text = dump(&db).expect("dump");
        let reparsed = parse(&text).expect("reparse");
        prop_assert_eq!(reparsed, db);
    }
}
