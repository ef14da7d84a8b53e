//! The fixture file loads into the expected entries.

use std::net::Ipv4Addr;

use hwdb_core::{
    AnanasBoards, DlsSetups, Fpgas, HXCubeSetups, Hicanns, JboaSetups, Reticles, StoreError,
    Wafers,
};
use hwdb_types::{
    AnanasGlobal, AnanasOnWafer, CalibrationMode, DNCGlobal, DNCOnWafer, HXCubeId, JboaId,
    SetupType, Wafer,
};

use crate::common::{fixture_db, fpga, hicann};

#[test]
fn wafer_entry_and_children() {
    let db = fixture_db();
    let wafer = db.get::<Wafers>(&Wafer::new(5)).expect("wafer 5");

    assert_eq!(wafer.setup_type, SetupType::BSSWafer);
    assert_eq!(wafer.macu, Ipv4Addr::new(192, 168, 200, 165));
    assert_eq!(wafer.macu_version, 1);
    assert_eq!(wafer.fpgas.len(), 2);
    assert_eq!(wafer.hicanns.len(), 3);
    assert_eq!(wafer.adcs.len(), 3);

    let f3 = db.get::<Fpgas>(&fpga(5, 3)).expect("fpga 3");
    assert_eq!(f3.ip, Ipv4Addr::new(192, 168, 5, 4));
    assert!(f3.highspeed);
    assert!(!db.has::<Fpgas>(&fpga(5, 1)));
}

#[test]
fn reticles_ananas_and_hicanns() {
    let db = fixture_db();
    let reticle = |d| DNCGlobal::new(DNCOnWafer::new(d).expect("dnc"), Wafer::new(5));
    assert!(db.get::<Reticles>(&reticle(0)).expect("reticle 0").to_be_powered);
    assert!(!db.get::<Reticles>(&reticle(1)).expect("reticle 1").to_be_powered);

    let ananas = db
        .get::<AnanasBoards>(&AnanasGlobal::new(
            AnanasOnWafer::new(0).expect("ananas"),
            Wafer::new(5),
        ))
        .expect("ananas 0");
    assert_eq!(ananas.ip, Ipv4Addr::new(192, 168, 5, 190));
    assert_eq!(ananas.baseport_data, 0xafe0);
    assert_eq!(ananas.baseport_reset, 0x2570);

    let h144 = db.get::<Hicanns>(&hicann(5, 144)).expect("hicann 144");
    assert_eq!(h144.version, 4);
    assert_eq!(h144.label, "v4-15");
    assert_eq!(db.get::<Hicanns>(&hicann(5, 88)).expect("hicann 88").label, "v4-26");
}

#[test]
fn per_fpga_views() {
    let db = fixture_db();

    let on_f0 = db.hicanns_of_fpga(fpga(5, 0));
    assert_eq!(on_f0.len(), 1);
    assert_eq!(on_f0[0].0, hicann(5, 144));
    assert_eq!(db.hicanns_of_fpga(fpga(5, 3)).len(), 2);

    let adcs = db.adcs_of_fpga(fpga(5, 3));
    assert_eq!(adcs.len(), 1);
    let (_, adc) = adcs[0];
    assert_eq!(adc.coord, "B201259");
    assert_eq!(adc.calibration, CalibrationMode::Default);
    assert_eq!(adc.remote_ip, Ipv4Addr::new(192, 168, 200, 44));
    assert_eq!(adc.remote_port, 44489);

    let local = db.adcs_of_fpga(fpga(5, 0));
    assert_eq!(local.len(), 2);
    assert!(local.iter().all(|(_, adc)| adc.remote_ip == Ipv4Addr::UNSPECIFIED));
}

#[test]
fn dls_setups() {
    let db = fixture_db();
    assert_eq!(db.keys::<DlsSetups>(), ["07_20", "B123456_42"]);

    let gaston = db.get::<DlsSetups>(&"07_20".to_string()).expect("07_20");
    assert_eq!(gaston.fpga_name, "07");
    assert_eq!(gaston.board_name, "Gaston");
    assert_eq!(gaston.board_version, 2);
    assert_eq!(gaston.chip_id, 20);
    assert_eq!(gaston.chip_version, 2);
    assert_eq!(gaston.ntpwr_ip, Some(Ipv4Addr::new(192, 168, 200, 54)));
    assert_eq!(gaston.ntpwr_slot, 1);

    let herbert = db.get::<DlsSetups>(&"B123456_42".to_string()).expect("B123456_42");
    assert_eq!(herbert.chip_id, 42);
    assert_eq!(herbert.ntpwr_slot, 3);
}

#[test]
fn hxcube_setup() {
    let db = fixture_db();
    let cube = db.get::<HXCubeSetups>(&HXCubeId::new(6)).expect("hxcube 6");

    assert_eq!(cube.usb_host, "AMTHost11");
    assert_eq!(cube.usb_serial, "AFEABC1230456789");
    assert_eq!(cube.xilinx_hw_server.as_deref(), Some("abc.de:1234"));
    assert_eq!(cube.fpgas.keys().copied().collect::<Vec<_>>(), [0, 3, 7]);

    let f0 = &cube.fpgas[&0];
    assert_eq!(f0.ip, Ipv4Addr::new(192, 168, 66, 1));
    assert!(f0.ci_test_node);
    assert_eq!(f0.extoll_node_id, Some(2));
    assert_eq!(f0.fuse_dna, Some(0x3A0E_92C4_0288_2A33));
    let wing = f0.wing.as_ref().expect("wing on fpga 0");
    assert_eq!(wing.handwritten_chip_serial, 12);
    assert_eq!(wing.chip_revision, 42);
    assert_eq!(wing.eeprom_chip_serial, Some(0x1234_ABCD));
    assert_eq!(wing.synram_timing_pcconf, Some([[1, 2], [1, 2]]));
    assert_eq!(wing.synram_timing_wconf, Some([[3, 4], [3, 4]]));

    let f3 = &cube.fpgas[&3];
    assert!(!f3.ci_test_node);
    assert_eq!(f3.fuse_dna, None);
    assert_eq!(f3.wing.as_ref().map(|w| w.handwritten_chip_serial), Some(69));
    assert!(cube.fpgas[&7].wing.is_none());
}

#[test]
fn jboa_setup() {
    let db = fixture_db();
    let jboa = db.get::<JboaSetups>(&JboaId::new(7)).expect("jboa 7");

    assert_eq!(jboa.xilinx_hw_server.as_deref(), Some("abc.yz:4321"));
    assert_eq!(
        jboa.fpgas[&12].wing.as_ref().map(|w| w.chip_revision),
        Some(43)
    );
    assert_eq!(jboa.fpgas[&13].fuse_dna, Some(0x1_2345_6789));
    assert!(jboa.fpgas[&13].wing.is_none());

    assert_eq!(jboa.aggregators.len(), 2);
    assert!(jboa.aggregators[&0].ci_test_node);
    assert_eq!(jboa.aggregators[&1].ip, Ipv4Addr::new(192, 168, 87, 45));
    assert!(!jboa.aggregators[&1].ci_test_node);
}

#[test]
fn removing_fpga_drops_its_hicanns() {
    let mut db = fixture_db();
    db.remove::<Fpgas>(&fpga(5, 3)).expect("remove fpga 3");

    assert!(!db.has::<Hicanns>(&hicann(5, 88)));
    assert!(!db.has::<Hicanns>(&hicann(5, 116)));
    assert!(db.has::<Hicanns>(&hicann(5, 144)));
    assert!(matches!(
        db.get::<Fpgas>(&fpga(5, 3)),
        Err(StoreError::NotFound { .. })
    ));
}
