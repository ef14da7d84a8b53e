//! Branch identifiers of the fixture's multi-chip carriers.

use hwdb_core::{HXCubeSetups, StoreError};
use hwdb_types::{BranchIdError, BranchIdentifier, CarrierKind, HXCubeId, JboaId};

use crate::common::fixture_db;

#[test]
fn hxcube_chip_by_handwritten_and_eeprom_serial() {
    let db = fixture_db();
    let cube = HXCubeId::new(6);

    let by_label = db.hxcube_branch_identifier(cube, 12).expect("serial 12");
    assert_eq!(by_label.to_string(), "hxcube6fpga0chip12_1");

    let by_eeprom = db
        .hxcube_branch_identifier(cube, 0x1234_ABCD)
        .expect("eeprom serial");
    assert_eq!(by_eeprom, by_label);

    assert_eq!(
        db.hxcube_branch_identifier(cube, 69)
            .expect("serial 69")
            .to_string(),
        "hxcube6fpga3chip69_1"
    );
}

#[test]
fn legacy_hxcube_form_has_no_board_slot() {
    let db = fixture_db();
    let cube = db.get::<HXCubeSetups>(&HXCubeId::new(6)).expect("cube");
    let legacy = cube.legacy_branch_identifier(12).expect("legacy");
    assert_eq!(legacy.to_string(), "hxcube6chip12_1");
    assert_eq!(legacy.board_slot(), None);
}

#[test]
fn jboa_chip() {
    let db = fixture_db();
    let identifier = db
        .jboa_branch_identifier(JboaId::new(7), 13)
        .expect("serial 13");
    assert_eq!(identifier.to_string(), "jboa7fpga12chip13_1");

    let decoded: BranchIdentifier = "jboa7fpga12chip13_1".parse().expect("decode");
    assert_eq!(decoded, identifier);
    assert_eq!(decoded.carrier(), CarrierKind::Jboa);
    assert_eq!(decoded.board_slot(), Some(12));
}

#[test]
fn lookup_failures() {
    let db = fixture_db();

    assert!(matches!(
        db.hxcube_branch_identifier(HXCubeId::new(6), 5),
        Err(StoreError::BranchId(BranchIdError::ChipNotFound { chip_serial: 5, .. }))
    ));
    assert!(matches!(
        db.hxcube_branch_identifier(HXCubeId::new(6), 100),
        Err(StoreError::BranchId(BranchIdError::InvalidSerial(100)))
    ));
    assert!(matches!(
        db.hxcube_branch_identifier(HXCubeId::new(99), 12),
        Err(StoreError::NotFound { .. })
    ));
}
