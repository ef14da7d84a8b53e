//! Shared test utilities and fixtures
//!
//! A database file covering every document kind, plus helpers to place it on
//! disk and run the `hwdb` binary against it.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

use hwdb_core::Database;
use hwdb_types::{FPGAGlobal, FPGAOnWafer, HICANNGlobal, HICANNOnWafer, Wafer};

pub const FIXTURE: &str = "\
---
wafer: 5
setuptype: bsswafer
macu: 192.168.200.165
macuversion: 1
fpgas:
  - fpga: 0
    ip: 192.168.5.1
  - fpga: 3
    ip: 192.168.5.4
reticles:
  - reticle: 0
    to_be_powered: true
  - reticle: 1
    to_be_powered: false
ananas:
  - ananas: 0
    ip: 192.168.5.190
    baseport_data: 0xafe0
    baseport_reset: 0x2570
adcs:
  - fpga: 0
    analog: 0
    adc: B201331
    channel: 0
    trigger: 1
  - fpga: 0
    analog: 1
    adc: B201331
    channel: 1
    trigger: 1
  - fpga: 3
    analog: 0
    adc: B201259
    channel: 0
    trigger: 1
    remote_ip: 192.168.200.44
    remote_port: 44489
hicanns:
  - hicann: 88
    version: 4
    label: v4-26
  - hicann: 116
    version: 4
    label: v4-26
  - hicann: 144
    version: 4
    label: v4-15
---
dls_setup: '07_20'
fpga_name: '07'
board_name: 'Gaston'
board_version: 2
chip_id: '20'
chip_version: 2
ntpwr_ip: '192.168.200.54'
ntpwr_slot: 1
---
dls_setup: 'B123456_42'
fpga_name: 'B123456'
board_name: 'Herbert'
board_version: 5
chip_id: '42'
chip_version: 4
ntpwr_ip: '192.168.200.108'
ntpwr_slot: 3
---
hxcube_id: 6
fpgas:
  - fpga: 0
    ip: 192.168.66.1
    ci_test_node: true
    extoll_node_id: 2
    handwritten_chip_serial: 12
    chip_revision: 42
    eeprom_chip_serial: 0x1234ABCD
    synram_timing_pcconf:
      - [1, 2]
      - [1, 2]
    synram_timing_wconf:
      - [3, 4]
      - [3, 4]
    fuse_dna: 0x3A0E92C402882A33
  - fpga: 3
    ip: 192.168.66.4
    handwritten_chip_serial: 69
    chip_revision: 1
  - fpga: 7
    ip: 192.168.66.8
usb_host: 'AMTHost11'
usb_serial: 'AFEABC1230456789'
xilinx_hw_server: 'abc.de:1234'
---
jboa_id: 7
fpgas:
  - fpga: 12
    ip: 192.168.87.33
    handwritten_chip_serial: 13
    chip_revision: 43
  - fpga: 13
    ip: 192.168.87.34
    fuse_dna: 0x123456789
aggregators:
  - aggregator: 0
    ip: 192.168.87.13
    ci_test_node: true
  - aggregator: 1
    ip: 192.168.87.45
xilinx_hw_server: 'abc.yz:4321'
";

/// The fixture written to a temporary directory.
pub struct FixtureFile {
    dir: TempDir,
    path: PathBuf,
}

impl FixtureFile {
    pub fn new() -> Self {
        Self::with_content(FIXTURE)
    }

    pub fn with_content(content: &str) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("db.yaml");
        fs::write(&path, content).expect("write fixture");
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

pub fn fixture_db() -> Database {
    hwdb_persist::parse(FIXTURE).expect("fixture parses")
}

pub fn fpga(wafer: u32, fpga: usize) -> FPGAGlobal {
    FPGAGlobal::new(FPGAOnWafer::new(fpga).expect("fpga"), Wafer::new(wafer))
}

pub fn hicann(wafer: u32, hicann: usize) -> HICANNGlobal {
    HICANNGlobal::new(HICANNOnWafer::new(hicann).expect("hicann"), Wafer::new(wafer))
}

/// Run the `hwdb` binary with `HOME` pointed at an empty directory so no user
/// config leaks into the test.
pub fn run_hwdb(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hwdb"))
        .args(args)
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .output()
        .expect("run hwdb")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
