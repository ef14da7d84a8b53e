//! The `hwdb` binary against the fixture file.

use std::fs;
use std::process::Output;

use crate::common::{FixtureFile, run_hwdb, stderr, stdout};

fn hwdb(fixture: &FixtureFile, args: &[&str]) -> Output {
    let path = fixture.path().to_str().expect("utf-8 path");
    let mut full = vec!["--hwdb", path];
    full.extend_from_slice(args);
    run_hwdb(fixture.dir(), &full)
}

#[test]
fn query_prints_attribute() {
    let fixture = FixtureFile::new();

    let output = hwdb(&fixture, &["query", "W5F3", "ip"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "192.168.5.4\n");

    let output = hwdb(&fixture, &["query", "W5", "hicanns"]);
    assert_eq!(stdout(&output), "W5H88,W5H116,W5H144\n");
}

#[test]
fn unknown_property_lists_names_and_exits_one() {
    let fixture = FixtureFile::new();
    let output = hwdb(&fixture, &["query", "W5D1", "colour"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).is_empty());
    assert!(stderr(&output).contains("available properties are: to_be_powered, fpga"));
}

#[test]
fn missing_entry_fails() {
    let fixture = FixtureFile::new();
    let output = hwdb(&fixture, &["query", "W5F1", "ip"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("not found"));
}

#[test]
fn licenses_to_stdout_and_files() {
    let fixture = FixtureFile::new();

    let output = hwdb(&fixture, &["licenses", "--stdout"]);
    assert!(output.status.success(), "{}", stderr(&output));
    let out = stdout(&output);
    let mut lines = out.lines();
    assert_eq!(
        lines.next(),
        Some("Licenses=W5F0,W5T8,W5F3,W5A0:6,B201331,B201259")
    );
    assert!(lines.next().is_some_and(|l| l.starts_with("AccountingStorageTRES=License/W5F0")));

    let licenses = fixture.dir().join("out-licenses");
    let tres = fixture.dir().join("out-tres");
    let output = hwdb(
        &fixture,
        &[
            "licenses",
            "--license-file",
            licenses.to_str().expect("utf-8"),
            "--tres-file",
            tres.to_str().expect("utf-8"),
        ],
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(
        fs::read_to_string(&licenses)
            .expect("licenses file")
            .ends_with("Licenses=W5F0,W5T8,W5F3,W5A0:6,B201331,B201259")
    );
    assert!(tres.exists());
}

#[test]
fn entries_prints_raw_document() {
    let fixture = FixtureFile::new();
    let output = hwdb(&fixture, &["entries", "jboa_id", "7"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).starts_with("jboa_id: 7\nfpgas:\n"));

    let output = hwdb(&fixture, &["entries", "jboa_id", "8"]);
    assert!(stdout(&output).is_empty());
}

#[test]
fn branch_encode_and_decode() {
    let fixture = FixtureFile::new();

    let output = hwdb(&fixture, &["branch", "encode", "hxcube", "6", "69"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "hxcube6fpga3chip69_1\n");

    let output = hwdb(&fixture, &["branch", "encode", "hxcube", "6", "12", "--legacy"]);
    assert_eq!(stdout(&output), "hxcube6chip12_1\n");

    let output = hwdb(&fixture, &["branch", "encode", "jboa", "9", "4", "--fpga", "2"]);
    assert_eq!(stdout(&output), "jboa9fpga2chip4_1\n");

    let output = hwdb(&fixture, &["branch", "decode", "jboa7fpga12chip13_1"]);
    assert_eq!(
        stdout(&output),
        "carrier: jboa\ncarrier_id: 7\nfpga: 12\nchip_serial: 13\ndisambiguator: 1\n"
    );

    let output = hwdb(&fixture, &["branch", "decode", "jboa7chip13_1"]);
    assert!(!output.status.success());
}

#[test]
fn config_file_supplies_database_path() {
    let fixture = FixtureFile::new();
    let config_dir = fixture.dir().join(".hwdb");
    fs::create_dir(&config_dir).expect("config dir");
    fs::write(
        config_dir.join("config.toml"),
        format!("[database]\npath = \"{}\"\n", fixture.path().display()),
    )
    .expect("config");

    let output = run_hwdb(fixture.dir(), &["query", "W5", "macu"]);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(stdout(&output), "192.168.200.165\n");
}
