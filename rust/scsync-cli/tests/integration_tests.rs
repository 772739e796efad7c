use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::str::{contains, is_empty};
use tempfile::tempdir;

use scsync::{
    batch::DepthBatch,
    encode::{DepthEncoder, IntradayEncoder},
    enums::DepthCommand,
    flags::FlagSet,
    record::{DepthHeader, DepthRecord, IntradayHeader, IntradayRecord},
    timestamp,
};

const DAY: &str = "2024-03-31";

fn cmd() -> Command {
    Command::cargo_bin("scsync").unwrap()
}

/// Platform microseconds `offset_us` into the test day.
fn day_us(offset_us: u64) -> u64 {
    let day = scsync_cli::parse_date(DAY).unwrap();
    timestamp::to_sc_us(timestamp::day_bounds(day).0) + offset_us
}

fn write_fixture_pair(dir: &Path, symbol: &str) {
    let mut records = vec![
        DepthRecord {
            sc_us: day_us(5_000),
            command: DepthCommand::AddBidLevel,
            flags: FlagSet::empty(),
            num_orders: 2,
            price: 100.0,
            quantity: 5,
            reserved: 0,
        },
        DepthRecord {
            sc_us: day_us(5_000),
            command: DepthCommand::AddAskLevel,
            flags: FlagSet::empty(),
            num_orders: 1,
            price: 100.25,
            quantity: 3,
            reserved: 0,
        },
    ];
    records.last_mut().unwrap().flags.set_end_of_batch();
    let batch = DepthBatch::from_records(records).unwrap();
    let mut depth = DepthEncoder::new(Vec::new(), &DepthHeader::default()).unwrap();
    depth.encode_batch(&batch).unwrap();
    fs::write(dir.join(format!("{symbol}.{DAY}.depth")), depth.into_inner()).unwrap();

    let trade = IntradayRecord {
        sc_us: day_us(5_123),
        open_bits: scsync::SINGLE_TRADE_BITS,
        high: 100.25,
        low: 100.0,
        close: 100.25,
        num_trades: 1,
        total_volume: 3,
        bid_volume: 0,
        ask_volume: 3,
    };
    let mut trades = IntradayEncoder::new(Vec::new(), &IntradayHeader::default()).unwrap();
    trades.encode_records(&[trade]).unwrap();
    fs::write(dir.join(format!("{symbol}.scid")), trades.into_inner()).unwrap();
}

#[test]
fn synchronizes_a_day_and_writes_the_sync_pair() {
    let dir = tempdir().unwrap();
    write_fixture_pair(dir.path(), "ESM4");
    cmd()
        .args(["ESM4", DAY, "--data-dir", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("complete"))
        .stdout(contains("hash"));
    assert!(dir.path().join("ESM4-SYNC.scid").exists());
    assert!(dir.path().join(format!("ESM4-SYNC.{DAY}.depth")).exists());
    let manifest =
        fs::read_to_string(dir.path().join(format!("ESM4-SYNC.{DAY}.manifest.json"))).unwrap();
    assert!(manifest.contains(r#""injected_open_bits":"0x7fc0dead""#));
    assert!(manifest.contains(r#""status":"complete""#));
    // no stray temporaries
    assert!(!dir.path().join("ESM4-SYNC.scid.tmp").exists());
}

#[test]
fn rejects_a_depth_file_with_a_bad_magic_number() {
    let dir = tempdir().unwrap();
    write_fixture_pair(dir.path(), "ESM4");
    let depth_path = dir.path().join(format!("ESM4.{DAY}.depth"));
    let mut bytes = fs::read(&depth_path).unwrap();
    bytes[0..4].copy_from_slice(b"QQQQ");
    fs::write(&depth_path, bytes).unwrap();
    cmd()
        .args(["ESM4", DAY, "--data-dir", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stdout(is_empty())
        .stderr(contains("magic"));
    assert!(!dir.path().join("ESM4-SYNC.scid").exists());
}

#[test]
fn rejects_depth_records_outside_the_requested_day() {
    let dir = tempdir().unwrap();
    write_fixture_pair(dir.path(), "ESM4");
    // ask for a different day than the records were written into
    let other_depth = dir.path().join("ESM4.2024-04-01.depth");
    fs::copy(dir.path().join(format!("ESM4.{DAY}.depth")), &other_depth).unwrap();
    cmd()
        .args(["ESM4", "2024-04-01", "--data-dir", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("outside the session day"));
}

#[test]
fn missing_inputs_fail_with_a_path_in_the_message() {
    let dir = tempdir().unwrap();
    cmd()
        .args(["NQZ4", DAY, "--data-dir", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("NQZ4.scid"));
}

#[test]
fn bad_date_arguments_are_rejected_by_the_parser() {
    cmd()
        .args(["ESM4", "March 15th"])
        .assert()
        .failure()
        .stderr(contains("not a valid YYYY-MM-DD date"));
}
