//! Unit tests for the CLI argument surface and decode command

use clap::Parser;
use feed_downloader::cli::decode::decode_rows;
use feed_downloader::cli::{Cli, Commands};
use feed_downloader::feed::Environment;
use std::io::{BufReader, Write};

#[test]
fn test_cli_defaults_to_sandbox() {
    let cli = Cli::parse_from([
        "feed-downloader",
        "bootstrap",
        "--category",
        "1",
        "--output",
        "out.gz",
    ]);

    assert_eq!(cli.environment, Environment::Sandbox);
    assert_eq!(cli.chunk_size, None);
    assert_eq!(cli.feed_config().chunk_size, 1_048_576);
}

#[test]
fn test_cli_rejects_zero_chunk_size() {
    let result = Cli::try_parse_from([
        "feed-downloader",
        "--chunk-size",
        "0",
        "bootstrap",
        "--category",
        "1",
        "--output",
        "out.gz",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_cli_rejects_bad_snapshot_time() {
    let result = Cli::try_parse_from([
        "feed-downloader",
        "snapshot",
        "--category",
        "1",
        "--output",
        "out.gz",
        "--at",
        "noon",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_cli_base_url_override() {
    let cli = Cli::parse_from([
        "feed-downloader",
        "--base-url",
        "http://localhost:8080/buy/feed/",
        "decode",
        "--input",
        "items.tsv",
    ]);

    assert_eq!(cli.feed_config().base_url, "http://localhost:8080/buy/feed/");
    assert!(matches!(cli.command, Commands::Decode(_)));
}

#[test]
fn test_decode_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "111\tFirst lamp").unwrap();
    writeln!(file, "222\tSecond lamp").unwrap();
    file.flush().unwrap();

    let reader = BufReader::new(std::fs::File::open(file.path()).unwrap());
    let mut out = Vec::new();
    let count = decode_rows(reader, false, &mut out).unwrap();

    assert_eq!(count, 2);
    let lines: Vec<serde_json::Value> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines[0]["item_id"], "111");
    assert_eq!(lines[1]["title"], "Second lamp");
}
