//! Decode command: feed rows to JSON lines

use clap::Args;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::info;

use crate::item::FeedItem;

use super::CliError;

/// Arguments for decoding a feed file
#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Decompressed TSV feed file
    #[arg(long)]
    pub input: PathBuf,

    /// Skip the first row (column header)
    #[arg(long, default_value_t = false)]
    pub skip_header: bool,
}

impl DecodeArgs {
    /// Print every row of the input file to stdout.
    pub fn execute(&self) -> Result<(), CliError> {
        let file = File::open(&self.input)?;
        let stdout = io::stdout();
        let count = decode_rows(BufReader::new(file), self.skip_header, &mut stdout.lock())?;
        info!("Decoded {} rows from {}", count, self.input.display());
        Ok(())
    }
}

/// Write each row of `reader` to `out` as one JSON object per line.
///
/// Returns the number of rows written.
pub fn decode_rows<R: BufRead, W: Write>(
    reader: R,
    skip_header: bool,
    out: &mut W,
) -> Result<usize, CliError> {
    let mut count = 0;
    for item in FeedItem::read_all(reader).skip(usize::from(skip_header)) {
        serde_json::to_writer(&mut *out, &item?)?;
        out.write_all(b"\n")?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}
