//! CLI command implementations

pub mod decode;
pub mod download;
pub mod error;

pub use decode::DecodeArgs;
pub use download::{BootstrapArgs, Cli, Commands, DailyArgs, FeedTarget, SnapshotArgs};
pub use error::CliError;
