//! Pieces shared by the `sna` and `sna-vis` binaries.

use clap::Args;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::error::LoadError;
use crate::loader::{LoadOptions, MalformedPolicy};

/// Edge list parsing flags.
#[derive(Args, Debug, Clone)]
pub struct LoadArgs {
    /// Field delimiter: a single character, `tab` or `\t`
    #[arg(long, default_value = "tab", env = "SNA_DELIMITER", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// What to do with lines that have fewer than two fields
    #[arg(long, value_enum, default_value_t = MalformedPolicy::Abort, env = "SNA_ON_MALFORMED")]
    pub on_malformed: MalformedPolicy,

    /// Ignore the first line of the file
    #[arg(long)]
    pub skip_first: bool,
}

impl LoadArgs {
    pub fn options(&self) -> LoadOptions {
        LoadOptions {
            delimiter: self.delimiter,
            malformed: self.on_malformed,
            skip_first: self.skip_first,
            ..LoadOptions::default()
        }
    }
}

pub fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        "comma" => Ok(b','),
        "space" => Ok(b' '),
        _ => match raw.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(format!("delimiter must be a single ASCII character, got {raw:?}")),
        },
    }
}

/// Logs go to stderr so stdout only carries results. `RUST_LOG` overrides
/// the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// 2 for unreadable input, 3 for malformed input, 1 otherwise.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.chain().find_map(|cause| cause.downcast_ref::<LoadError>()) {
        Some(LoadError::Input { .. }) => 2,
        Some(LoadError::MalformedLine { .. } | LoadError::Parse { .. }) => 3,
        None => 1,
    }
}

/// Prints the error chain to stderr and maps it to an exit code.
pub fn report(err: anyhow::Error) -> ExitCode {
    eprintln!("error: {err:#}");
    ExitCode::from(exit_code(&err))
}
