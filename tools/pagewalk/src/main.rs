//! `pagewalk <image> <cr3> <va>...`
//!
//! Translates virtual addresses against a raw physical-memory image whose
//! byte offset equals the physical address. Numbers are `0x`-prefixed hex or
//! decimal, with optional `_` separators. `PAGEWALK_LOG` selects the log level.

mod image;
mod logger;

use crate::image::ImageMemory;
use crate::logger::StderrLogger;
use log::{SetLoggerError, info};
use paging_addresses::VirtualAddress;
use paging_walk::{Cr3, PageWalker, WalkError};
use std::error::Error;
use std::num::ParseIntError;
use std::path::PathBuf;
use std::process::ExitCode;
use std::{env, io};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("usage: pagewalk <image> <cr3> <va>...")]
    Usage,
    #[error("invalid number {arg:?}")]
    InvalidNumber {
        arg: String,
        #[source]
        source: ParseIntError,
    },
    #[error("invalid PAGEWALK_LOG value {0:?}")]
    InvalidLogLevel(String),
    #[error("failed to set up logging")]
    Logger(#[from] SetLoggerError),
    #[error("failed to read image {path:?}")]
    Image {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

struct Args {
    image: PathBuf,
    cr3: u64,
    addresses: Vec<u64>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, CliError> {
        let image = args.next().ok_or(CliError::Usage)?.into();
        let cr3 = parse_number(&args.next().ok_or(CliError::Usage)?)?;
        let addresses = args
            .map(|arg| parse_number(&arg))
            .collect::<Result<Vec<_>, _>>()?;
        if addresses.is_empty() {
            return Err(CliError::Usage);
        }
        Ok(Self {
            image,
            cr3,
            addresses,
        })
    }
}

fn parse_number(arg: &str) -> Result<u64, CliError> {
    let digits = arg.replace('_', "");
    let parsed = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => digits.parse(),
    };
    parsed.map_err(|source| CliError::InvalidNumber {
        arg: arg.to_owned(),
        source,
    })
}

/// The error and its sources on one line, joined with `: `.
fn report(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Translate every address, printing one block per address. Returns the number of failures.
fn run(walker: &PageWalker<'_, ImageMemory>, addresses: &[u64]) -> usize {
    let mut failures = 0;
    for &raw in addresses {
        let va = VirtualAddress::new(raw);
        if !va.is_canonical() {
            info!("{va} is not canonical; translating bits 47:0 only");
        }

        match walker.walk(va) {
            Ok(translation) => {
                for step in translation.path() {
                    println!("  {step}");
                }
                println!(
                    "{va} -> {} ({})",
                    translation.physical_address(),
                    translation.size()
                );
            }
            Err(e @ WalkError::NotPresent(_)) => {
                failures += 1;
                println!("{va} -> not mapped: {e}");
            }
            Err(e @ WalkError::Read { .. }) => {
                failures += 1;
                eprintln!("{va}: {}", report(&e));
            }
        }
    }
    failures
}

fn main() -> Result<ExitCode, CliError> {
    let log_setting = env::var("PAGEWALK_LOG").ok();
    let level = logger::level_from_env(log_setting.as_deref())
        .ok_or_else(|| CliError::InvalidLogLevel(log_setting.unwrap_or_default()))?;
    StderrLogger::new(level).init()?;

    let args = Args::parse(env::args().skip(1))?;
    let memory = ImageMemory::open(&args.image).map_err(|source| CliError::Image {
        path: args.image.clone(),
        source,
    })?;

    let walker = PageWalker::new(&memory, Cr3::from_bits(args.cr3));
    info!("root {:?}", walker.root());

    if run(&walker, &args.addresses) == 0 {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
