use crate::ArgsError;
use crate::defaults;
use clap::Parser;
use std::path::PathBuf;

/// Emitters and receivers run in a tight loop unattended (`auto`) or pause
/// for a line on stdin between every step (`manual`), useful for walking
/// through the protocol by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Auto,
    Manual,
}

impl std::str::FromStr for Mode {
    type Err = ArgsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Mode::Auto),
            "manual" => Ok(Mode::Manual),
            other => Err(ArgsError::BadMode(other.to_string())),
        }
    }
}

fn parse_hex_key(s: &str) -> Result<u8, String> {
    if s.len() != 2 {
        return Err(ArgsError::BadKey(s.to_string()).to_string());
    }
    u8::from_str_radix(s, 16).map_err(|_| ArgsError::BadKey(s.to_string()).to_string())
}

fn parse_capacity(s: &str) -> Result<usize, String> {
    let v: usize = s.parse().map_err(|_| ArgsError::CapacityZero.to_string())?;
    if v == 0 {
        return Err(ArgsError::CapacityZero.to_string());
    }
    Ok(v)
}

fn parse_delay_ms(s: &str) -> Result<u64, String> {
    let v: u64 = s.parse().map_err(|_| ArgsError::DelayOutOfRange(0).to_string())?;
    if v > 5000 {
        return Err(ArgsError::DelayOutOfRange(v).to_string());
    }
    Ok(v)
}

/// `initializer <input-file> <capacity:int≥1> <key:hex2>`
#[derive(Parser, Debug)]
#[command(name = "initializer", about = "Create the shared segment and semaphores, then exit")]
pub struct InitializerArgs {
    pub input_file: PathBuf,

    #[arg(value_parser = parse_capacity)]
    pub capacity: usize,

    #[arg(value_parser = parse_hex_key)]
    pub key: u8,
}

/// `emitter [auto|manual] [key:hex2] [delay-ms:int 0..5000]`
#[derive(Parser, Debug)]
#[command(name = "emitter", about = "Read source bytes into the ring, transformed")]
pub struct EmitterArgs {
    pub mode: Option<Mode>,

    #[arg(value_parser = parse_hex_key)]
    pub key: Option<u8>,

    #[arg(value_parser = parse_delay_ms)]
    pub delay_ms: Option<u64>,
}

impl EmitterArgs {
    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or_else(defaults::mode)
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms.unwrap_or_else(defaults::delay_ms)
    }
}

/// `receiver [auto|manual] [key:hex2] [delay-ms:int 0..5000]`
#[derive(Parser, Debug)]
#[command(name = "receiver", about = "Drain the ring in source order into the output file")]
pub struct ReceiverArgs {
    pub mode: Option<Mode>,

    #[arg(value_parser = parse_hex_key)]
    pub key: Option<u8>,

    #[arg(value_parser = parse_delay_ms)]
    pub delay_ms: Option<u64>,
}

impl ReceiverArgs {
    pub fn mode(&self) -> Mode {
        self.mode.unwrap_or_else(defaults::mode)
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay_ms.unwrap_or_else(defaults::delay_ms)
    }

    pub fn output_dir(&self) -> PathBuf {
        std::env::var("OUTPUT_DIR").map(PathBuf::from).unwrap_or_else(|_| defaults::output_dir())
    }
}

/// `terminator` takes no arguments.
#[derive(Parser, Debug)]
#[command(name = "terminator", about = "Wait for shutdown, drain the pipeline, print stats")]
pub struct TerminatorArgs;
