use clap::{Args, Parser};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::bridge::BridgeConfig;
use crate::port::{SerialConfig, default_patterns};
use crate::proto::command::{ControlOverride, ControlTable};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "serial-bridge",
    about = "Relay operator commands from a TCP client to a serial microcontroller"
)]
pub struct Cli {
    /// Address to listen on (all interfaces by default)
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: IpAddr,
    /// TCP port the operator station connects to
    #[arg(long, default_value_t = 60500)]
    pub port: u16,
    #[command(flatten)]
    pub ser: SerialOpts,
    #[command(flatten)]
    pub timing: TimingOpts,
    /// Extra or replacement control mapping, e.g. --control trig=7 (repeatable)
    #[arg(long = "control", value_name = "NAME=CODE")]
    pub controls: Vec<ControlOverride>,
    /// Consecutive device failures before giving up
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_reconnects: u32,
    /// Treat an empty client read (peer closed) as a disconnect
    #[arg(long, default_value_t = false)]
    pub eof_disconnect: bool,
    /// Debug logging (RUST_LOG overrides)
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SerialOpts {
    /// Serial device path; skips discovery
    #[arg(long)]
    pub dev: Option<PathBuf>,
    /// Discovery glob, tried in order (repeatable)
    #[arg(long = "pattern", default_values_t = default_patterns())]
    pub patterns: Vec<String>,
    /// Baud rate
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,
    /// Per-read timeout on the serial port in milliseconds
    #[arg(long, default_value_t = 100)]
    pub read_timeout_ms: u64,
    /// Wait after opening the port while the board resets, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub settle_ms: u64,
}

#[derive(Args, Debug, Clone)]
pub struct TimingOpts {
    /// Wait between writing a batch and reading the board's answer, in milliseconds
    #[arg(long, default_value_t = 50)]
    pub response_delay_ms: u64,
    /// Wait before re-opening the device after a failure, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub backoff_ms: u64,
}

impl Cli {
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn control_table(&self) -> ControlTable {
        ControlTable::with_overrides(&self.controls)
    }

    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            device: self.ser.dev.clone(),
            patterns: self.ser.patterns.clone(),
            baud: self.ser.baud,
            read_timeout: Duration::from_millis(self.ser.read_timeout_ms),
            settle: Duration::from_millis(self.ser.settle_ms),
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            response_delay: Duration::from_millis(self.timing.response_delay_ms),
            backoff: Duration::from_millis(self.timing.backoff_ms),
            max_reconnects: self.max_reconnects,
            eof_disconnect: self.eof_disconnect,
        }
    }
}
