use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::LinkError;

/// ACM (native USB) first, then USB-serial adapters.
pub const DEFAULT_PATTERNS: [&str; 2] = ["/dev/ttyACM*", "/dev/ttyUSB*"];

/// The device side of the bridge, as the loop uses it.
pub trait Device: Write {
    /// Drop whatever is already buffered on the line.
    fn discard_input(&mut self) -> io::Result<()>;
    /// Everything readable right now. Bounded by the port's read timeout.
    fn read_available(&mut self) -> io::Result<Vec<u8>>;
}

impl Device for Box<dyn SerialPort> {
    fn discard_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input)?;
        Ok(())
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        drain(self, |port| Ok(port.bytes_to_read()? as usize))
    }
}

/// Read until `pending` reports nothing queued, a read returns 0, or the port times out.
pub fn drain<R, F>(port: &mut R, mut pending: F) -> io::Result<Vec<u8>>
where
    R: Read + ?Sized,
    F: FnMut(&mut R) -> io::Result<usize>,
{
    let mut out = Vec::new();
    loop {
        let queued = pending(port)?;
        if queued == 0 {
            break;
        }
        let start = out.len();
        out.resize(start + queued, 0);
        let n = match port.read(&mut out[start..]) {
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => {
                out.truncate(start);
                continue;
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => 0,
            Err(e) => return Err(e),
        };
        out.truncate(start + n);
        if n == 0 {
            break;
        }
    }
    Ok(out)
}

/// Produces a fresh, settled device handle on every call.
pub trait DeviceOpener {
    type Device: Device;

    fn open_device(&mut self) -> Result<Self::Device, LinkError>;
}

#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Pinned path; skips discovery when set.
    pub device: Option<PathBuf>,
    pub patterns: Vec<String>,
    pub baud: u32,
    pub read_timeout: Duration,
    /// Time the board needs to come out of reset after the port opens.
    pub settle: Duration,
}

pub struct SerialOpener {
    cfg: SerialConfig,
}

impl SerialOpener {
    pub fn new(cfg: SerialConfig) -> Self {
        Self { cfg }
    }

    fn resolve_path(&self) -> Result<PathBuf, LinkError> {
        match &self.cfg.device {
            Some(p) => Ok(p.clone()),
            None => first_candidate(&self.cfg.patterns),
        }
    }
}

impl DeviceOpener for SerialOpener {
    type Device = Box<dyn SerialPort>;

    fn open_device(&mut self) -> Result<Self::Device, LinkError> {
        let path = self.resolve_path()?;
        info!("[port] connecting to device on {}", path.display());
        let mut port = open_port(&path, self.cfg.baud, self.cfg.read_timeout)?;
        settle_and_flush(&mut port, self.cfg.settle)?;
        info!("[port] device connected");
        Ok(port)
    }
}

pub fn open_port(
    path: &Path,
    baud: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, LinkError> {
    let dev = path.to_string_lossy();
    serialport::new(dev.as_ref(), baud)
        .timeout(timeout)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .open()
        .map_err(|e| LinkError::DeviceUnavailable(format!("open {}: {}", dev, e)))
}

/// Wait out the reset, then throw away stale bytes from a previous session.
pub fn settle_and_flush<D: Device>(dev: &mut D, settle: Duration) -> Result<(), LinkError> {
    if !settle.is_zero() {
        debug!("[port] settling for {:?}", settle);
        std::thread::sleep(settle);
    }
    dev.discard_input().map_err(LinkError::DeviceIo)
}

/// All paths matching `patterns`, pattern by pattern, each pattern in lexical order.
pub fn candidate_paths(patterns: &[String]) -> Result<Vec<PathBuf>, glob::PatternError> {
    let mut out = Vec::new();
    for pat in patterns {
        out.extend(glob::glob(pat)?.filter_map(Result::ok));
    }
    Ok(out)
}

/// First discovered path. With several adapters attached this may not be the board.
pub fn first_candidate(patterns: &[String]) -> Result<PathBuf, LinkError> {
    let paths = candidate_paths(patterns)
        .map_err(|e| LinkError::DeviceUnavailable(format!("bad device pattern: {}", e)))?;
    if paths.len() > 1 {
        debug!("[port] {} candidates, using the first: {:?}", paths.len(), paths);
    }
    paths.into_iter().next().ok_or_else(|| {
        LinkError::DeviceUnavailable(format!("no device found ({})", patterns.join(" or ")))
    })
}

pub fn default_patterns() -> Vec<String> {
    DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect()
}
