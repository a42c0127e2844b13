use anyhow::Result;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::client::{
    Acceptor, BATCH_SIZE, Batch, acquire_client, read_batch, send_best_effort,
};
use crate::error::LinkError;
use crate::port::{Device, DeviceOpener};
use crate::proto::command::{ControlTable, Directive};
use crate::proto::parser::{decode, translate};
use crate::session::{LinkState, Recovery, Session};
use crate::stats::Stats;

/// Sent to the client once per successful device (re)connection.
pub const DEVICE_READY: &[u8] = b"Arduino Connected";

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Pause between writing a batch and draining the board's answer.
    pub response_delay: Duration,
    /// Pause before re-opening the device after a failure.
    pub backoff: Duration,
    pub max_reconnects: u32,
    /// Treat a zero-length client read as a disconnect instead of an empty batch.
    pub eof_disconnect: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            response_delay: Duration::from_millis(50),
            backoff: Duration::from_secs(1),
            max_reconnects: crate::session::DEFAULT_MAX_RECONNECTS,
            eof_disconnect: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    End,
}

/// Single-threaded control loop between one operator and one board.
pub struct Bridge<A: Acceptor, O: DeviceOpener> {
    acceptor: A,
    opener: O,
    table: ControlTable,
    cfg: BridgeConfig,
    session: Session,
    client: Option<A::Conn>,
    device: Option<O::Device>,
    stats: Stats,
    buf: Vec<u8>,
}

impl<A: Acceptor, O: DeviceOpener> Bridge<A, O> {
    pub fn new(acceptor: A, opener: O, table: ControlTable, cfg: BridgeConfig) -> Self {
        Self {
            acceptor,
            opener,
            table,
            session: Session::new(cfg.max_reconnects),
            cfg,
            client: None,
            device: None,
            stats: Stats::new(),
            buf: vec![0u8; BATCH_SIZE],
        }
    }

    /// Runs until the operator sends the session-end line (`Ok`) or the device
    /// fails too many times in a row (`Err`).
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.turn() {
                Ok(Step::Continue) => {}
                Ok(Step::End) => {
                    info!("[bridge] session end received, shutting down");
                    self.stats.log("shutdown");
                    return Ok(());
                }
                Err(e) => self.recover(e)?,
            }
        }
    }

    fn turn(&mut self) -> Result<Step, LinkError> {
        if self.session.client == LinkState::Disconnected {
            self.client = Some(acquire_client(&mut self.acceptor));
            self.session = self.session.client_connected();
        }

        if self.session.device == LinkState::Disconnected {
            self.device = None;
            let device = self.opener.open_device()?;
            self.device = Some(device);
            self.session = self.session.device_connected();
            if let Some(client) = self.client.as_mut() {
                send_best_effort(client, DEVICE_READY);
            }
        }

        let (has_client, has_device) = (self.client.is_some(), self.device.is_some());
        match (self.client.as_mut(), self.device.as_mut()) {
            (Some(client), Some(device)) => pump(
                client,
                device,
                &self.table,
                &self.cfg,
                &mut self.stats,
                &mut self.buf,
            ),
            // a link marked connected without a handle; re-acquire only that one
            _ => {
                if !has_client {
                    self.session.client = LinkState::Disconnected;
                }
                if !has_device {
                    self.session.device = LinkState::Disconnected;
                }
                Ok(Step::Continue)
            }
        }
    }

    fn recover(&mut self, err: LinkError) -> Result<()> {
        let (session, recovery) = self.session.fail(err.domain());
        self.session = session;
        match recovery {
            Recovery::Reaccept => {
                info!("[client] disconnected: {}", err);
                self.client = None;
                self.stats.log("client session");
            }
            Recovery::Reopen => {
                warn!(
                    "[port] {} | attempting reconnect ({}/{})",
                    err,
                    session.reconnects.count(),
                    session.reconnects.ceiling()
                );
                self.device = None;
                self.stats.inc_reconnects();
                if !self.cfg.backoff.is_zero() {
                    std::thread::sleep(self.cfg.backoff);
                }
            }
            Recovery::GiveUp => {
                error!(
                    "[port] {} | {} device failures in a row, exiting",
                    err,
                    session.reconnects.count()
                );
                self.device = None;
                self.stats.log("shutdown");
                return Err(anyhow::Error::new(err).context(format!(
                    "device reconnect attempts exhausted after {} failures",
                    session.reconnects.count()
                )));
            }
        }
        Ok(())
    }
}

/// One round: read a batch, write its frames, give the board a moment, relay its answer.
fn pump<C: Read + Write, D: Device>(
    client: &mut C,
    device: &mut D,
    table: &ControlTable,
    cfg: &BridgeConfig,
    stats: &mut Stats,
    buf: &mut [u8],
) -> Result<Step, LinkError> {
    let batch = read_batch(client, buf)?;
    if batch == Batch::Empty && cfg.eof_disconnect {
        return Err(LinkError::ClientDisconnected(ErrorKind::UnexpectedEof.into()));
    }
    let n = batch.received();

    let text = decode(&buf[..n]);
    for item in translate(&text, table) {
        match item {
            Ok(Directive::Send(frame)) => {
                device
                    .write_all(frame.to_line().as_bytes())
                    .map_err(LinkError::DeviceIo)?;
                debug!("[bridge] -> {}", frame);
                stats.inc_frames();
            }
            Ok(Directive::EndSession) => return Ok(Step::End),
            Err(m) => {
                warn!("[bridge] {}", m);
                stats.inc_skipped();
            }
        }
    }

    if !cfg.response_delay.is_zero() {
        std::thread::sleep(cfg.response_delay);
    }

    let reply = device.read_available().map_err(LinkError::DeviceIo)?;
    if !reply.is_empty() && send_best_effort(client, &reply) {
        stats.add_forwarded(reply.len());
    }
    Ok(Step::Continue)
}
