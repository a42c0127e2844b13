//! In-memory stand-ins for the TCP listener and the serial port.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::rc::Rc;

use crate::client::Acceptor;
use crate::error::LinkError;
use crate::port::{Device, DeviceOpener};

#[derive(Default)]
pub struct FakeDevice {
    /// Bytes the board has sent but nobody read yet.
    pub pending: Vec<u8>,
    /// Appended to `pending` after every write.
    pub reply: Vec<u8>,
    /// Everything written to the board.
    pub wire: Rc<RefCell<Vec<u8>>>,
    pub discards: usize,
    /// Number of writes that succeed before the port "unplugs".
    pub fail_after: Option<usize>,
    writes: usize,
}

impl FakeDevice {
    pub fn replying(reply: &[u8]) -> Self {
        Self {
            reply: reply.to_vec(),
            ..Self::default()
        }
    }

    pub fn unplugged_after(writes: usize) -> Self {
        Self {
            fail_after: Some(writes),
            ..Self::default()
        }
    }
}

impl Write for FakeDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(n) = self.fail_after
            && self.writes >= n
        {
            return Err(io::Error::new(ErrorKind::BrokenPipe, "device unplugged"));
        }
        self.writes += 1;
        self.wire.borrow_mut().extend_from_slice(buf);
        self.pending.extend_from_slice(&self.reply);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Device for FakeDevice {
    fn discard_input(&mut self) -> io::Result<()> {
        self.discards += 1;
        self.pending.clear();
        Ok(())
    }

    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        Ok(std::mem::take(&mut self.pending))
    }
}

/// Hands out scripted devices; fails once the script runs dry.
#[derive(Default)]
pub struct FakeOpener {
    pub script: VecDeque<Option<FakeDevice>>,
    pub opens: Rc<Cell<usize>>,
}

impl FakeOpener {
    pub fn with(devices: impl IntoIterator<Item = Option<FakeDevice>>) -> Self {
        Self {
            script: devices.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl DeviceOpener for FakeOpener {
    type Device = FakeDevice;

    fn open_device(&mut self) -> Result<FakeDevice, LinkError> {
        self.opens.set(self.opens.get() + 1);
        match self.script.pop_front().flatten() {
            Some(mut dev) => {
                dev.discard_input().map_err(LinkError::DeviceIo)?;
                Ok(dev)
            }
            None => Err(LinkError::DeviceUnavailable("no device found".into())),
        }
    }
}

pub enum Inbound {
    Bytes(Vec<u8>),
    /// EINTR: the read returns early with nothing.
    Interrupted,
    Reset,
}

pub fn bytes(b: &[u8]) -> Inbound {
    Inbound::Bytes(b.to_vec())
}

#[derive(Default)]
pub struct FakeClient {
    pub inbound: VecDeque<Inbound>,
    /// Everything the bridge sent back.
    pub outbound: Rc<RefCell<Vec<u8>>>,
    pub fail_sends: bool,
}

impl FakeClient {
    pub fn sending(inbound: impl IntoIterator<Item = Inbound>) -> Self {
        Self {
            inbound: inbound.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Read for FakeClient {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inbound.pop_front() {
            Some(Inbound::Bytes(b)) => {
                let n = b.len().min(buf.len());
                buf[..n].copy_from_slice(&b[..n]);
                Ok(n)
            }
            Some(Inbound::Interrupted) => Err(ErrorKind::Interrupted.into()),
            Some(Inbound::Reset) | None => Err(ErrorKind::ConnectionReset.into()),
        }
    }
}

impl Write for FakeClient {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_sends {
            return Err(ErrorKind::BrokenPipe.into());
        }
        self.outbound.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeAcceptor {
    pub clients: VecDeque<FakeClient>,
    pub accepts: Rc<Cell<usize>>,
}

impl FakeAcceptor {
    pub fn with(clients: impl IntoIterator<Item = FakeClient>) -> Self {
        Self {
            clients: clients.into_iter().collect(),
            ..Self::default()
        }
    }
}

impl Acceptor for FakeAcceptor {
    type Conn = FakeClient;

    fn accept_client(&mut self) -> io::Result<(FakeClient, String)> {
        self.accepts.set(self.accepts.get() + 1);
        let client = self
            .clients
            .pop_front()
            .expect("bridge asked for a client the test did not script");
        Ok((client, format!("fake-{}", self.accepts.get())))
    }
}
