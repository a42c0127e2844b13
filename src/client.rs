use std::io::{self, ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::LinkError;

/// Largest batch taken from the client in one read.
pub const BATCH_SIZE: usize = 1024;

const ACCEPT_RETRY: Duration = Duration::from_millis(100);

/// Source of operator connections.
pub trait Acceptor {
    type Conn: Read + Write;

    fn accept_client(&mut self) -> io::Result<(Self::Conn, String)>;
}

impl Acceptor for TcpListener {
    type Conn = TcpStream;

    fn accept_client(&mut self) -> io::Result<(TcpStream, String)> {
        let (stream, peer) = self.accept()?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("[client] set_nodelay for {}: {}", peer, e);
        }
        Ok((stream, peer.to_string()))
    }
}

/// Block until an operator connects. Accept errors are logged and retried forever.
pub fn acquire_client<A: Acceptor>(acceptor: &mut A) -> A::Conn {
    info!("[client] waiting for operator connection");
    loop {
        match acceptor.accept_client() {
            Ok((conn, peer)) => {
                info!("[client] connected from {}", peer);
                return conn;
            }
            Err(e) => {
                warn!("[client] accept failed: {}", e);
                std::thread::sleep(ACCEPT_RETRY);
            }
        }
    }
}

/// Outcome of one client read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Batch {
    /// `n` bytes landed in the buffer.
    Data(usize),
    /// Zero-length read. On a socket this is the peer closing.
    Empty,
    /// A signal cut the read short; nothing was received.
    Interrupted,
}

impl Batch {
    pub fn received(self) -> usize {
        match self {
            Batch::Data(n) => n,
            Batch::Empty | Batch::Interrupted => 0,
        }
    }
}

/// One blocking read, no timeout. The caller decides what an empty read means.
pub fn read_batch<R: Read>(conn: &mut R, buf: &mut [u8]) -> Result<Batch, LinkError> {
    match conn.read(buf) {
        Ok(0) => Ok(Batch::Empty),
        Ok(n) => Ok(Batch::Data(n)),
        Err(e) if e.kind() == ErrorKind::Interrupted => Ok(Batch::Interrupted),
        Err(e) => Err(LinkError::ClientDisconnected(e)),
    }
}

/// Fire-and-forget send. A failure is logged and never reaches the caller's
/// control flow; the return value only says whether the bytes went out.
pub fn send_best_effort<W: Write>(conn: &mut W, bytes: &[u8]) -> bool {
    match conn.write_all(bytes).and_then(|_| conn.flush()) {
        Ok(()) => true,
        Err(e) => {
            debug!("[client] dropped {} bytes: {}", bytes.len(), e);
            false
        }
    }
}
