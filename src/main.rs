use anyhow::{Context, Result};
use clap::Parser;
use std::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod bridge;
mod cli;
mod client;
mod error;
mod frame;
mod port;
mod proto;
mod session;
mod stats;

#[cfg(test)]
mod fakes;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    init_tracing(args.debug);

    for pat in &args.ser.patterns {
        glob::Pattern::new(pat).with_context(|| format!("bad --pattern {}", pat))?;
    }

    let table = args.control_table();
    for (name, code) in table.iter() {
        info!("[bridge] control {} -> {}", name, code);
    }

    let addr = args.listen_addr();
    let listener = TcpListener::bind(addr).with_context(|| format!("binding {}", addr))?;
    info!("[bridge] listening on {}", addr);

    let opener = port::SerialOpener::new(args.serial_config());
    let mut bridge = bridge::Bridge::new(listener, opener, table, args.bridge_config());
    bridge.run()
}

fn init_tracing(debug: bool) {
    let default = if debug {
        "serial_bridge=debug"
    } else {
        "serial_bridge=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
