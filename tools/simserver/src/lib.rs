//! Streaming client for Cap'n Proto simulation servers.
//!
//! A simulation server (`NgspiceSimServer`, `XyceSimServer`, …) exposes the
//! [`simulator.capnp`](../schema/simulator.capnp) bootstrap interface over
//! TCP. This crate connects to one (optionally autostarting a local server
//! binary), loads deck files into it, runs analyses, and drains the chunked
//! vector stream each command returns into a [`ResultStore`] of columnar
//! frames.
//!
//! The RPC runtime is single-threaded: [`connect`] must be called inside a
//! [`tokio::task::LocalSet`], which also hosts the connection's pump task.
#![warn(missing_docs)]

use std::time::Duration;

use capnp_rpc::{rpc_twoparty_capnp, twoparty, RpcSystem};
use futures::{AsyncReadExt, FutureExt};
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::{debug, info, warn};

#[allow(missing_docs, clippy::all)]
pub mod simulator_capnp {
    include!(concat!(env!("OUT_DIR"), "/simulator_capnp.rs"));
}

mod analysis;
pub mod error;
mod frame;
mod store;
mod stream;

pub use analysis::{AcSweep, Analysis};
pub use error::{Error, Result};
pub use frame::{Column, Frame};
pub use store::{result_doc_id, to_result_doc, ResultStore};
pub use stream::read_stream;

use simulator_capnp::{commands, result, simulator};

/// First reconnect delay after spawning a local server.
const RETRY_BASE: Duration = Duration::from_millis(100);

/// Give up once the next backoff delay would exceed this.
const RETRY_CAP: Duration = Duration::from_secs(2);

/// The simulator flavor a server speaks.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SimulatorKind {
    /// ngspice.
    Ngspice,
    /// Xyce.
    Xyce,
    /// CXXRTL digital simulation.
    Cxxrtl,
}

impl SimulatorKind {
    /// The local server binary implementing this flavor.
    pub fn server_binary(&self) -> &'static str {
        match self {
            Self::Ngspice => "NgspiceSimServer",
            Self::Xyce => "XyceSimServer",
            Self::Cxxrtl => "CxxrtlSimServer",
        }
    }
}

/// An open connection to a simulation server.
///
/// Dropping the connection stops the RPC pump task and releases the socket.
pub struct Connection {
    client: simulator::Client,
    pump: tokio::task::JoinHandle<()>,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

/// A set of files loaded into the simulator, ready to run commands.
pub struct FileSet {
    commands: commands::Client,
}

/// The streaming response of one simulation command.
pub struct ResponseHandle {
    pub(crate) handle: result::Client,
}

async fn try_connect(host: &str, port: u16) -> Result<Connection> {
    let stream = tokio::net::TcpStream::connect((host, port)).await?;
    stream.set_nodelay(true)?;
    let (reader, writer) = TokioAsyncReadCompatExt::compat(stream).split();
    let network = Box::new(twoparty::VatNetwork::new(
        futures::io::BufReader::new(reader),
        futures::io::BufWriter::new(writer),
        rpc_twoparty_capnp::Side::Client,
        Default::default(),
    ));
    let mut rpc_system = RpcSystem::new(network, None);
    let client: simulator::Client = rpc_system.bootstrap(rpc_twoparty_capnp::Side::Server);
    let pump = tokio::task::spawn_local(rpc_system.map(|_| ()));
    debug!(host, port, "simulation server connected");
    Ok(Connection { client, pump })
}

fn is_local(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Connects to the simulation server at `host:port`.
///
/// When the connection is refused, `host` is local, and `autostart` is
/// permitted, the matching server binary is spawned and the connection
/// retried under bounded exponential backoff; spawning and dialing again
/// immediately is an unavoidable race.
pub async fn connect(
    host: &str,
    port: u16,
    kind: SimulatorKind,
    autostart: bool,
) -> Result<Connection> {
    match try_connect(host, port).await {
        Ok(connection) => Ok(connection),
        Err(err) if autostart && is_local(host) => {
            warn!(error = %err, "connection failed, starting a local server");
            let child = tokio::process::Command::new(kind.server_binary())
                .arg(port.to_string())
                .spawn()?;
            info!(binary = kind.server_binary(), pid = ?child.id(), "server spawned");
            let mut delay = RETRY_BASE;
            loop {
                tokio::time::sleep(delay).await;
                match try_connect(host, port).await {
                    Ok(connection) => return Ok(connection),
                    Err(err) if delay < RETRY_CAP => {
                        debug!(error = %err, delay_ms = delay.as_millis() as u64, "retrying");
                        delay *= 2;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        Err(err) => Err(err),
    }
}

impl Connection {
    /// Loads in-memory files into the simulator. The first file is the
    /// entrypoint.
    pub fn load_files(&self, files: &[(String, Vec<u8>)]) -> FileSet {
        let mut request = self.client.load_files_request();
        {
            let mut list = request.get().init_files(files.len() as u32);
            for (i, (name, contents)) in files.iter().enumerate() {
                let mut file = list.reborrow().get(i as u32);
                file.set_name(name.as_str());
                file.set_contents(contents.as_slice());
            }
        }
        FileSet {
            commands: request.send().pipeline.get_commands(),
        }
    }

    /// Loads files already present on the server's filesystem.
    pub fn load_path(&self, path: &str) -> FileSet {
        let mut request = self.client.load_path_request();
        request.get().set_path(path);
        FileSet {
            commands: request.send().pipeline.get_commands(),
        }
    }
}

impl FileSet {
    /// Runs one analysis, returning the handle its chunks stream from.
    pub fn run(&self, analysis: &Analysis) -> ResponseHandle {
        ResponseHandle {
            handle: analysis.send(&self.commands),
        }
    }
}

/// Replaces every character outside `[a-zA-Z0-9]` to form a deck filename
/// the simulator will accept.
pub fn safe_filename(name: &str) -> String {
    let mut safe: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    safe.push_str(".cir");
    safe
}
