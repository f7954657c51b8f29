//! Simulation client errors.

use thiserror::Error as ThisError;

/// The result type returned by simulation client functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Possible simulation client errors.
#[derive(ThisError, Debug)]
pub enum Error {
    /// Socket-level failure.
    #[error("io error")]
    Io(#[from] std::io::Error),
    /// RPC-level failure.
    #[error("rpc error")]
    Rpc(#[from] capnp::Error),
    /// A union discriminant this client does not know.
    #[error("unknown wire discriminant")]
    Schema(#[from] capnp::NotInSchema),
}
