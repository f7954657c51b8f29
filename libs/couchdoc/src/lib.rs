//! Typed client for a CouchDB-compatible document store.
//!
//! Exposes the protocol subset schematic mirroring needs: key-range
//! `_all_docs` reads with an update-sequence token, one-shot and continuous
//! `_changes` feeds filtered by a server-side `_selector`, and document
//! writes. One [`DbClient`] addresses one database.
//!
//! The client never retries on its own; callers decide whether to reopen a
//! failed change stream.
#![warn(missing_docs)]

use thiserror::Error;

mod changes;
mod client;
mod selector;

pub use changes::{Change, ChangeStream};
pub use client::{DbClient, Seq};
pub use selector::Selector;

/// The result type returned by document-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Document-store client errors.
#[derive(Error, Debug)]
pub enum Error {
    /// A database URL that does not parse.
    #[error("invalid database url `{0}`")]
    BadUrl(String),
    /// Socket or HTTP-level failure.
    #[error("transport error")]
    Transport(#[from] reqwest::Error),
    /// I/O failure while reading a change stream body.
    #[error("change stream error")]
    Stream(#[from] std::io::Error),
    /// A non-2xx response from the store.
    #[error("document store returned {code}: {body}")]
    Status {
        /// The HTTP status code.
        code: u16,
        /// The response body, for diagnostics.
        body: String,
    },
    /// A response body that does not decode as expected.
    #[error("malformed document store response")]
    Protocol(#[from] serde_json::Error),
    /// No heartbeat arrived within the configured stall deadline.
    #[error("change feed stalled past the heartbeat deadline")]
    Stalled,
}
