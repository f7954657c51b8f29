//! Live schematic mirroring and netlist generation.
//!
//! This crate ties the pieces together: a [`Mirror`] keeps a
//! [`Hierarchy`](schemdoc::Hierarchy) of schematic documents synchronized
//! against a document store's change feed, a [`DeckWatch`] turns each
//! snapshot into a SPICE deck plus its save-vector list, and simulation
//! results stream into a [`ResultStore`](simserver::ResultStore) that can
//! be persisted back to the store.
//!
//! ```text
//! DbClient ─► Mirror ─► (extract ─► deck) ─► simserver ─► ResultStore
//!     ▲                                                        │
//!     └────────────────── persist_results ◄────────────────────┘
//! ```
//!
//! Everything runs on one cooperative event loop; extraction itself is
//! synchronous and free of I/O, so re-running it on a snapshot is always
//! safe.
#![warn(missing_docs)]

use thiserror::Error;

mod live;
mod mirror;

pub use couchdoc::{DbClient, Selector, Seq};
pub use live::{emit_deck, persist_results, DeckWatch, LiveDeck};
pub use mirror::{DocSource, Mirror, MirrorWatch};
pub use schemdoc::Hierarchy;
pub use spice::EmitOptions;

/// The result type returned by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Mirroring and emission errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Document store access failed.
    #[error(transparent)]
    Db(#[from] couchdoc::Error),
    /// A document failed to decode or carries a malformed id.
    #[error(transparent)]
    Doc(#[from] schemdoc::Error),
    /// Deck emission failed.
    #[error(transparent)]
    Spice(#[from] spice::Error),
    /// Simulation streaming failed.
    #[error(transparent)]
    Sim(#[from] simserver::Error),
}
