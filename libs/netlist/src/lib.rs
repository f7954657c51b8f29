//! Geometric net extraction.
//!
//! Wires connect where their endpoints share a grid coordinate; device pins
//! connect to whatever wire (or other device pin) sits at the coordinate the
//! symbol transform places them on. This crate computes pin placements
//! ([`pins`]) and sweeps the resulting spatial indexes into nets
//! ([`extract`]), producing a per-device port-to-net mapping ready for
//! netlist emission.
//!
//! Extraction is a pure function over one schematic's documents: it performs
//! no I/O and may be re-run freely on the same snapshot.
#![warn(missing_docs)]

use thiserror::Error;

mod extract;
mod place;

pub use extract::{extract, Netlist};
pub use place::{pins, PinMap};

/// The result type returned by extraction functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Extraction errors.
#[derive(Error, Debug)]
pub enum Error {
    /// A document with connectivity that the wire sweep cannot interpret.
    #[error("cell `{0}` cannot appear on a wire")]
    Schema(String),
}
