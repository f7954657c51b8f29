//! SPICE deck emission.
//!
//! Takes a mirrored [`Hierarchy`](schemdoc::Hierarchy), extracts every
//! schematic in it, and renders a flat SPICE deck: one comment header, the
//! set of subcircuit and model declarations, the top-level instance lines,
//! optional user-provided text, and a final `.end`.
//!
//! Device lines come from built-in templates keyed by the primitive family;
//! a model document can replace the template per simulator (`reftempl`) and
//! contribute a declaration (`decltempl`) rendered once. Templates are the
//! single-brace format strings stored in model documents; see
//! [`templates`](crate::templates) for the placeholder set.
//!
//! The companion [`save_vectors`] walk synthesizes the simulator save list
//! for the same hierarchy.
#![warn(missing_docs)]

use thiserror::Error;

mod emit;
mod save;
pub mod templates;

pub use emit::{deck, print_props, spice_name, EmitOptions};
pub use save::save_vectors;

/// The result type returned by emission functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Emission errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Net extraction failed.
    #[error(transparent)]
    Extract(#[from] netlist::Error),
    /// A document id that does not follow the identifier grammar.
    #[error(transparent)]
    Id(#[from] schemdoc::Error),
    /// A user cell with no `models:<cell>` document.
    #[error("no model document for cell `{0}`")]
    MissingModel(String),
    /// A schematic referenced by the hierarchy but not present in it.
    #[error("schematic `{0}` is not mirrored")]
    MissingSchematic(String),
    /// A non-device document where a device was expected.
    #[error("cell `{0}` is not a device")]
    NotDevice(String),
}
