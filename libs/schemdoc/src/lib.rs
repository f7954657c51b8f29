//! Document model for schematic capture databases.
//!
//! A schematic is stored as a bag of small JSON documents: graphical wires,
//! port labels, device symbols, and hierarchical instances, plus one model
//! document per user-defined cell describing its symbol pins and the
//! parameterizations (variants) it can be realized with.
//!
//! This crate defines the typed forms of those documents and the
//! [`Hierarchy`] container holding a top cell together with every
//! sub-schematic and model it references. Higher layers keep a [`Hierarchy`]
//! synchronized against the database and derive netlists from it; nothing
//! here performs I/O.

use thiserror::Error;

mod cell;
mod doc;
mod hierarchy;
mod ident;
mod model;

pub use cell::CellKind;
pub use doc::{Element, PropValue};
pub use hierarchy::{Hierarchy, ModelRef, ModelTable, Upsert, MODELS};
pub use ident::SchemId;
pub use model::{Conn, ModelDef, ModelDoc, ModelType, SimModel};

/// The result type returned by document-model functions.
pub type Result<T> = std::result::Result<T, Error>;

/// Document-model errors.
#[derive(Error, Debug)]
pub enum Error {
    /// A document id that does not follow the `cell$variant[:device[-key]]`
    /// grammar.
    #[error("malformed schematic identifier `{0}`")]
    InvalidId(String),
    /// A document body that does not decode as the expected document kind.
    #[error("malformed document `{id}`: {source}")]
    InvalidDoc {
        /// The id of the offending document.
        id: String,
        /// The underlying decode error.
        source: serde_json::Error,
    },
}
