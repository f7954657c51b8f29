//! Schematic identifiers.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use arcstr::ArcStr;

use crate::Error;

/// A parsed schematic identifier.
///
/// The textual grammar is `<cell>$<variant>[:<device>[-<key>]]`. The
/// `cell$variant` pair names a schematic definition; adding a device names a
/// single placement inside it. Model documents use the reserved `models`
/// cell with no variant, e.g. `models:opamp`.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct SchemId {
    /// The cell this document belongs to.
    pub cell: ArcStr,
    /// The variant (model) of the cell, absent for the `models`
    /// pseudo-schematic.
    pub variant: Option<ArcStr>,
    /// The device placement, if the id names one.
    pub device: Option<ArcStr>,
    /// The editor-assigned uniquifying key of the device.
    pub key: Option<ArcStr>,
}

impl SchemId {
    /// Creates an id naming a schematic definition.
    pub fn schematic(cell: impl Into<ArcStr>, variant: impl Into<ArcStr>) -> Self {
        Self {
            cell: cell.into(),
            variant: Some(variant.into()),
            device: None,
            key: None,
        }
    }

    /// The `cell$variant` name of the schematic this id belongs to.
    ///
    /// Ids without a variant (model documents) yield the bare cell name.
    pub fn schem(&self) -> String {
        match &self.variant {
            Some(v) => format!("{}${}", self.cell, v),
            None => self.cell.to_string(),
        }
    }
}

impl FromStr for SchemId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        let (schem, dev) = match id.split_once(':') {
            Some((schem, dev)) => (schem, Some(dev)),
            None => (id, None),
        };
        let (cell, variant) = match schem.split_once('$') {
            Some((cell, variant)) => (cell, Some(variant)),
            None => (schem, None),
        };
        if cell.is_empty() || variant.is_some_and(str::is_empty) {
            return Err(Error::InvalidId(id.to_string()));
        }
        let (device, key) = match dev {
            Some(dev) => match dev.split_once('-') {
                Some((device, key)) => (Some(device), Some(key)),
                None => (Some(dev), None),
            },
            None => (None, None),
        };
        Ok(Self {
            cell: cell.into(),
            variant: variant.map(ArcStr::from),
            device: device.map(ArcStr::from),
            key: key.map(ArcStr::from),
        })
    }
}

impl Display for SchemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cell)?;
        if let Some(variant) = &self.variant {
            write!(f, "${}", variant)?;
        }
        if let Some(device) = &self.device {
            write!(f, ":{}", device)?;
            if let Some(key) = &self.key {
                write!(f, "-{}", key)?;
            }
        }
        Ok(())
    }
}
