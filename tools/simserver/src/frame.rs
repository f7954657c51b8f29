//! Columnar result frames.

use arcstr::ArcStr;
use indexmap::IndexMap;
use num::complex::Complex64;

/// One column of simulation data.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Real samples.
    Real(Vec<f64>),
    /// Complex samples (AC and noise analyses).
    Complex(Vec<Complex64>),
}

impl Column {
    /// The number of samples in the column.
    pub fn len(&self) -> usize {
        match self {
            Self::Real(v) => v.len(),
            Self::Complex(v) => v.len(),
        }
    }

    /// Whether the column holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends another chunk of the same column.
    ///
    /// A column keeps the type it first arrived with; a chunk of the other
    /// type is coerced (reals widen to complex, complex collapse to their
    /// real part).
    pub fn extend(&mut self, other: Column) {
        match (self, other) {
            (Self::Real(a), Self::Real(b)) => a.extend(b),
            (Self::Complex(a), Self::Complex(b)) => a.extend(b),
            (Self::Real(a), Self::Complex(b)) => a.extend(b.into_iter().map(|c| c.re)),
            (Self::Complex(a), Self::Real(b)) => {
                a.extend(b.into_iter().map(|x| Complex64::new(x, 0.)))
            }
        }
    }
}

/// A growing frame of columns sharing one independent variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// The name of the independent variable (the `scale` vector).
    pub scale: ArcStr,
    /// The independent variable samples.
    pub index: Column,
    /// Dependent columns by vector name.
    pub columns: IndexMap<ArcStr, Column>,
}

impl Frame {
    /// Creates a frame from one chunk.
    pub fn new(scale: impl Into<ArcStr>, index: Column, columns: IndexMap<ArcStr, Column>) -> Self {
        Self {
            scale: scale.into(),
            index,
            columns,
        }
    }

    /// The number of rows in the frame.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the frame holds no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `other` carries the same scale and column names, making it
    /// appendable to this frame.
    pub fn same_columns(&self, other: &Frame) -> bool {
        self.scale == other.scale
            && self.columns.len() == other.columns.len()
            && self.columns.keys().zip(other.columns.keys()).all(|(a, b)| a == b)
    }

    /// Appends another chunk's rows to this frame.
    pub fn append(&mut self, other: Frame) {
        self.index.extend(other.index);
        for (name, column) in other.columns {
            match self.columns.get_mut(&name) {
                Some(existing) => existing.extend(column),
                None => {
                    self.columns.insert(name, column);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(cols: &[(&str, &[f64])]) -> Frame {
        let mut columns = IndexMap::new();
        for (name, data) in &cols[1..] {
            columns.insert(ArcStr::from(*name), Column::Real(data.to_vec()));
        }
        Frame::new(cols[0].0, Column::Real(cols[0].1.to_vec()), columns)
    }

    #[test]
    fn append_grows_rows() {
        let mut a = frame(&[("time", &[0., 1.]), ("out", &[5., 6.])]);
        let b = frame(&[("time", &[2.]), ("out", &[7.])]);
        assert!(a.same_columns(&b));
        a.append(b);
        assert_eq!(a.len(), 3);
        assert_eq!(a.columns["out"], Column::Real(vec![5., 6., 7.]));
    }

    #[test]
    fn column_sets_must_match() {
        let a = frame(&[("time", &[0.]), ("out", &[1.])]);
        let b = frame(&[("time", &[0.]), ("in", &[1.])]);
        let c = frame(&[("freq", &[0.]), ("out", &[1.])]);
        assert!(!a.same_columns(&b));
        assert!(!a.same_columns(&c));
    }
}
