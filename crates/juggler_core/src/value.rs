//! Parameter values and the tuples built from them.
//!
//! A value is written into a template with its `Display` form, so floats
//! follow Rust formatting (`1.0` renders as `1`, `-0.5` as `-0.5`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single parameter value substituted into a site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value, `None` for text
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Text(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::Int(i64::from(v))
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// One value per site of an axis
pub type Tuple = Vec<Value>;

/// One work unit: a tuple from every registered axis, in registration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combination(Vec<Tuple>);

impl Combination {
    #[must_use]
    pub fn new(tuples: Vec<Tuple>) -> Self {
        Self(tuples)
    }

    /// Tuple drawn from axis `index`
    #[must_use]
    pub fn tuple(&self, index: usize) -> Option<&[Value]> {
        self.0.get(index).map(Vec::as_slice)
    }

    /// First value of the tuple drawn from axis `index`.
    ///
    /// Convenient for single-site axes, whose tuples always have one element.
    #[must_use]
    pub fn scalar(&self, index: usize) -> Option<&Value> {
        self.0.get(index).and_then(|t| t.first())
    }

    pub fn tuples(&self) -> impl Iterator<Item = &[Value]> {
        self.0.iter().map(Vec::as_slice)
    }

    /// Number of axes the combination spans
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for value in self.0.iter().flatten() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{value}")?;
            first = false;
        }
        Ok(())
    }
}
