use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scalar element kinds a primitive layout can wrap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scalar {
    Char,
    Byte,
    Short,
    Int,
    Float,
    Double,
}

impl Scalar {
    pub fn size(self) -> u32 {
        match self {
            Scalar::Char | Scalar::Byte => 1,
            Scalar::Short => 2,
            Scalar::Int | Scalar::Float => 4,
            Scalar::Double => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scalar::Char => "char",
            Scalar::Byte => "byte",
            Scalar::Short => "short",
            Scalar::Int => "int",
            Scalar::Float => "float",
            Scalar::Double => "double",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Scalar> {
        let scalar = match tag {
            "char" | "MPI_CHAR" => Scalar::Char,
            "byte" | "MPI_BYTE" => Scalar::Byte,
            "short" | "int16" | "MPI_SHORT" => Scalar::Short,
            "int" | "int32" | "MPI_INT" => Scalar::Int,
            "float" | "float32" | "MPI_FLOAT" => Scalar::Float,
            "double" | "float64" | "MPI_DOUBLE" => Scalar::Double,
            _ => return None,
        };

        Some(scalar)
    }
}

impl FromStr for Scalar {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Scalar::from_tag(s)
            .ok_or_else(|| Error::config(s, "unknown scalar type tag"))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
