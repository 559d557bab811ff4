//! Constructors for every registered layout. Each one reads its parameters
//! from a [`Params`] set, checks its preconditions, and returns a freshly
//! built tree. Intermediate nodes are moved into the node that wraps them.

pub mod fixed;
pub mod sized;

use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::params::Params;
use crate::scalar::Scalar;

/// The base element every layout is made of: its scalar kind and byte size.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Base {
    pub scalar: Scalar,
    pub size: i64,
}

impl Base {
    pub fn from_params(p: &Params) -> Result<Base> {
        let scalar = p.scalar("b")?;
        Ok(Base {
            scalar,
            size: scalar.size() as i64,
        })
    }

    pub fn layout(&self) -> Layout {
        Layout::primitive(self.scalar)
    }
}

pub(crate) fn ensure(cond: bool, key: &str, message: &str) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(Error::precondition(key, message))
    }
}

/// A count parameter that must be strictly positive.
pub(crate) fn positive(p: &Params, key: &str) -> Result<u32> {
    let value = p.count(key)?;
    ensure(value > 0, key, "must be positive")?;
    Ok(value)
}

/// `total / per`, clamped to at least one repetition. A layout built with the
/// clamped count overflows its budget, which the resolver reports.
pub(crate) fn repetitions(key: &str, total: i64, per: i64) -> Result<u32> {
    if per <= 0 {
        return Err(Error::precondition(key, "repetition unit must be positive"));
    }

    u32::try_from((total / per).max(1))
        .map_err(|_| Error::precondition(key, "repetition count does not fit in 32 bits"))
}

pub(crate) fn small(key: &str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::precondition(key, "value out of range"))
}

/// Product of `factors`, failing on `key` if it leaves the 64-bit range.
pub(crate) fn product(key: &str, factors: &[i64]) -> Result<i64> {
    factors
        .iter()
        .try_fold(1i64, |acc, &f| acc.checked_mul(f))
        .ok_or_else(|| Error::precondition(key, "byte span overflows 64 bits"))
}

pub(crate) fn sum(key: &str, terms: &[i64]) -> Result<i64> {
    terms
        .iter()
        .try_fold(0i64, |acc, &t| acc.checked_add(t))
        .ok_or_else(|| Error::precondition(key, "byte span overflows 64 bits"))
}
