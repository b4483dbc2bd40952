//! Identifiers and small enums shared by every StaxDB crate

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of a relationship traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow relationships pointing at the current set (<-)
    In,
    /// Follow relationships leaving the current set (->)
    Out,
}

impl Direction {
    /// Wire name used by the engine
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }

    /// Returns the opposite direction
    pub fn reverse(self) -> Self {
        match self {
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            other => Err(Error::InvalidArgument(format!(
                "traverse() direction must be 'in' or 'out', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a plan compiled by the engine
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(u32);

impl PlanId {
    /// Sentinel value engines return when compilation fails
    pub const INVALID_RAW: i64 = -1;

    /// Create a plan id directly, bypassing sentinel checks
    pub fn from_internal(id: u32) -> Self {
        Self(id)
    }

    /// Validate a raw identifier returned by an engine.
    ///
    /// Returns `None` for `-1`, for `u32::MAX` (the same sentinel seen
    /// through an unsigned lens) and for anything outside the `u32` range.
    pub fn from_raw(raw: i64) -> Option<Self> {
        if raw == Self::INVALID_RAW || raw == u32::MAX as i64 {
            return None;
        }
        u32::try_from(raw).ok().map(Self)
    }

    /// Get the numeric representation
    pub fn as_internal(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlanId({})", self.0)
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a graph object
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(u32);

impl ObjectId {
    pub fn from_internal(id: u32) -> Self {
        Self(id)
    }

    pub fn as_internal(&self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Engine-side index of an opened key/value collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionId(u32);

impl CollectionId {
    pub fn from_internal(id: u32) -> Self {
        Self(id)
    }

    pub fn as_internal(&self) -> u32 {
        self.0
    }
}
