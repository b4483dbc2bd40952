//! Criterion processing
//!
//! Turns one `field: value` pair from a loosely typed criteria mapping into
//! a plan step. Checked in order:
//!
//! 1. `{gte|lte|gt|lt}` - numeric range. `gt`/`lt` fill in for a missing
//!    `gte`/`lte` and are treated as inclusive.
//! 2. `{near: {lat, lon}, radius}` - geohash range around a point (meters)
//! 3. `{lat, lon}` - exact geohash point
//! 4. string, number or boolean - equality

use crate::geohash;
use crate::plan::{Bound, OpType, QueryStep, Range, StepValue};
use serde_json::{Map, Value};
use stax_core::{Error, Result};
use tracing::debug;

const RANGE_KEYS: [&str; 4] = ["gte", "lte", "gt", "lt"];

/// Largest integer an `f64` holds exactly
pub const MAX_EXACT_FLOAT_INT: u64 = 1 << 53;

/// Normalize one criterion into a step
pub fn process(op_type: OpType, field: &str, value: &Value) -> Result<QueryStep> {
    let step_value = match value {
        Value::Object(obj) => process_object(field, obj)?,
        Value::String(s) => StepValue::Text(s.clone()),
        Value::Number(n) => StepValue::Number(n.clone()),
        Value::Bool(b) => StepValue::Boolean(*b),
        Value::Null | Value::Array(_) => {
            return Err(Error::InvalidCriteria(format!(
                "field '{}' expects a string, number, boolean, range or location, found {}",
                field,
                type_name(value)
            )));
        }
    };
    Ok(QueryStep::criterion(op_type, field, step_value))
}

fn process_object(field: &str, obj: &Map<String, Value>) -> Result<StepValue> {
    if RANGE_KEYS.iter().any(|k| obj.contains_key(*k)) {
        let gte = inclusive_bound(field, obj, "gte", "gt")?;
        let lte = inclusive_bound(field, obj, "lte", "lt")?;
        return Ok(StepValue::Range(Range::new(gte, lte)));
    }

    if let (Some(near), Some(radius)) = (obj.get("near"), obj.get("radius")) {
        let near = near.as_object().ok_or_else(|| {
            Error::type_mismatch(format!("'{}.near' as {{lat, lon}}", field), type_name(near))
        })?;
        let lat = number_at(field, near, "lat")?;
        let lon = number_at(field, near, "lon")?;
        let radius = radius.as_f64().ok_or_else(|| {
            Error::type_mismatch(format!("'{}.radius' in meters", field), type_name(radius))
        })?;

        let (gte, lte) = geohash::radius_range(lat, lon, radius);
        debug!(field, lat, lon, radius, gte, lte, "Radius criterion expanded to geohash range");
        return Ok(StepValue::Range(Range::keys(gte, lte)));
    }

    if obj.contains_key("lat") && obj.contains_key("lon") {
        let lat = number_at(field, obj, "lat")?;
        let lon = number_at(field, obj, "lon")?;
        return Ok(StepValue::Range(Range::point(geohash::encode(lat, lon))));
    }

    Err(Error::InvalidCriteria(format!(
        "field '{}' has an object value that is neither a range nor a location",
        field
    )))
}

/// Read `key`, falling back to `alias` when `key` is absent or null
fn inclusive_bound(
    field: &str,
    obj: &Map<String, Value>,
    key: &str,
    alias: &str,
) -> Result<Option<Bound>> {
    let present = |k: &str| obj.get(k).filter(|v| !v.is_null());

    let (used, value) = match (present(key), present(alias)) {
        (Some(v), _) => (key, v),
        (None, Some(v)) => {
            debug!(field, alias, "Exclusive bound treated as inclusive");
            (alias, v)
        }
        (None, None) => return Ok(None),
    };

    let number = match value {
        Value::Number(n) => n,
        other => {
            return Err(Error::type_mismatch(
                format!("number for '{}.{}'", field, used),
                type_name(other),
            ));
        }
    };

    // Pre-encoded keys (geohashes) do not survive a round trip through f64
    match number.as_u64() {
        Some(k) if k > MAX_EXACT_FLOAT_INT => Ok(Some(Bound::Key(k))),
        _ => Ok(number.as_f64().map(Bound::Number)),
    }
}

fn number_at(field: &str, obj: &Map<String, Value>, key: &str) -> Result<f64> {
    let value = obj.get(key).unwrap_or(&Value::Null);
    value
        .as_f64()
        .ok_or_else(|| Error::type_mismatch(format!("number for '{}.{}'", field, key), type_name(value)))
}

/// JSON type name used in error messages
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
