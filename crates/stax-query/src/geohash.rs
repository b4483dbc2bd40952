//! Interleaved binary geohash
//!
//! Latitude and longitude are refined by alternating binary subdivision,
//! longitude first, and the resulting bits are packed MSB-first into one
//! integer. Nearby points share high-order bits, so a single key range
//! scan approximates a 2D bounding box.

/// Bits produced by [`encode`]; 32 refinements per axis
pub const DEFAULT_PRECISION: u32 = 64;

/// Approximate length of one degree of latitude
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Encode a coordinate at full 64-bit precision
pub fn encode(lat: f64, lon: f64) -> u64 {
    encode_with_precision(lat, lon, DEFAULT_PRECISION)
}

/// Encode a coordinate into `precision` bits (capped at 64).
///
/// Coordinates outside [-90, 90] x [-180, 180] saturate at the edge cells.
pub fn encode_with_precision(lat: f64, lon: f64, precision: u32) -> u64 {
    let mut geohash = 0u64;
    let (mut lat_min, mut lat_max) = (-90.0_f64, 90.0_f64);
    let (mut lon_min, mut lon_max) = (-180.0_f64, 180.0_f64);
    let mut is_lon = true;

    for _ in 0..precision.min(DEFAULT_PRECISION) {
        geohash <<= 1;
        if is_lon {
            let mid = lon_min + (lon_max - lon_min) / 2.0;
            if lon > mid {
                geohash |= 1;
                lon_min = mid;
            } else {
                lon_max = mid;
            }
        } else {
            let mid = lat_min + (lat_max - lat_min) / 2.0;
            if lat > mid {
                geohash |= 1;
                lat_min = mid;
            } else {
                lat_max = mid;
            }
        }
        is_lon = !is_lon;
    }
    geohash
}

/// Axis-aligned box in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Box enclosing a circle of `radius_m` meters around a point.
    ///
    /// Uses a flat-earth approximation: latitude degrees from
    /// [`METERS_PER_DEGREE`], longitude degrees widened by `1 / cos(lat)`.
    /// Points in the box corners outside the circle still match.
    pub fn around(lat: f64, lon: f64, radius_m: f64) -> Self {
        let lat_delta = radius_m / METERS_PER_DEGREE;
        let lon_delta = radius_m / (METERS_PER_DEGREE * lat.to_radians().cos());

        Self {
            min_lat: lat - lat_delta,
            max_lat: lat + lat_delta,
            min_lon: lon - lon_delta,
            max_lon: lon + lon_delta,
        }
    }

    /// Encode the two opposite corners as an ordered `(gte, lte)` pair
    pub fn geohash_range(&self) -> (u64, u64) {
        let gte = encode(self.min_lat, self.min_lon);
        let lte = encode(self.max_lat, self.max_lon);
        if gte > lte { (lte, gte) } else { (gte, lte) }
    }
}

/// Geohash key range approximating a radius search
pub fn radius_range(lat: f64, lon: f64, radius_m: f64) -> (u64, u64) {
    BoundingBox::around(lat, lon, radius_m).geohash_range()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Pull one axis' bits out of a 64-bit hash. Longitude owns the even
    /// positions counted from the MSB, latitude the odd ones.
    fn axis_bits(hash: u64, lon: bool) -> u32 {
        let first = if lon { 63 } else { 62 };
        (0..32).fold(0u32, |acc, i| (acc << 1) | ((hash >> (first - 2 * i)) & 1) as u32)
    }

    #[test]
    fn test_first_bits_pick_quadrant() {
        // East and north of the origin: both leading bits set
        assert_eq!(encode(45.0, 90.0) >> 62, 0b11);
        // West and south
        assert_eq!(encode(-45.0, -90.0) >> 62, 0b00);
        // East, south
        assert_eq!(encode(-45.0, 90.0) >> 62, 0b10);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(encode(-90.0, -180.0), 0);
        // The upper edge is always above the running midpoint
        assert_eq!(encode(90.0, 180.0), u64::MAX);
    }

    #[test]
    fn test_precision() {
        let full = encode(51.5074, -0.1278);
        let short = encode_with_precision(51.5074, -0.1278, 16);
        assert_eq!(short, full >> 48);
        assert_eq!(encode_with_precision(51.5074, -0.1278, 0), 0);
        assert_eq!(encode_with_precision(51.5074, -0.1278, 200), full);
    }

    #[test]
    fn test_radius_range_contains_center() {
        let (gte, lte) = radius_range(48.8566, 2.3522, 5_000.0);
        let center = encode(48.8566, 2.3522);
        assert!(gte <= center && center <= lte);
    }

    #[test]
    fn test_bounding_box_widens_longitude_away_from_equator() {
        let equator = BoundingBox::around(0.0, 0.0, 10_000.0);
        let north = BoundingBox::around(60.0, 0.0, 10_000.0);

        let eq_width = equator.max_lon - equator.min_lon;
        let north_width = north.max_lon - north.min_lon;
        assert!((north_width / eq_width - 2.0).abs() < 1e-9);
        assert!((north.max_lat - north.min_lat - (equator.max_lat - equator.min_lat)).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_encoding_is_deterministic(lat in -90.0f64..=90.0, lon in -180.0f64..=180.0) {
            prop_assert_eq!(encode(lat, lon), encode(lat, lon));
        }

        #[test]
        fn prop_latitude_bits_are_monotonic(
            lon in -180.0f64..=180.0,
            a in -90.0f64..=90.0,
            b in -90.0f64..=90.0,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(axis_bits(encode(lo, lon), false) <= axis_bits(encode(hi, lon), false));
            prop_assert_eq!(axis_bits(encode(lo, lon), true), axis_bits(encode(hi, lon), true));
        }

        #[test]
        fn prop_longitude_bits_are_monotonic(
            lat in -90.0f64..=90.0,
            a in -180.0f64..=180.0,
            b in -180.0f64..=180.0,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(axis_bits(encode(lat, lo), true) <= axis_bits(encode(lat, hi), true));
        }

        #[test]
        fn prop_radius_range_is_ordered(
            lat in -89.0f64..=89.0,
            lon in -180.0f64..=180.0,
            radius in -50_000.0f64..=500_000.0,
        ) {
            let (gte, lte) = radius_range(lat, lon, radius);
            prop_assert!(gte <= lte);
        }
    }
}
