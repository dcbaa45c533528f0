// The mTPC readout plane is an annulus cut into concentric rings, each ring cut into the same
// number of pads. Ring 0 is the innermost ring. Pad 0 of an even ring starts at phi = 0 and
// pads count counterclockwise. Odd rings are rotated by half a pad, so that adjacent rings
// are laid like bricks:
//
//   ring 1:    |  0  |  1  |  2  |
//   ring 0: |  0  |  1  |  2  |
//
// Because the ring width and pad count are fixed, inner pads are narrower than outer ones.
// All lengths are in cm and all angles in radians.
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use super::constants::{
    DEFAULT_INNER_RADIUS, DEFAULT_NUM_PADS_PER_RING, DEFAULT_NUM_RINGS, DEFAULT_OUTER_RADIUS,
};
use super::error::GeometryError;

/// DetectorGeometry describes the pad plane and maps between (ring, pad) and the plane's
/// Cartesian coordinates.
///
/// A geometry is never modified after it is built. Consumers are handed a geometry
/// explicitly; there is no global instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeometry")]
pub struct DetectorGeometry {
    num_rings: usize,
    num_pads_per_ring: usize,
    inner_radius: f64,
    outer_radius: f64,
}

/// Deserialized form of a geometry before validation
#[derive(Debug, Deserialize)]
struct RawGeometry {
    num_rings: usize,
    num_pads_per_ring: usize,
    inner_radius: f64,
    outer_radius: f64,
}

impl TryFrom<RawGeometry> for DetectorGeometry {
    type Error = GeometryError;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        Self::new(
            raw.num_rings,
            raw.num_pads_per_ring,
            raw.inner_radius,
            raw.outer_radius,
        )
    }
}

impl Default for DetectorGeometry {
    /// The TDIS mTPC pad plane
    fn default() -> Self {
        Self {
            num_rings: DEFAULT_NUM_RINGS,
            num_pads_per_ring: DEFAULT_NUM_PADS_PER_RING,
            inner_radius: DEFAULT_INNER_RADIUS,
            outer_radius: DEFAULT_OUTER_RADIUS,
        }
    }
}

impl DetectorGeometry {
    /// Create a new validated geometry
    pub fn new(
        num_rings: usize,
        num_pads_per_ring: usize,
        inner_radius: f64,
        outer_radius: f64,
    ) -> Result<Self, GeometryError> {
        let geometry = Self {
            num_rings,
            num_pads_per_ring,
            inner_radius,
            outer_radius,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Check the geometry invariants. Every constructor, deserialization included, runs this.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.num_rings == 0 || self.num_pads_per_ring == 0 {
            return Err(GeometryError::InvalidConfig(String::from(
                "the pad plane needs at least one ring and one pad per ring",
            )));
        }
        if !(self.inner_radius >= 0.0
            && self.outer_radius > self.inner_radius
            && self.outer_radius.is_finite())
        {
            return Err(GeometryError::InvalidConfig(format!(
                "radii must satisfy 0 <= inner < outer, got inner {} and outer {}",
                self.inner_radius, self.outer_radius
            )));
        }
        Ok(())
    }

    pub fn num_rings(&self) -> usize {
        self.num_rings
    }

    pub fn num_pads_per_ring(&self) -> usize {
        self.num_pads_per_ring
    }

    pub fn inner_radius(&self) -> f64 {
        self.inner_radius
    }

    pub fn outer_radius(&self) -> f64 {
        self.outer_radius
    }

    /// Radial width of a single ring
    pub fn ring_width(&self) -> f64 {
        (self.outer_radius - self.inner_radius) / self.num_rings as f64
    }

    /// Angular width of a single pad
    pub fn pad_width(&self) -> f64 {
        TAU / self.num_pads_per_ring as f64
    }

    /// Odd rings are rotated by half a pad
    fn ring_offset(&self, ring: i64) -> f64 {
        if ring % 2 == 0 {
            0.0
        } else {
            0.5 * self.pad_width()
        }
    }

    fn check_ring(&self, ring: i32) -> Result<(), GeometryError> {
        if ring < 0 || ring as usize >= self.num_rings {
            return Err(GeometryError::RingOutOfRange {
                ring,
                num_rings: self.num_rings,
            });
        }
        Ok(())
    }

    fn check_pad(&self, pad: i32) -> Result<(), GeometryError> {
        if pad < 0 || pad as usize >= self.num_pads_per_ring {
            return Err(GeometryError::PadOutOfRange {
                pad,
                num_pads: self.num_pads_per_ring,
            });
        }
        Ok(())
    }

    /// Inner and outer radius of a ring
    pub fn ring_radii(&self, ring: i32) -> Result<(f64, f64), GeometryError> {
        self.check_ring(ring)?;
        let r_inner = self.inner_radius + ring as f64 * self.ring_width();
        Ok((r_inner, r_inner + self.ring_width()))
    }

    /// Radius of the middle of a ring
    pub fn ring_center_radius(&self, ring: i32) -> Result<f64, GeometryError> {
        self.check_ring(ring)?;
        Ok(self.ring_width() * (ring as f64 + 0.5) + self.inner_radius)
    }

    /// Start and end angle of a pad. The end may exceed 2pi for the last pad of odd rings.
    pub fn pad_angular_bounds(&self, ring: i32, pad: i32) -> Result<(f64, f64), GeometryError> {
        self.check_ring(ring)?;
        self.check_pad(pad)?;
        let start = pad as f64 * self.pad_width() + self.ring_offset(ring as i64);
        Ok((start, start + self.pad_width()))
    }

    /// Arc length of a pad at the ring center. Pads are annular sectors, so this is only an
    /// approximation of their width.
    pub fn pad_approx_width(&self, ring: i32) -> Result<f64, GeometryError> {
        Ok(self.ring_center_radius(ring)? * self.pad_width())
    }

    /// Get the (x, y) center of a pad.
    ///
    /// Out of range indices are an error; they are never clamped.
    pub fn pad_center(&self, ring: i32, pad: i32) -> Result<(f64, f64), GeometryError> {
        let r = self.ring_center_radius(ring)?;
        self.check_pad(pad)?;
        let theta =
            0.5 * self.pad_width() + pad as f64 * self.pad_width() + self.ring_offset(ring as i64);
        Ok((r * theta.cos(), r * theta.sin()))
    }

    /// Find the (ring, pad) containing the polar point (r, phi).
    ///
    /// This is a best-effort lookup for points which did not come from a pad center, so
    /// points off the plane are clamped to the nearest ring and pad rather than rejected.
    pub fn ring_pad_for_point(&self, r: f64, phi: f64) -> (i32, i32) {
        let ring = ((r - self.inner_radius) / self.ring_width()).floor() as i64;
        let ring = ring.clamp(0, self.num_rings as i64 - 1);

        let phi = phi.rem_euclid(TAU);
        let shifted = (phi - self.ring_offset(ring)).rem_euclid(TAU);
        let pad = (shifted / self.pad_width()).floor() as i64;
        let pad = pad.clamp(0, self.num_pads_per_ring as i64 - 1);

        (ring as i32, pad as i32)
    }

    /// Same as ring_pad_for_point, for a Cartesian point
    pub fn ring_pad_for_xy(&self, x: f64, y: f64) -> (i32, i32) {
        self.ring_pad_for_point(x.hypot(y), y.atan2(x))
    }
}

//Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1.0e-9;

    #[test]
    fn test_default_geometry() {
        let geo = DetectorGeometry::default();
        assert!(geo.validate().is_ok());
        assert_eq!(geo.num_rings(), 21);
        assert_eq!(geo.num_pads_per_ring(), 122);
        assert!((geo.ring_width() - 10.0 / 21.0).abs() < TOLERANCE);
        assert!((geo.pad_width() - TAU / 122.0).abs() < TOLERANCE);
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(DetectorGeometry::new(0, 122, 5.0, 15.0).is_err());
        assert!(DetectorGeometry::new(21, 0, 5.0, 15.0).is_err());
        assert!(DetectorGeometry::new(21, 122, 15.0, 5.0).is_err());
        assert!(DetectorGeometry::new(21, 122, f64::NAN, 5.0).is_err());
        assert!(DetectorGeometry::new(21, 122, 5.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let yaml = "num_rings: 21\nnum_pads_per_ring: 122\ninner_radius: 5.0\nouter_radius: 15.0\n";
        let geo: DetectorGeometry = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(geo, DetectorGeometry::default());

        for bad in [
            yaml.replace("num_rings: 21", "num_rings: 0"),
            yaml.replace("num_pads_per_ring: 122", "num_pads_per_ring: 0"),
            yaml.replace("outer_radius: 15.0", "outer_radius: 1.0"),
        ] {
            assert!(serde_yaml::from_str::<DetectorGeometry>(&bad).is_err());
        }
    }

    #[test]
    fn test_pad_center_radius() {
        let geo = DetectorGeometry::default();
        for ring in 0..geo.num_rings() as i32 {
            for pad in [0, 1, 60, 121] {
                let (x, y) = geo.pad_center(ring, pad).unwrap();
                let expected = geo.ring_width() * (ring as f64 + 0.5) + geo.inner_radius();
                assert!((x.hypot(y) - expected).abs() < TOLERANCE);
            }
        }
    }

    #[test]
    fn test_pad_center_first_pad() {
        let geo = DetectorGeometry::default();
        let (x, y) = geo.pad_center(0, 0).unwrap();
        assert!(x > 0.0);
        assert!((y.atan2(x) - 0.5 * geo.pad_width()).abs() < TOLERANCE);
    }

    #[test]
    fn test_pad_center_matches_simulation() {
        // Monte-Carlo hit at ring 7 pad 97 with true position (3.09, -7.78) cm
        let geo = DetectorGeometry::default();
        let (x, y) = geo.pad_center(7, 97).unwrap();
        assert!((x - 3.09).abs() < geo.ring_width());
        assert!((y + 7.78).abs() < geo.ring_width());
    }

    #[test]
    fn test_odd_ring_offset() {
        let geo = DetectorGeometry::default();
        let (x0, y0) = geo.pad_center(0, 0).unwrap();
        let (x1, y1) = geo.pad_center(1, 0).unwrap();
        let offset = y1.atan2(x1) - y0.atan2(x0);
        assert!((offset - 0.5 * geo.pad_width()).abs() < TOLERANCE);
    }

    #[test]
    fn test_out_of_range() {
        let geo = DetectorGeometry::default();
        assert_eq!(
            geo.pad_center(-1, 0),
            Err(GeometryError::RingOutOfRange {
                ring: -1,
                num_rings: 21
            })
        );
        assert_eq!(
            geo.pad_center(21, 0),
            Err(GeometryError::RingOutOfRange {
                ring: 21,
                num_rings: 21
            })
        );
        assert_eq!(
            geo.pad_center(0, 122),
            Err(GeometryError::PadOutOfRange {
                pad: 122,
                num_pads: 122
            })
        );
        assert!(geo.pad_center(0, -1).is_err());
        assert!(geo.ring_radii(21).is_err());
        assert!(geo.pad_angular_bounds(3, 200).is_err());
    }

    #[test]
    fn test_round_trip_every_pad() {
        let geo = DetectorGeometry::default();
        for ring in 0..geo.num_rings() as i32 {
            for pad in 0..geo.num_pads_per_ring() as i32 {
                let (x, y) = geo.pad_center(ring, pad).unwrap();
                assert_eq!(geo.ring_pad_for_xy(x, y), (ring, pad));
            }
        }
    }

    #[test]
    fn test_point_lookup_clamps() {
        let geo = DetectorGeometry::default();
        assert_eq!(geo.ring_pad_for_point(0.0, 0.01).0, 0);
        assert_eq!(geo.ring_pad_for_point(100.0, 0.01).0, 20);
        // Negative angles wrap around
        assert_eq!(geo.ring_pad_for_point(5.1, -0.01), (0, 121));
        // Just below the odd ring offset belongs to the last pad of the ring
        let r1 = geo.ring_center_radius(1).unwrap();
        assert_eq!(geo.ring_pad_for_point(r1, 0.25 * geo.pad_width()), (1, 121));
    }

    #[test]
    fn test_ring_radii_contiguous() {
        let geo = DetectorGeometry::default();
        let (inner, _) = geo.ring_radii(0).unwrap();
        assert!((inner - geo.inner_radius()).abs() < TOLERANCE);
        let (_, outer) = geo.ring_radii(20).unwrap();
        assert!((outer - geo.outer_radius()).abs() < TOLERANCE);
        for ring in 0..20 {
            let (_, outer) = geo.ring_radii(ring).unwrap();
            let (inner, _) = geo.ring_radii(ring + 1).unwrap();
            assert!((outer - inner).abs() < TOLERANCE);
        }
    }

    #[test]
    fn test_pad_bounds_cover_circle() {
        let geo = DetectorGeometry::default();
        let total: f64 = (0..122)
            .map(|pad| {
                let (start, end) = geo.pad_angular_bounds(0, pad).unwrap();
                end - start
            })
            .sum();
        assert!((total - TAU).abs() < 1.0e-6);
        let (even, _) = geo.pad_angular_bounds(0, 0).unwrap();
        let (odd, _) = geo.pad_angular_bounds(1, 0).unwrap();
        assert!((odd - even - 0.5 * geo.pad_width()).abs() < TOLERANCE);
    }

    #[test]
    fn test_pad_approx_width_grows() {
        let geo = DetectorGeometry::default();
        let inner = geo.pad_approx_width(0).unwrap();
        let outer = geo.pad_approx_width(20).unwrap();
        assert!(outer > inner);
        assert!((inner - (5.0 + 0.5 * 10.0 / 21.0) * geo.pad_width()).abs() < 1.0e-6);
    }
}
