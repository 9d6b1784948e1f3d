//! Geodetic ↔ local calibration.
//!
//! Four control points pair local Cartesian coordinates with the geodetic
//! coordinates the World reports for them. With `L` and `G` holding the points
//! as homogeneous columns, `T = (G · L⁻¹)⁻¹` maps `[lat, lon, alt, 1]` back to
//! local space. The map is affine, so points away from the control points are
//! only approximate (centimeter order over a city-sized map).

use contracts::{GeoLocation, Location, World};
use nalgebra::{Matrix4, Vector4};
use tracing::{debug, instrument};

use crate::error::{GeometryError, Result};

/// Hadamard ratio `|det| / Π‖column‖` below which a matrix is treated as
/// singular. The ratio is 1 for orthogonal columns and does not depend on units.
const SINGULAR_RATIO: f64 = 1e-10;

/// Four paired (local, geodetic) calibration points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPointSet {
    pub local: [Location; 4],
    pub geodetic: [GeoLocation; 4],
}

impl ControlPointSet {
    /// Origin and the unit offsets along x, y and z
    pub const CANONICAL_LOCAL: [Location; 4] = [
        Location::new(0.0, 0.0, 0.0),
        Location::new(1.0, 0.0, 0.0),
        Location::new(0.0, 1.0, 0.0),
        Location::new(0.0, 0.0, 1.0),
    ];

    /// Canonical local points paired with the World's geodetic mapping of them
    pub fn from_world<W: World + ?Sized>(world: &W) -> Self {
        let local = Self::CANONICAL_LOCAL;
        let geodetic = local.map(|point| world.transform_to_geolocation(&point));
        Self { local, geodetic }
    }
}

/// Calibrated geodetic → local transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeodeticTransform {
    matrix: Matrix4<f64>,
}

impl GeodeticTransform {
    /// Solve the transform from four correspondences.
    ///
    /// # Errors
    /// [`GeometryError::DegenerateControlPoints`] when the local points are not
    /// affinely independent or the geodetic points collapse.
    #[instrument(name = "geodetic_calibrate", skip(points))]
    pub fn calibrate(points: &ControlPointSet) -> Result<Self> {
        let local = Matrix4::from_columns(&points.local.map(|p| Vector4::new(p.x, p.y, p.z, 1.0)));
        let geodetic = Matrix4::from_columns(
            &points
                .geodetic
                .map(|g| Vector4::new(g.latitude, g.longitude, g.altitude, 1.0)),
        );

        let local_inv = invert(&local, "local control points are not affinely independent")?;
        let local_to_geo = geodetic * local_inv;
        let matrix = invert(&local_to_geo, "geodetic control points are not affinely independent")?;

        debug!(det = local_to_geo.determinant(), "Geodetic transform calibrated");
        Ok(Self { matrix })
    }

    /// Calibrate against the World's own local → geodetic mapping
    pub fn from_world<W: World + ?Sized>(world: &W) -> Result<Self> {
        Self::calibrate(&ControlPointSet::from_world(world))
    }

    /// Map a geodetic coordinate to local space
    pub fn transform(&self, geolocation: &GeoLocation) -> Location {
        let local = self.matrix
            * Vector4::new(
                geolocation.latitude,
                geolocation.longitude,
                geolocation.altitude,
                1.0,
            );
        Location::new(local.x, local.y, local.z)
    }

    /// Underlying 4×4 matrix
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }
}

fn invert(matrix: &Matrix4<f64>, message: &str) -> Result<Matrix4<f64>> {
    let det = matrix.determinant();
    let volume: f64 = matrix.column_iter().map(|column| column.norm()).product();
    if !det.is_finite() || volume == 0.0 || det.abs() < SINGULAR_RATIO * volume {
        return Err(GeometryError::degenerate(format!(
            "{} (det={:e}, ratio={:e})",
            message,
            det,
            det.abs() / volume
        )));
    }
    matrix
        .try_inverse()
        .ok_or_else(|| GeometryError::degenerate(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mercator-style mapping with the same constants the simulator uses.
    fn mercator(origin: GeoLocation, location: &Location) -> GeoLocation {
        const EARTH_RADIUS: f64 = 6_378_137.0;
        let scale = origin.latitude.to_radians().cos();
        let mx = scale * origin.longitude.to_radians() * EARTH_RADIUS + location.x;
        let my = scale
            * EARTH_RADIUS
            * ((90.0 + origin.latitude) * std::f64::consts::PI / 360.0).tan().ln()
            - location.y;
        GeoLocation {
            latitude: 360.0 / std::f64::consts::PI * (my / (EARTH_RADIUS * scale)).exp().atan() - 90.0,
            longitude: (mx / (EARTH_RADIUS * scale)).to_degrees(),
            altitude: origin.altitude + location.z,
        }
    }

    fn control_points(origin: GeoLocation) -> ControlPointSet {
        let local = ControlPointSet::CANONICAL_LOCAL;
        ControlPointSet {
            local,
            geodetic: local.map(|p| mercator(origin, &p)),
        }
    }

    #[test]
    fn control_points_round_trip() {
        let points = control_points(GeoLocation::default());
        let transform = GeodeticTransform::calibrate(&points).unwrap();

        for (local, geo) in points.local.iter().zip(points.geodetic.iter()) {
            let back = transform.transform(geo);
            assert!((back.x - local.x).abs() < 1e-9, "x: {} vs {}", back.x, local.x);
            assert!((back.y - local.y).abs() < 1e-9, "y: {} vs {}", back.y, local.y);
            assert!((back.z - local.z).abs() < 1e-9, "z: {} vs {}", back.z, local.z);
        }
    }

    #[test]
    fn control_points_round_trip_away_from_equator() {
        let origin = GeoLocation {
            latitude: 49.0,
            longitude: 8.4,
            altitude: 110.0,
        };
        let points = control_points(origin);
        let transform = GeodeticTransform::calibrate(&points).unwrap();

        for (local, geo) in points.local.iter().zip(points.geodetic.iter()) {
            let back = transform.transform(geo);
            assert!(back.distance(local) < 1e-6, "{:?} vs {:?}", back, local);
        }

        let truth = Location::new(-120.0, 45.0, 2.0);
        let estimate = transform.transform(&mercator(origin, &truth));
        assert!(estimate.distance(&truth) < 0.1, "{:?}", estimate);
    }

    #[test]
    fn singularity_check_ignores_units() {
        // well conditioned, just tiny
        let tiny = Matrix4::from_diagonal(&Vector4::new(1e-6, 1e-6, 1e-6, 1.0));
        assert!(invert(&tiny, "tiny").is_ok());

        // unit scale, but two columns nearly parallel
        let mut skewed = Matrix4::identity();
        skewed[(0, 1)] = 1.0;
        skewed[(1, 1)] = 1e-12;
        assert!(matches!(
            invert(&skewed, "skewed"),
            Err(GeometryError::DegenerateControlPoints { .. })
        ));
    }

    #[test]
    fn far_points_are_approximate() {
        let origin = GeoLocation::default();
        let transform = GeodeticTransform::calibrate(&control_points(origin)).unwrap();

        let truth = Location::new(150.0, -80.0, 3.0);
        let estimate = transform.transform(&mercator(origin, &truth));
        assert!(estimate.distance(&truth) < 0.1);
    }

    #[test]
    fn collinear_local_points_fail_fast() {
        let mut points = control_points(GeoLocation::default());
        points.local[3] = Location::new(2.0, 0.0, 0.0);
        let err = GeodeticTransform::calibrate(&points).unwrap_err();
        assert!(matches!(err, GeometryError::DegenerateControlPoints { .. }));
    }

    #[test]
    fn collapsed_geodetic_points_fail_fast() {
        let mut points = control_points(GeoLocation::default());
        points.geodetic[2] = points.geodetic[0];
        assert!(GeodeticTransform::calibrate(&points).is_err());
    }
}
