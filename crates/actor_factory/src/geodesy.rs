//! Mercator 投影
//!
//! 与模拟器一致：以地理参考点为原点的横向 Mercator 展开，
//! 本地 x 朝东、y 朝南（左手系），z 直接叠加到高度上。

use std::f64::consts::PI;

use contracts::{GeoLocation, Location};

/// 赤道半径 (WGS84, 米)
const EARTH_RADIUS_EQUA: f64 = 6_378_137.0;

fn scale(latitude: f64) -> f64 {
    latitude.to_radians().cos()
}

fn lat_to_my(latitude: f64, scale: f64) -> f64 {
    scale * EARTH_RADIUS_EQUA * ((90.0 + latitude) * PI / 360.0).tan().ln()
}

fn lon_to_mx(longitude: f64, scale: f64) -> f64 {
    scale * longitude * PI * EARTH_RADIUS_EQUA / 180.0
}

/// 本地坐标 → 大地坐标
pub fn to_geolocation(georeference: &GeoLocation, location: &Location) -> GeoLocation {
    let s = scale(georeference.latitude);
    let mx = lon_to_mx(georeference.longitude, s) + location.x;
    let my = lat_to_my(georeference.latitude, s) - location.y;

    GeoLocation {
        latitude: 360.0 * (my / (EARTH_RADIUS_EQUA * s)).exp().atan() / PI - 90.0,
        longitude: mx * 180.0 / (PI * EARTH_RADIUS_EQUA * s),
        altitude: georeference.altitude + location.z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> GeoLocation {
        GeoLocation {
            latitude: 49.0,
            longitude: 8.0,
            altitude: 120.0,
        }
    }

    #[test]
    fn origin_maps_to_reference() {
        let geo = to_geolocation(&reference(), &Location::default());
        assert!((geo.latitude - 49.0).abs() < 1e-9);
        assert!((geo.longitude - 8.0).abs() < 1e-9);
        assert_eq!(geo.altitude, 120.0);
    }

    #[test]
    fn axes_follow_left_handed_convention() {
        let east = to_geolocation(&reference(), &Location::new(100.0, 0.0, 0.0));
        assert!(east.longitude > 8.0);
        let south = to_geolocation(&reference(), &Location::new(0.0, 100.0, 0.0));
        assert!(south.latitude < 49.0);
    }

    #[test]
    fn east_offset_scales_with_latitude() {
        let east = to_geolocation(&reference(), &Location::new(1000.0, 0.0, 0.0));
        let expected = 1000.0 * 180.0 / (PI * EARTH_RADIUS_EQUA * 49f64.to_radians().cos());
        assert!((east.longitude - 8.0 - expected).abs() < 1e-12);
        assert!((east.latitude - 49.0).abs() < 1e-9);
    }
}
