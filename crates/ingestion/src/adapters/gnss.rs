//! GNSS 解码

use contracts::{Channel, GnssReading, RawPayload, RawSensorData, Sample, SamplePayload};
use geometry::GeodeticTransform;

use crate::error::{IngestionError, Result};

/// 解码 GNSS 测量；提供标定时附带本地坐标
pub fn decode(raw: &RawSensorData, geodetic: Option<&GeodeticTransform>) -> Result<Sample> {
    let RawPayload::Gnss(measurement) = &raw.payload else {
        return Err(IngestionError::parse_failed(
            Channel::Gnss,
            "expected a gnss measurement, got an image",
        ));
    };

    let values = [measurement.latitude, measurement.longitude, measurement.altitude];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(IngestionError::parse_failed(
            Channel::Gnss,
            format!("non-finite measurement {:?}", values),
        ));
    }

    let reading = GnssReading {
        latitude: measurement.latitude,
        longitude: measurement.longitude,
        altitude: measurement.altitude,
        local: geodetic.map(|t| t.transform(measurement)),
    };
    Ok(Sample::new(raw.timestamp, raw.frame, SamplePayload::Gnss(reading)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{GeoLocation, Location};
    use geometry::ControlPointSet;

    fn measurement(latitude: f64, longitude: f64, altitude: f64) -> RawSensorData {
        RawSensorData {
            frame: 3,
            timestamp: 0.15,
            payload: RawPayload::Gnss(GeoLocation {
                latitude,
                longitude,
                altitude,
            }),
        }
    }

    #[test]
    fn reading_without_calibration() {
        let sample = decode(&measurement(48.1, 11.5, 520.0), None).unwrap();
        let SamplePayload::Gnss(reading) = sample.payload else {
            panic!("expected gnss payload");
        };
        assert_eq!(reading.latitude, 48.1);
        assert!(reading.local.is_none());
    }

    #[test]
    fn reading_with_local_coordinates() {
        // 1e-5 degrees per meter, altitude passes through
        let points = ControlPointSet {
            local: ControlPointSet::CANONICAL_LOCAL,
            geodetic: [
                GeoLocation { latitude: 0.0, longitude: 0.0, altitude: 0.0 },
                GeoLocation { latitude: 0.0, longitude: 1e-5, altitude: 0.0 },
                GeoLocation { latitude: -1e-5, longitude: 0.0, altitude: 0.0 },
                GeoLocation { latitude: 0.0, longitude: 0.0, altitude: 1.0 },
            ],
        };
        let transform = GeodeticTransform::calibrate(&points).unwrap();

        let sample = decode(&measurement(-2e-5, 3e-5, 1.5), Some(&transform)).unwrap();
        let SamplePayload::Gnss(reading) = sample.payload else {
            panic!("expected gnss payload");
        };
        let local = reading.local.unwrap();
        assert!(local.distance(&Location::new(3.0, 2.0, 1.5)) < 1e-6);
    }

    #[test]
    fn nan_is_rejected() {
        assert!(decode(&measurement(f64::NAN, 0.0, 0.0), None).is_err());
    }
}
