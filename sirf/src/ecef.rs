//! Earth-centred earth-fixed to geodetic conversion on the WGS-84 ellipsoid.

use core::f64::consts::PI;

/// WGS-84 semi-major axis, metres.
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS-84 flattening.
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Height of the geoid above the ellipsoid at a given position.
pub trait GeoidModel {
    /// Separation in metres for latitude and longitude in degrees.
    fn separation(&self, lat_deg: f64, lon_deg: f64) -> f64;
}

impl<F> GeoidModel for F
where
    F: Fn(f64, f64) -> f64,
{
    fn separation(&self, lat_deg: f64, lon_deg: f64) -> f64 {
        self(lat_deg, lon_deg)
    }
}

/// Treats the ellipsoid as the geoid, so altitudes are ellipsoidal heights.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Ellipsoid;

impl GeoidModel for Ellipsoid {
    fn separation(&self, _lat_deg: f64, _lon_deg: f64) -> f64 {
        0.0
    }
}

/// Position and velocity in a local geodetic frame.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Geodetic {
    /// Degrees, north positive
    pub latitude: f64,
    /// Degrees, east positive
    pub longitude: f64,
    /// Metres above the geoid
    pub altitude: f64,
    pub vel_north: f64,
    pub vel_east: f64,
    pub vel_up: f64,
    /// Horizontal speed, m/s
    pub speed: f64,
    /// Track over ground in radians, `[0, 2π)`
    pub heading: f64,
}

struct Shape {
    a: f64,
    b: f64,
    e2: f64,
    ep2: f64,
}

fn wgs84() -> Shape {
    let a = WGS84_A;
    let b = a * (1.0 - WGS84_F);
    let diff = a.powi(2) - b.powi(2);
    Shape {
        a,
        b,
        e2: diff / a.powi(2),
        ep2: diff / b.powi(2),
    }
}

/// Converts an ECEF position (m) and velocity (m/s).
///
/// Uses Bowring's closed form without iteration, which is good to well under
/// a millimetre for terrestrial receivers.
pub fn ecef_to_geodetic<G: GeoidModel + ?Sized>(
    pos: [f64; 3],
    vel: [f64; 3],
    geoid: &G,
) -> Geodetic {
    let Shape { a, b, e2, ep2 } = wgs84();
    let [x, y, z] = pos;
    let [vx, vy, vz] = vel;

    let lambda = y.atan2(x);
    let p = (x.powi(2) + y.powi(2)).sqrt();
    let theta = (z * a).atan2(p * b);
    let phi = (z + ep2 * b * theta.sin().powf(3.0)).atan2(p - e2 * a * theta.cos().powf(3.0));
    let n = a / (1.0 - e2 * phi.sin().powi(2)).sqrt();

    let latitude = phi.to_degrees();
    let longitude = lambda.to_degrees();
    let altitude = p / phi.cos() - n - geoid.separation(latitude, longitude);

    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_lambda, cos_lambda) = lambda.sin_cos();
    let vel_north = -vx * sin_phi * cos_lambda - vy * sin_phi * sin_lambda + vz * cos_phi;
    let vel_east = -vx * sin_lambda + vy * cos_lambda;
    let vel_up = vx * cos_phi * cos_lambda + vy * cos_phi * sin_lambda + vz * sin_phi;

    let speed = vel_north.hypot(vel_east);
    let mut heading = vel_east.atan2(vel_north);
    if heading < 0.0 {
        heading += 2.0 * PI;
        // -tiny + 2π rounds up to 2π
        if heading >= 2.0 * PI {
            heading = 0.0;
        }
    }

    Geodetic {
        latitude,
        longitude,
        altitude,
        vel_north,
        vel_east,
        vel_up,
        speed,
        heading,
    }
}

/// Forward transform from latitude/longitude (degrees) and ellipsoidal
/// height (m) to ECEF metres.
pub fn geodetic_to_ecef(lat_deg: f64, lon_deg: f64, height: f64) -> [f64; 3] {
    let Shape { a, e2, .. } = wgs84();
    let (sin_phi, cos_phi) = lat_deg.to_radians().sin_cos();
    let (sin_lambda, cos_lambda) = lon_deg.to_radians().sin_cos();
    let n = a / (1.0 - e2 * sin_phi.powi(2)).sqrt();
    [
        (n + height) * cos_phi * cos_lambda,
        (n + height) * cos_phi * sin_lambda,
        (n * (1.0 - e2) + height) * sin_phi,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equator_prime_meridian() {
        let g = ecef_to_geodetic([WGS84_A, 0.0, 0.0], [0.0; 3], &Ellipsoid);
        assert!(g.latitude.abs() < 1e-9);
        assert!(g.longitude.abs() < 1e-9);
        assert!(g.altitude.abs() < 1e-6);
        assert_eq!(g.speed, 0.0);
        assert_eq!(g.heading, 0.0);
    }

    #[test]
    fn west_of_greenwich_has_negative_longitude() {
        let g = ecef_to_geodetic([-2_694_685.0, -4_293_642.0, 3_857_878.0], [0.0; 3], &Ellipsoid);
        assert!((g.latitude - 37.458).abs() < 0.01, "{}", g.latitude);
        assert!((g.longitude - -122.112).abs() < 0.01, "{}", g.longitude);
        assert!(g.altitude.abs() < 100.0, "{}", g.altitude);
    }

    #[test]
    fn westward_motion_wraps_heading() {
        // At (0°, 0°) local east is +y.
        let g = ecef_to_geodetic([WGS84_A, 0.0, 0.0], [0.0, -3.0, 0.0], &Ellipsoid);
        assert!((g.vel_east + 3.0).abs() < 1e-9);
        assert!((g.speed - 3.0).abs() < 1e-9);
        assert!((g.heading - 1.5 * PI).abs() < 1e-9);
        assert!(g.heading < 2.0 * PI);
    }

    #[test]
    fn north_and_up_components() {
        let g = ecef_to_geodetic([WGS84_A, 0.0, 0.0], [2.0, 0.0, 1.0], &Ellipsoid);
        assert!((g.vel_north - 1.0).abs() < 1e-9);
        assert!((g.vel_up - 2.0).abs() < 1e-9);
        assert!(g.heading.abs() < 1e-9);
    }

    #[test]
    fn geoid_separation_is_subtracted() {
        let pos = geodetic_to_ecef(45.0, 10.0, 100.0);
        let plain = ecef_to_geodetic(pos, [0.0; 3], &Ellipsoid);
        let corrected = ecef_to_geodetic(pos, [0.0; 3], &|_lat: f64, _lon: f64| 47.5);
        assert!((plain.altitude - 100.0).abs() < 1e-3);
        assert!((plain.altitude - corrected.altitude - 47.5).abs() < 1e-9);
    }
}
