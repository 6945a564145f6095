use proptest::prelude::*;
use sirf::{ecef_to_geodetic, geodetic_to_ecef, Ellipsoid};
use std::f64::consts::PI;

proptest! {
    #[test]
    fn round_trip_recovers_position(
        lat in -89.9f64..89.9,
        lon in -179.9f64..179.9,
        h in -1000.0f64..20_000.0,
    ) {
        let pos = geodetic_to_ecef(lat, lon, h);
        let g = ecef_to_geodetic(pos, [0.0; 3], &Ellipsoid);
        prop_assert!((g.latitude - lat).abs() < 1e-7, "lat {} vs {}", g.latitude, lat);
        prop_assert!((g.longitude - lon).abs() < 1e-7, "lon {} vs {}", g.longitude, lon);
        prop_assert!((g.altitude - h).abs() < 1e-2, "alt {} vs {}", g.altitude, h);
    }

    #[test]
    fn heading_stays_in_range(
        lat in -89.0f64..89.0,
        lon in -179.0f64..179.0,
        vel in prop::array::uniform3(-500.0f64..500.0),
    ) {
        let pos = geodetic_to_ecef(lat, lon, 0.0);
        let g = ecef_to_geodetic(pos, vel, &Ellipsoid);
        prop_assert!(g.heading >= 0.0 && g.heading < 2.0 * PI);
        prop_assert!((g.speed - g.vel_north.hypot(g.vel_east)).abs() < 1e-9);
        // the local frame is a rotation, so the magnitude is preserved
        let local = (g.speed.powi(2) + g.vel_up.powi(2)).sqrt();
        let ecef = (vel[0].powi(2) + vel[1].powi(2) + vel[2].powi(2)).sqrt();
        prop_assert!((local - ecef).abs() < 1e-6);
    }
}

#[test]
fn southwest_motion_heading() {
    // At (0°, 0°): north is +z, east is +y.
    let pos = geodetic_to_ecef(0.0, 0.0, 0.0);
    let g = ecef_to_geodetic(pos, [0.0, -1.0, -1.0], &Ellipsoid);
    assert!((g.heading - 1.25 * PI).abs() < 1e-9);
}
