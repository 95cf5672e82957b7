//! Distance between two coordinates on the sphere and on the WGS84 ellipsoid
//!
//! Both distances are computed from latitude/longitude only, altitude never
//! takes part. Coordinates are [`Point`]s with x = longitude, y = latitude.

use std::f64::consts::PI;

use geo::geometry::Point;
use log::warn;

/// Mean earth radius used by the great-circle model, meters
pub const MEAN_EARTH_RADIUS: f64 = 6_371_008.8;

/// WGS84 semi-major axis, meters
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// WGS84 semi-minor axis, meters
pub const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
/// Mean radius of the WGS84 ellipsoid, (2a + b) / 3
pub const WGS84_MEAN_RADIUS: f64 = (2.0 * WGS84_A + WGS84_B) / 3.0;

/// Convergence threshold on lambda, radians. Around 0.006 mm on the ground.
const CONVERGENCE_THRESHOLD: f64 = 1e-12;
const MAX_ITERATIONS: usize = 200;

/// Outcome of the ellipsoidal inverse problem
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geodesic {
    pub meters: f64,
    /// The iteration did not converge and `meters` is the spherical
    /// approximation on the ellipsoid's mean radius
    pub fallback: bool,
}

/// Great-circle distance in meters, haversine in its `atan2` form
pub fn great_circle_distance(p1: Point, p2: Point) -> f64 {
    MEAN_EARTH_RADIUS * central_angle(p1, p2)
}

/// Geodesic distance in meters on the WGS84 ellipsoid
///
/// See [`geodesic`] for the non-convergence behaviour.
pub fn geodesic_distance(p1: Point, p2: Point) -> f64 {
    geodesic(p1, p2).meters
}

/// Vincenty's inverse formula on WGS84
///
/// Nearly antipodal pairs can make the iteration oscillate. After
/// `MAX_ITERATIONS`, or when lambda leaves [-pi, pi], the distance falls
/// back to the great-circle central angle times [`WGS84_MEAN_RADIUS`] and
/// the result is flagged with `fallback`.
pub fn geodesic(p1: Point, p2: Point) -> Geodesic {
    let l = longitude_difference(p1, p2);
    let u1 = ((1.0 - WGS84_F) * p1.y().to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * p2.y().to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;

        if sin_sigma == 0.0 {
            if cos_sigma > 0.0 {
                // coincident points
                return Geodesic {
                    meters: 0.0,
                    fallback: false,
                };
            }
            // exactly antipodal, the azimuth is undefined
            break;
        }

        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // equatorial line when cos_sq_alpha is zero
        let cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));

        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if lambda.abs() > PI {
            break;
        }

        if (lambda - previous).abs() < CONVERGENCE_THRESHOLD {
            let u_sq = cos_sq_alpha * (WGS84_A.powi(2) - WGS84_B.powi(2)) / WGS84_B.powi(2);
            let a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = b
                * sin_sigma
                * (cos_2sigma_m
                    + b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                            - b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma.powi(2))
                                * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));

            return Geodesic {
                meters: WGS84_B * a * (sigma - delta_sigma),
                fallback: false,
            };
        }
    }

    let meters = WGS84_MEAN_RADIUS * central_angle(p1, p2);
    warn!(
        "Geodesic between ({}, {}) and ({}, {}) did not converge, using spherical estimate {:.3} m",
        p1.y(),
        p1.x(),
        p2.y(),
        p2.x(),
        meters
    );

    Geodesic {
        meters,
        fallback: true,
    }
}

/// Longitude difference from `p1` to `p2` wrapped into [-pi, pi], radians
///
/// Tracks crossing the antimeridian jump from +180 to -180 degrees, the
/// shorter way around is the one that must be iterated on.
fn longitude_difference(p1: Point, p2: Point) -> f64 {
    let l = (p2.x() - p1.x()).to_radians();
    if l > PI {
        l - 2.0 * PI
    } else if l < -PI {
        l + 2.0 * PI
    } else {
        l
    }
}

/// Central angle between two points on the unit sphere, radians
fn central_angle(p1: Point, p2: Point) -> f64 {
    let lat1 = p1.y().to_radians();
    let lat2 = p2.y().to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = (p2.x() - p1.x()).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push `a` slightly outside [0, 1] near antipodes
    let a = a.clamp(0.0, 1.0);

    2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}
