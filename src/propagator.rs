//! Trajectory propagation through a solenoid field.
//!
//! Charged particles follow a helix around the field axis; neutral particles,
//! or any particle in a field-free container, follow a straight line. Paths end
//! where they leave the container's cylinder or after `max_orbits` turns.

use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use serde::Serialize;

/// Curvature constant: radius [cm] = pT [GeV] / (CURVATURE * |q| * B [T]).
const CURVATURE: f32 = 0.299_792_458e-2;

/// Largest turning angle between two path points.
const MAX_STEP_ANGLE: f32 = 0.05;

/// Largest distance between two path points, in cm.
const MAX_STEP_LENGTH: f32 = 5.0;

const BISECTION_STEPS: usize = 24;

/// Propagation settings of one trajectory list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackPropagator {
    pub field: Vec3,
    pub max_r: f32,
    pub max_z: f32,
    pub max_orbits: f32,
}

impl Default for TrackPropagator {
    fn default() -> Self {
        Self {
            field: Vec3::ZERO,
            max_r: 350.0,
            max_z: 450.0,
            max_orbits: 0.5,
        }
    }
}

impl TrackPropagator {
    pub fn new(field: Vec3, max_r: f32, max_z: f32) -> Self {
        Self {
            field,
            max_r,
            max_z,
            ..Default::default()
        }
    }

    fn is_outside(&self, p: Vec3) -> bool {
        p.truncate().length() > self.max_r || p.z.abs() > self.max_z
    }

    /// Path points from `vertex` along `momentum` (GeV) for a particle of the given charge.
    pub fn propagate(&self, vertex: Vec3, momentum: Vec3, charge: i32) -> Vec<Vec3> {
        let mut points = vec![vertex];
        if self.is_outside(vertex) || momentum == Vec3::ZERO {
            return points;
        }

        let pt = momentum.truncate().length();
        let bz = self.field.z;
        if charge == 0 || bz == 0.0 || pt == 0.0 {
            let dir = momentum.normalize();
            points.push(vertex + dir * self.exit_distance(vertex, dir));
            return points;
        }

        let helix = Helix::new(vertex, momentum, charge, bz);
        let arc_per_rad = (helix.radius * helix.radius + helix.dz_dtheta * helix.dz_dtheta).sqrt();
        let step = MAX_STEP_ANGLE.min(MAX_STEP_LENGTH / arc_per_rad);
        let theta_max = TAU * self.max_orbits;

        let mut prev = 0.0;
        loop {
            let theta = (prev + step).min(theta_max);
            let p = helix.at(theta);
            if self.is_outside(p) {
                points.push(self.bisect_exit(&helix, prev, theta));
                break;
            }
            points.push(p);
            if theta >= theta_max {
                break;
            }
            prev = theta;
        }
        points
    }

    /// Last point inside the cylinder between two turning angles.
    fn bisect_exit(&self, helix: &Helix, mut inside: f32, mut outside: f32) -> Vec3 {
        for _ in 0..BISECTION_STEPS {
            let mid = 0.5 * (inside + outside);
            if self.is_outside(helix.at(mid)) {
                outside = mid;
            } else {
                inside = mid;
            }
        }
        helix.at(inside)
    }

    /// Distance along unit direction `dir` from `start` to the cylinder wall.
    fn exit_distance(&self, start: Vec3, dir: Vec3) -> f32 {
        let (s, d) = (start.truncate(), dir.truncate());
        let a = d.length_squared();
        let t_r = if a > 0.0 {
            let b = 2.0 * s.dot(d);
            let c = s.length_squared() - self.max_r * self.max_r;
            (-b + (b * b - 4.0 * a * c).max(0.0).sqrt()) / (2.0 * a)
        } else {
            f32::INFINITY
        };
        let t_z = if dir.z > 0.0 {
            (self.max_z - start.z) / dir.z
        } else if dir.z < 0.0 {
            (-self.max_z - start.z) / dir.z
        } else {
            f32::INFINITY
        };
        t_r.min(t_z)
    }
}

/// Helix parameterised by turning angle.
struct Helix {
    vertex: Vec3,
    radius: f32,
    /// +1 for counter-clockwise rotation seen from +z, -1 otherwise.
    sense: f32,
    phi0: f32,
    dz_dtheta: f32,
}

impl Helix {
    fn new(vertex: Vec3, momentum: Vec3, charge: i32, bz: f32) -> Self {
        let pt = momentum.truncate().length();
        let radius = pt / (CURVATURE * charge.unsigned_abs() as f32 * bz.abs());
        Self {
            vertex,
            radius,
            sense: -(charge as f32 * bz).signum(),
            phi0: momentum.y.atan2(momentum.x),
            dz_dtheta: radius * momentum.z / pt,
        }
    }

    fn at(&self, theta: f32) -> Vec3 {
        let phi = self.phi0 + self.sense * theta;
        let hr = self.sense * self.radius;
        let xy = Vec2::new(phi.sin() - self.phi0.sin(), -(phi.cos() - self.phi0.cos())) * hr;
        self.vertex + xy.extend(self.dz_dtheta * theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solenoid() -> TrackPropagator {
        TrackPropagator::new(Vec3::new(0.0, 0.0, -3.8), 129.0, 300.0)
    }

    #[test]
    fn test_neutral_goes_straight_to_barrel() {
        let prop = solenoid();
        let path = prop.propagate(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 0);
        assert_eq!(path.len(), 2);
        assert!((path[1] - Vec3::new(129.0, 0.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_forward_neutral_hits_endcap() {
        let prop = solenoid();
        let path = prop.propagate(Vec3::ZERO, Vec3::new(1.0, 0.0, 10.0), 0);
        let end = *path.last().unwrap();
        assert!((end.z - 300.0).abs() < 1e-3);
        assert!(end.truncate().length() < 129.0);
    }

    #[test]
    fn test_zero_momentum_or_outside_vertex() {
        let prop = solenoid();
        assert_eq!(prop.propagate(Vec3::ZERO, Vec3::ZERO, 1).len(), 1);
        assert_eq!(prop.propagate(Vec3::new(500.0, 0.0, 0.0), Vec3::X, 1).len(), 1);
    }

    #[test]
    fn test_helix_stays_inside_and_reaches_wall() {
        let prop = solenoid();
        let path = prop.propagate(Vec3::ZERO, Vec3::new(20.0, 5.0, 3.0), 1);
        assert!(path.len() > 2);
        for p in &path {
            assert!(p.truncate().length() <= 129.0 + 1e-3);
            assert!(p.z.abs() <= 300.0 + 1e-3);
        }
        let end = path.last().unwrap();
        assert!((end.truncate().length() - 129.0).abs() < 0.1);
    }

    #[test]
    fn test_looper_stops_after_half_orbit() {
        let prop = solenoid();
        let pt = 0.5;
        let radius = pt / (CURVATURE * 3.8);
        let path = prop.propagate(Vec3::ZERO, Vec3::new(pt, 0.0, 0.0), -1);
        let end = path.last().unwrap();
        assert!((end.truncate().length() - 2.0 * radius).abs() < 0.01 * radius);
    }

    #[test]
    fn test_opposite_charges_bend_opposite_ways() {
        let prop = solenoid();
        let plus = prop.propagate(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), 1);
        let minus = prop.propagate(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), -1);
        let (yp, ym) = (plus.last().unwrap().y, minus.last().unwrap().y);
        assert!(yp * ym < 0.0);
        assert!((yp + ym).abs() < 1e-2);
    }

    #[test]
    fn test_extreme_charge_stays_inside() {
        let prop = solenoid();
        let path = prop.propagate(Vec3::ZERO, Vec3::new(5.0, 0.0, 1.0), i32::MIN);
        assert!(path.len() > 1);
        for p in &path {
            assert!(p.is_finite());
            assert!(p.truncate().length() <= 129.0 + 1e-3);
        }
    }

    #[test]
    fn test_no_field_is_straight_for_charged() {
        let prop = TrackPropagator::new(Vec3::ZERO, 129.0, 300.0);
        let path = prop.propagate(Vec3::ZERO, Vec3::new(0.0, 3.0, 0.0), 1);
        assert_eq!(path.len(), 2);
        assert!((path[1].y - 129.0).abs() < 1e-3);
    }
}
