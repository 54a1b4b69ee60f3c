//! Renderable primitives produced by the converters.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use serde::Serialize;

use crate::color::Rgba;
use crate::records::FourMomentum;

/// A propagated particle trajectory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    pub name: String,
    pub title: String,
    /// PDG species code.
    pub pdg: i32,
    pub charge: i32,
    pub momentum: FourMomentum,
    /// Start of the path.
    pub vertex: Vec3,
    pub color: Rgba,
    /// Propagated path, starting at `vertex`.
    pub path: Vec<Vec3>,
}

/// One calorimeter cell with its EM and HAD energy deposits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaloTower {
    pub eta_min: f32,
    pub eta_max: f32,
    pub phi_min: f32,
    pub phi_max: f32,
    /// Slice 0 is electromagnetic, slice 1 hadronic.
    pub slices: [f32; 2],
}

impl CaloTower {
    pub fn new(edges: [f32; 4]) -> Self {
        Self {
            eta_min: edges[0],
            eta_max: edges[1],
            phi_min: edges[2],
            phi_max: edges[3],
            slices: [0.0; 2],
        }
    }

    pub fn edges(&self) -> [f32; 4] {
        [self.eta_min, self.eta_max, self.phi_min, self.phi_max]
    }

    pub fn eta_center(&self) -> f32 {
        0.5 * (self.eta_min + self.eta_max)
    }

    pub fn phi_center(&self) -> f32 {
        0.5 * (self.phi_min + self.phi_max)
    }

    pub fn total(&self) -> f32 {
        self.slices.iter().sum()
    }
}

/// Cone from the interaction point to an elliptic base on a cylinder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JetCone {
    pub name: String,
    pub title: String,
    pub line_color: Rgba,
    pub fill_color: Rgba,
    /// Percent, 0 is opaque.
    pub transparency: u8,
    pub cylinder_radius: f32,
    pub cylinder_half_length: f32,
    pub eta: f32,
    pub phi: f32,
    pub delta_eta: f32,
    pub delta_phi: f32,
    pub pickable: bool,
}

impl JetCone {
    pub fn apex(&self) -> Vec3 {
        Vec3::ZERO
    }

    /// Where the cone axis meets the cylinder.
    pub fn axis_point(&self) -> Vec3 {
        self.base_point(self.eta, self.phi)
    }

    /// Point on the cylinder surface in direction (eta, phi).
    pub fn base_point(&self, eta: f32, phi: f32) -> Vec3 {
        let theta = 2.0 * (-eta).exp().atan();
        let dir = Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
        let limit = self.cylinder_radius.atan2(self.cylinder_half_length);

        if theta < limit {
            dir * (self.cylinder_half_length / theta.cos())
        } else if theta > PI - limit {
            dir * (-self.cylinder_half_length / theta.cos())
        } else {
            dir * (self.cylinder_radius / theta.sin())
        }
    }

    /// `segments` points around the elliptic base.
    pub fn base_outline(&self, segments: usize) -> Vec<Vec3> {
        (0..segments)
            .map(|i| {
                let angle = TAU * i as f32 / segments as f32;
                self.base_point(
                    self.eta + self.delta_eta * angle.cos(),
                    self.phi + self.delta_phi * angle.sin(),
                )
            })
            .collect()
    }
}

/// Arrow from `origin` along `vector`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arrow {
    pub name: String,
    pub title: String,
    pub color: Rgba,
    pub origin: Vec3,
    pub vector: Vec3,
    pub tube_radius: f32,
    pub cone_radius: f32,
    pub cone_length: f32,
    pub pickable: bool,
}

impl Arrow {
    pub fn tip(&self) -> Vec3 {
        self.origin + self.vector
    }
}

/// Entry of a generic element list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Primitive {
    Cone(JetCone),
    Arrow(Arrow),
}

impl Primitive {
    pub fn name(&self) -> &str {
        match self {
            Primitive::Cone(c) => &c.name,
            Primitive::Arrow(a) => &a.name,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Primitive::Cone(c) => &c.title,
            Primitive::Arrow(a) => &a.title,
        }
    }
}
