//! Raw per-event records, one struct per physics class.
//!
//! Field names follow the Delphes tree layout (`PT`, `Eta`, `Phi`, ...) so event
//! files exported from a Delphes tree deserialize directly.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Relativistic four-momentum in GeV.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FourMomentum {
    pub p: Vec3,
    pub e: f32,
}

impl FourMomentum {
    pub fn new(px: f32, py: f32, pz: f32, e: f32) -> Self {
        Self { p: Vec3::new(px, py, pz), e }
    }

    pub fn from_pt_eta_phi_m(pt: f32, eta: f32, phi: f32, mass: f32) -> Self {
        let p = momentum_from_pt_eta_phi(pt, eta, phi);
        let e = (p.length_squared() + mass * mass).sqrt();
        Self { p, e }
    }

    pub fn from_pt_eta_phi_e(pt: f32, eta: f32, phi: f32, e: f32) -> Self {
        Self {
            p: momentum_from_pt_eta_phi(pt, eta, phi),
            e,
        }
    }

    pub fn pt(&self) -> f32 {
        self.p.truncate().length()
    }

    /// Pseudorapidity. Zero for momenta along the beam axis.
    pub fn eta(&self) -> f32 {
        let pt = self.pt();
        if pt == 0.0 {
            return 0.0;
        }
        (self.p.z / pt).asinh()
    }

    pub fn phi(&self) -> f32 {
        self.p.y.atan2(self.p.x)
    }
}

fn momentum_from_pt_eta_phi(pt: f32, eta: f32, phi: f32) -> Vec3 {
    Vec3::new(pt * phi.cos(), pt * phi.sin(), pt * eta.sinh())
}

/// Reconstructed charged track.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Track {
    #[serde(rename = "PID")]
    pub pid: i32,
    pub charge: i32,
    #[serde(rename = "PT")]
    pub pt: f32,
    pub eta: f32,
    pub phi: f32,
    /// Track origin in cm.
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Track {
    pub fn p4(&self) -> FourMomentum {
        FourMomentum::from_pt_eta_phi_m(self.pt, self.eta, self.phi, 0.0)
    }

    pub fn vertex(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Calorimeter tower.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tower {
    #[serde(rename = "ET", default)]
    pub et: f32,
    #[serde(default)]
    pub eta: f32,
    #[serde(default)]
    pub phi: f32,
    #[serde(default)]
    pub e: f32,
    pub eem: f32,
    pub ehad: f32,
    /// Eta min, eta max, phi min, phi max.
    pub edges: [f32; 4],
}

/// Reconstructed jet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Jet {
    #[serde(rename = "PT")]
    pub pt: f32,
    pub eta: f32,
    pub phi: f32,
    #[serde(default)]
    pub mass: f32,
    pub delta_eta: f32,
    pub delta_phi: f32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Electron {
    #[serde(rename = "PT")]
    pub pt: f32,
    pub eta: f32,
    pub phi: f32,
    pub charge: i32,
}

impl Electron {
    pub fn p4(&self) -> FourMomentum {
        FourMomentum::from_pt_eta_phi_m(self.pt, self.eta, self.phi, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Muon {
    #[serde(rename = "PT")]
    pub pt: f32,
    pub eta: f32,
    pub phi: f32,
    pub charge: i32,
}

impl Muon {
    pub fn p4(&self) -> FourMomentum {
        FourMomentum::from_pt_eta_phi_m(self.pt, self.eta, self.phi, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Photon {
    #[serde(rename = "PT")]
    pub pt: f32,
    pub eta: f32,
    pub phi: f32,
    pub e: f32,
}

impl Photon {
    pub fn p4(&self) -> FourMomentum {
        FourMomentum::from_pt_eta_phi_e(self.pt, self.eta, self.phi, self.e)
    }
}

/// Missing transverse energy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MissingEt {
    #[serde(rename = "MET")]
    pub met: f32,
    #[serde(default)]
    pub eta: f32,
    pub phi: f32,
}

/// Generator-level particle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GenParticle {
    #[serde(rename = "PID")]
    pub pid: i32,
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub charge: i32,
    #[serde(default)]
    pub mass: f32,
    pub e: f32,
    pub px: f32,
    pub py: f32,
    pub pz: f32,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl GenParticle {
    pub fn p4(&self) -> FourMomentum {
        FourMomentum::new(self.px, self.py, self.pz, self.e)
    }

    pub fn vertex(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}
