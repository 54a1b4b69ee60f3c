//! Fixed per-class colours (RGBA).

use crate::branch_spec::{BranchSpec, PhysicsClass};

pub type Rgba = [f32; 4];

pub const BLACK: Rgba = [0.0, 0.0, 0.0, 1.0];
pub const BLUE: Rgba = [0.0, 0.0, 1.0, 1.0];
pub const RED: Rgba = [1.0, 0.0, 0.0, 1.0];
pub const GREEN: Rgba = [0.0, 1.0, 0.0, 1.0];
pub const YELLOW: Rgba = [1.0, 1.0, 0.0, 1.0];
pub const CYAN: Rgba = [0.0, 1.0, 1.0, 1.0];
pub const VIOLET: Rgba = [0.6, 0.2, 1.0, 1.0];

/// Colour a branch is drawn with.
pub fn for_branch(spec: &BranchSpec) -> Rgba {
    match spec.class {
        PhysicsClass::Track => BLUE,
        PhysicsClass::Electron => RED,
        PhysicsClass::Muon => GREEN,
        PhysicsClass::Photon => YELLOW,
        PhysicsClass::Jet if spec.is_gen_jet() => CYAN,
        PhysicsClass::Jet => YELLOW,
        PhysicsClass::MissingET => VIOLET,
        PhysicsClass::GenParticle => CYAN,
        PhysicsClass::Tower => BLACK,
    }
}
