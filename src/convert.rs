//! Record-to-geometry converters, one per container kind.
//!
//! Converters append to a container that the caller has already reset. A
//! branch whose records do not match its container kind means the registry and
//! the dispatcher disagree; that is a bug, and [`convert_branch`] panics.

use glam::Vec3;

use crate::branch_spec::{DerivedKind, PhysicsClass};
use crate::color::Rgba;
use crate::container::{BranchContainer, CaloGrid, ElementList, TrackList, SLICE_EM, SLICE_HAD};
use crate::event_source::RecordArray;
use crate::pdg;
use crate::primitives::{Arrow, JetCone, Primitive, Trajectory};
use crate::records::{FourMomentum, Jet, MissingEt, Tower};
use crate::registry::BranchElement;

/// Jet cones stop this far inside the tracker cylinder.
pub const JET_CYLINDER_INSET: f32 = 10.0;
pub const JET_TRANSPARENCY: u8 = 60;

/// MET value drawn with the length of the tracker radius.
// TODO: derive the reference from the event content or expose it as a setting.
pub const MET_REFERENCE: f32 = 50.0;
const MET_TUBE_RADIUS: f32 = 0.04;
const MET_CONE_RADIUS: f32 = 0.08;
const MET_CONE_LENGTH: f32 = 0.10;

/// Fill a branch's container from its raw records.
pub fn convert_branch(element: &mut BranchElement, records: &RecordArray) {
    let BranchElement {
        spec,
        color,
        container,
        ..
    } = element;

    match (spec.kind, container, records) {
        (DerivedKind::Tower, BranchContainer::Calo(grid), RecordArray::Towers(towers)) => {
            convert_towers(towers, grid)
        }
        (DerivedKind::Track | DerivedKind::Photon, BranchContainer::Tracks(list), records) => {
            convert_tracks(spec.class, records, list, *color)
        }
        (DerivedKind::Jet, BranchContainer::Elements(list), RecordArray::Jets(jets)) => {
            convert_jets(jets, list, *color)
        }
        (DerivedKind::Vector, BranchContainer::Elements(list), RecordArray::MissingEt(met)) => {
            convert_missing_et(met, list, *color)
        }
        (kind, _, records) => panic!(
            "branch {} of kind {} cannot hold {} records",
            spec.output_name,
            kind,
            records.class_name()
        ),
    }
}

/// Add every tower as a calorimeter cell and accumulate its EM/HAD energies.
pub fn convert_towers(towers: &[Tower], grid: &mut CaloGrid) {
    for tower in towers {
        let cell = grid.add_tower(tower.edges);
        grid.fill_slice(cell, SLICE_EM, tower.eem);
        grid.fill_slice(cell, SLICE_HAD, tower.ehad);
    }
    grid.data_changed();
}

/// Particle seed shared by every track-like class.
struct Seed {
    pdg: i32,
    charge: i32,
    momentum: FourMomentum,
    vertex: Vec3,
}

fn species_charge(code: i32) -> i32 {
    pdg::lookup(code).map_or(0, |s| s.charge)
}

fn lepton_seed(base: i32, charge: i32, momentum: FourMomentum) -> Seed {
    let code = pdg::lepton_code(base, charge);
    Seed {
        pdg: code,
        charge: species_charge(code),
        momentum,
        vertex: Vec3::ZERO,
    }
}

fn seeds(class: PhysicsClass, records: &RecordArray) -> Vec<Seed> {
    match (class, records) {
        (PhysicsClass::Track, RecordArray::Tracks(tracks)) => tracks
            .iter()
            .map(|t| Seed {
                pdg: t.pid,
                charge: t.charge,
                momentum: t.p4(),
                vertex: t.vertex(),
            })
            .collect(),
        (PhysicsClass::GenParticle, RecordArray::GenParticles(particles)) => particles
            .iter()
            .map(|p| Seed {
                pdg: p.pid,
                charge: p.charge,
                momentum: p.p4(),
                vertex: p.vertex(),
            })
            .collect(),
        (PhysicsClass::Electron, RecordArray::Electrons(electrons)) => electrons
            .iter()
            .map(|e| lepton_seed(pdg::ELECTRON, e.charge, e.p4()))
            .collect(),
        (PhysicsClass::Muon, RecordArray::Muons(muons)) => muons
            .iter()
            .map(|m| lepton_seed(pdg::MUON, m.charge, m.p4()))
            .collect(),
        (PhysicsClass::Photon, RecordArray::Photons(photons)) => photons
            .iter()
            .map(|p| Seed {
                pdg: pdg::PHOTON,
                charge: 0,
                momentum: p.p4(),
                vertex: Vec3::ZERO,
            })
            .collect(),
        (class, records) => panic!(
            "{} track list cannot be filled from {} records",
            class,
            records.class_name()
        ),
    }
}

fn track_title(seed: &Seed) -> String {
    format!(
        "{}\nq={} pT={:.3} eta={:.3} phi={:.3}\nvertex=({:.2}, {:.2}, {:.2})",
        pdg::name_of(seed.pdg),
        seed.charge,
        seed.momentum.pt(),
        seed.momentum.eta(),
        seed.momentum.phi(),
        seed.vertex.x,
        seed.vertex.y,
        seed.vertex.z
    )
}

/// Build one propagated trajectory per record. Only `Track` and `GenParticle`
/// records carry a start vertex; the others start at the origin.
pub fn convert_tracks(class: PhysicsClass, records: &RecordArray, list: &mut TrackList, color: Rgba) {
    for (counter, seed) in seeds(class, records).into_iter().enumerate() {
        let path = list
            .propagator()
            .propagate(seed.vertex, seed.momentum.p, seed.charge);
        list.tracks.push(Trajectory {
            name: format!("{} [{}]", class, counter),
            title: track_title(&seed),
            pdg: seed.pdg,
            charge: seed.charge,
            momentum: seed.momentum,
            vertex: seed.vertex,
            color,
            path,
        });
    }
}

/// One cone per jet, anchored just inside the tracker cylinder.
pub fn convert_jets(jets: &[Jet], list: &mut ElementList, color: Rgba) {
    let bounds = list.bounds();
    for (counter, jet) in jets.iter().enumerate() {
        list.elements.push(Primitive::Cone(JetCone {
            name: format!("jet [{}]", counter),
            title: format!(
                "jet [{}]: Pt={:.3}, Eta={:.3}, \nPhi={:.3}, M={:.3}",
                counter, jet.pt, jet.eta, jet.phi, jet.mass
            ),
            line_color: color,
            fill_color: color,
            transparency: JET_TRANSPARENCY,
            cylinder_radius: bounds.radius - JET_CYLINDER_INSET,
            cylinder_half_length: bounds.half_length - JET_CYLINDER_INSET,
            eta: jet.eta,
            phi: jet.phi,
            delta_eta: jet.delta_eta,
            delta_phi: jet.delta_phi,
            pickable: true,
        }));
    }
}

/// Arrow in the transverse plane whose length is the tracker radius scaled by
/// MET / [`MET_REFERENCE`].
pub fn convert_missing_et(met: &[MissingEt], list: &mut ElementList, color: Rgba) {
    let radius = list.bounds().radius;
    for m in met {
        let length = radius * m.met / MET_REFERENCE;
        list.elements.push(Primitive::Arrow(Arrow {
            name: "Missing Et".to_string(),
            title: format!("Missing Et ({:.1} GeV)", m.met),
            color,
            origin: Vec3::ZERO,
            vector: Vec3::new(length * m.phi.cos(), length * m.phi.sin(), 0.0),
            tube_radius: MET_TUBE_RADIUS,
            cone_radius: MET_CONE_RADIUS,
            cone_length: MET_CONE_LENGTH,
            pickable: true,
        }));
    }
}
