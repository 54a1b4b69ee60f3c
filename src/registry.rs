//! Branch registry: one typed container per declared branch.

use std::collections::HashSet;

use glam::Vec3;
use serde::Serialize;

use crate::branch_spec::{BranchDecl, BranchSpec, DerivedKind, PhysicsClass};
use crate::color::{self, Rgba};
use crate::container::{BranchContainer, CaloGrid, Cylinder, ElementList, TrackList};
use crate::event_source::{BranchHandle, EventSource};
use crate::geometry::DetectorGeometry;
use crate::propagator::TrackPropagator;

/// A registered branch: its declaration, its container and the handle of its
/// raw records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BranchElement {
    pub spec: BranchSpec,
    pub color: Rgba,
    pub container: BranchContainer,
    #[serde(skip)]
    pub handle: BranchHandle,
}

impl BranchElement {
    pub fn name(&self) -> &str {
        &self.spec.output_name
    }

    pub fn class(&self) -> PhysicsClass {
        self.spec.class
    }

    pub fn kind(&self) -> DerivedKind {
        self.spec.kind
    }
}

/// A branch opened for reading but not displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassiveBranch {
    pub name: String,
    pub class_name: String,
    pub handle: BranchHandle,
}

/// Build the element for one spec.
pub fn register(spec: BranchSpec, geometry: &DetectorGeometry, handle: BranchHandle) -> BranchElement {
    let color = color::for_branch(&spec);
    let solenoid = Vec3::new(0.0, 0.0, -geometry.bz);
    let tracker = |field: Vec3| TrackPropagator::new(field, geometry.tracker_radius, geometry.tracker_half_length);
    let cylinder = Cylinder {
        radius: geometry.tracker_radius,
        half_length: geometry.tracker_half_length,
    };

    let mut container = match spec.class {
        PhysicsClass::Track | PhysicsClass::Electron | PhysicsClass::GenParticle => {
            BranchContainer::Tracks(TrackList::new(tracker(solenoid)))
        }
        PhysicsClass::Photon => BranchContainer::Tracks(TrackList::new(tracker(Vec3::ZERO))),
        PhysicsClass::Muon => BranchContainer::Tracks(TrackList::new(TrackPropagator::new(
            solenoid,
            geometry.detector_radius,
            geometry.detector_half_length,
        ))),
        PhysicsClass::Tower => BranchContainer::Calo(CaloGrid::new(geometry.calo_axes.clone())),
        PhysicsClass::Jet | PhysicsClass::MissingET => BranchContainer::Elements(ElementList::new(cylinder)),
    };

    if spec.class == PhysicsClass::GenParticle || spec.is_gen_jet() {
        container.set_visible(false);
    }

    BranchElement {
        spec,
        color,
        container,
        handle,
    }
}

/// Every registered branch, in declaration order.
#[derive(Debug, Default)]
pub struct BranchRegistry {
    branches: Vec<BranchElement>,
    passive: Vec<PassiveBranch>,
}

impl BranchRegistry {
    /// Register every declaration, opening its raw array on `source`.
    ///
    /// A declaration reusing an output name already registered is skipped.
    pub fn build<S: EventSource + ?Sized>(
        decls: Vec<BranchDecl>,
        geometry: &DetectorGeometry,
        source: &mut S,
    ) -> Self {
        let mut registry = Self::default();
        let mut names = HashSet::new();
        for decl in decls {
            if !names.insert(decl.output_name().to_string()) {
                log::warn!("Skipping duplicate declaration of branch {}", decl.output_name());
                continue;
            }
            match decl {
                BranchDecl::Spec(spec) => {
                    let handle = source.use_branch(&spec.output_name, spec.class.as_str());
                    let element = register(spec, geometry, handle);
                    log::debug!(
                        "Registered branch {} ({}, {})",
                        element.name(),
                        element.class(),
                        element.kind()
                    );
                    registry.branches.push(element);
                }
                BranchDecl::Unrecognized {
                    output_name,
                    class_name,
                    ..
                } => {
                    let handle = source.use_branch(&output_name, &class_name);
                    registry.passive.push(PassiveBranch {
                        name: output_name,
                        class_name,
                        handle,
                    });
                }
            }
        }
        log::info!(
            "Registered {} branches ({} opened but not displayed)",
            registry.branches.len(),
            registry.passive.len()
        );
        registry
    }

    pub fn branches(&self) -> &[BranchElement] {
        &self.branches
    }

    pub fn branches_mut(&mut self) -> &mut [BranchElement] {
        &mut self.branches
    }

    pub fn passive(&self) -> &[PassiveBranch] {
        &self.passive
    }

    pub fn get(&self, name: &str) -> Option<&BranchElement> {
        self.branches.iter().find(|b| b.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut BranchElement> {
        self.branches.iter_mut().find(|b| b.name() == name)
    }

    pub fn len(&self) -> usize {
        self.branches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Empty every container.
    pub fn reset(&mut self) {
        for branch in &mut self.branches {
            branch.container.reset();
        }
    }
}
