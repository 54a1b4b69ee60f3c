//! Per-branch containers.
//!
//! A container's parameters (propagator, axes, cylinder) are fixed when it is
//! created; [`BranchContainer::reset`] only drops the event content.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde::Serialize;

use crate::geometry::CaloAxes;
use crate::primitives::{CaloTower, Primitive, Trajectory};
use crate::propagator::TrackPropagator;

/// Number of energy slices per calorimeter cell.
pub const SLICES: usize = 2;
pub const SLICE_EM: usize = 0;
pub const SLICE_HAD: usize = 1;

/// Trajectories of one branch, sharing one propagator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackList {
    propagator: TrackPropagator,
    pub tracks: Vec<Trajectory>,
    pub visible: bool,
}

impl TrackList {
    pub fn new(propagator: TrackPropagator) -> Self {
        Self {
            propagator,
            tracks: Vec::new(),
            visible: true,
        }
    }

    pub fn propagator(&self) -> &TrackPropagator {
        &self.propagator
    }
}

/// Calorimeter cells binned on shared eta/phi axes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaloGrid {
    #[serde(skip)]
    axes: Rc<CaloAxes>,
    /// Cell position by edge bits.
    #[serde(skip)]
    cells: HashMap<[u32; 4], usize>,
    pub towers: Vec<CaloTower>,
    /// Set when content changed since the display last drew it.
    pub changed: bool,
}

/// Summed deposits of one (eta, phi) bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LegoBin {
    pub eta_bin: usize,
    pub phi_bin: usize,
    pub slices: [f32; SLICES],
}

impl CaloGrid {
    pub fn new(axes: Rc<CaloAxes>) -> Self {
        Self {
            axes,
            cells: HashMap::new(),
            towers: Vec::new(),
            changed: false,
        }
    }

    pub fn axes(&self) -> &Rc<CaloAxes> {
        &self.axes
    }

    /// Cell for the given edges, created if no cell has exactly these edges.
    pub fn add_tower(&mut self, edges: [f32; 4]) -> usize {
        // -0.0 and 0.0 share a key
        let key = edges.map(|e| (e + 0.0).to_bits());
        let next = self.towers.len();
        let cell = *self.cells.entry(key).or_insert(next);
        if cell == next {
            self.towers.push(CaloTower::new(edges));
        }
        cell
    }

    /// Drop every cell.
    pub fn clear(&mut self) {
        self.towers.clear();
        self.cells.clear();
    }

    /// Add `value` to one slice of a cell.
    pub fn fill_slice(&mut self, cell: usize, slice: usize, value: f32) {
        self.towers[cell].slices[slice] += value;
    }

    pub fn data_changed(&mut self) {
        self.changed = true;
    }

    /// Deposits summed per axis bin, keyed by the cell centre. Cells outside
    /// the axes are left out.
    pub fn binned(&self) -> Vec<LegoBin> {
        let mut bins: BTreeMap<(usize, usize), [f32; SLICES]> = BTreeMap::new();
        for tower in &self.towers {
            let (Some(eta_bin), Some(phi_bin)) = (
                self.axes.eta.find_bin(tower.eta_center()),
                self.axes.phi.find_bin(tower.phi_center()),
            ) else {
                continue;
            };
            let sum = bins.entry((eta_bin, phi_bin)).or_default();
            for (acc, v) in sum.iter_mut().zip(tower.slices) {
                *acc += v;
            }
        }
        bins.into_iter()
            .map(|((eta_bin, phi_bin), slices)| LegoBin { eta_bin, phi_bin, slices })
            .collect()
    }
}

/// Cylinder the element primitives are anchored on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cylinder {
    pub radius: f32,
    pub half_length: f32,
}

/// Independent primitives (jet cones, arrows), rebuilt every event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementList {
    bounds: Cylinder,
    pub elements: Vec<Primitive>,
    pub visible: bool,
}

impl ElementList {
    pub fn new(bounds: Cylinder) -> Self {
        Self {
            bounds,
            elements: Vec::new(),
            visible: true,
        }
    }

    pub fn bounds(&self) -> Cylinder {
        self.bounds
    }
}

/// The container owned by one branch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum BranchContainer {
    Tracks(TrackList),
    Calo(CaloGrid),
    Elements(ElementList),
}

impl BranchContainer {
    /// Drop the event content, keeping the container's parameters.
    pub fn reset(&mut self) {
        match self {
            BranchContainer::Tracks(list) => list.tracks.clear(),
            BranchContainer::Calo(grid) => grid.clear(),
            BranchContainer::Elements(list) => list.elements.clear(),
        }
    }

    /// Number of items currently held.
    pub fn len(&self) -> usize {
        match self {
            BranchContainer::Tracks(list) => list.tracks.len(),
            BranchContainer::Calo(grid) => grid.towers.len(),
            BranchContainer::Elements(list) => list.elements.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_visible(&self) -> bool {
        match self {
            BranchContainer::Tracks(list) => list.visible,
            BranchContainer::Calo(_) => true,
            BranchContainer::Elements(list) => list.visible,
        }
    }

    /// Toggle drawing. Calorimeter grids are always drawn.
    pub fn set_visible(&mut self, visible: bool) {
        match self {
            BranchContainer::Tracks(list) => list.visible = visible,
            BranchContainer::Calo(_) => {}
            BranchContainer::Elements(list) => list.visible = visible,
        }
    }
}
