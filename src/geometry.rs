//! Detector parameters consumed by the branch registry.
//!
//! Lengths are in centimetres, the field in tesla.

use std::f32::consts::PI;
use std::rc::Rc;

use serde::Serialize;

use crate::conf::ConfReader;

/// Gap left between consecutive sub-detectors.
const CONTINGENCY: f32 = 10.0;
const CALO_BARREL_THICKNESS: f32 = 50.0;
const CALO_ENDCAP_THICKNESS: f32 = 75.0;
const MUON_SYSTEM_THICKNESS: f32 = 200.0;

/// Bin edges along one calorimeter axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    edges: Vec<f32>,
}

impl Axis {
    /// Axis with explicit, strictly increasing edges.
    pub fn from_edges(edges: Vec<f32>) -> Self {
        debug_assert!(edges.windows(2).all(|w| w[0] < w[1]), "axis edges must increase");
        Self { edges }
    }

    /// Axis with `bins` equal bins between `min` and `max`.
    pub fn uniform(bins: usize, min: f32, max: f32) -> Self {
        let width = (max - min) / bins as f32;
        Self {
            edges: (0..=bins).map(|i| min + width * i as f32).collect(),
        }
    }

    pub fn bins(&self) -> usize {
        self.edges.len().saturating_sub(1)
    }

    pub fn edges(&self) -> &[f32] {
        &self.edges
    }

    /// Bin containing `x`. Bins are half-open, `[low, high)`.
    pub fn find_bin(&self, x: f32) -> Option<usize> {
        let (first, last) = (*self.edges.first()?, *self.edges.last()?);
        if !(first..last).contains(&x) {
            return None;
        }
        Some(self.edges.partition_point(|&edge| edge <= x) - 1)
    }
}

/// Eta/phi binning shared by every calorimeter grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaloAxes {
    pub eta: Axis,
    pub phi: Axis,
}

impl Default for CaloAxes {
    fn default() -> Self {
        Self {
            eta: Axis::uniform(100, -5.0, 5.0),
            phi: Axis::uniform(72, -PI, PI),
        }
    }
}

/// Geometry parameters read once at startup.
#[derive(Debug, Clone)]
pub struct DetectorGeometry {
    pub tracker_radius: f32,
    pub tracker_half_length: f32,
    pub detector_radius: f32,
    pub detector_half_length: f32,
    /// Magnitude of the solenoid field.
    pub bz: f32,
    pub calo_axes: Rc<CaloAxes>,
}

impl DetectorGeometry {
    /// Geometry for a tracker of the given size. The outer envelope adds the
    /// calorimeter and muon system around it.
    pub fn new(tracker_radius: f32, tracker_half_length: f32, bz: f32) -> Self {
        Self {
            tracker_radius,
            tracker_half_length,
            detector_radius: tracker_radius + CONTINGENCY + CALO_BARREL_THICKNESS + CONTINGENCY + MUON_SYSTEM_THICKNESS,
            detector_half_length: tracker_half_length
                + CONTINGENCY
                + CALO_ENDCAP_THICKNESS
                + CONTINGENCY
                + MUON_SYSTEM_THICKNESS,
            bz,
            calo_axes: Rc::new(CaloAxes::default()),
        }
    }

    /// Read the tracker volume and field from the `ParticlePropagator` module
    /// of a card (metres in the card).
    pub fn from_conf(conf: &ConfReader) -> Self {
        let radius = conf.get_f64("ParticlePropagator::Radius", 1.29) * 100.0;
        let half_length = conf.get_f64("ParticlePropagator::HalfLength", 3.0) * 100.0;
        let bz = conf.get_f64("ParticlePropagator::Bz", 3.8);
        Self::new(radius as f32, half_length as f32, bz as f32)
    }

    /// Inner radius of the calorimeter barrel.
    pub fn calo_radius(&self) -> f32 {
        self.tracker_radius + CONTINGENCY
    }

    pub fn with_calo_axes(mut self, axes: CaloAxes) -> Self {
        self.calo_axes = Rc::new(axes);
        self
    }
}

impl Default for DetectorGeometry {
    fn default() -> Self {
        Self::new(129.0, 300.0, 3.8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_axis() {
        let axis = Axis::uniform(4, 0.0, 1.0);
        assert_eq!(axis.bins(), 4);
        assert_eq!(axis.edges(), [0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(axis.find_bin(0.0), Some(0));
        assert_eq!(axis.find_bin(0.3), Some(1));
        assert_eq!(axis.find_bin(0.75), Some(3));
        assert_eq!(axis.find_bin(1.0), None);
        assert_eq!(axis.find_bin(-0.1), None);
    }

    #[test]
    fn test_from_conf_converts_to_cm() {
        let conf = ConfReader::parse_str(
            "module ParticlePropagator ParticlePropagator {\n set Radius 1.0\n set HalfLength 2.5\n set Bz 2.0\n}",
        )
        .unwrap();
        let geom = DetectorGeometry::from_conf(&conf);
        assert_eq!(geom.tracker_radius, 100.0);
        assert_eq!(geom.tracker_half_length, 250.0);
        assert_eq!(geom.bz, 2.0);
        assert!(geom.detector_radius > geom.tracker_radius);
        assert!(geom.detector_half_length > geom.tracker_half_length);
    }

    #[test]
    fn test_defaults_without_card_values() {
        let geom = DetectorGeometry::from_conf(&ConfReader::new());
        assert!((geom.tracker_radius - 129.0).abs() < 1e-3);
        assert!((geom.tracker_half_length - 300.0).abs() < 1e-3);
        assert!((geom.bz - 3.8).abs() < 1e-6);
    }
}
