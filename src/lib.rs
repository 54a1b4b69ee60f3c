//! Event display pipeline for Delphes trees.
//!
//! A detector card declares the tree branches; each recognised branch gets a
//! typed container. Every event load resets the containers, reads one entry and
//! converts its records into trajectories, calorimeter cells and primitives.

// Card and branch declarations
pub mod conf;
pub mod branch_spec;

// Event records and their sources
pub mod records;
pub mod event_source;
pub mod event_file;

// Geometry and containers
pub mod geometry;
pub mod pdg;
pub mod color;
pub mod propagator;
pub mod primitives;
pub mod container;
pub mod registry;

// Event cycle
pub mod convert;
pub mod session;
pub mod display;

pub mod cli;
