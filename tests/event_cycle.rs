//! Drive a full session from a card and an event file on disk.
//!
//! Run with: cargo test --test event_cycle

use std::fs;
use std::path::Path;

use evdisplay::branch_spec::PhysicsClass;
use evdisplay::conf::ConfReader;
use evdisplay::container::BranchContainer;
use evdisplay::display::{ProjectedScene, ProjectionView, ShapeKind};
use evdisplay::event_file::EventFile;
use evdisplay::geometry::DetectorGeometry;
use evdisplay::primitives::Primitive;
use evdisplay::session::{EventState, LoadError, Session};
use tempfile::TempDir;

const CARD: &str = r#"
set ExecutionPath {
  ParticlePropagator
  Calorimeter
  TreeWriter
}

module ParticlePropagator ParticlePropagator {
  set InputArray Delphes/stableParticles
  set Radius 1.0
  set HalfLength 2.5
  set Bz 2.0
}

module TreeWriter TreeWriter {
  add Branch Delphes/allParticles Particle GenParticle
  add Branch TrackMerger/tracks Track Track
  add Branch Calorimeter/towers Tower Tower
  add Branch Calorimeter/eflowTracks EFlowTrack Track
  add Branch Calorimeter/eflowTowers EFlowTower Tower
  add Branch GenJetFinder/jets GenJet Jet
  add Branch UniqueObjectFinder/jets Jet Jet
  add Branch UniqueObjectFinder/electrons Electron Electron
  add Branch UniqueObjectFinder/photons Photon Photon
  add Branch MuonIsolation/muons Muon Muon
  add Branch MissingET/momentum MissingET MissingET
  add Branch ScalarHT/energy ScalarHT ScalarHT
}
"#;

const EVENTS: &str = r#"
{ "entries": [
  {
    "Particle": [{"PID": 211, "Status": 1, "Charge": 1, "E": 5.0, "Px": 3.0, "Py": 4.0, "Pz": 0.0}],
    "Track": [
      {"PID": 211, "Charge": 1, "PT": 4.0, "Eta": 0.2, "Phi": 0.3},
      {"PID": -211, "Charge": -1, "PT": 1.5, "Eta": -0.4, "Phi": 2.0}
    ],
    "Tower": [
      {"ET": 3.0, "Eem": 2.0, "Ehad": 1.0, "Edges": [0.0, 0.087, 0.0, 0.087]},
      {"ET": 1.0, "Eem": 0.5, "Ehad": 0.5, "Edges": [0.0, 0.087, 0.0, 0.087]}
    ],
    "EFlowTrack": [{"PID": 211, "Charge": 1, "PT": 4.0, "Eta": 0.2, "Phi": 0.3}],
    "GenJet": [{"PT": 40.0, "Eta": 0.1, "Phi": 1.0, "Mass": 5.0, "DeltaEta": 0.3, "DeltaPhi": 0.3}],
    "Jet": [{"PT": 38.0, "Eta": 0.1, "Phi": 1.0, "Mass": 4.0, "DeltaEta": 0.3, "DeltaPhi": 0.3}],
    "Electron": [{"PT": 20.0, "Eta": 1.0, "Phi": -1.0, "Charge": -1}],
    "Photon": [{"PT": 15.0, "Eta": 0.0, "Phi": 3.0, "E": 15.0}],
    "Muon": [{"PT": 25.0, "Eta": -1.2, "Phi": 0.5, "Charge": 1}],
    "MissingET": [{"MET": 25.0, "Eta": 0.0, "Phi": 0.0}],
    "ScalarHT": [{"HT": 120.0}]
  },
  {
    "Track": [],
    "MissingET": [{"MET": 10.0, "Phi": 1.5}]
  }
] }
"#;

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn open() -> (TempDir, Session<EventFile, ProjectedScene>) {
    let dir = TempDir::new().unwrap();
    let card = write(dir.path(), "delphes_card.tcl", CARD);
    let events = write(dir.path(), "events.json", EVENTS);

    let conf = ConfReader::read_file(&card).unwrap();
    let geometry = DetectorGeometry::from_conf(&conf);
    let source = EventFile::open(&events).unwrap();
    let session = Session::from_conf(&conf, source, ProjectedScene::new(geometry.calo_radius()));
    (dir, session)
}

#[test]
fn test_registry_follows_card_order() {
    let (_dir, session) = open();
    let names: Vec<_> = session.registry().branches().iter().map(|b| b.name()).collect();
    assert_eq!(
        names,
        ["Particle", "Track", "Tower", "GenJet", "Jet", "Electron", "Photon", "Muon", "MissingET"]
    );
    assert_eq!(session.registry().passive().len(), 1);
    assert_eq!(session.registry().passive()[0].class_name, "ScalarHT");
    assert_eq!(session.display().branches.len(), 9);
    assert_eq!(session.display().lego.as_ref().map(|l| l.branch.as_str()), Some("Tower"));
    assert_eq!(session.event_count(), 2);
}

#[test]
fn test_first_event() {
    let (_dir, mut session) = open();
    let report = session.load_event(0).unwrap();
    assert_eq!(session.state(), EventState::Ready);
    assert_eq!(report.primary.as_deref(), Some("Track"));
    assert_eq!(report.order.last().map(String::as_str), Some("Track"));
    assert_eq!(report.order.len(), 9);

    let registry = session.registry();
    let count = |name: &str| registry.get(name).unwrap().container.len();
    assert_eq!(count("Particle"), 1);
    assert_eq!(count("Track"), 2);
    assert_eq!(count("Tower"), 1);
    assert_eq!(count("Jet"), 1);
    assert_eq!(count("Electron"), 1);
    assert_eq!(count("MissingET"), 1);

    match &registry.get("Tower").unwrap().container {
        BranchContainer::Calo(grid) => assert_eq!(grid.towers[0].slices, [2.5, 1.5]),
        other => panic!("Expected calorimeter grid, got {:?}", other),
    }

    match &registry.get("Electron").unwrap().container {
        BranchContainer::Tracks(list) => {
            assert_eq!(list.tracks[0].pdg, 11);
            assert_eq!(list.tracks[0].name, "Electron [0]");
        }
        other => panic!("Expected track list, got {:?}", other),
    }

    match &registry.get("MissingET").unwrap().container {
        BranchContainer::Elements(list) => match &list.elements[0] {
            Primitive::Arrow(arrow) => assert!((arrow.tip().x - 50.0).abs() < 1e-3),
            other => panic!("Expected arrow, got {:?}", other),
        },
        other => panic!("Expected element list, got {:?}", other),
    }

    let muon = registry.get("Muon").unwrap();
    assert_eq!(muon.class(), PhysicsClass::Muon);
    let BranchContainer::Tracks(list) = &muon.container else {
        panic!("Expected track list");
    };
    let end = list.tracks[0].path.last().unwrap();
    assert!(end.truncate().length() > 100.0 || end.z.abs() > 250.0);

    // Hidden branches (Particle, GenJet) stay out of the projected views.
    let rphi = session.display().view(ProjectionView::RPhi);
    assert_eq!(rphi.shapes_of("Particle").count(), 0);
    assert_eq!(rphi.shapes_of("GenJet").count(), 0);
    assert_eq!(rphi.shapes_of("Track").count(), 2);
    assert_eq!(rphi.shapes_of("Jet").next().map(|s| s.kind), Some(ShapeKind::Cone));
    assert_eq!(session.display().view(ProjectionView::RhoZ).imports, 1);
}

#[test]
fn test_second_event_clears_previous_content() {
    let (_dir, mut session) = open();
    session.load_event(0).unwrap();
    let report = session.next_event().unwrap().unwrap();
    assert_eq!(report.index, 1);
    assert_eq!(report.primary, None);

    let registry = session.registry();
    for branch in registry.branches() {
        let expected = usize::from(branch.name() == "MissingET");
        assert_eq!(branch.container.len(), expected, "branch {}", branch.name());
    }
    let lego = session.display().lego.as_ref().unwrap();
    assert!(lego.bins.is_empty());
    assert_eq!(session.display().view(ProjectionView::RPhi).shapes.len(), 1);
    assert!(session.next_event().unwrap().is_none());
}

#[test]
fn test_out_of_range_keeps_last_event() {
    let (_dir, mut session) = open();
    session.load_event(0).unwrap();
    let snapshot = session.registry().branches().to_vec();
    let scene = session.display().clone();

    assert!(matches!(
        session.load_event(2),
        Err(LoadError::OutOfRange { index: 2, count: 2 })
    ));
    assert_eq!(session.state(), EventState::Error);
    assert_eq!(session.registry().branches(), &snapshot[..]);
    assert_eq!(session.display(), &scene);

    session.load_event(-1).unwrap_err();
    assert_eq!(session.current_event(), Some(0));
    session.load_event(1).unwrap();
    assert_eq!(session.state(), EventState::Ready);
}

#[test]
fn test_missing_files_are_reported() {
    let dir = TempDir::new().unwrap();
    assert!(ConfReader::read_file(dir.path().join("missing.tcl")).is_err());
    assert!(EventFile::open(dir.path().join("missing.json")).is_err());

    let broken = write(dir.path(), "broken.json", "{ not json");
    assert!(EventFile::open(broken).is_err());
}
