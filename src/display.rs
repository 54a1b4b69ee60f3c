//! Projected event views fed by the session after every load.
//!
//! The 3D containers live in the registry; a display only receives them
//! through [`EventDisplay`]. [`ProjectedScene`] keeps two flattened views
//! (transverse and longitudinal) plus the calorimeter lego.

use glam::{Vec2, Vec3};
use serde::Serialize;

use crate::color::Rgba;
use crate::container::{BranchContainer, CaloGrid, LegoBin};
use crate::primitives::{CaloTower, Primitive};
use crate::registry::BranchElement;

/// Radial length of a calorimeter bar per GeV.
const TOWER_SCALE: f32 = 2.0;

/// Points around a jet cone base.
const CONE_SEGMENTS: usize = 24;

/// Supported 2D projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProjectionView {
    /// Transverse plane, (x, y).
    RPhi,
    /// Longitudinal plane, (z, rho) with rho signed by the side of the y axis.
    RhoZ,
}

impl ProjectionView {
    pub const ALL: [ProjectionView; 2] = [ProjectionView::RPhi, ProjectionView::RhoZ];

    pub fn project(self, p: Vec3) -> Vec2 {
        match self {
            ProjectionView::RPhi => p.truncate(),
            ProjectionView::RhoZ => {
                let rho = p.truncate().length();
                Vec2::new(p.z, if p.y < 0.0 { -rho } else { rho })
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProjectionView::RPhi => "RPhi",
            ProjectionView::RhoZ => "RhoZ",
        }
    }
}

/// Receiver of the registered branches.
pub trait EventDisplay {
    /// Called once, with the branches in registration order.
    fn add_branches(&mut self, branches: &[BranchElement]);

    /// Replace the event content of `view` with the current container content.
    fn import_event(&mut self, view: ProjectionView, branches: &[BranchElement]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShapeKind {
    Track,
    Tower,
    Cone,
    Arrow,
}

/// A projected polyline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedShape {
    pub branch: String,
    pub name: String,
    pub kind: ShapeKind,
    pub color: Rgba,
    pub points: Vec<Vec2>,
}

/// Content of one projected view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneView {
    pub view: ProjectionView,
    pub shapes: Vec<ProjectedShape>,
    /// Number of events imported so far.
    pub imports: usize,
}

impl SceneView {
    fn new(view: ProjectionView) -> Self {
        Self {
            view,
            shapes: Vec::new(),
            imports: 0,
        }
    }

    pub fn shapes_of<'a>(&'a self, branch: &'a str) -> impl Iterator<Item = &'a ProjectedShape> + 'a {
        self.shapes.iter().filter(move |s| s.branch == branch)
    }
}

/// Eta/phi histogram of calorimeter deposits.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Lego {
    pub branch: String,
    pub eta_bins: usize,
    pub phi_bins: usize,
    pub bins: Vec<LegoBin>,
}

impl Lego {
    fn fill(&mut self, grid: &CaloGrid) {
        self.eta_bins = grid.axes().eta.bins();
        self.phi_bins = grid.axes().phi.bins();
        self.bins = grid.binned();
    }

    /// Summed deposits over all bins.
    pub fn total(&self) -> f32 {
        self.bins.iter().flat_map(|b| b.slices).sum()
    }
}

/// In-memory projected display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedScene {
    /// Radius the calorimeter bars start from.
    calo_radius: f32,
    pub branches: Vec<String>,
    pub rphi: SceneView,
    pub rhoz: SceneView,
    pub lego: Option<Lego>,
}

impl ProjectedScene {
    pub fn new(calo_radius: f32) -> Self {
        Self {
            calo_radius,
            branches: Vec::new(),
            rphi: SceneView::new(ProjectionView::RPhi),
            rhoz: SceneView::new(ProjectionView::RhoZ),
            lego: None,
        }
    }

    pub fn view(&self, view: ProjectionView) -> &SceneView {
        match view {
            ProjectionView::RPhi => &self.rphi,
            ProjectionView::RhoZ => &self.rhoz,
        }
    }

    fn view_mut(&mut self, view: ProjectionView) -> &mut SceneView {
        match view {
            ProjectionView::RPhi => &mut self.rphi,
            ProjectionView::RhoZ => &mut self.rhoz,
        }
    }

    fn tower_bar(&self, view: ProjectionView, tower: &CaloTower) -> Vec<Vec2> {
        let phi = tower.phi_center();
        let theta = 2.0 * (-tower.eta_center()).exp().atan();
        let dir = Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos());
        let inner = self.calo_radius;
        let outer = inner + TOWER_SCALE * tower.total();
        vec![view.project(dir * inner), view.project(dir * outer)]
    }

    fn project_branch(&self, view: ProjectionView, branch: &BranchElement, out: &mut Vec<ProjectedShape>) {
        let shape = |name: &str, kind, points| ProjectedShape {
            branch: branch.name().to_string(),
            name: name.to_string(),
            kind,
            color: branch.color,
            points,
        };

        match &branch.container {
            BranchContainer::Tracks(list) => {
                for track in &list.tracks {
                    let points = track.path.iter().map(|p| view.project(*p)).collect();
                    out.push(shape(&track.name, ShapeKind::Track, points));
                }
            }
            BranchContainer::Calo(grid) => {
                for (i, tower) in grid.towers.iter().enumerate() {
                    let name = format!("tower [{}]", i);
                    out.push(shape(&name, ShapeKind::Tower, self.tower_bar(view, tower)));
                }
            }
            BranchContainer::Elements(list) => {
                for element in &list.elements {
                    let (kind, points) = match element {
                        Primitive::Cone(cone) => {
                            let apex = view.project(cone.apex());
                            let mut points = vec![apex];
                            points.extend(cone.base_outline(CONE_SEGMENTS).into_iter().map(|p| view.project(p)));
                            points.push(apex);
                            (ShapeKind::Cone, points)
                        }
                        Primitive::Arrow(arrow) => (
                            ShapeKind::Arrow,
                            vec![view.project(arrow.origin), view.project(arrow.tip())],
                        ),
                    };
                    out.push(shape(element.name(), kind, points));
                }
            }
        }
    }
}

impl EventDisplay for ProjectedScene {
    fn add_branches(&mut self, branches: &[BranchElement]) {
        self.branches = branches.iter().map(|b| b.name().to_string()).collect();
        self.lego = branches
            .iter()
            .find(|b| matches!(b.container, BranchContainer::Calo(_)))
            .map(|b| Lego {
                branch: b.name().to_string(),
                ..Default::default()
            });
        log::info!(
            "Display attached to {} branches{}",
            self.branches.len(),
            self.lego
                .as_ref()
                .map(|l| format!(", lego from {}", l.branch))
                .unwrap_or_default()
        );
    }

    fn import_event(&mut self, view: ProjectionView, branches: &[BranchElement]) {
        let mut shapes = Vec::new();
        for branch in branches.iter().filter(|b| b.container.is_visible()) {
            self.project_branch(view, branch, &mut shapes);
        }

        if let Some(lego) = self.lego.as_mut() {
            let grid = branches.iter().find_map(|b| match &b.container {
                BranchContainer::Calo(grid) if b.name() == lego.branch => Some(grid),
                _ => None,
            });
            if let Some(grid) = grid {
                lego.fill(grid);
            }
        }

        let scene = self.view_mut(view);
        scene.shapes = shapes;
        scene.imports += 1;
        log::debug!("{} view holds {} shapes", view.name(), scene.shapes.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch_spec::{BranchSpec, PhysicsClass};
    use crate::container::{SLICE_EM, SLICE_HAD};
    use crate::convert::convert_branch;
    use crate::event_source::{BranchHandle, RecordArray};
    use crate::geometry::DetectorGeometry;
    use crate::records::{MissingEt, Track};
    use crate::registry::register;

    fn branch(name: &str, class: PhysicsClass) -> BranchElement {
        register(
            BranchSpec::new("in", name, class),
            &DetectorGeometry::new(100.0, 200.0, 2.0),
            BranchHandle(0),
        )
    }

    #[test]
    fn test_projections() {
        let p = Vec3::new(3.0, -4.0, 7.0);
        assert_eq!(ProjectionView::RPhi.project(p), Vec2::new(3.0, -4.0));
        assert_eq!(ProjectionView::RhoZ.project(p), Vec2::new(7.0, -5.0));
        assert_eq!(ProjectionView::RhoZ.project(Vec3::new(0.0, 2.0, 1.0)), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_import_replaces_previous_content() {
        let mut met = branch("MissingET", PhysicsClass::MissingET);
        convert_branch(&mut met, &RecordArray::MissingEt(vec![MissingEt { met: 50.0, eta: 0.0, phi: 0.0 }]));

        let mut scene = ProjectedScene::new(110.0);
        scene.add_branches(std::slice::from_ref(&met));
        scene.import_event(ProjectionView::RPhi, std::slice::from_ref(&met));
        assert_eq!(scene.rphi.shapes.len(), 1);
        let arrow = &scene.rphi.shapes[0];
        assert_eq!(arrow.kind, ShapeKind::Arrow);
        assert!((arrow.points[1] - Vec2::new(100.0, 0.0)).length() < 1e-3);

        met.container.reset();
        scene.import_event(ProjectionView::RPhi, std::slice::from_ref(&met));
        assert!(scene.rphi.shapes.is_empty());
        assert_eq!(scene.rphi.imports, 2);
        assert_eq!(scene.rhoz.imports, 0);
    }

    #[test]
    fn test_hidden_branches_are_not_projected() {
        let mut particles = branch("Particle", PhysicsClass::GenParticle);
        let mut tracks = branch("Track", PhysicsClass::Track);
        let track = Track {
            pid: 211,
            charge: 1,
            pt: 5.0,
            ..Default::default()
        };
        convert_branch(&mut tracks, &RecordArray::Tracks(vec![track]));
        convert_branch(
            &mut particles,
            &RecordArray::GenParticles(vec![Default::default()]),
        );
        let branches = [particles, tracks];

        let mut scene = ProjectedScene::new(110.0);
        scene.add_branches(&branches);
        scene.import_event(ProjectionView::RhoZ, &branches);
        assert_eq!(scene.rhoz.shapes.len(), 1);
        assert_eq!(scene.rhoz.shapes_of("Track").count(), 1);
        assert_eq!(scene.rhoz.shapes[0].name, "Track [0]");
    }

    #[test]
    fn test_lego_follows_first_tower_branch() {
        let mut first = branch("Tower", PhysicsClass::Tower);
        let second = branch("OtherTower", PhysicsClass::Tower);
        if let BranchContainer::Calo(grid) = &mut first.container {
            let cell = grid.add_tower([0.0, 0.1, 0.0, 0.1]);
            grid.fill_slice(cell, SLICE_EM, 2.0);
            grid.fill_slice(cell, SLICE_HAD, 1.5);
        }
        let branches = [first, second];

        let mut scene = ProjectedScene::new(110.0);
        scene.add_branches(&branches);
        scene.import_event(ProjectionView::RhoZ, &branches);

        let lego = scene.lego.as_ref().expect("lego attached");
        assert_eq!(lego.branch, "Tower");
        assert_eq!(lego.eta_bins, 100);
        assert_eq!(lego.phi_bins, 72);
        assert_eq!(lego.bins.len(), 1);
        assert!((lego.total() - 3.5).abs() < 1e-6);

        let bar = &scene.rhoz.shapes[0];
        assert_eq!(bar.kind, ShapeKind::Tower);
        assert!((bar.points[0].length() - 110.0).abs() < 1e-3);
        assert!((bar.points[1].length() - bar.points[0].length() - 7.0).abs() < 1e-3);
    }

    #[test]
    fn test_no_lego_without_towers() {
        let mut scene = ProjectedScene::new(110.0);
        scene.add_branches(&[branch("Jet", PhysicsClass::Jet)]);
        assert!(scene.lego.is_none());
        assert_eq!(scene.branches, ["Jet"]);
    }
}
