//! Event cycle: reset, read, dispatch and notify, one event at a time.

use serde::Serialize;
use thiserror::Error;

use crate::branch_spec::{parse_branches, BranchDecl, PhysicsClass};
use crate::conf::ConfReader;
use crate::container::BranchContainer;
use crate::convert::convert_branch;
use crate::display::{EventDisplay, ProjectionView};
use crate::event_source::{EventSource, ReadError};
use crate::geometry::DetectorGeometry;
use crate::registry::BranchRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventState {
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("event {index} is out of range ({count} events)")]
    OutOfRange { index: i64, count: usize },
    #[error("failed to read event {index}")]
    Read {
        index: usize,
        #[source]
        source: ReadError,
    },
}

/// Summary of a successful load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub index: usize,
    /// Branch names in conversion order.
    pub order: Vec<String>,
    /// Track branch converted last, if any.
    pub primary: Option<String>,
    /// Items per branch after conversion, in registration order.
    pub counts: Vec<(String, usize)>,
}

/// Owns the registry, the event source, the cursor and the display.
pub struct Session<S: EventSource, D: EventDisplay> {
    registry: BranchRegistry,
    source: S,
    display: D,
    current: Option<usize>,
    state: EventState,
}

impl<S: EventSource, D: EventDisplay> Session<S, D> {
    /// Register every declared branch on `source` and hand them to `display`.
    pub fn new(decls: Vec<BranchDecl>, geometry: &DetectorGeometry, mut source: S, mut display: D) -> Self {
        let registry = BranchRegistry::build(decls, geometry, &mut source);
        display.add_branches(registry.branches());
        Self {
            registry,
            source,
            display,
            current: None,
            state: EventState::Idle,
        }
    }

    /// Session for the branches and geometry of a card.
    pub fn from_conf(conf: &ConfReader, source: S, display: D) -> Self {
        let geometry = DetectorGeometry::from_conf(conf);
        Self::new(parse_branches(conf), &geometry, source, display)
    }

    pub fn registry(&self) -> &BranchRegistry {
        &self.registry
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn state(&self) -> EventState {
        self.state
    }

    /// Index of the event currently shown.
    pub fn current_event(&self) -> Option<usize> {
        self.current
    }

    pub fn event_count(&self) -> usize {
        self.source.entry_count()
    }

    /// The first `Track` branch with records in the entry just read.
    fn primary_branch(&self) -> Option<usize> {
        self.registry
            .branches()
            .iter()
            .position(|b| b.class() == PhysicsClass::Track && !self.source.records(b.handle).is_empty())
    }

    /// Registry positions in conversion order for the entry just read.
    ///
    /// The primary track branch is held back and converted last; everything
    /// else keeps registration order.
    pub fn dispatch_plan(&self) -> Vec<usize> {
        let primary = self.primary_branch();
        let mut order: Vec<usize> = (0..self.registry.len()).filter(|&i| Some(i) != primary).collect();
        order.extend(primary);
        order
    }

    /// Load and display event `index`.
    ///
    /// An out-of-range index leaves every container and the display as they
    /// were. A read failure happens after the reset, so the containers are left
    /// empty while the display keeps the previous event.
    pub fn load_event(&mut self, index: i64) -> Result<LoadReport, LoadError> {
        let count = self.source.entry_count();
        let Some(entry) = usize::try_from(index).ok().filter(|&i| i < count) else {
            self.state = EventState::Error;
            log::warn!("Event {} is out of range ({} events)", index, count);
            return Err(LoadError::OutOfRange { index, count });
        };

        self.state = EventState::Loading;
        self.registry.reset();
        if let Err(source) = self.source.read_entry(entry) {
            self.state = EventState::Error;
            log::warn!("Failed to read event {}: {}", entry, source);
            return Err(LoadError::Read { index: entry, source });
        }

        let order = self.dispatch_plan();
        let primary = self
            .primary_branch()
            .map(|i| self.registry.branches()[i].name().to_string());

        for &i in &order {
            let element = &mut self.registry.branches_mut()[i];
            let records = self.source.records(element.handle);
            convert_branch(element, records);
            log::debug!("Converted {} items into {}", element.container.len(), element.name());
        }

        self.current = Some(entry);
        self.state = EventState::Ready;
        for view in ProjectionView::ALL {
            self.display.import_event(view, self.registry.branches());
        }
        for element in self.registry.branches_mut() {
            if let BranchContainer::Calo(grid) = &mut element.container {
                grid.changed = false;
            }
        }

        let branches = self.registry.branches();
        log::info!("Loaded event {} of {}", entry + 1, count);
        Ok(LoadReport {
            index: entry,
            order: order.iter().map(|&i| branches[i].name().to_string()).collect(),
            primary,
            counts: branches
                .iter()
                .map(|b| (b.name().to_string(), b.container.len()))
                .collect(),
        })
    }

    /// Load the next event, or the first one if none is loaded yet. Returns
    /// `None` when already at the last event.
    pub fn next_event(&mut self) -> Result<Option<LoadReport>, LoadError> {
        let next = match self.current {
            None => 0,
            Some(i) if i + 1 >= self.event_count() => {
                log::info!("Already at last event");
                return Ok(None);
            }
            Some(i) => i + 1,
        };
        self.load_event(next as i64).map(Some)
    }

    /// Load the previous event. Returns `None` when already at the first event.
    pub fn previous_event(&mut self) -> Result<Option<LoadReport>, LoadError> {
        match self.current {
            Some(i) if i > 0 => self.load_event(i as i64 - 1).map(Some),
            _ => {
                log::info!("Already at first event");
                Ok(None)
            }
        }
    }
}
