//! Contract between the display pipeline and whatever supplies event records.

use thiserror::Error;

use crate::records::{Electron, GenParticle, Jet, MissingEt, Muon, Photon, Tower, Track};

/// Handle to a branch opened with [`EventSource::use_branch`].
///
/// The handle stays valid for the life of the source; the records it points
/// to are replaced every time a new entry is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchHandle(pub usize);

/// Records of one branch for the current entry.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordArray {
    Tracks(Vec<Track>),
    Towers(Vec<Tower>),
    Jets(Vec<Jet>),
    Electrons(Vec<Electron>),
    Muons(Vec<Muon>),
    Photons(Vec<Photon>),
    MissingEt(Vec<MissingEt>),
    GenParticles(Vec<GenParticle>),
    /// A class the display has no converter for; only the record count is kept.
    Opaque(usize),
}

impl RecordArray {
    pub fn len(&self) -> usize {
        match self {
            RecordArray::Tracks(v) => v.len(),
            RecordArray::Towers(v) => v.len(),
            RecordArray::Jets(v) => v.len(),
            RecordArray::Electrons(v) => v.len(),
            RecordArray::Muons(v) => v.len(),
            RecordArray::Photons(v) => v.len(),
            RecordArray::MissingEt(v) => v.len(),
            RecordArray::GenParticles(v) => v.len(),
            RecordArray::Opaque(n) => *n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record class held by the array.
    pub fn class_name(&self) -> &'static str {
        match self {
            RecordArray::Tracks(_) => "Track",
            RecordArray::Towers(_) => "Tower",
            RecordArray::Jets(_) => "Jet",
            RecordArray::Electrons(_) => "Electron",
            RecordArray::Muons(_) => "Muon",
            RecordArray::Photons(_) => "Photon",
            RecordArray::MissingEt(_) => "MissingET",
            RecordArray::GenParticles(_) => "GenParticle",
            RecordArray::Opaque(_) => "opaque",
        }
    }

    /// Empty array for a card class name.
    pub fn empty_for(class_name: &str) -> Self {
        match class_name {
            "Track" => RecordArray::Tracks(Vec::new()),
            "Tower" => RecordArray::Towers(Vec::new()),
            "Jet" => RecordArray::Jets(Vec::new()),
            "Electron" => RecordArray::Electrons(Vec::new()),
            "Muon" => RecordArray::Muons(Vec::new()),
            "Photon" => RecordArray::Photons(Vec::new()),
            "MissingET" => RecordArray::MissingEt(Vec::new()),
            "GenParticle" => RecordArray::GenParticles(Vec::new()),
            _ => RecordArray::Opaque(0),
        }
    }
}

/// Errors raised while opening an event file or reading an entry.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to open event file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("event file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
    #[error("entry {index} does not exist ({count} entries)")]
    NoSuchEntry { index: usize, count: usize },
    #[error("entry {index}: branch {branch} is not a list of {class} records: {source}")]
    BadBranch {
        index: usize,
        branch: String,
        class: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Supplier of per-event records.
pub trait EventSource {
    /// Number of entries available.
    fn entry_count(&self) -> usize;

    /// Open a branch by name. `class_name` is the class declared in the card.
    fn use_branch(&mut self, name: &str, class_name: &str) -> BranchHandle;

    /// Make `index` the current entry, refreshing every opened branch.
    ///
    /// On error the previously loaded entry stays current.
    fn read_entry(&mut self, index: usize) -> Result<(), ReadError>;

    /// Records of an opened branch for the current entry.
    fn records(&self, handle: BranchHandle) -> &RecordArray;
}
