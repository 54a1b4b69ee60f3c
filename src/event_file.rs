//! JSON event file.
//!
//! An event file is a list of entries, each mapping branch names to arrays of
//! records with Delphes field names:
//!
//! ```json
//! { "entries": [
//!     { "Track": [{"PID": 211, "Charge": 1, "PT": 3.2, "Eta": 0.4, "Phi": 1.1}],
//!       "MissingET": [{"MET": 25.0, "Phi": 0.3}] }
//! ] }
//! ```
//!
//! A bare top-level array of entries is accepted as well. Branches absent from
//! an entry read as empty.

use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::event_source::{BranchHandle, EventSource, ReadError, RecordArray};
use crate::records::{Electron, GenParticle, Jet, MissingEt, Muon, Photon, Tower, Track};

/// One entry: branch name to raw JSON records.
pub type Entry = Map<String, Value>;

#[derive(Deserialize)]
#[serde(untagged)]
enum EventFileDoc {
    Wrapped { entries: Vec<Entry> },
    Bare(Vec<Entry>),
}

#[derive(Debug, Clone)]
struct OpenBranch {
    name: String,
    class_name: String,
}

/// Event source backed by an in-memory JSON document.
#[derive(Debug, Default)]
pub struct EventFile {
    entries: Vec<Entry>,
    branches: Vec<OpenBranch>,
    current: Vec<RecordArray>,
    current_index: Option<usize>,
}

impl EventFile {
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            ..Default::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ReadError> {
        let doc: EventFileDoc = serde_json::from_str(text)?;
        let entries = match doc {
            EventFileDoc::Wrapped { entries } | EventFileDoc::Bare(entries) => entries,
        };
        Ok(Self::from_entries(entries))
    }

    /// Open an event file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ReadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file = Self::from_json_str(&text)?;
        log::info!("Opened {} with {} entries", path.display(), file.entries.len());
        Ok(file)
    }

    /// Index of the entry currently loaded, if any.
    pub fn current_entry(&self) -> Option<usize> {
        self.current_index
    }
}

fn decode(value: &Value, class_name: &str) -> Result<RecordArray, serde_json::Error> {
    if value.is_null() {
        return Ok(RecordArray::empty_for(class_name));
    }

    Ok(match class_name {
        "Track" => RecordArray::Tracks(Vec::<Track>::deserialize(value)?),
        "Tower" => RecordArray::Towers(Vec::<Tower>::deserialize(value)?),
        "Jet" => RecordArray::Jets(Vec::<Jet>::deserialize(value)?),
        "Electron" => RecordArray::Electrons(Vec::<Electron>::deserialize(value)?),
        "Muon" => RecordArray::Muons(Vec::<Muon>::deserialize(value)?),
        "Photon" => RecordArray::Photons(Vec::<Photon>::deserialize(value)?),
        "MissingET" => RecordArray::MissingEt(Vec::<MissingEt>::deserialize(value)?),
        "GenParticle" => RecordArray::GenParticles(Vec::<GenParticle>::deserialize(value)?),
        _ => RecordArray::Opaque(value.as_array().map_or(0, Vec::len)),
    })
}

impl EventSource for EventFile {
    fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn use_branch(&mut self, name: &str, class_name: &str) -> BranchHandle {
        if let Some(pos) = self.branches.iter().position(|b| b.name == name) {
            return BranchHandle(pos);
        }
        self.branches.push(OpenBranch {
            name: name.to_string(),
            class_name: class_name.to_string(),
        });
        self.current.push(RecordArray::empty_for(class_name));
        BranchHandle(self.branches.len() - 1)
    }

    fn read_entry(&mut self, index: usize) -> Result<(), ReadError> {
        let entry = self.entries.get(index).ok_or(ReadError::NoSuchEntry {
            index,
            count: self.entries.len(),
        })?;

        let mut loaded = Vec::with_capacity(self.branches.len());
        for branch in &self.branches {
            let records = match entry.get(&branch.name) {
                Some(value) => decode(value, &branch.class_name).map_err(|source| ReadError::BadBranch {
                    index,
                    branch: branch.name.clone(),
                    class: branch.class_name.clone(),
                    source,
                })?,
                None => RecordArray::empty_for(&branch.class_name),
            };
            loaded.push(records);
        }

        self.current = loaded;
        self.current_index = Some(index);
        Ok(())
    }

    fn records(&self, handle: BranchHandle) -> &RecordArray {
        &self.current[handle.0]
    }
}
