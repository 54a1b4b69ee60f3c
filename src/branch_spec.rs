//! Branch declarations read from the `TreeWriter::Branch` card parameter.
//!
//! The parameter is a flat list of `(input, name, class)` triples. Each triple
//! becomes either a [`BranchSpec`] (a class the display knows how to draw), an
//! unrecognised declaration (kept so its raw array is still opened), or is
//! dropped entirely when it is an energy-flow collection.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::conf::ConfReader;

/// Card parameter holding the branch triples.
pub const BRANCH_PARAM: &str = "TreeWriter::Branch";

/// Marker identifying energy-flow collections, which are never displayed.
const EFLOW_MARKER: &str = "eflow";

/// Marker identifying generator-level jets.
const GEN_JET_MARKER: &str = "GenJetFinder";

/// Physics class of a branch, as written in the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PhysicsClass {
    Track,
    Tower,
    Jet,
    Electron,
    Photon,
    Muon,
    MissingET,
    GenParticle,
}

impl PhysicsClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhysicsClass::Track => "Track",
            PhysicsClass::Tower => "Tower",
            PhysicsClass::Jet => "Jet",
            PhysicsClass::Electron => "Electron",
            PhysicsClass::Photon => "Photon",
            PhysicsClass::Muon => "Muon",
            PhysicsClass::MissingET => "MissingET",
            PhysicsClass::GenParticle => "GenParticle",
        }
    }

    /// Kind of container a branch of this class is drawn into.
    pub fn derived_kind(&self) -> DerivedKind {
        match self {
            PhysicsClass::Track
            | PhysicsClass::Electron
            | PhysicsClass::Muon
            | PhysicsClass::GenParticle => DerivedKind::Track,
            PhysicsClass::Photon => DerivedKind::Photon,
            PhysicsClass::Tower => DerivedKind::Tower,
            PhysicsClass::Jet => DerivedKind::Jet,
            PhysicsClass::MissingET => DerivedKind::Vector,
        }
    }
}

impl fmt::Display for PhysicsClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhysicsClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Track" => Ok(PhysicsClass::Track),
            "Tower" => Ok(PhysicsClass::Tower),
            "Jet" => Ok(PhysicsClass::Jet),
            "Electron" => Ok(PhysicsClass::Electron),
            "Photon" => Ok(PhysicsClass::Photon),
            "Muon" => Ok(PhysicsClass::Muon),
            "MissingET" => Ok(PhysicsClass::MissingET),
            "GenParticle" => Ok(PhysicsClass::GenParticle),
            other => Err(format!("unknown branch class '{}'", other)),
        }
    }
}

/// Container kind derived from the physics class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedKind {
    Track,
    Tower,
    Jet,
    Vector,
    Photon,
}

impl DerivedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedKind::Track => "track",
            DerivedKind::Tower => "tower",
            DerivedKind::Jet => "jet",
            DerivedKind::Vector => "vector",
            DerivedKind::Photon => "photon",
        }
    }
}

impl fmt::Display for DerivedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A branch the display knows how to draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchSpec {
    pub input_tag: String,
    pub output_name: String,
    pub class: PhysicsClass,
    pub kind: DerivedKind,
}

impl BranchSpec {
    pub fn new(input_tag: impl Into<String>, output_name: impl Into<String>, class: PhysicsClass) -> Self {
        Self {
            input_tag: input_tag.into(),
            output_name: output_name.into(),
            class,
            kind: class.derived_kind(),
        }
    }

    /// Generator-level jets are registered but not drawn unless toggled on.
    pub fn is_gen_jet(&self) -> bool {
        self.class == PhysicsClass::Jet && self.input_tag.contains(GEN_JET_MARKER)
    }
}

/// One parsed branch declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchDecl {
    /// A branch with a drawable class.
    Spec(BranchSpec),
    /// A branch whose class has no converter. Its array is still opened.
    Unrecognized {
        input_tag: String,
        output_name: String,
        class_name: String,
    },
}

impl BranchDecl {
    /// Output (tree branch) name of the declaration.
    pub fn output_name(&self) -> &str {
        match self {
            BranchDecl::Spec(spec) => &spec.output_name,
            BranchDecl::Unrecognized { output_name, .. } => output_name,
        }
    }
}

fn is_eflow(input_tag: &str, output_name: &str) -> bool {
    input_tag.to_ascii_lowercase().contains(EFLOW_MARKER)
        || output_name.to_ascii_lowercase().contains(EFLOW_MARKER)
}

/// Turn one triple into a declaration. Energy-flow tracks and towers yield `None`.
pub fn parse_triple(input_tag: &str, output_name: &str, class_name: &str) -> Option<BranchDecl> {
    match class_name.parse::<PhysicsClass>() {
        Ok(class) => {
            let filtered = matches!(class, PhysicsClass::Track | PhysicsClass::Tower)
                && is_eflow(input_tag, output_name);
            if filtered {
                log::debug!("Skipping energy-flow branch {} ({})", output_name, input_tag);
                return None;
            }
            Some(BranchDecl::Spec(BranchSpec::new(input_tag, output_name, class)))
        }
        Err(_) => {
            log::debug!(
                "Branch {} has class {} which is not displayed",
                output_name,
                class_name
            );
            Some(BranchDecl::Unrecognized {
                input_tag: input_tag.to_string(),
                output_name: output_name.to_string(),
                class_name: class_name.to_string(),
            })
        }
    }
}

/// Read every branch declaration from the card, in declaration order.
pub fn parse_branches(conf: &ConfReader) -> Vec<BranchDecl> {
    let words = conf.get_strings(BRANCH_PARAM);
    let chunks = words.chunks_exact(3);
    if !chunks.remainder().is_empty() {
        log::warn!(
            "{} has {} trailing value(s) that do not form a branch triple: {:?}",
            BRANCH_PARAM,
            chunks.remainder().len(),
            chunks.remainder()
        );
    }

    chunks
        .filter_map(|triple| parse_triple(&triple[0], &triple[1], &triple[2]))
        .collect()
}
