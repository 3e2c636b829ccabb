//! Core domain types for herbgraph.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one pipeline run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Rank
// ---------------------------------------------------------------------------

/// The closed set of taxonomic ranks read from an infobox.
///
/// Declaration order runs broadest to narrowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rank {
    Kingdom,
    Clade,
    Order,
    Family,
    Subfamily,
    Tribe,
    Genus,
}

impl Rank {
    /// Every rank, broadest first.
    pub const ALL: [Rank; 7] = [
        Rank::Kingdom,
        Rank::Clade,
        Rank::Order,
        Rank::Family,
        Rank::Subfamily,
        Rank::Tribe,
        Rank::Genus,
    ];

    /// Display label, also used as the graph node label.
    pub fn label(self) -> &'static str {
        match self {
            Rank::Kingdom => "Kingdom",
            Rank::Clade => "Clade",
            Rank::Order => "Order",
            Rank::Family => "Family",
            Rank::Subfamily => "Subfamily",
            Rank::Tribe => "Tribe",
            Rank::Genus => "Genus",
        }
    }

    /// Match an infobox row label such as `"Kingdom:"` against the closed set.
    ///
    /// Returns `None` for anything else (`"Species:"`, `"(unranked):"`, ...).
    pub fn from_label(raw: &str) -> Option<Rank> {
        let label = raw.trim().trim_end_matches(':').trim();
        Rank::ALL
            .into_iter()
            .find(|rank| rank.label().eq_ignore_ascii_case(label))
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// TaxonRank
// ---------------------------------------------------------------------------

/// One link of a taxonomy chain: a rank paired with its normalized taxon name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaxonRank {
    pub rank: Rank,
    pub value: String,
}

impl TaxonRank {
    pub fn new(rank: Rank, value: impl Into<String>) -> Self {
        Self {
            rank,
            value: value.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// HerbRecord
// ---------------------------------------------------------------------------

/// Everything known about one herb, keyed by its taxonomic (latin) name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HerbRecord {
    /// Taxonomic name, the record's identity.
    pub latin: String,
    /// Common name, display case preserved.
    pub name: String,
    /// Absolute link to the herb's detail document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Lower-cased labels of what the herb is used to treat.
    #[serde(default)]
    pub effects: BTreeSet<String>,
    /// Lower-cased labels of known adverse effects.
    #[serde(default)]
    pub adverse_effects: BTreeSet<String>,
    /// Taxonomy chain, broadest rank first, in source document order.
    #[serde(default)]
    pub taxonomy: Vec<TaxonRank>,
}

impl HerbRecord {
    /// Only herbs with a resolved taxonomy chain are written to the graph.
    pub fn is_graph_eligible(&self) -> bool {
        !self.taxonomy.is_empty()
    }

    /// The narrowest known rank, which the herb node is anchored to.
    pub fn narrowest_rank(&self) -> Option<&TaxonRank> {
        self.taxonomy.last()
    }
}

/// Herb records keyed by taxonomic name. Iteration order is stable.
pub type HerbMap = BTreeMap<String, HerbRecord>;
