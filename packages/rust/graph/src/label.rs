//! The closed vocabulary of node labels, relationship types, and attribute keys.
//!
//! These are the only strings ever spliced into statement text.

use herbgraph_shared::Rank;
use serde::Serialize;

/// Node label: one per rank, plus herbs and diseases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum NodeLabel {
    Taxon(Rank),
    Herb,
    Disease,
}

impl NodeLabel {
    /// Every label the deduplication pass sweeps.
    pub const ALL: [NodeLabel; 9] = [
        NodeLabel::Taxon(Rank::Kingdom),
        NodeLabel::Taxon(Rank::Clade),
        NodeLabel::Taxon(Rank::Order),
        NodeLabel::Taxon(Rank::Family),
        NodeLabel::Taxon(Rank::Subfamily),
        NodeLabel::Taxon(Rank::Tribe),
        NodeLabel::Taxon(Rank::Genus),
        NodeLabel::Herb,
        NodeLabel::Disease,
    ];

    /// Whether names under this label are written in their dedup-key form
    /// (trimmed, lower-case). Herb names keep the case of the taxonomic name.
    pub fn has_normalized_names(self) -> bool {
        !matches!(self, NodeLabel::Herb)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeLabel::Taxon(rank) => rank.label(),
            NodeLabel::Herb => "Herb",
            NodeLabel::Disease => "Disease",
        }
    }
}

impl std::fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Rank> for NodeLabel {
    fn from(rank: Rank) -> Self {
        NodeLabel::Taxon(rank)
    }
}

/// Relationship type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RelType {
    /// Herb → Disease it treats.
    Cures,
    /// Herb → Disease it can cause.
    Cause,
    /// Narrower taxon → broader taxon, and Herb → its narrowest known taxon.
    IncludedIn,
}

impl RelType {
    pub const ALL: [RelType; 3] = [RelType::Cures, RelType::Cause, RelType::IncludedIn];

    pub fn as_str(self) -> &'static str {
        match self {
            RelType::Cures => "cures",
            RelType::Cause => "cause",
            RelType::IncludedIn => "included_in",
        }
    }
}

impl std::fmt::Display for RelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node property written besides the `name` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum NodeAttr {
    CommonName,
    Link,
}

impl NodeAttr {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeAttr::CommonName => "common_name",
            NodeAttr::Link => "link",
        }
    }
}
