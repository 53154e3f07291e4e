use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Discriminator for every synchronizable entity kind. Also stored as
/// `sync_queue.entity_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Assessment,
    Dimension,
    Recommendation,
    DigitalisationGap,
    DigitalisationLevel,
    Cooperation,
    CooperationUser,
    DimensionAssessment,
}

/// A lookup key lifted out of the JSON document into its own indexed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexColumn {
    pub name: &'static str,
    pub integer: bool,
}

const fn text(name: &'static str) -> IndexColumn {
    IndexColumn {
        name,
        integer: false,
    }
}

const fn integer(name: &'static str) -> IndexColumn {
    IndexColumn {
        name,
        integer: true,
    }
}

const ORGANIZATION_SCOPED: &[IndexColumn] = &[text("organization_id")];
const RECOMMENDATION_COLUMNS: &[IndexColumn] = &[
    text("dimension_id"),
    text("organization_id"),
    integer("priority"),
];
const DIMENSION_ASSESSMENT_COLUMNS: &[IndexColumn] =
    &[text("dimension_id"), text("assessment_id")];
const LEVEL_COLUMNS: &[IndexColumn] = &[
    text("dimension_id"),
    text("assessment_id"),
    text("level_type"),
    text("state"),
];
const COOPERATION_USER_COLUMNS: &[IndexColumn] = &[text("cooperation_id")];

/// How a kind's remote collection is fetched during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionFetch {
    /// One list call returns full records.
    List,
    /// The list call returns summaries; each record is fetched by id.
    SummariesThenDetails,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Assessment,
        EntityKind::Dimension,
        EntityKind::Recommendation,
        EntityKind::DigitalisationGap,
        EntityKind::DigitalisationLevel,
        EntityKind::Cooperation,
        EntityKind::CooperationUser,
        EntityKind::DimensionAssessment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Assessment => "assessment",
            EntityKind::Dimension => "dimension",
            EntityKind::Recommendation => "recommendation",
            EntityKind::DigitalisationGap => "digitalisation_gap",
            EntityKind::DigitalisationLevel => "digitalisation_level",
            EntityKind::Cooperation => "cooperation",
            EntityKind::CooperationUser => "cooperation_user",
            EntityKind::DimensionAssessment => "dimension_assessment",
        }
    }

    /// Local store table holding this kind.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Assessment => "assessments",
            EntityKind::Dimension => "dimensions",
            EntityKind::Recommendation => "recommendations",
            EntityKind::DigitalisationGap => "digitalisation_gaps",
            EntityKind::DigitalisationLevel => "digitalisation_levels",
            EntityKind::Cooperation => "cooperations",
            EntityKind::CooperationUser => "cooperation_users",
            EntityKind::DimensionAssessment => "dimension_assessments",
        }
    }

    /// REST collection segment on the remote API.
    pub fn collection_path(&self) -> &'static str {
        match self {
            EntityKind::Assessment => "assessments",
            EntityKind::Dimension => "dimensions",
            EntityKind::Recommendation => "recommendations",
            EntityKind::DigitalisationGap => "digitalisation-gaps",
            EntityKind::DigitalisationLevel => "digitalisation-levels",
            EntityKind::Cooperation => "cooperations",
            EntityKind::CooperationUser => "cooperation-users",
            EntityKind::DimensionAssessment => "dimension-assessments",
        }
    }

    pub fn index_columns(&self) -> &'static [IndexColumn] {
        match self {
            EntityKind::Assessment | EntityKind::Dimension | EntityKind::Cooperation => {
                ORGANIZATION_SCOPED
            }
            EntityKind::Recommendation => RECOMMENDATION_COLUMNS,
            EntityKind::DigitalisationGap | EntityKind::DimensionAssessment => {
                DIMENSION_ASSESSMENT_COLUMNS
            }
            EntityKind::DigitalisationLevel => LEVEL_COLUMNS,
            EntityKind::CooperationUser => COOPERATION_USER_COLUMNS,
        }
    }

    pub fn index_column(&self, name: &str) -> Option<IndexColumn> {
        self.index_columns()
            .iter()
            .copied()
            .find(|column| column.name == name)
    }

    pub fn collection_fetch(&self) -> CollectionFetch {
        match self {
            EntityKind::Assessment => CollectionFetch::SummariesThenDetails,
            _ => CollectionFetch::List,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unknown entity kind: {s}"))
    }
}
