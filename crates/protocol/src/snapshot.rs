use crate::graph::Relationship;
use crate::layout::GraphLayout;
use crate::lenient;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Everything the team has authored, as supplied by the form layer on every
/// change. Read-only from the engine's point of view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StatementSnapshot {
    #[serde(deserialize_with = "lenient::text")]
    pub purpose: String,
    #[serde(deserialize_with = "lenient::text")]
    pub vision: String,
    #[serde(deserialize_with = "lenient::text")]
    pub mission: String,
    #[serde(deserialize_with = "lenient::text")]
    pub strategy: String,
    #[serde(deserialize_with = "lenient::seq")]
    pub values: Vec<ValueRecord>,
    #[serde(deserialize_with = "lenient::seq")]
    pub principles: Vec<StatementRecord>,
    #[serde(deserialize_with = "lenient::seq")]
    pub behaviors: Vec<StatementRecord>,
    #[serde(deserialize_with = "lenient::seq")]
    pub goals: Vec<GoalRecord>,
    #[serde(deserialize_with = "lenient::seq")]
    pub roles: Vec<RoleRecord>,
    #[serde(deserialize_with = "lenient::seq")]
    pub people: Vec<PersonRecord>,

    /// Durable relationship list: user-drawn edges and saved suggestions.
    #[serde(deserialize_with = "lenient::seq")]
    pub relationships: Vec<Relationship>,

    /// Durable node positions, written only by explicit save-layout actions.
    #[serde(deserialize_with = "lenient::or_default")]
    pub layout: GraphLayout,
}

impl StatementSnapshot {
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.purpose.trim().is_empty()
            && self.vision.trim().is_empty()
            && self.mission.trim().is_empty()
            && self.strategy.trim().is_empty()
            && self.values.is_empty()
            && self.principles.is_empty()
            && self.behaviors.is_empty()
            && self.goals.is_empty()
            && self.roles.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ValueRecord {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl ValueRecord {
    /// Name and description joined, the text concept tagging runs over.
    #[must_use]
    pub fn full_text(&self) -> String {
        let name = self.name.trim();
        let description = self.description.trim();
        match (name.is_empty(), description.is_empty()) {
            (false, false) => format!("{name}: {description}"),
            (false, true) => name.to_string(),
            (true, _) => description.to_string(),
        }
    }
}

/// A principle or behavior. `source_value_ids` names the values it derives
/// from (record ids, not node ids).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct StatementRecord {
    pub id: String,
    pub text: String,
    #[serde(deserialize_with = "lenient::seq")]
    pub source_value_ids: Vec<String>,
}

/// Goals were historically plain strings identified by position. Both shapes
/// are accepted; tracked goals keep their id across reorders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum GoalRecord {
    Tracked {
        #[serde(default)]
        id: String,
        text: String,
    },
    Legacy(String),
}

impl GoalRecord {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Tracked { text, .. } => text,
            Self::Legacy(text) => text,
        }
    }

    #[must_use]
    pub fn stable_id(&self) -> Option<&str> {
        match self {
            Self::Tracked { id, .. } if !id.trim().is_empty() => Some(id),
            _ => None,
        }
    }

    pub fn set_text(&mut self, value: String) {
        match self {
            Self::Tracked { text, .. } => *text = value,
            Self::Legacy(text) => *text = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RoleRecord {
    Tracked {
        #[serde(default)]
        id: String,
        title: String,
        #[serde(default)]
        description: String,
    },
    Legacy(String),
}

impl RoleRecord {
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Tracked { title, .. } => title,
            Self::Legacy(title) => title,
        }
    }

    #[must_use]
    pub fn stable_id(&self) -> Option<&str> {
        match self {
            Self::Tracked { id, .. } if !id.trim().is_empty() => Some(id),
            _ => None,
        }
    }

    pub fn set_title(&mut self, value: String) {
        match self {
            Self::Tracked { title, .. } => *title = value,
            Self::Legacy(title) => *title = value,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PersonRecord {
    pub id: String,
    pub name: String,
    pub role_id: Option<String>,
}
