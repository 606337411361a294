//! Model provider groups as configured in the model settings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A configured group of models sharing one provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelGroup {
    pub model_provider: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModelGroup {
    pub fn new(model_provider: impl Into<String>) -> Self {
        Self {
            model_provider: model_provider.into(),
            extra: Map::new(),
        }
    }
}

/// Group filter; `None` fields match anything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupFilter {
    pub model_provider: Option<String>,
}

impl GroupFilter {
    pub fn provider(name: impl Into<String>) -> Self {
        Self {
            model_provider: Some(name.into()),
        }
    }

    pub fn matches(&self, group: &ModelGroup) -> bool {
        self.model_provider
            .as_deref()
            .map_or(true, |p| p == group.model_provider)
    }
}

/// Return the groups matching `filter`, in their configured order.
pub fn query_group<'a>(filter: &GroupFilter, groups: &'a [ModelGroup]) -> Vec<&'a ModelGroup> {
    groups.iter().filter(|g| filter.matches(g)).collect()
}
