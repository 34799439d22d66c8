use serde::{Deserialize, Serialize};

use crate::launch::InputItem;

/// A unit of work handed to the group processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingGroup {
    /// Position in processing and merge order.
    pub index: usize,
    /// Stable identifier, derived from the series and first timestamp.
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_key: Option<String>,
    pub items: Vec<InputItem>,
}

impl ProcessingGroup {
    pub(crate) fn start(index: usize, first: InputItem, grouped: bool) -> Self {
        let series_key = if grouped { first.series_key() } else { None };
        let id = match (&series_key, first.date_time) {
            (Some(series), Some(ts)) => format!("{}@{}", series, ts.format("%Y-%m-%dT%H:%M:%S")),
            (Some(series), None) => format!("{}@{}", series, first.id),
            (None, _) => first.id.clone(),
        };
        Self {
            index,
            id,
            series_key,
            items: vec![first],
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First item of the group, used as its representative.
    pub fn representative(&self) -> Option<&InputItem> {
        self.items.first()
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.id.as_str())
    }
}
