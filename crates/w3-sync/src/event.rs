use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A change observed at a subscribed path.
///
/// A subscription always starts with a [`DocEvent::Snapshot`]. Writes below
/// the subscribed path arrive as keyed child deltas; writes at or above it
/// arrive as a fresh snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DocEvent {
    /// Full value at the path. `None` when nothing is stored there.
    Snapshot { value: Option<Value> },
    /// A direct child was added or changed; `value` is its new full value.
    ChildPut { key: String, value: Value },
    /// A direct child disappeared.
    ChildRemoved { key: String },
}
