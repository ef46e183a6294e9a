//! Home-screen widget binding carried by notes.

use crate::model::ids::WidgetType;
use serde::{Deserialize, Serialize};

/// `(widget_id, widget_type)` pair claimed by one note.
///
/// Two notes in the same folder should not claim the same pair; this is
/// bookkeeping checked by callers, not a storage constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WidgetAttribute {
    pub widget_id: i64,
    pub widget_type: WidgetType,
}

impl WidgetAttribute {
    pub fn new(widget_id: i64, widget_type: WidgetType) -> Self {
        Self {
            widget_id,
            widget_type,
        }
    }

    /// Returns whether a real widget is bound.
    pub fn is_bound(&self) -> bool {
        self.widget_type != WidgetType::Invalid
    }
}
