use super::window::TimelineWindow;
use crate::task::Task;
use serde::{Deserialize, Serialize};

/// Horizontal pixels per calendar day unless configured otherwise.
pub const DEFAULT_UNIT_WIDTH: f32 = 30.0;

/// Horizontal placement of a task bar within the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarGeometry {
    pub offset: f32,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionMapper {
    unit_width: f32,
}

impl Default for PositionMapper {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT_WIDTH)
    }
}

impl PositionMapper {
    pub fn new(unit_width: f32) -> Self {
        let unit_width = if unit_width.is_finite() && unit_width > 0.0 {
            unit_width
        } else {
            DEFAULT_UNIT_WIDTH
        };
        Self { unit_width }
    }

    pub fn unit_width(&self) -> f32 {
        self.unit_width
    }

    /// Bar for `task`, or `None` when a date is missing or lies outside the
    /// window. Partially visible tasks are not clipped.
    pub fn position(&self, task: &Task, window: &TimelineWindow) -> Option<BarGeometry> {
        let (start, end) = task.date_range()?;
        let start_idx = window.index_of(start)?;
        let end_idx = window.index_of(end)?;
        if end_idx < start_idx {
            return None;
        }
        Some(BarGeometry {
            offset: start_idx as f32 * self.unit_width,
            width: (end_idx - start_idx + 1) as f32 * self.unit_width,
        })
    }

    /// Whole days covered by a horizontal pointer displacement.
    pub fn day_delta(&self, anchor_x: f32, current_x: f32) -> i64 {
        crate::drag::day_delta(anchor_x, current_x, self.unit_width)
    }

    /// Total pixel width of the window.
    pub fn total_width(&self, window: &TimelineWindow) -> f32 {
        window.len() as f32 * self.unit_width
    }
}
