pub mod position;
pub mod window;

pub use position::{BarGeometry, DEFAULT_UNIT_WIDTH, PositionMapper};
pub use window::{TimelineWindow, compute_window, first_of_month, last_of_month};
