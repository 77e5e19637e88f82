mod common;
mod smoothing;

pub use common::midpoint;
pub(crate) use common::{calculate_bounds, distance_to_line_segment};
pub use smoothing::{smooth_path, PathSegment, SmoothPath, MAX_QUAD_SUBDIVISIONS};
