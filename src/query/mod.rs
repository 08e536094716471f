pub mod locator;
pub mod path;

pub use locator::{find_element, find_elements, FindOptions};
pub(crate) use locator::segment_matches;
pub use path::{Condition, PathQuery, Segment};
