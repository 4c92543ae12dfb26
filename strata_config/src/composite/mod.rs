//! Composites merging named child sources into one view.

mod engine;
mod layered;
mod ordered;
mod state;
mod visitor;

pub use layered::LayeredConfig;
pub use ordered::CompositeConfig;
pub use state::{ChildInfo, CompositeState, ResolvedEntry};
pub use visitor::{ConfigVisitor, DescribeVisitor, LoggingVisitor};
