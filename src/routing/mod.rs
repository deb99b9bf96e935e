//! Request routing by glob pattern.

pub mod matcher;
pub mod router;

pub use matcher::{match_prefix, match_prefix_str};
pub use router::{Route, RouteMatch, Router};
