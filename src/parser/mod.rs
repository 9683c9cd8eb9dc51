pub mod query;
pub mod title;

pub use query::{build_queries, sanitize_title};
pub use title::{infer_season_from_title, parse_release_title};
