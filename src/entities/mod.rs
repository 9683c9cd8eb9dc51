pub mod prelude;

pub mod downloads;
pub mod search_cache;
