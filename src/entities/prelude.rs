pub use super::downloads::Entity as Downloads;
pub use super::search_cache::Entity as SearchCache;
