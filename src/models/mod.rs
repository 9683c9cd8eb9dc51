pub mod episode;
pub mod release;
