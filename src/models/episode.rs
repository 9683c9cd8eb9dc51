/// A single episode the media library manager reports as not yet collected.
///
/// The fields are the minimum the acquisition pipeline needs; everything else
/// returned by the library manager is dropped at the client boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEpisode {
    /// Unique episode identifier, also the ledger key.
    pub episode_id: i32,

    /// Identifier of the parent series.
    pub series_id: i32,

    pub episode_number: u32,
}
