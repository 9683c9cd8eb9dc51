use sea_orm::entity::prelude::*;

/// Permanent ledger of episodes already handed to the download client.
/// Presence of a row is the "already handled" marker; rows never expire.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "downloads")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub episode_id: i32,
    pub series_id: i32,
    #[sea_orm(column_type = "Text")]
    pub magnet: String,
    pub title: String,
    pub added_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
