use sea_orm::entity::prelude::*;

/// A completed search: the question, the answer, and its citations.
/// Rows are immutable once written; there is no update path.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "searches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning user id. Every read and delete filters on this.
    pub owner_id: i32,

    pub query: String,

    #[sea_orm(column_type = "Text")]
    pub response: String,

    /// Ordered JSON array of `{title, url}` source objects.
    #[sea_orm(column_type = "Text")]
    pub sources_json: String,

    /// Unix epoch milliseconds, set server-side at insert.
    pub created_at: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
