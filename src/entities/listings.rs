use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub search_id: i32,
    pub title: String,
    pub price: Option<String>,
    pub price_number: Option<i64>,
    pub location: Option<String>,
    pub link: String,
    pub image: Option<String>,
    pub seller: Option<String>,
    pub timestamp: Option<String>,
    pub badges: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Versioned JSON envelope of the technical details mapping.
    #[sea_orm(column_type = "Text", nullable)]
    pub details: Option<String>,
    pub first_seen: String,
    pub last_seen: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::searches::Entity",
        from = "Column::SearchId",
        to = "super::searches::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Searches,
    #[sea_orm(has_one = "super::evaluations::Entity")]
    Evaluations,
}

impl Related<super::searches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Searches.def()
    }
}

impl Related<super::evaluations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Evaluations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
