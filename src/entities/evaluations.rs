use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "evaluations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub listing_id: String,
    pub value_score: f64,
    /// Versioned JSON envelope of the ordered value points.
    #[sea_orm(column_type = "Text")]
    pub value_points: String,
    pub match_score: f64,
    #[sea_orm(column_type = "Text")]
    pub match_points: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub red_flags: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub raw_response: Option<String>,
    pub evaluated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::listings::Entity",
        from = "Column::ListingId",
        to = "super::listings::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Listings,
}

impl Related<super::listings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Listings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
