use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "beo_attachments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub beo_id: i32,
    /// Storage path of the image
    pub path: String,
    pub original_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::beo::Entity",
        from = "Column::BeoId",
        to = "super::beo::Column::Id",
        on_delete = "Cascade"
    )]
    Beo,
}

impl Related<super::beo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Beo.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
