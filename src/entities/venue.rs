use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "venues")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    /// Seated capacity per setup type
    pub capacity_banquet: Option<i32>,
    pub capacity_classroom: Option<i32>,
    pub capacity_theater: Option<i32>,
    pub capacity_reception: Option<i32>,
    /// Storage path of the venue photo
    pub photo: Option<String>,
    /// Storage path of the floor plan
    pub floor_plan: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_venue::Entity")]
    OrderVenues,
}

impl Related<super::order_venue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderVenues.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        super::order_venue::Relation::Order.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::order_venue::Relation::Venue.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
