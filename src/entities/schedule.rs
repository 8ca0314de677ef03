use chrono::{NaiveDate, NaiveTime};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[sea_orm(rs_type = "i32", db_type = "Integer")]
#[serde(rename_all = "snake_case")]
pub enum ScheduleFunction {
    #[sea_orm(num_value = 1)]
    #[strum(serialize = "Loading In")]
    LoadingIn,
    #[sea_orm(num_value = 2)]
    #[strum(serialize = "Show")]
    Show,
    #[sea_orm(num_value = 3)]
    #[strum(serialize = "Loading Out")]
    LoadingOut,
}

/// One time block of an order. `end_date >= start_date` is enforced on write.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "schedules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub order_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub time_start: NaiveTime,
    pub time_end: NaiveTime,
    pub function: ScheduleFunction,
    pub people: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id",
        on_delete = "Cascade"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
