use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sales-facing lifecycle of an order.
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
pub enum OrderStatus {
    #[sea_orm(num_value = 0)]
    Inquiry,
    #[sea_orm(num_value = 1)]
    Confirmed,
    #[sea_orm(num_value = 2)]
    Executed,
}

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Inquiry, OrderStatus::Confirmed)
                | (OrderStatus::Confirmed, OrderStatus::Executed)
        )
    }
}

/// Review-facing lifecycle of the banquet event order document.
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
pub enum BeoStatus {
    #[sea_orm(num_value = 0)]
    Planning,
    #[sea_orm(num_value = 1)]
    SentToReview,
    #[sea_orm(num_value = 2)]
    Approved,
    #[sea_orm(num_value = 3)]
    EditedPendingReview,
}

impl BeoStatus {
    pub fn can_transition_to(self, next: BeoStatus) -> bool {
        matches!(
            (self, next),
            (BeoStatus::Planning, BeoStatus::SentToReview)
                | (BeoStatus::EditedPendingReview, BeoStatus::SentToReview)
                | (BeoStatus::SentToReview, BeoStatus::Approved)
                | (BeoStatus::SentToReview, BeoStatus::EditedPendingReview)
                | (BeoStatus::Approved, BeoStatus::EditedPendingReview)
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Event code prefix plus a five digit sequence, e.g. `CNF00001`
    /// Unique among live orders
    pub custom_code: String,
    pub event_id: i32,
    pub event_name: String,
    /// Inclusive booking range
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: OrderStatus,
    pub status_beo: BeoStatus,
    pub customer_id: i32,
    /// Percentage
    pub discount: Option<f64>,
    pub notes: Option<String>,
    pub created_by: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::event::Entity",
        from = "Column::EventId",
        to = "super::event::Column::Id"
    )]
    Event,
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::order_venue::Entity")]
    OrderVenues,
    #[sea_orm(has_many = "super::schedule::Entity")]
    Schedules,
    #[sea_orm(has_many = "super::beo::Entity")]
    Beos,
    #[sea_orm(has_many = "super::order_attachment::Entity")]
    Attachments,
    #[sea_orm(has_many = "super::beo_file::Entity")]
    BeoFiles,
}

impl Related<super::event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Event.def()
    }
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::order_venue::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderVenues.def()
    }
}

impl Related<super::venue::Entity> for Entity {
    fn to() -> RelationDef {
        super::order_venue::Relation::Venue.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::order_venue::Relation::Order.def().rev())
    }
}

impl Related<super::schedule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Schedules.def()
    }
}

impl Related<super::beo::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Beos.def()
    }
}

impl Related<super::order_attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl Related<super::beo_file::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BeoFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
