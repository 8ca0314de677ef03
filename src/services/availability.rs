//! Venue booking conflict detection.

use crate::entities::{order, order_venue, venue};
use crate::errors::ServiceError;
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// Inclusive day ranges `[s1, e1]` and `[s2, e2]` share at least one day
pub fn ranges_overlap(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
    s1 <= e2 && s2 <= e1
}

/// One existing booking that collides with the requested range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueConflict {
    pub venue_id: i32,
    pub venue_name: String,
    pub order_id: i32,
    pub custom_code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResult {
    pub conflicts: Vec<VenueConflict>,
}

impl ConflictResult {
    pub fn has_conflict(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn is_venue_available(&self, venue_id: i32) -> bool {
        !self.conflicts.iter().any(|c| c.venue_id == venue_id)
    }

    /// Distinct names of the conflicting venues, in the order first seen
    pub fn venue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for c in &self.conflicts {
            if !names.contains(&c.venue_name) {
                names.push(c.venue_name.clone());
            }
        }
        names
    }

    /// `BookingConflict` naming every conflicting venue, if there is any conflict
    pub fn into_error(self) -> Option<ServiceError> {
        if self.has_conflict() {
            Some(ServiceError::BookingConflict {
                venues: self.venue_names(),
            })
        } else {
            None
        }
    }
}

/// Finds every live order booking one of `venue_ids` for a range overlapping `[start, end]`.
///
/// `exclude_order_id` skips the order being edited. This is a pure query.
#[instrument(skip(db))]
pub async fn check_availability<C: ConnectionTrait>(
    db: &C,
    venue_ids: &[i32],
    start: NaiveDate,
    end: NaiveDate,
    exclude_order_id: Option<i32>,
) -> Result<ConflictResult, ServiceError> {
    if end < start {
        return Err(ServiceError::ValidationError(format!(
            "end_date {} is before start_date {}",
            end, start
        )));
    }
    if venue_ids.is_empty() {
        return Ok(ConflictResult::default());
    }

    let bookings = order_venue::Entity::find()
        .filter(order_venue::Column::VenueId.is_in(venue_ids.to_vec()))
        .all(db)
        .await?;
    if bookings.is_empty() {
        return Ok(ConflictResult::default());
    }

    let mut order_query = order::Entity::find()
        .filter(order::Column::Id.is_in(bookings.iter().map(|b| b.order_id).collect::<Vec<_>>()))
        .filter(order::Column::DeletedAt.is_null());
    if let Some(excluded) = exclude_order_id {
        order_query = order_query.filter(order::Column::Id.ne(excluded));
    }
    let orders: HashMap<i32, order::Model> = order_query
        .all(db)
        .await?
        .into_iter()
        .filter(|o| ranges_overlap(start, end, o.start_date, o.end_date))
        .map(|o| (o.id, o))
        .collect();
    if orders.is_empty() {
        return Ok(ConflictResult::default());
    }

    let venue_names: HashMap<i32, String> = venue::Entity::find()
        .filter(venue::Column::Id.is_in(venue_ids.to_vec()))
        .all(db)
        .await?
        .into_iter()
        .map(|v| (v.id, v.name))
        .collect();

    let mut conflicts: Vec<VenueConflict> = bookings
        .iter()
        .filter_map(|b| {
            let o = orders.get(&b.order_id)?;
            Some(VenueConflict {
                venue_id: b.venue_id,
                venue_name: venue_names
                    .get(&b.venue_id)
                    .cloned()
                    .unwrap_or_else(|| format!("Venue {}", b.venue_id)),
                order_id: o.id,
                custom_code: o.custom_code.clone(),
                start_date: o.start_date,
                end_date: o.end_date,
            })
        })
        .collect();

    let position = |venue_id: i32| venue_ids.iter().position(|v| *v == venue_id);
    conflicts.sort_by_key(|c| (position(c.venue_id), c.start_date, c.order_id));

    debug!(conflicts = conflicts.len(), "Availability checked");
    Ok(ConflictResult { conflicts })
}
