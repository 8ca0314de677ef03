//! Returning an approved order to review after it is edited.
//!
//! [`revise_after_edit`] is called by the update path inside its
//! transaction, after the caller's changes are written. Its own status
//! write is a single-column `UPDATE`, which does not pass through the
//! update path again.

use crate::entities::{beo_file, order, order::BeoStatus};
use crate::errors::ServiceError;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::{info, instrument};

/// Order fields whose change invalidates an approved BEO
pub const TRACKED_FIELDS: &[&str] = &[
    "event_name",
    "start_date",
    "end_date",
    "venues",
    "schedules",
    "beos",
    "attachments",
];

pub fn is_tracked(field: &str) -> bool {
    TRACKED_FIELDS.contains(&field)
}

/// What an edit did to the review state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Revision {
    /// `status_beo` was moved to `EditedPendingReview`
    pub demoted: bool,
    /// Storage path of the document withdrawn by this edit, to delete after commit
    pub purged_file: Option<String>,
    /// Tracked fields that changed while approved; reviewers should be told
    pub notify_fields: Vec<String>,
}

impl Revision {
    pub fn should_notify(&self) -> bool {
        !self.notify_fields.is_empty()
    }
}

/// Marks the live document of `order_id` as deleted and returns its path
pub async fn purge_live_file<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
) -> Result<Option<String>, ServiceError> {
    let Some(file) = beo_file::Entity::find()
        .filter(beo_file::Column::OrderId.eq(order_id))
        .filter(beo_file::Column::DeletedAt.is_null())
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    let path = file.path.clone();
    let mut active: beo_file::ActiveModel = file.into();
    active.deleted_at = Set(Some(Utc::now()));
    active.update(db).await?;
    Ok(Some(path))
}

/// Applies the review consequences of an edit to `before`.
///
/// * An explicit request for `EditedPendingReview` withdraws the document
///   without notifying anyone.
/// * A change to any tracked field of an `Approved` order demotes it,
///   withdraws the document and asks for notification.
///
/// When both apply the document is withdrawn once.
#[instrument(skip(db, before, changed_fields), fields(order_id = before.id))]
pub async fn revise_after_edit<C: ConnectionTrait>(
    db: &C,
    before: &order::Model,
    changed_fields: &[String],
    explicit_status: Option<BeoStatus>,
) -> Result<Revision, ServiceError> {
    let explicit_demotion = explicit_status == Some(BeoStatus::EditedPendingReview)
        && before.status_beo != BeoStatus::EditedPendingReview;

    let tracked: Vec<String> = changed_fields
        .iter()
        .filter(|f| is_tracked(f))
        .cloned()
        .collect();
    let tracked_edit = before.status_beo == BeoStatus::Approved && !tracked.is_empty();

    if !explicit_demotion && !tracked_edit {
        return Ok(Revision::default());
    }

    order::Entity::update_many()
        .col_expr(
            order::Column::StatusBeo,
            Expr::value(BeoStatus::EditedPendingReview),
        )
        .filter(order::Column::Id.eq(before.id))
        .exec(db)
        .await?;

    let purged_file = purge_live_file(db, before.id).await?;

    if explicit_demotion {
        info!(
            order_id = before.id,
            purged = purged_file.is_some(),
            "Order explicitly returned to review"
        );
    }
    if tracked_edit {
        info!(order_id = before.id, fields = ?tracked, "Approved order edited, returned to review");
    }

    Ok(Revision {
        demoted: true,
        purged_file,
        notify_fields: if tracked_edit { tracked } else { Vec::new() },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracked_set_covers_order_defining_fields() {
        assert!(is_tracked("event_name"));
        assert!(is_tracked("start_date"));
        assert!(is_tracked("venues"));
        assert!(is_tracked("attachments"));
        assert!(!is_tracked("discount"));
        assert!(!is_tracked("notes"));
        assert!(!is_tracked("customer_id"));
    }

    #[test]
    fn default_revision_does_nothing() {
        let revision = Revision::default();
        assert!(!revision.demoted);
        assert!(!revision.should_notify());
        assert!(revision.purged_file.is_none());
    }
}
