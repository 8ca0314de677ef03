//! Picks recipients for order notifications and delivers them.
//!
//! Delivery failures are logged and never returned: a notification that
//! could not be sent must not undo the state change that triggered it.

use crate::auth::Actor;
use crate::entities::{beo, department, order, user, user_role, user_role::Role};
use crate::errors::ServiceError;
use crate::notifications::{
    ActorRef, ApprovalAudience, Notifier, OrderNotification, OrderRef, Recipient,
};
use metrics::counter;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

#[derive(Clone)]
pub struct NotificationDispatcher {
    db: Arc<DatabaseConnection>,
    notifier: Arc<dyn Notifier>,
}

impl From<&order::Model> for OrderRef {
    fn from(order: &order::Model) -> Self {
        OrderRef {
            order_id: order.id,
            custom_code: order.custom_code.clone(),
            event_name: order.event_name.clone(),
        }
    }
}

impl From<&Actor> for ActorRef {
    fn from(actor: &Actor) -> Self {
        ActorRef {
            id: actor.id,
            name: actor.name.clone(),
        }
    }
}

impl From<user::Model> for Recipient {
    fn from(user: user::Model) -> Self {
        Recipient {
            user_id: user.id,
            name: user.name,
            email: user.email,
        }
    }
}

impl NotificationDispatcher {
    pub fn new(db: Arc<DatabaseConnection>, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    /// Every user holding `role`, in id order
    pub async fn users_with_role(&self, role: Role) -> Result<Vec<Recipient>, ServiceError> {
        let ids: Vec<i32> = user_role::Entity::find()
            .filter(user_role::Column::Role.eq(role))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|r| r.user_id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(user::Entity::find()
            .filter(user::Column::Id.is_in(ids))
            .order_by_asc(user::Column::Id)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(Recipient::from)
            .collect())
    }

    async fn deliver(&self, notification: OrderNotification, recipients: Vec<Recipient>) {
        if recipients.is_empty() {
            debug!(kind = notification.kind(), "No recipients, skipping notification");
            return;
        }

        let channels = notification.channels();
        match self
            .notifier
            .send(&notification, &recipients, channels)
            .await
        {
            Ok(()) => {
                counter!("beo.notifications.sent", recipients.len() as u64, "kind" => notification.kind());
            }
            Err(e) => {
                counter!("beo.notifications.failed", 1, "kind" => notification.kind());
                warn!(
                    kind = notification.kind(),
                    order_id = notification.order().order_id,
                    error = %e,
                    "Notification delivery failed"
                );
            }
        }
    }

    async fn kanit_recipients_or_log(&self, order_id: i32) -> Vec<Recipient> {
        match self.users_with_role(Role::Kanit).await {
            Ok(recipients) => recipients,
            Err(e) => {
                warn!(order_id, error = %e, "Could not load kanit recipients");
                Vec::new()
            }
        }
    }

    #[instrument(skip(self, order, sent_by), fields(order_id = order.id))]
    pub async fn order_sent_to_kanit(&self, order: &order::Model, sent_by: &Actor) {
        let recipients = self.kanit_recipients_or_log(order.id).await;
        let notification = OrderNotification::SentToKanit {
            order: order.into(),
            sent_by: sent_by.into(),
        };
        self.deliver(notification, recipients).await;
    }

    #[instrument(skip(self, order, edited_by, changed_fields), fields(order_id = order.id))]
    pub async fn order_needs_review(
        &self,
        order: &order::Model,
        edited_by: &Actor,
        changed_fields: &[String],
    ) {
        let recipients = self.kanit_recipients_or_log(order.id).await;
        let notification = OrderNotification::NeedsReview {
            order: order.into(),
            edited_by: edited_by.into(),
            changed_fields: changed_fields.to_vec(),
        };
        self.deliver(notification, recipients).await;
    }

    /// Approval fan-out: a generic notice to the sales creator, and to each
    /// PIC both a PIC-shaped approval notice and an assignment notice per
    /// department they serve on.
    #[instrument(skip(self, order, approved_by), fields(order_id = order.id))]
    pub async fn order_approved(&self, order: &order::Model, approved_by: &Actor) {
        let assignments = match self.pic_assignments(order.id).await {
            Ok(a) => a,
            Err(e) => {
                warn!(order_id = order.id, error = %e, "Could not load PIC assignments");
                Vec::new()
            }
        };

        if let Some(creator_id) = order.created_by {
            match user::Entity::find_by_id(creator_id).one(&*self.db).await {
                Ok(Some(creator)) => {
                    let notification = OrderNotification::ApprovedByKanit {
                        order: order.into(),
                        approved_by: approved_by.into(),
                        audience: ApprovalAudience::Generic,
                    };
                    self.deliver(notification, vec![creator.into()]).await;
                }
                Ok(None) => debug!(creator_id, "Order creator no longer exists"),
                Err(e) => warn!(order_id = order.id, error = %e, "Could not load order creator"),
            }
        }

        for (pic, department) in assignments {
            let approval = OrderNotification::ApprovedByKanit {
                order: order.into(),
                approved_by: approved_by.into(),
                audience: ApprovalAudience::PicAssignment {
                    department: department.clone(),
                },
            };
            self.deliver(approval, vec![pic.clone()]).await;

            let assignment = OrderNotification::ApprovedPicAssigned {
                order: order.into(),
                approved_by: approved_by.into(),
                department,
            };
            self.deliver(assignment, vec![pic]).await;
        }
    }

    /// Distinct (PIC, department name) pairs across the order's BEO lines
    async fn pic_assignments(&self, order_id: i32) -> Result<Vec<(Recipient, String)>, ServiceError> {
        let beos = beo::Entity::find()
            .filter(beo::Column::OrderId.eq(order_id))
            .filter(beo::Column::UserId.is_not_null())
            .order_by_asc(beo::Column::Id)
            .all(&*self.db)
            .await?;
        if beos.is_empty() {
            return Ok(Vec::new());
        }

        let user_ids: Vec<i32> = beos.iter().filter_map(|b| b.user_id).collect();
        let department_ids: Vec<i32> = beos.iter().map(|b| b.department_id).collect();

        let users: HashMap<i32, user::Model> = user::Entity::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let departments: HashMap<i32, String> = department::Entity::find()
            .filter(department::Column::Id.is_in(department_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|d| (d.id, d.name))
            .collect();

        let mut pairs: BTreeMap<(i32, i32), (Recipient, String)> = BTreeMap::new();
        for b in beos {
            let Some(user_id) = b.user_id else { continue };
            let Some(pic) = users.get(&user_id) else { continue };
            let department = departments
                .get(&b.department_id)
                .cloned()
                .unwrap_or_else(|| format!("Department {}", b.department_id));
            pairs
                .entry((user_id, b.department_id))
                .or_insert_with(|| (pic.clone().into(), department));
        }
        Ok(pairs.into_values().collect())
    }
}
