use crate::entities::notification;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Notification service errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Mail delivery failed for {recipient}: {reason}")]
    Mail { recipient: String, reason: String },
    #[error("Notification not found: {0}")]
    NotFound(Uuid),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Database,
    Mail,
}

/// The order a notification is about, captured when it is built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRef {
    pub order_id: i32,
    pub custom_code: String,
    pub event_name: String,
}

/// The user who caused a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id: i32,
    pub name: String,
    pub email: String,
}

/// Who an approval notice is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalAudience {
    /// The sales user behind the order
    Generic,
    /// A PIC on one of the order's BEO lines
    PicAssignment { department: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderNotification {
    SentToKanit {
        order: OrderRef,
        sent_by: ActorRef,
    },
    ApprovedByKanit {
        order: OrderRef,
        approved_by: ActorRef,
        audience: ApprovalAudience,
    },
    ApprovedPicAssigned {
        order: OrderRef,
        approved_by: ActorRef,
        department: String,
    },
    NeedsReview {
        order: OrderRef,
        edited_by: ActorRef,
        changed_fields: Vec<String>,
    },
}

/// Mail rendering: greeting, body lines and one call to action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub subject: String,
    pub greeting: String,
    pub lines: Vec<String>,
    pub action_text: String,
    pub action_url: String,
}

impl OrderNotification {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SentToKanit { .. } => "order_sent_to_kanit",
            Self::ApprovedByKanit { .. } => "order_approved_by_kanit",
            Self::ApprovedPicAssigned { .. } => "order_approved_pic_assigned",
            Self::NeedsReview { .. } => "order_needs_review",
        }
    }

    pub fn channels(&self) -> &'static [Channel] {
        match self {
            Self::ApprovedByKanit { .. } => &[Channel::Database],
            _ => &[Channel::Database, Channel::Mail],
        }
    }

    pub fn order(&self) -> &OrderRef {
        match self {
            Self::SentToKanit { order, .. }
            | Self::ApprovedByKanit { order, .. }
            | Self::ApprovedPicAssigned { order, .. }
            | Self::NeedsReview { order, .. } => order,
        }
    }

    fn actor(&self) -> &ActorRef {
        match self {
            Self::SentToKanit { sent_by, .. } => sent_by,
            Self::ApprovedByKanit { approved_by, .. }
            | Self::ApprovedPicAssigned { approved_by, .. } => approved_by,
            Self::NeedsReview { edited_by, .. } => edited_by,
        }
    }

    pub fn action_url(&self, base_url: &str) -> String {
        let base = base_url.trim_end_matches('/');
        let id = self.order().order_id;
        match self {
            Self::SentToKanit { .. } | Self::NeedsReview { .. } => {
                format!("{}/kanit/orders/{}", base, id)
            }
            Self::ApprovedByKanit {
                audience: ApprovalAudience::Generic,
                ..
            } => format!("{}/sales/orders/{}", base, id),
            Self::ApprovedByKanit {
                audience: ApprovalAudience::PicAssignment { .. },
                ..
            }
            | Self::ApprovedPicAssigned { .. } => format!("{}/pic/orders/{}", base, id),
        }
    }

    pub fn title(&self) -> String {
        match self {
            Self::SentToKanit { .. } => "Order sent for review".to_string(),
            Self::ApprovedByKanit {
                audience: ApprovalAudience::Generic,
                ..
            } => "Order approved".to_string(),
            Self::ApprovedByKanit {
                audience: ApprovalAudience::PicAssignment { department },
                ..
            } => format!("Order approved: {} assignment", department),
            Self::ApprovedPicAssigned { department, .. } => {
                format!("You are PIC for {}", department)
            }
            Self::NeedsReview { .. } => "Approved order was edited".to_string(),
        }
    }

    pub fn message(&self) -> String {
        let order = self.order();
        let actor = &self.actor().name;
        match self {
            Self::SentToKanit { .. } => format!(
                "{} sent order {} ({}) for review",
                actor, order.custom_code, order.event_name
            ),
            Self::ApprovedByKanit {
                audience: ApprovalAudience::Generic,
                ..
            } => format!(
                "{} approved order {} ({})",
                actor, order.custom_code, order.event_name
            ),
            Self::ApprovedByKanit {
                audience: ApprovalAudience::PicAssignment { department },
                ..
            } => format!(
                "{} approved order {} ({}). You are the PIC for {}",
                actor, order.custom_code, order.event_name, department
            ),
            Self::ApprovedPicAssigned { department, .. } => format!(
                "Order {} ({}) was approved by {}. Please prepare the {} work order",
                order.custom_code, order.event_name, actor, department
            ),
            Self::NeedsReview { changed_fields, .. } => format!(
                "{} edited order {} ({}): {}. Review required",
                actor,
                order.custom_code,
                order.event_name,
                changed_fields.join(", ")
            ),
        }
    }

    fn icon_and_color(&self) -> (&'static str, &'static str) {
        match self {
            Self::SentToKanit { .. } => ("send", "warning"),
            Self::ApprovedByKanit { .. } => ("check-circle", "success"),
            Self::ApprovedPicAssigned { .. } => ("user-check", "info"),
            Self::NeedsReview { .. } => ("edit", "danger"),
        }
    }

    /// Flat key-value payload stored in the notification feed
    pub fn to_payload(&self, base_url: &str) -> Value {
        let order = self.order();
        let actor = self.actor();
        let (icon, color) = self.icon_and_color();

        let mut payload = json!({
            "type": self.kind(),
            "title": self.title(),
            "message": self.message(),
            "order_id": order.order_id,
            "custom_code": order.custom_code,
            "event_name": order.event_name,
            "actor_id": actor.id,
            "actor_name": actor.name,
            "action_url": self.action_url(base_url),
            "icon": icon,
            "color": color,
        });

        match self {
            Self::ApprovedByKanit {
                audience: ApprovalAudience::PicAssignment { department },
                ..
            }
            | Self::ApprovedPicAssigned { department, .. } => {
                payload["is_pic_notification"] = json!(true);
                payload["department"] = json!(department);
            }
            Self::NeedsReview { changed_fields, .. } => {
                payload["changed_fields"] = json!(changed_fields.join(", "));
            }
            _ => {}
        }
        payload
    }

    /// Mail rendering for notifications delivered on the mail channel
    pub fn to_mail(&self, recipient: &Recipient, base_url: &str) -> Option<MailMessage> {
        if !self.channels().contains(&Channel::Mail) {
            return None;
        }
        let order = self.order();
        let greeting = format!("Hello {},", recipient.name);
        let action_url = self.action_url(base_url);

        let (subject, lines, action_text) = match self {
            Self::SentToKanit { .. } => (
                format!("Order {} needs your review", order.custom_code),
                vec![
                    self.message(),
                    "Please review the banquet event order and approve it.".to_string(),
                ],
                "Review order",
            ),
            Self::ApprovedPicAssigned { department, .. } => (
                format!("PIC assignment: {}", order.custom_code),
                vec![
                    self.message(),
                    format!(
                        "As PIC you are responsible for delivering the {} package and notes listed in the BEO.",
                        department
                    ),
                ],
                "Open order",
            ),
            Self::NeedsReview { changed_fields, .. } => (
                format!("Order {} changed after approval", order.custom_code),
                vec![
                    self.message(),
                    format!("Changed fields: {}", changed_fields.join(", ")),
                    "The previous BEO document was withdrawn.".to_string(),
                ],
                "Review changes",
            ),
            Self::ApprovedByKanit { .. } => return None,
        };

        Some(MailMessage {
            subject,
            greeting,
            lines,
            action_text: action_text.to_string(),
            action_url,
        })
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_mail(&self, to: &Recipient, message: &MailMessage)
        -> Result<(), NotificationError>;
}

/// Mailer that writes outgoing mail to the log
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_mail(
        &self,
        to: &Recipient,
        message: &MailMessage,
    ) -> Result<(), NotificationError> {
        info!(
            from = %self.from,
            to = %to.email,
            subject = %message.subject,
            action_url = %message.action_url,
            "Mail sent"
        );
        Ok(())
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        notification: &OrderNotification,
        recipients: &[Recipient],
        channels: &[Channel],
    ) -> Result<(), NotificationError>;
}

/// Stores feed entries in the `notifications` table and hands mail to a [`Mailer`]
#[derive(Clone)]
pub struct DatabaseNotifier {
    db: Arc<DatabaseConnection>,
    mailer: Arc<dyn Mailer>,
    base_url: String,
}

impl DatabaseNotifier {
    pub fn new(db: Arc<DatabaseConnection>, mailer: Arc<dyn Mailer>, base_url: String) -> Self {
        Self {
            db,
            mailer,
            base_url,
        }
    }
}

#[async_trait]
impl Notifier for DatabaseNotifier {
    #[instrument(skip(self, notification, recipients), fields(kind = notification.kind(), recipients = recipients.len()))]
    async fn send(
        &self,
        notification: &OrderNotification,
        recipients: &[Recipient],
        channels: &[Channel],
    ) -> Result<(), NotificationError> {
        let mut first_error = None;

        for recipient in recipients {
            if channels.contains(&Channel::Database) {
                let row = notification::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(recipient.user_id),
                    kind: Set(notification.kind().to_string()),
                    data: Set(notification.to_payload(&self.base_url)),
                    read_at: Set(None),
                    created_at: Set(Utc::now()),
                };
                if let Err(e) = row.insert(&*self.db).await {
                    warn!(user_id = recipient.user_id, error = %e, "Failed to store notification");
                    first_error.get_or_insert(NotificationError::Database(e));
                }
            }

            if channels.contains(&Channel::Mail) {
                if let Some(mail) = notification.to_mail(recipient, &self.base_url) {
                    if let Err(e) = self.mailer.send_mail(recipient, &mail).await {
                        warn!(user_id = recipient.user_id, error = %e, "Failed to send mail");
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Most recent feed entries for a user
pub async fn list_for_user(
    db: &DatabaseConnection,
    user_id: i32,
    limit: u64,
) -> Result<Vec<notification::Model>, NotificationError> {
    Ok(notification::Entity::find()
        .filter(notification::Column::UserId.eq(user_id))
        .order_by_desc(notification::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await?)
}

pub async fn mark_as_read(
    db: &DatabaseConnection,
    user_id: i32,
    notification_id: Uuid,
) -> Result<notification::Model, NotificationError> {
    let row = notification::Entity::find_by_id(notification_id)
        .filter(notification::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or(NotificationError::NotFound(notification_id))?;

    if row.read_at.is_some() {
        return Ok(row);
    }
    let mut active: notification::ActiveModel = row.into();
    active.read_at = Set(Some(Utc::now()));
    Ok(active.update(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order() -> OrderRef {
        OrderRef {
            order_id: 7,
            custom_code: "CNF00007".into(),
            event_name: "Annual Summit".into(),
        }
    }

    fn kanit() -> ActorRef {
        ActorRef {
            id: 3,
            name: "Kartika".into(),
        }
    }

    fn recipient() -> Recipient {
        Recipient {
            user_id: 9,
            name: "Dewi".into(),
            email: "dewi@venue.local".into(),
        }
    }

    #[test]
    fn generic_approval_omits_pic_fields() {
        let n = OrderNotification::ApprovedByKanit {
            order: order(),
            approved_by: kanit(),
            audience: ApprovalAudience::Generic,
        };
        let payload = n.to_payload("http://app.local/");
        assert_eq!(payload["type"], "order_approved_by_kanit");
        assert_eq!(payload["action_url"], "http://app.local/sales/orders/7");
        assert!(payload.get("is_pic_notification").is_none());
        assert!(payload.get("department").is_none());
        assert_eq!(n.channels(), &[Channel::Database]);
        assert!(n.to_mail(&recipient(), "http://app.local").is_none());
    }

    #[test]
    fn pic_approval_carries_department_and_pic_link() {
        let n = OrderNotification::ApprovedByKanit {
            order: order(),
            approved_by: kanit(),
            audience: ApprovalAudience::PicAssignment {
                department: "Kitchen".into(),
            },
        };
        let payload = n.to_payload("http://app.local");
        assert_eq!(payload["is_pic_notification"], true);
        assert_eq!(payload["department"], "Kitchen");
        assert_eq!(payload["action_url"], "http://app.local/pic/orders/7");
    }

    #[test]
    fn payload_is_flat() {
        let n = OrderNotification::NeedsReview {
            order: order(),
            edited_by: ActorRef {
                id: 2,
                name: "Sari".into(),
            },
            changed_fields: vec!["event_name".into(), "start_date".into()],
        };
        let payload = n.to_payload("http://app.local");
        let map = payload.as_object().unwrap();
        assert!(map.values().all(|v| !v.is_object() && !v.is_array()));
        assert_eq!(payload["changed_fields"], "event_name, start_date");
        assert_eq!(payload["actor_name"], "Sari");
    }

    #[test]
    fn pic_assignment_mail_names_department() {
        let n = OrderNotification::ApprovedPicAssigned {
            order: order(),
            approved_by: kanit(),
            department: "Decoration".into(),
        };
        let mail = n.to_mail(&recipient(), "http://app.local").unwrap();
        assert_eq!(mail.subject, "PIC assignment: CNF00007");
        assert_eq!(mail.greeting, "Hello Dewi,");
        assert!(mail.lines.iter().any(|l| l.contains("Decoration")));
        assert_eq!(mail.action_url, "http://app.local/pic/orders/7");
    }

    #[test]
    fn sent_to_kanit_goes_to_database_and_mail() {
        let n = OrderNotification::SentToKanit {
            order: order(),
            sent_by: ActorRef {
                id: 2,
                name: "Sari".into(),
            },
        };
        assert_eq!(n.channels(), &[Channel::Database, Channel::Mail]);
        assert_eq!(n.message(), "Sari sent order CNF00007 (Annual Summit) for review");
        let mail = n.to_mail(&recipient(), "http://app.local").unwrap();
        assert_eq!(mail.action_url, "http://app.local/kanit/orders/7");
    }
}
