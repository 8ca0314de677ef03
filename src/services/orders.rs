use crate::{
    auth::Actor,
    entities::{
        beo, beo_attachment, beo_file, customer, department, event,
        order::{self, BeoStatus, OrderStatus},
        order_attachment, order_venue, package, schedule,
        schedule::ScheduleFunction,
        user,
        user_role::Role,
        venue,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    locks::KeyedLocks,
    rendering::DocumentRenderer,
    services::{
        availability::{self, ConflictResult},
        code_generator,
        documents::build_document_context,
        notification_dispatcher::NotificationDispatcher,
        revalidation::{self, Revision},
    },
    storage::FileStorage,
};
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use metrics::counter;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const SALES_ROLES: &[Role] = &[Role::Sales, Role::Admin];
const REVIEW_ROLES: &[Role] = &[Role::Kanit, Role::Admin];
const EDIT_ROLES: &[Role] = &[Role::Sales, Role::Kanit, Role::Admin];

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewCustomer {
    #[validate(length(min = 1, max = 255, message = "Organizer is required"))]
    pub organizer: String,
    #[validate(length(min = 1, max = 255, message = "Contact person is required"))]
    pub contact_person: String,
    #[validate(length(min = 1, max = 32, message = "Phone is required"))]
    pub phone: String,
    #[validate(email(message = "Email must be valid"))]
    pub email: String,
    pub address: Option<String>,
    #[serde(default)]
    pub kl_status: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct AttachmentInput {
    /// Storage path of an already uploaded file
    #[validate(length(min = 1, max = 512))]
    pub path: String,
    pub original_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ScheduleInput {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub time_start: NaiveTime,
    pub time_end: NaiveTime,
    pub function: ScheduleFunction,
    #[validate(range(min = 0, message = "People must not be negative"))]
    pub people: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BeoInput {
    pub department_id: i32,
    /// PIC
    pub user_id: Option<i32>,
    pub package_id: Option<i32>,
    #[validate(length(max = 5000, message = "Notes must be at most 5000 characters"))]
    pub notes: Option<String>,
    #[serde(default)]
    #[validate]
    pub attachments: Vec<AttachmentInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    pub event_id: i32,
    #[validate(length(min = 1, max = 255, message = "Event name is required"))]
    pub event_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(length(min = 1, message = "At least one venue is required"))]
    pub venue_ids: Vec<i32>,
    /// Existing customer; mutually exclusive with `customer`
    pub customer_id: Option<i32>,
    /// Customer created together with the order
    #[validate]
    pub customer: Option<NewCustomer>,
    #[validate(range(min = 0.0, max = 100.0, message = "Discount is a percentage"))]
    pub discount: Option<f64>,
    pub notes: Option<String>,
    #[serde(default)]
    #[validate]
    pub schedules: Vec<ScheduleInput>,
    #[serde(default)]
    #[validate]
    pub beos: Vec<BeoInput>,
    #[serde(default)]
    #[validate]
    pub attachments: Vec<AttachmentInput>,
}

/// Partial update. List fields replace the stored list when present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateOrderRequest {
    #[validate(length(min = 1, max = 255, message = "Event name must not be empty"))]
    pub event_name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "At least one venue is required"))]
    pub venue_ids: Option<Vec<i32>>,
    pub customer_id: Option<i32>,
    #[validate(range(min = 0.0, max = 100.0, message = "Discount is a percentage"))]
    pub discount: Option<f64>,
    pub notes: Option<String>,
    #[validate]
    pub schedules: Option<Vec<ScheduleInput>>,
    #[validate]
    pub beos: Option<Vec<BeoInput>>,
    #[validate]
    pub attachments: Option<Vec<AttachmentInput>>,
    /// Only `edited_pending_review` may be requested here
    pub status_beo: Option<BeoStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    pub venue_ids: Vec<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub exclude_order_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BeoDetail {
    #[serde(flatten)]
    pub beo: beo::Model,
    pub attachments: Vec<beo_attachment::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BeoFileView {
    #[serde(flatten)]
    pub file: beo_file::Model,
    pub url: String,
}

/// An order with everything it owns
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: order::Model,
    pub customer: Option<customer::Model>,
    pub venues: Vec<venue::Model>,
    pub schedules: Vec<schedule::Model>,
    pub beos: Vec<BeoDetail>,
    pub attachments: Vec<order_attachment::Model>,
    pub file: Option<BeoFileView>,
}

enum CustomerSource<'a> {
    Existing(i32),
    New(&'a NewCustomer),
}

/// Settings the service needs from configuration
#[derive(Debug, Clone)]
pub struct OrderSettings {
    pub file_code_office: String,
    pub header_assets: Vec<String>,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            file_code_office: "PPKGBK/JICC".to_string(),
            header_assets: Vec::new(),
        }
    }
}

/// Order lifecycle: creation, status transitions, edits and approval.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DatabaseConnection>,
    locks: KeyedLocks,
    storage: Arc<dyn FileStorage>,
    renderer: Arc<dyn DocumentRenderer>,
    dispatcher: NotificationDispatcher,
    event_sender: Option<Arc<EventSender>>,
    settings: OrderSettings,
}

fn validation_error(field: &str, message: impl Into<String>) -> ServiceError {
    ServiceError::ValidationError(format!("{}: {}", field, message.into()))
}

fn ensure_range(field: &str, start: NaiveDate, end: NaiveDate) -> Result<(), ServiceError> {
    if end < start {
        return Err(validation_error(
            field,
            format!("end date {} is before start date {}", end, start),
        ));
    }
    Ok(())
}

fn ensure_schedules(schedules: &[ScheduleInput]) -> Result<(), ServiceError> {
    for (i, s) in schedules.iter().enumerate() {
        ensure_range(&format!("schedules[{}]", i), s.start_date, s.end_date)?;
    }
    Ok(())
}

fn dedup_ids(ids: &[i32]) -> Vec<i32> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

fn db_error(context: &'static str) -> impl Fn(sea_orm::DbErr) -> ServiceError {
    move |e| {
        error!(error = %e, "{}", context);
        ServiceError::DatabaseError(e)
    }
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        locks: KeyedLocks,
        storage: Arc<dyn FileStorage>,
        renderer: Arc<dyn DocumentRenderer>,
        dispatcher: NotificationDispatcher,
        event_sender: Option<Arc<EventSender>>,
        settings: OrderSettings,
    ) -> Self {
        Self {
            db_pool,
            locks,
            storage,
            renderer,
            dispatcher,
            event_sender,
            settings,
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            sender.send_or_log(event).await;
        }
    }

    async fn begin(&self) -> Result<DatabaseTransaction, ServiceError> {
        self.db_pool
            .begin()
            .await
            .map_err(db_error("Failed to start transaction"))
    }

    /// Creates an order in `Inquiry` / `Planning` with a fresh custom code.
    #[instrument(skip(self, request, actor), fields(event_id = request.event_id, actor_id = actor.id))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        actor: &Actor,
    ) -> Result<OrderDetail, ServiceError> {
        actor.require_any(SALES_ROLES, "Creating an order")?;
        request.validate()?;
        ensure_range("end_date", request.start_date, request.end_date)?;
        ensure_schedules(&request.schedules)?;
        let customer_source = match (request.customer_id, request.customer.as_ref()) {
            (Some(id), None) => CustomerSource::Existing(id),
            (None, Some(new_customer)) => CustomerSource::New(new_customer),
            _ => {
                return Err(validation_error(
                    "customer",
                    "provide exactly one of customer_id or customer",
                ))
            }
        };

        let db = &*self.db_pool;
        let event = event::Entity::find_by_id(request.event_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Event {} not found", request.event_id))
            })?;
        let venue_ids = dedup_ids(&request.venue_ids);

        let mut keys = vec![KeyedLocks::code_key(&event.code)];
        keys.extend(venue_ids.iter().map(|id| KeyedLocks::venue_key(*id)));
        let _guard = self.locks.lock_all(keys).await;
        let txn = self.begin().await?;

        ensure_venues_exist(&txn, &venue_ids).await?;
        if let Some(err) = availability::check_availability(
            &txn,
            &venue_ids,
            request.start_date,
            request.end_date,
            None,
        )
        .await?
        .into_error()
        {
            warn!(event_id = request.event_id, "Booking conflict on create");
            return Err(err);
        }
        ensure_beo_references(&txn, &request.beos).await?;

        let customer_id = match customer_source {
            CustomerSource::Existing(id) => {
                ensure_exists::<customer::Entity, _>(&txn, id, "Customer").await?;
                id
            }
            CustomerSource::New(new_customer) => insert_customer(&txn, new_customer).await?.id,
        };

        let custom_code = code_generator::generate_custom_code(&txn, event.id).await?;
        let now = Utc::now();

        let created = order::ActiveModel {
            custom_code: Set(custom_code.clone()),
            event_id: Set(event.id),
            event_name: Set(request.event_name.clone()),
            start_date: Set(request.start_date),
            end_date: Set(request.end_date),
            status: Set(OrderStatus::Inquiry),
            status_beo: Set(BeoStatus::Planning),
            customer_id: Set(customer_id),
            discount: Set(request.discount),
            notes: Set(request.notes.clone()),
            created_by: Set(Some(actor.id)),
            created_at: Set(now),
            updated_at: Set(None),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(db_error("Failed to insert order"))?;

        replace_venues(&txn, created.id, &venue_ids).await?;
        replace_schedules(&txn, created.id, &request.schedules).await?;
        replace_beos(&txn, created.id, &request.beos).await?;
        replace_attachments(&txn, created.id, &request.attachments).await?;

        txn.commit()
            .await
            .map_err(db_error("Failed to commit order creation"))?;

        info!(order_id = created.id, custom_code = %custom_code, "Order created");
        counter!("beo.orders.created", 1);
        self.emit(Event::OrderCreated {
            order_id: created.id,
            custom_code,
        })
        .await;

        self.get_order(created.id).await
    }

    /// `Inquiry -> Confirmed`
    #[instrument(skip(self, actor), fields(actor_id = actor.id))]
    pub async fn confirm_order(&self, order_id: i32, actor: &Actor) -> Result<OrderDetail, ServiceError> {
        actor.require_any(SALES_ROLES, "Confirming an order")?;
        self.transition_status(order_id, OrderStatus::Confirmed).await?;
        self.emit(Event::OrderConfirmed(order_id)).await;
        self.get_order(order_id).await
    }

    /// `Confirmed -> Executed`
    #[instrument(skip(self, actor), fields(actor_id = actor.id))]
    pub async fn execute_order(&self, order_id: i32, actor: &Actor) -> Result<OrderDetail, ServiceError> {
        actor.require_any(SALES_ROLES, "Executing an order")?;
        self.transition_status(order_id, OrderStatus::Executed).await?;
        self.emit(Event::OrderExecuted(order_id)).await;
        self.get_order(order_id).await
    }

    async fn transition_status(&self, order_id: i32, next: OrderStatus) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let current = find_live_order(db, order_id).await?;
        if !current.status.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "order {} is {} and cannot become {}",
                current.custom_code, current.status, next
            )));
        }

        let result = order::Entity::update_many()
            .col_expr(order::Column::Status, Expr::value(next))
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(current.status))
            .filter(order::Column::DeletedAt.is_null())
            .exec(db)
            .await?;
        if result.rows_affected != 1 {
            return Err(ServiceError::InvalidStatus(format!(
                "order {} changed status concurrently",
                current.custom_code
            )));
        }

        info!(order_id, from = %current.status, to = %next, "Order status changed");
        Ok(())
    }

    /// `Planning | EditedPendingReview -> SentToReview`, then tells every kanit.
    #[instrument(skip(self, actor), fields(actor_id = actor.id))]
    pub async fn send_for_review(&self, order_id: i32, actor: &Actor) -> Result<OrderDetail, ServiceError> {
        actor.require_any(SALES_ROLES, "Sending an order for review")?;

        let db = &*self.db_pool;
        let current = find_live_order(db, order_id).await?;
        if !current.status_beo.can_transition_to(BeoStatus::SentToReview) {
            return Err(ServiceError::InvalidStatus(format!(
                "order {} is {} and cannot be sent for review",
                current.custom_code, current.status_beo
            )));
        }

        let result = order::Entity::update_many()
            .col_expr(order::Column::StatusBeo, Expr::value(BeoStatus::SentToReview))
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::StatusBeo.eq(current.status_beo))
            .filter(order::Column::DeletedAt.is_null())
            .exec(db)
            .await?;
        if result.rows_affected != 1 {
            return Err(ServiceError::InvalidStatus(format!(
                "order {} changed review status concurrently",
                current.custom_code
            )));
        }

        info!(order_id, "Order sent for review");
        let detail = self.get_order(order_id).await?;
        self.dispatcher.order_sent_to_kanit(&detail.order, actor).await;
        self.emit(Event::OrderSentForReview {
            order_id,
            sent_by: actor.id,
        })
        .await;
        Ok(detail)
    }

    /// `SentToReview -> Approved`, producing the BEO document.
    ///
    /// The document is rendered and stored before the status changes. The
    /// status change and the file row are committed together, guarded on the
    /// order still being `SentToReview`. On any failure the order stays in
    /// review and a stored document is removed.
    #[instrument(skip(self, actor), fields(actor_id = actor.id))]
    pub async fn approve_order(&self, order_id: i32, actor: &Actor) -> Result<OrderDetail, ServiceError> {
        actor.require_any(REVIEW_ROLES, "Approving an order")?;

        let now = Utc::now();
        let guard = self
            .locks
            .lock(KeyedLocks::file_key(&code_generator::file_period(now)))
            .await;
        let txn = self.begin().await?;

        let current = find_live_order(&txn, order_id).await?;
        if current.status_beo != BeoStatus::SentToReview {
            return Err(ServiceError::InvalidStatus(format!(
                "order {} is {} and cannot be approved",
                current.custom_code, current.status_beo
            )));
        }

        let file_code =
            code_generator::generate_file_code(&txn, &self.settings.file_code_office, now).await?;
        let context = build_document_context(
            &txn,
            self.storage.as_ref(),
            &current,
            &file_code,
            &actor.name,
            &self.settings.header_assets,
            now,
        )
        .await?;
        let document = self.renderer.render(&context).await.map_err(|e| {
            error!(order_id, error = %e, "Document rendering failed");
            ServiceError::from(e)
        })?;

        let path = format!(
            "beo/{:04}/{:02}/{}-{}.{}",
            now.year(),
            now.month(),
            current.custom_code,
            &Uuid::new_v4().simple().to_string()[..8],
            document.extension
        );
        let stored = self.storage.store(&path, &document.bytes).await.map_err(|e| {
            error!(order_id, error = %e, "Storing document failed");
            ServiceError::from(e)
        })?;

        let recorded = self
            .record_approval(
                &txn,
                &current,
                &file_code,
                &stored,
                &document.mime_type,
                document.bytes.len(),
                actor,
                now,
            )
            .await;
        let file = match recorded {
            Ok(file) => file,
            Err(e) => {
                drop(txn);
                self.discard_file(&stored).await;
                return Err(e);
            }
        };
        if let Err(e) = txn.commit().await {
            error!(order_id, error = %e, "Failed to commit approval");
            self.discard_file(&stored).await;
            return Err(ServiceError::DatabaseError(e));
        }
        drop(guard);

        info!(order_id, file_code = %file.file_code, "Order approved");
        counter!("beo.orders.approved", 1);

        let detail = self.get_order(order_id).await?;
        self.dispatcher.order_approved(&detail.order, actor).await;
        self.emit(Event::OrderApproved {
            order_id,
            approved_by: actor.id,
            file_code,
        })
        .await;
        Ok(detail)
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_approval(
        &self,
        txn: &DatabaseTransaction,
        current: &order::Model,
        file_code: &str,
        path: &str,
        mime_type: &str,
        size: usize,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<beo_file::Model, ServiceError> {
        let result = order::Entity::update_many()
            .col_expr(order::Column::StatusBeo, Expr::value(BeoStatus::Approved))
            .col_expr(order::Column::UpdatedAt, Expr::value(now))
            .filter(order::Column::Id.eq(current.id))
            .filter(order::Column::StatusBeo.eq(BeoStatus::SentToReview))
            .filter(order::Column::DeletedAt.is_null())
            .exec(txn)
            .await?;
        if result.rows_affected != 1 {
            return Err(ServiceError::InvalidStatus(format!(
                "order {} left review before approval completed",
                current.custom_code
            )));
        }

        let file = beo_file::ActiveModel {
            order_id: Set(current.id),
            file_code: Set(file_code.to_string()),
            path: Set(path.to_string()),
            size: Set(size as i64),
            mime_type: Set(mime_type.to_string()),
            metadata: Set(json!({
                "custom_code": current.custom_code,
                "approved_by": actor.id,
                "approved_by_name": actor.name,
                "generated_at": now.to_rfc3339(),
            })),
            created_at: Set(now),
            deleted_at: Set(None),
            ..Default::default()
        }
        .insert(txn)
        .await
        .map_err(db_error("Failed to insert BEO file"))?;
        Ok(file)
    }

    async fn discard_file(&self, path: &str) {
        match self.storage.delete(path).await {
            Ok(_) => {}
            Err(e) => warn!(path = %path, error = %e, "Could not remove document"),
        }
    }

    /// Applies a partial edit, then returns an approved order to review if
    /// the edit touched a tracked field.
    ///
    /// `actor` is `None` only for internal callers such as imports; the HTTP
    /// layer always passes the authenticated user.
    #[instrument(skip(self, request, actor), fields(actor_id = actor.map(|a| a.id)))]
    pub async fn update_order(
        &self,
        order_id: i32,
        request: UpdateOrderRequest,
        actor: Option<&Actor>,
    ) -> Result<OrderDetail, ServiceError> {
        if let Some(actor) = actor {
            actor.require_any(EDIT_ROLES, "Editing an order")?;
        }
        request.validate()?;
        if let Some(schedules) = &request.schedules {
            ensure_schedules(schedules)?;
        }
        if let Some(status) = request.status_beo {
            if status != BeoStatus::EditedPendingReview {
                return Err(ServiceError::InvalidStatus(format!(
                    "status_beo can only be set to {} by an edit",
                    BeoStatus::EditedPendingReview
                )));
            }
        }

        // Only edits move an order between venues; holding the order key
        // keeps its venue set fixed until the venue keys are taken.
        let order_guard = self.locks.lock(KeyedLocks::order_key(order_id)).await;
        let stored_venues = venue_ids_of(&*self.db_pool, order_id).await?;
        let venue_ids = request.venue_ids.as_deref().map(dedup_ids);

        let keys: Vec<String> = stored_venues
            .iter()
            .chain(venue_ids.iter().flatten())
            .map(|id| KeyedLocks::venue_key(*id))
            .collect();
        let guard = self.locks.lock_all(keys).await;

        let txn = self.begin().await?;
        let before = find_live_order(&txn, order_id).await?;

        if let Some(status) = request.status_beo {
            if status != before.status_beo && !before.status_beo.can_transition_to(status) {
                return Err(ServiceError::InvalidStatus(format!(
                    "order {} is {} and cannot become {}",
                    before.custom_code, before.status_beo, status
                )));
            }
        }

        let mut changed: Vec<String> = Vec::new();
        let start_date = request.start_date.unwrap_or(before.start_date);
        let end_date = request.end_date.unwrap_or(before.end_date);
        ensure_range("end_date", start_date, end_date)?;

        let venues_changed = venue_ids
            .as_ref()
            .map(|ids| ids.iter().collect::<BTreeSet<_>>() != stored_venues.iter().collect::<BTreeSet<_>>())
            .unwrap_or(false);
        let dates_changed = start_date != before.start_date || end_date != before.end_date;

        if venues_changed || dates_changed {
            let final_venues = venue_ids.clone().unwrap_or_else(|| stored_venues.clone());
            ensure_venues_exist(&txn, &final_venues).await?;
            if let Some(err) = availability::check_availability(
                &txn,
                &final_venues,
                start_date,
                end_date,
                Some(order_id),
            )
            .await?
            .into_error()
            {
                warn!(order_id, "Booking conflict on edit");
                return Err(err);
            }
        }

        let mut active: order::ActiveModel = before.clone().into();
        if let Some(name) = &request.event_name {
            if *name != before.event_name {
                active.event_name = Set(name.clone());
                changed.push("event_name".into());
            }
        }
        if start_date != before.start_date {
            active.start_date = Set(start_date);
            changed.push("start_date".into());
        }
        if end_date != before.end_date {
            active.end_date = Set(end_date);
            changed.push("end_date".into());
        }
        if let Some(customer_id) = request.customer_id {
            if customer_id != before.customer_id {
                ensure_exists::<customer::Entity, _>(&txn, customer_id, "Customer").await?;
                active.customer_id = Set(customer_id);
                changed.push("customer_id".into());
            }
        }
        if let Some(discount) = request.discount {
            if Some(discount) != before.discount {
                active.discount = Set(Some(discount));
                changed.push("discount".into());
            }
        }
        if let Some(notes) = &request.notes {
            if Some(notes) != before.notes.as_ref() {
                active.notes = Set(Some(notes.clone()));
                changed.push("notes".into());
            }
        }

        if venues_changed {
            if let Some(ids) = &venue_ids {
                replace_venues(&txn, order_id, ids).await?;
                changed.push("venues".into());
            }
        }
        if let Some(schedules) = &request.schedules {
            if *schedules != schedule_inputs_of(&txn, order_id).await? {
                replace_schedules(&txn, order_id, schedules).await?;
                changed.push("schedules".into());
            }
        }
        if let Some(beos) = &request.beos {
            if *beos != beo_inputs_of(&txn, order_id).await? {
                ensure_beo_references(&txn, beos).await?;
                replace_beos(&txn, order_id, beos).await?;
                changed.push("beos".into());
            }
        }
        if let Some(attachments) = &request.attachments {
            if *attachments != attachment_inputs_of(&txn, order_id).await? {
                replace_attachments(&txn, order_id, attachments).await?;
                changed.push("attachments".into());
            }
        }

        if !changed.is_empty() {
            active.updated_at = Set(Some(Utc::now()));
            active.update(&txn).await.map_err(db_error("Failed to update order"))?;
        }

        let revision =
            revalidation::revise_after_edit(&txn, &before, &changed, request.status_beo).await?;

        txn.commit()
            .await
            .map_err(db_error("Failed to commit order update"))?;
        drop(guard);
        drop(order_guard);

        info!(order_id, fields = ?changed, demoted = revision.demoted, "Order updated");
        self.after_revision(&before, &revision, actor).await;
        if !changed.is_empty() {
            self.emit(Event::OrderUpdated(order_id)).await;
        }

        self.get_order(order_id).await
    }

    async fn after_revision(&self, before: &order::Model, revision: &Revision, actor: Option<&Actor>) {
        if let Some(path) = &revision.purged_file {
            self.discard_file(path).await;
        }
        if revision.demoted {
            counter!("beo.orders.revised", 1);
        }
        if revision.should_notify() {
            match actor {
                Some(actor) => {
                    let mut order = before.clone();
                    order.status_beo = BeoStatus::EditedPendingReview;
                    self.dispatcher
                        .order_needs_review(&order, actor, &revision.notify_fields)
                        .await;
                }
                None => warn!(
                    order_id = before.id,
                    "Approved order edited without an actor, skipping review notification"
                ),
            }
            self.emit(Event::OrderRevised {
                order_id: before.id,
                changed_fields: revision.notify_fields.clone(),
            })
            .await;
        }
    }

    /// Soft delete. The row keeps its custom code, but the code becomes free
    /// for the next order of the same prefix and the venues are released.
    #[instrument(skip(self, actor), fields(actor_id = actor.id))]
    pub async fn delete_order(&self, order_id: i32, actor: &Actor) -> Result<(), ServiceError> {
        actor.require_any(SALES_ROLES, "Deleting an order")?;

        let db = &*self.db_pool;
        let result = order::Entity::update_many()
            .col_expr(order::Column::DeletedAt, Expr::value(Some(Utc::now())))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::DeletedAt.is_null())
            .exec(db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Order {} not found", order_id)));
        }

        info!(order_id, "Order deleted");
        self.emit(Event::OrderDeleted(order_id)).await;
        Ok(())
    }

    pub async fn check_availability(&self, query: &AvailabilityQuery) -> Result<ConflictResult, ServiceError> {
        availability::check_availability(
            &*self.db_pool,
            &dedup_ids(&query.venue_ids),
            query.start_date,
            query.end_date,
            query.exclude_order_id,
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: i32) -> Result<OrderDetail, ServiceError> {
        let db = &*self.db_pool;
        let order = find_live_order(db, order_id).await?;

        let customer = customer::Entity::find_by_id(order.customer_id).one(db).await?;
        let venue_ids = venue_ids_of(db, order_id).await?;
        let venues = venue::Entity::find()
            .filter(venue::Column::Id.is_in(venue_ids))
            .order_by_asc(venue::Column::Id)
            .all(db)
            .await?;
        let schedules = schedule::Entity::find()
            .filter(schedule::Column::OrderId.eq(order_id))
            .order_by_asc(schedule::Column::Id)
            .all(db)
            .await?;

        let mut beos = Vec::new();
        for b in beo::Entity::find()
            .filter(beo::Column::OrderId.eq(order_id))
            .order_by_asc(beo::Column::Id)
            .all(db)
            .await?
        {
            let attachments = beo_attachment::Entity::find()
                .filter(beo_attachment::Column::BeoId.eq(b.id))
                .order_by_asc(beo_attachment::Column::Id)
                .all(db)
                .await?;
            beos.push(BeoDetail { beo: b, attachments });
        }

        let attachments = order_attachment::Entity::find()
            .filter(order_attachment::Column::OrderId.eq(order_id))
            .order_by_asc(order_attachment::Column::Id)
            .all(db)
            .await?;
        let file = beo_file::Entity::find()
            .filter(beo_file::Column::OrderId.eq(order_id))
            .filter(beo_file::Column::DeletedAt.is_null())
            .one(db)
            .await?
            .map(|file| BeoFileView {
                url: self.storage.url(&file.path),
                file,
            });

        Ok(OrderDetail {
            order,
            customer,
            venues,
            schedules,
            beos,
            attachments,
            file,
        })
    }
}

async fn find_live_order<C: ConnectionTrait>(db: &C, order_id: i32) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(order_id)
        .filter(order::Column::DeletedAt.is_null())
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
}

async fn ensure_exists<E, C>(db: &C, id: i32, label: &str) -> Result<(), ServiceError>
where
    E: EntityTrait,
    <E::PrimaryKey as sea_orm::PrimaryKeyTrait>::ValueType: From<i32>,
    C: ConnectionTrait,
{
    match E::find_by_id(id).one(db).await? {
        Some(_) => Ok(()),
        None => Err(ServiceError::NotFound(format!("{} {} not found", label, id))),
    }
}

async fn ensure_venues_exist<C: ConnectionTrait>(db: &C, venue_ids: &[i32]) -> Result<(), ServiceError> {
    let found: HashSet<i32> = venue::Entity::find()
        .filter(venue::Column::Id.is_in(venue_ids.to_vec()))
        .all(db)
        .await?
        .into_iter()
        .map(|v| v.id)
        .collect();
    let missing: Vec<String> = venue_ids
        .iter()
        .filter(|id| !found.contains(id))
        .map(|id| id.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!("Venue {} not found", missing.join(", "))))
    }
}

async fn ensure_beo_references<C: ConnectionTrait>(db: &C, beos: &[BeoInput]) -> Result<(), ServiceError> {
    for b in beos {
        ensure_exists::<department::Entity, _>(db, b.department_id, "Department").await?;
        if let Some(user_id) = b.user_id {
            ensure_exists::<user::Entity, _>(db, user_id, "User").await?;
        }
        if let Some(package_id) = b.package_id {
            let package = package::Entity::find_by_id(package_id)
                .one(db)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("Package {} not found", package_id)))?;
            if package.department_id != b.department_id {
                return Err(validation_error(
                    "beos.package_id",
                    format!("package {} belongs to another department", package.name),
                ));
            }
        }
    }
    Ok(())
}

async fn insert_customer<C: ConnectionTrait>(db: &C, input: &NewCustomer) -> Result<customer::Model, ServiceError> {
    Ok(customer::ActiveModel {
        organizer: Set(input.organizer.clone()),
        contact_person: Set(input.contact_person.clone()),
        phone: Set(input.phone.clone()),
        email: Set(input.email.clone()),
        address: Set(input.address.clone()),
        kl_status: Set(input.kl_status),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

async fn venue_ids_of<C: ConnectionTrait>(db: &C, order_id: i32) -> Result<Vec<i32>, ServiceError> {
    Ok(order_venue::Entity::find()
        .filter(order_venue::Column::OrderId.eq(order_id))
        .order_by_asc(order_venue::Column::VenueId)
        .all(db)
        .await?
        .into_iter()
        .map(|ov| ov.venue_id)
        .collect())
}

async fn replace_venues<C: ConnectionTrait>(db: &C, order_id: i32, venue_ids: &[i32]) -> Result<(), ServiceError> {
    order_venue::Entity::delete_many()
        .filter(order_venue::Column::OrderId.eq(order_id))
        .exec(db)
        .await?;
    if venue_ids.is_empty() {
        return Ok(());
    }
    order_venue::Entity::insert_many(venue_ids.iter().map(|venue_id| order_venue::ActiveModel {
        order_id: Set(order_id),
        venue_id: Set(*venue_id),
    }))
    .exec_without_returning(db)
    .await?;
    Ok(())
}

async fn schedule_inputs_of<C: ConnectionTrait>(db: &C, order_id: i32) -> Result<Vec<ScheduleInput>, ServiceError> {
    Ok(schedule::Entity::find()
        .filter(schedule::Column::OrderId.eq(order_id))
        .order_by_asc(schedule::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|s| ScheduleInput {
            start_date: s.start_date,
            end_date: s.end_date,
            time_start: s.time_start,
            time_end: s.time_end,
            function: s.function,
            people: s.people,
        })
        .collect())
}

async fn replace_schedules<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
    schedules: &[ScheduleInput],
) -> Result<(), ServiceError> {
    schedule::Entity::delete_many()
        .filter(schedule::Column::OrderId.eq(order_id))
        .exec(db)
        .await?;
    for s in schedules {
        schedule::ActiveModel {
            order_id: Set(order_id),
            start_date: Set(s.start_date),
            end_date: Set(s.end_date),
            time_start: Set(s.time_start),
            time_end: Set(s.time_end),
            function: Set(s.function),
            people: Set(s.people),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn beo_inputs_of<C: ConnectionTrait>(db: &C, order_id: i32) -> Result<Vec<BeoInput>, ServiceError> {
    let mut inputs = Vec::new();
    for b in beo::Entity::find()
        .filter(beo::Column::OrderId.eq(order_id))
        .order_by_asc(beo::Column::Id)
        .all(db)
        .await?
    {
        let attachments = beo_attachment::Entity::find()
            .filter(beo_attachment::Column::BeoId.eq(b.id))
            .order_by_asc(beo_attachment::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|a| AttachmentInput {
                path: a.path,
                original_name: a.original_name,
            })
            .collect();
        inputs.push(BeoInput {
            department_id: b.department_id,
            user_id: b.user_id,
            package_id: b.package_id,
            notes: b.notes,
            attachments,
        });
    }
    Ok(inputs)
}

async fn replace_beos<C: ConnectionTrait>(db: &C, order_id: i32, beos: &[BeoInput]) -> Result<(), ServiceError> {
    beo::Entity::delete_many()
        .filter(beo::Column::OrderId.eq(order_id))
        .exec(db)
        .await?;
    let now = Utc::now();
    for b in beos {
        let created = beo::ActiveModel {
            order_id: Set(order_id),
            department_id: Set(b.department_id),
            user_id: Set(b.user_id),
            package_id: Set(b.package_id),
            notes: Set(b.notes.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        for a in &b.attachments {
            beo_attachment::ActiveModel {
                beo_id: Set(created.id),
                path: Set(a.path.clone()),
                original_name: Set(a.original_name.clone()),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }
    }
    Ok(())
}

async fn attachment_inputs_of<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
) -> Result<Vec<AttachmentInput>, ServiceError> {
    Ok(order_attachment::Entity::find()
        .filter(order_attachment::Column::OrderId.eq(order_id))
        .order_by_asc(order_attachment::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|a| AttachmentInput {
            path: a.path,
            original_name: a.original_name,
        })
        .collect())
}

async fn replace_attachments<C: ConnectionTrait>(
    db: &C,
    order_id: i32,
    attachments: &[AttachmentInput],
) -> Result<(), ServiceError> {
    order_attachment::Entity::delete_many()
        .filter(order_attachment::Column::OrderId.eq(order_id))
        .exec(db)
        .await?;
    let now = Utc::now();
    for a in attachments {
        order_attachment::ActiveModel {
            order_id: Set(order_id),
            path: Set(a.path.clone()),
            original_name: Set(a.original_name.clone()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}
