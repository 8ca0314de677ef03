#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use beo_api::{
    auth::{load_actor, Actor},
    config::AppConfig,
    db,
    entities::{customer, department, event, user_role::Role, venue},
    events::EventSender,
    handlers::AppServices,
    notifications::{Channel, NotificationError, Notifier, OrderNotification, Recipient},
    rendering::{BeoDocumentContext, DocumentRenderer, HtmlDocumentRenderer, RenderError, RenderedDocument},
    services::{
        catalog::{CatalogService, CreateDepartmentRequest, CreateEventRequest, CreateUserRequest, CreateVenueRequest},
        orders::{CreateOrderRequest, NewCustomer, OrderService, OrderSettings},
    },
    storage::{FileStorage, LocalFileStorage},
    AppState,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use tempfile::TempDir;
use tokio::sync::{mpsc, Mutex};

/// One delivered notification, flattened for assertions
#[derive(Debug, Clone)]
pub struct Delivery {
    pub kind: &'static str,
    pub notification: OrderNotification,
    pub user_ids: Vec<i32>,
    pub channels: Vec<Channel>,
}

/// Notifier that records instead of delivering
#[derive(Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingNotifier {
    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    pub async fn of_kind(&self, kind: &str) -> Vec<Delivery> {
        self.deliveries()
            .await
            .into_iter()
            .filter(|d| d.kind == kind)
            .collect()
    }

    pub async fn clear(&self) {
        self.deliveries.lock().await.clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        notification: &OrderNotification,
        recipients: &[Recipient],
        channels: &[Channel],
    ) -> Result<(), NotificationError> {
        self.deliveries.lock().await.push(Delivery {
            kind: notification.kind(),
            notification: notification.clone(),
            user_ids: recipients.iter().map(|r| r.user_id).collect(),
            channels: channels.to_vec(),
        });
        Ok(())
    }
}

/// Renderer that always fails, for approval rollback tests
pub struct FailingRenderer;

#[async_trait]
impl DocumentRenderer for FailingRenderer {
    async fn render(&self, _context: &BeoDocumentContext) -> Result<RenderedDocument, RenderError> {
        Err(RenderError::Unavailable("renderer offline".into()))
    }
}

pub struct Fixtures {
    pub conference: event::Model,
    pub hall_a: venue::Model,
    pub hall_b: venue::Model,
    pub hall_c: venue::Model,
    pub catering: department::Model,
    pub decoration: department::Model,
    pub customer: customer::Model,
    pub admin: Actor,
    pub sales: Actor,
    pub kanit: Actor,
    pub kanit2: Actor,
    pub pic: Actor,
}

pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub orders: Arc<OrderService>,
    pub catalog: Arc<CatalogService>,
    pub storage: Arc<LocalFileStorage>,
    pub notifier: Arc<RecordingNotifier>,
    pub state: AppState,
    pub fixtures: Fixtures,
    _event_task: tokio::task::JoinHandle<()>,
    _dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_renderer(Arc::new(HtmlDocumentRenderer)).await
    }

    pub async fn with_renderer(renderer: Arc<dyn DocumentRenderer>) -> Self {
        Self::build(renderer, 1).await
    }

    /// Several pooled connections, so transactions can genuinely interleave
    /// and only the keyed locks serialize conflicting work
    pub async fn with_pool_size(connections: u32) -> Self {
        Self::build(Arc::new(HtmlDocumentRenderer), connections).await
    }

    /// Fresh SQLite file database, migrated and seeded
    async fn build(renderer: Arc<dyn DocumentRenderer>, connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("beo_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = connections;
        cfg.db_min_connections = 1;
        cfg.storage_root = dir.path().join("storage").display().to_string();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(beo_api::events::process_events(event_rx, Vec::new()));

        let storage = Arc::new(LocalFileStorage::new(
            cfg.storage_root.clone(),
            cfg.public_base_url.clone(),
        ));
        let notifier = Arc::new(RecordingNotifier::default());
        let services = AppServices::with_parts(
            db_arc.clone(),
            storage.clone() as Arc<dyn FileStorage>,
            renderer,
            notifier.clone() as Arc<dyn Notifier>,
            Some(event_sender.clone()),
            OrderSettings::default(),
        );

        let state = AppState {
            db: db_arc.clone(),
            config: cfg,
            event_sender,
            services: services.clone(),
        };

        let fixtures = seed(&services.catalog, &db_arc).await;

        Self {
            db: db_arc,
            orders: services.orders.clone(),
            catalog: services.catalog.clone(),
            storage,
            notifier,
            state,
            fixtures,
            _event_task: event_task,
            _dir: dir,
        }
    }

    pub fn router(&self) -> Router {
        beo_api::app_router(self.state.clone())
    }

    /// Order request for the conference event booking `venue_ids`
    pub fn order_request(&self, venue_ids: Vec<i32>, start: NaiveDate, end: NaiveDate) -> CreateOrderRequest {
        CreateOrderRequest {
            event_id: self.fixtures.conference.id,
            event_name: "Annual Summit".to_string(),
            start_date: start,
            end_date: end,
            venue_ids,
            customer_id: Some(self.fixtures.customer.id),
            customer: None,
            discount: None,
            notes: None,
            schedules: Vec::new(),
            beos: Vec::new(),
            attachments: Vec::new(),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

async fn user(catalog: &CatalogService, db: &DatabaseConnection, name: &str, department_id: Option<i32>, roles: Vec<Role>) -> Actor {
    let created = catalog
        .create_user(CreateUserRequest {
            name: name.to_string(),
            email: format!("{}@venue.local", name.to_lowercase()),
            department_id,
            roles,
        })
        .await
        .expect("create user");
    load_actor(db, created.user.id)
        .await
        .expect("load actor")
        .expect("actor exists")
}

async fn seed(catalog: &CatalogService, db: &DatabaseConnection) -> Fixtures {
    let conference = catalog
        .create_event(CreateEventRequest {
            event_type: "conference".into(),
        })
        .await
        .expect("create event");

    let mut venues = Vec::new();
    for name in ["Hall A", "Hall B", "Hall C"] {
        venues.push(
            catalog
                .create_venue(CreateVenueRequest {
                    name: name.into(),
                    capacity_banquet: Some(300),
                    ..Default::default()
                })
                .await
                .expect("create venue"),
        );
    }
    let hall_c = venues.pop().expect("hall c");
    let hall_b = venues.pop().expect("hall b");
    let hall_a = venues.pop().expect("hall a");

    let catering = catalog
        .create_department(CreateDepartmentRequest {
            name: "Catering".into(),
        })
        .await
        .expect("create department");
    let decoration = catalog
        .create_department(CreateDepartmentRequest {
            name: "Decoration".into(),
        })
        .await
        .expect("create department");

    let customer = catalog
        .create_customer(NewCustomer {
            organizer: "Ministry of Tourism".into(),
            contact_person: "Budi".into(),
            phone: "0812000111".into(),
            email: "budi@tourism.example".into(),
            address: None,
            kl_status: true,
        })
        .await
        .expect("create customer");

    let admin = user(catalog, db, "Admin", None, vec![Role::Admin]).await;
    let sales = user(catalog, db, "Sari", None, vec![Role::Sales]).await;
    let kanit = user(catalog, db, "Kartika", None, vec![Role::Kanit]).await;
    let kanit2 = user(catalog, db, "Kurnia", None, vec![Role::Kanit]).await;
    let pic = user(catalog, db, "Putra", Some(catering.id), vec![Role::Pic]).await;

    Fixtures {
        conference,
        hall_a,
        hall_b,
        hall_c,
        catering,
        decoration,
        customer,
        admin,
        sales,
        kanit,
        kanit2,
        pic,
    }
}
