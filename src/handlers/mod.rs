pub mod catalog;
pub mod health;
pub mod notifications;
pub mod orders;

use crate::config::AppConfig;
use crate::events::EventSender;
use crate::locks::KeyedLocks;
use crate::notifications::{DatabaseNotifier, LogMailer, Notifier};
use crate::rendering::{DocumentRenderer, HtmlDocumentRenderer};
use crate::services::{
    catalog::CatalogService,
    notification_dispatcher::NotificationDispatcher,
    orders::{OrderService, OrderSettings},
};
use crate::storage::{FileStorage, LocalFileStorage};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub catalog: Arc<CatalogService>,
    pub storage: Arc<dyn FileStorage>,
}

impl AppServices {
    /// Default wiring: local disk storage, HTML documents, database feed plus logged mail
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        config: &AppConfig,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let storage: Arc<dyn FileStorage> = Arc::new(LocalFileStorage::new(
            config.storage_root.clone(),
            config.public_base_url.clone(),
        ));
        let renderer: Arc<dyn DocumentRenderer> = Arc::new(HtmlDocumentRenderer::default());
        let notifier: Arc<dyn Notifier> = Arc::new(DatabaseNotifier::new(
            db_pool.clone(),
            Arc::new(LogMailer::new(config.mail_from.clone())),
            config.public_base_url.clone(),
        ));
        let settings = OrderSettings {
            file_code_office: config.file_code_office.clone(),
            header_assets: config.document_header_assets.clone(),
        };

        Self::with_parts(
            db_pool,
            storage,
            renderer,
            notifier,
            Some(event_sender),
            settings,
        )
    }

    /// Wiring with caller-chosen storage, renderer and notifier
    pub fn with_parts(
        db_pool: Arc<DatabaseConnection>,
        storage: Arc<dyn FileStorage>,
        renderer: Arc<dyn DocumentRenderer>,
        notifier: Arc<dyn Notifier>,
        event_sender: Option<Arc<EventSender>>,
        settings: OrderSettings,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(db_pool.clone(), notifier);
        let orders = Arc::new(OrderService::new(
            db_pool.clone(),
            KeyedLocks::new(),
            storage.clone(),
            renderer,
            dispatcher,
            event_sender,
            settings,
        ));
        let catalog = Arc::new(CatalogService::new(db_pool));

        Self {
            orders,
            catalog,
            storage,
        }
    }
}
