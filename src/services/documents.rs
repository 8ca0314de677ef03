use crate::entities::{
    beo, beo_attachment, customer, department, event, order, order_attachment, order_venue,
    package, schedule, user, venue,
};
use crate::errors::ServiceError;
use crate::rendering::{BeoDocumentContext, BeoSection, InlineImage};
use crate::storage::FileStorage;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;
use tracing::warn;

async fn inline_images(storage: &dyn FileStorage, paths: &[(String, Option<String>)]) -> Vec<InlineImage> {
    let mut images = Vec::with_capacity(paths.len());
    for (path, original_name) in paths {
        match storage.read(path).await {
            Ok(bytes) => {
                let name = original_name.as_deref().unwrap_or(path);
                // Guess the mime type from the stored path, which keeps its extension
                let mut image = InlineImage::from_bytes(path, &bytes);
                image.name = name.to_string();
                images.push(image);
            }
            Err(e) => warn!(path = %path, error = %e, "Skipping unreadable attachment"),
        }
    }
    images
}

/// Loads the order graph and resolves every image to an inline data URI
pub async fn build_document_context<C: ConnectionTrait>(
    db: &C,
    storage: &dyn FileStorage,
    order: &order::Model,
    file_code: &str,
    approved_by: &str,
    header_assets: &[String],
    generated_at: DateTime<Utc>,
) -> Result<BeoDocumentContext, ServiceError> {
    let event = event::Entity::find_by_id(order.event_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Event {} not found", order.event_id)))?;
    let customer = customer::Entity::find_by_id(order.customer_id)
        .one(db)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Customer {} not found", order.customer_id))
        })?;

    let venue_ids: Vec<i32> = order_venue::Entity::find()
        .filter(order_venue::Column::OrderId.eq(order.id))
        .all(db)
        .await?
        .into_iter()
        .map(|ov| ov.venue_id)
        .collect();
    let venues = venue::Entity::find()
        .filter(venue::Column::Id.is_in(venue_ids))
        .order_by_asc(venue::Column::Name)
        .all(db)
        .await?;

    let schedules = schedule::Entity::find()
        .filter(schedule::Column::OrderId.eq(order.id))
        .order_by_asc(schedule::Column::StartDate)
        .order_by_asc(schedule::Column::TimeStart)
        .all(db)
        .await?;

    let beos = beo::Entity::find()
        .filter(beo::Column::OrderId.eq(order.id))
        .order_by_asc(beo::Column::Id)
        .all(db)
        .await?;
    let departments: HashMap<i32, String> = department::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|d| (d.id, d.name))
        .collect();
    let pic_ids: Vec<i32> = beos.iter().filter_map(|b| b.user_id).collect();
    let pics: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(pic_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();
    let package_ids: Vec<i32> = beos.iter().filter_map(|b| b.package_id).collect();
    let packages: HashMap<i32, String> = package::Entity::find()
        .filter(package::Column::Id.is_in(package_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();

    let mut sections = Vec::with_capacity(beos.len());
    for b in beos {
        let attachments: Vec<(String, Option<String>)> = beo_attachment::Entity::find()
            .filter(beo_attachment::Column::BeoId.eq(b.id))
            .order_by_asc(beo_attachment::Column::Id)
            .all(db)
            .await?
            .into_iter()
            .map(|a| (a.path, a.original_name))
            .collect();

        sections.push(BeoSection {
            department_name: departments
                .get(&b.department_id)
                .cloned()
                .unwrap_or_default(),
            pic_name: b.user_id.and_then(|id| pics.get(&id).cloned()),
            package_name: b.package_id.and_then(|id| packages.get(&id).cloned()),
            images: inline_images(storage, &attachments).await,
            beo: b,
        });
    }

    let order_attachments: Vec<(String, Option<String>)> = order_attachment::Entity::find()
        .filter(order_attachment::Column::OrderId.eq(order.id))
        .order_by_asc(order_attachment::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.path, a.original_name))
        .collect();

    let header_paths: Vec<(String, Option<String>)> =
        header_assets.iter().map(|p| (p.clone(), None)).collect();

    Ok(BeoDocumentContext {
        file_code: file_code.to_string(),
        generated_at,
        approved_by: approved_by.to_string(),
        order: order.clone(),
        event,
        customer,
        venues,
        schedules,
        sections,
        order_images: inline_images(storage, &order_attachments).await,
        header_images: inline_images(storage, &header_paths).await,
    })
}
