//! Reference data orders point at: events, venues, customers, departments,
//! packages and users.

use crate::{
    entities::{customer, department, event, package, user, user_role, user_role::Role, venue},
    errors::ServiceError,
    services::{code_generator::event_code_for, orders::NewCustomer},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 100, message = "Event type is required"))]
    pub event_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CreateVenueRequest {
    #[validate(length(min = 1, max = 255, message = "Venue name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub capacity_banquet: Option<i32>,
    #[validate(range(min = 0))]
    pub capacity_classroom: Option<i32>,
    #[validate(range(min = 0))]
    pub capacity_theater: Option<i32>,
    #[validate(range(min = 0))]
    pub capacity_reception: Option<i32>,
    pub photo: Option<String>,
    pub floor_plan: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateDepartmentRequest {
    #[validate(length(min = 1, max = 255, message = "Department name is required"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePackageRequest {
    pub department_id: i32,
    #[validate(length(min = 1, max = 255, message = "Package name is required"))]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Email must be valid"))]
    pub email: String,
    pub department_id: Option<i32>,
    #[validate(length(min = 1, message = "At least one role is required"))]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserWithRoles {
    #[serde(flatten)]
    pub user: user::Model,
    pub roles: Vec<Role>,
}

#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DatabaseConnection>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    /// Registers an event type and fixes its order-code prefix
    #[instrument(skip(self, request), fields(event_type = %request.event_type))]
    pub async fn create_event(&self, request: CreateEventRequest) -> Result<event::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let event_type = request.event_type.trim().to_string();

        let existing = event::Entity::find()
            .filter(event::Column::EventType.eq(event_type.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Event type {} already exists",
                event_type
            )));
        }

        let code = event_code_for(&event_type);
        let created = event::ActiveModel {
            event_type: Set(event_type),
            code: Set(code.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(event_id = created.id, code = %created.code, "Event created");
        Ok(created)
    }

    pub async fn list_events(&self) -> Result<Vec<event::Model>, ServiceError> {
        Ok(event::Entity::find()
            .order_by_asc(event::Column::EventType)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_venue(&self, request: CreateVenueRequest) -> Result<venue::Model, ServiceError> {
        request.validate()?;
        let created = venue::ActiveModel {
            name: Set(request.name),
            description: Set(request.description),
            capacity_banquet: Set(request.capacity_banquet),
            capacity_classroom: Set(request.capacity_classroom),
            capacity_theater: Set(request.capacity_theater),
            capacity_reception: Set(request.capacity_reception),
            photo: Set(request.photo),
            floor_plan: Set(request.floor_plan),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;

        info!(venue_id = created.id, "Venue created");
        Ok(created)
    }

    pub async fn list_venues(&self) -> Result<Vec<venue::Model>, ServiceError> {
        Ok(venue::Entity::find()
            .order_by_asc(venue::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, request))]
    pub async fn create_customer(&self, request: NewCustomer) -> Result<customer::Model, ServiceError> {
        request.validate()?;
        let created = customer::ActiveModel {
            organizer: Set(request.organizer),
            contact_person: Set(request.contact_person),
            phone: Set(request.phone),
            email: Set(request.email),
            address: Set(request.address),
            kl_status: Set(request.kl_status),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;

        info!(customer_id = created.id, "Customer created");
        Ok(created)
    }

    pub async fn list_customers(&self) -> Result<Vec<customer::Model>, ServiceError> {
        Ok(customer::Entity::find()
            .order_by_asc(customer::Column::Organizer)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_department(
        &self,
        request: CreateDepartmentRequest,
    ) -> Result<department::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        if department::Entity::find()
            .filter(department::Column::Name.eq(request.name.clone()))
            .one(db)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Department {} already exists",
                request.name
            )));
        }

        let created = department::ActiveModel {
            name: Set(request.name),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await?;
        Ok(created)
    }

    pub async fn list_departments(&self) -> Result<Vec<department::Model>, ServiceError> {
        Ok(department::Entity::find()
            .order_by_asc(department::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, request), fields(department_id = request.department_id))]
    pub async fn create_package(&self, request: CreatePackageRequest) -> Result<package::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        department::Entity::find_by_id(request.department_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Department {} not found", request.department_id))
            })?;
        if package::Entity::find()
            .filter(package::Column::Name.eq(request.name.clone()))
            .one(db)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "Package {} already exists",
                request.name
            )));
        }

        Ok(package::ActiveModel {
            department_id: Set(request.department_id),
            name: Set(request.name),
            description: Set(request.description),
            ..Default::default()
        }
        .insert(db)
        .await?)
    }

    /// Packages offered by one department, or all of them
    pub async fn list_packages(&self, department_id: Option<i32>) -> Result<Vec<package::Model>, ServiceError> {
        let mut query = package::Entity::find();
        if let Some(id) = department_id {
            query = query.filter(package::Column::DepartmentId.eq(id));
        }
        Ok(query
            .order_by_asc(package::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserWithRoles, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        if user::Entity::find()
            .filter(user::Column::Email.eq(request.email.clone()))
            .one(db)
            .await?
            .is_some()
        {
            return Err(ServiceError::Conflict(format!(
                "User {} already exists",
                request.email
            )));
        }
        if let Some(department_id) = request.department_id {
            department::Entity::find_by_id(department_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Department {} not found", department_id))
                })?;
        }

        let mut roles = request.roles.clone();
        roles.sort_by_key(|r| r.to_string());
        roles.dedup();

        let txn = db.begin().await?;
        let created = user::ActiveModel {
            name: Set(request.name),
            email: Set(request.email),
            department_id: Set(request.department_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        user_role::Entity::insert_many(roles.iter().map(|role| user_role::ActiveModel {
            user_id: Set(created.id),
            role: Set(*role),
        }))
        .exec_without_returning(&txn)
        .await?;
        txn.commit().await?;

        info!(user_id = created.id, roles = ?roles, "User created");
        Ok(UserWithRoles {
            user: created,
            roles,
        })
    }

    pub async fn list_users(&self) -> Result<Vec<UserWithRoles>, ServiceError> {
        let db = &*self.db_pool;
        let users = user::Entity::find()
            .order_by_asc(user::Column::Id)
            .all(db)
            .await?;
        let mut roles = user_role::Entity::find().all(db).await?;
        roles.sort_by_key(|r| r.role.to_string());

        Ok(users
            .into_iter()
            .map(|u| UserWithRoles {
                roles: roles
                    .iter()
                    .filter(|r| r.user_id == u.id)
                    .map(|r| r.role)
                    .collect(),
                user: u,
            })
            .collect())
    }
}
