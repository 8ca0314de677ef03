//! Acting user resolution and role checks.
//!
//! Authentication itself happens upstream; requests arrive with the
//! authenticated user's id in the `x-actor-id` header.

use crate::entities::{user, user_role, user_role::Role};
use crate::errors::ServiceError;
use crate::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ACTOR_HEADER: &str = "x-actor-id";

/// The user performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub department_id: Option<i32>,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.has_role(*r))
    }

    /// Fails with `Forbidden` unless the actor holds one of `roles`
    pub fn require_any(&self, roles: &[Role], action: &str) -> Result<(), ServiceError> {
        if self.has_any_role(roles) {
            Ok(())
        } else {
            let allowed = roles
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(" or ");
            Err(ServiceError::Forbidden(format!(
                "{} requires the {} role",
                action, allowed
            )))
        }
    }
}

/// Loads a user together with their roles
pub async fn load_actor<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Option<Actor>, ServiceError> {
    let Some(user) = user::Entity::find_by_id(user_id).one(db).await? else {
        return Ok(None);
    };

    let roles = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .all(db)
        .await?
        .into_iter()
        .map(|r| r.role)
        .collect();

    Ok(Some(Actor {
        id: user.id,
        name: user.name,
        email: user.email,
        department_id: user.department_id,
        roles,
    }))
}

/// Optional actor taken from the `x-actor-id` header
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Option<Actor>);

impl CurrentActor {
    /// The actor, or `Forbidden` when the request is anonymous
    pub fn required(self) -> Result<Actor, ServiceError> {
        self.0.ok_or_else(|| {
            ServiceError::Forbidden(format!("Missing or unknown {} header", ACTOR_HEADER))
        })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(ACTOR_HEADER) else {
            return Ok(CurrentActor(None));
        };

        let user_id: i32 = raw
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("{} must be a user id", ACTOR_HEADER))
            })?;

        let actor = load_actor(&*state.db, user_id).await?;
        if actor.is_none() {
            debug!(user_id, "Actor header names an unknown user");
        }
        Ok(CurrentActor(actor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn actor(roles: Vec<Role>) -> Actor {
        Actor {
            id: 1,
            name: "Sari".into(),
            email: "sari@venue.local".into(),
            department_id: None,
            roles,
        }
    }

    #[test]
    fn require_any_accepts_a_matching_role() {
        let sales = actor(vec![Role::Sales]);
        assert!(sales
            .require_any(&[Role::Sales, Role::Admin], "Creating an order")
            .is_ok());
    }

    #[test]
    fn require_any_names_the_allowed_roles() {
        let pic = actor(vec![Role::Pic]);
        let err = pic
            .require_any(&[Role::Kanit, Role::Admin], "Approving an order")
            .unwrap_err();
        assert_matches!(&err, ServiceError::Forbidden(msg) if msg == "Approving an order requires the kanit or admin role");
    }

    #[test]
    fn anonymous_actor_is_forbidden_when_required() {
        assert_matches!(CurrentActor(None).required(), Err(ServiceError::Forbidden(_)));
    }
}
