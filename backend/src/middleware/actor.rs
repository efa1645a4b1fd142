//! Caller identity
//!
//! Authentication happens upstream; requests arrive with the caller's ID in
//! `x-actor-id` and an optional `x-actor-role` (defaults to staff).

use axum::http::request::Parts;
use shared::{Actor, ActorRole};
use uuid::Uuid;

use crate::error::AppError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// The actor performing the request
#[derive(Clone, Copy, Debug)]
pub struct CurrentActor(pub Actor);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        actor_from_parts(parts).map(CurrentActor)
    }
}

fn actor_from_parts(parts: &Parts) -> Result<Actor, AppError> {
    let id = parts
        .headers
        .get(ACTOR_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", ACTOR_ID_HEADER)))?;
    let id = Uuid::parse_str(id.trim())
        .map_err(|_| AppError::Unauthorized(format!("Invalid {} header", ACTOR_ID_HEADER)))?;

    let role = match parts.headers.get(ACTOR_ROLE_HEADER) {
        None => ActorRole::default(),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|s| s.parse::<ActorRole>().ok())
            .ok_or_else(|| AppError::Unauthorized(format!("Invalid {} header", ACTOR_ROLE_HEADER)))?,
    };

    Ok(Actor::new(id, role))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_actor_defaults_to_staff() {
        let id = Uuid::new_v4();
        let actor = actor_from_parts(&parts(&[(ACTOR_ID_HEADER, &id.to_string())])).unwrap();
        assert_eq!(actor.id, id);
        assert!(!actor.is_admin());
    }

    #[test]
    fn test_admin_role_header() {
        let id = Uuid::new_v4().to_string();
        let actor =
            actor_from_parts(&parts(&[(ACTOR_ID_HEADER, &id), (ACTOR_ROLE_HEADER, "Admin")])).unwrap();
        assert!(actor.is_admin());
    }

    #[test]
    fn test_missing_or_invalid_identity_is_unauthorized() {
        assert!(matches!(
            actor_from_parts(&parts(&[])),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            actor_from_parts(&parts(&[(ACTOR_ID_HEADER, "not-a-uuid")])),
            Err(AppError::Unauthorized(_))
        ));
        let id = Uuid::new_v4().to_string();
        assert!(matches!(
            actor_from_parts(&parts(&[(ACTOR_ID_HEADER, &id), (ACTOR_ROLE_HEADER, "owner")])),
            Err(AppError::Unauthorized(_))
        ));
    }
}
