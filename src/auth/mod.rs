/*!
 * # Principal extraction and access control
 *
 * Authentication happens upstream; this service receives the acting user as
 * trusted request headers and only decides what that user may do.
 */

pub mod policy;

use crate::errors::ApiError;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

pub use policy::{allowed, authorize, Operation};

/// Header carrying the acting user's id
pub const ACTOR_ID_HEADER: &str = "x-actor-id";
/// Header carrying the acting user's role
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
/// Optional header naming the facility the actor works at
pub const FACILITY_ID_HEADER: &str = "x-facility-id";

/// Staff roles known to the pharmacy
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[strum(ascii_case_insensitive)]
pub enum Role {
    #[strum(to_string = "SuperAdmin", serialize = "Super Admin", serialize = "super_admin")]
    SuperAdmin,
    #[strum(
        to_string = "FacilityAdmin",
        serialize = "Facility Admin",
        serialize = "facility_admin"
    )]
    FacilityAdmin,
    Doctor,
    Nurse,
    Pharmacist,
}

/// The authenticated user on whose behalf a request runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub actor_id: Uuid,
    pub role: Role,
    pub facility_id: Option<i32>,
}

impl Principal {
    pub fn new(actor_id: Uuid, role: Role) -> Self {
        Self {
            actor_id,
            role,
            facility_id: None,
        }
    }

    pub fn with_facility(mut self, facility_id: i32) -> Self {
        self.facility_id = Some(facility_id);
        self
    }

    fn from_parts(parts: &Parts) -> Result<Self, String> {
        let header = |name: &str| -> Result<Option<&str>, String> {
            parts
                .headers
                .get(name)
                .map(|v| v.to_str().map(str::trim))
                .transpose()
                .map_err(|_| format!("Header {} is not valid text", name))
        };

        let actor_id = header(ACTOR_ID_HEADER)?
            .ok_or_else(|| format!("Missing {} header", ACTOR_ID_HEADER))
            .and_then(|raw| {
                Uuid::parse_str(raw).map_err(|_| format!("Invalid {} header", ACTOR_ID_HEADER))
            })?;

        let role = header(ACTOR_ROLE_HEADER)?
            .ok_or_else(|| format!("Missing {} header", ACTOR_ROLE_HEADER))
            .and_then(|raw| {
                Role::from_str(raw).map_err(|_| format!("Unknown role '{}'", raw))
            })?;

        let facility_id = match header(FACILITY_ID_HEADER)? {
            Some(raw) => Some(
                raw.parse::<i32>()
                    .map_err(|_| format!("Invalid {} header", FACILITY_ID_HEADER))?,
            ),
            None => None,
        };

        Ok(Self {
            actor_id,
            role,
            facility_id,
        })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Principal::from_parts(parts).map_err(|reason| {
            tracing::debug!(%reason, "Rejecting request without a usable principal");
            ApiError::Unauthorized(reason)
        })
    }
}
