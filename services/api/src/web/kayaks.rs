//! services/api/src/web/kayaks.rs

use axum::{extract::State, http::StatusCode, Extension, Json};
use kayak_rental_core::domain::Capability;
use kayak_rental_core::reporting::{project_availability, KayakAvailability};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::error::{port_rejection, Rejection};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct KayakResponse {
    pub id: i32,
    pub name: String,
    pub is_stand_up_paddle: bool,
    pub available: bool,
}

impl From<KayakAvailability> for KayakResponse {
    fn from(entry: KayakAvailability) -> Self {
        Self {
            id: entry.kayak.id,
            name: entry.kayak.name,
            is_stand_up_paddle: entry.kayak.is_stand_up_paddle,
            available: entry.available,
        }
    }
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct CreateKayakRequest {
    pub name: String,
    #[serde(default)]
    pub is_stand_up_paddle: bool,
}

/// The fleet, each kayak marked available unless an active rental holds it.
#[utoipa::path(
    get,
    path = "/kayaks",
    responses(
        (status = 200, description = "Fleet with availability", body = [KayakResponse])
    )
)]
pub async fn list_kayaks_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Vec<KayakResponse>>, Rejection> {
    caller.ensure(Capability::ViewRentals)?;

    let (kayaks, rentals) = tokio::try_join!(state.db.list_kayaks(), state.db.list_rentals())
        .map_err(|e| {
            error!("Failed to load fleet: {:?}", e);
            port_rejection(e, "Failed to load kayaks")
        })?;

    let fleet = project_availability(&kayaks, &rentals)
        .into_iter()
        .map(KayakResponse::from)
        .collect();
    Ok(Json(fleet))
}

/// Add a kayak to the fleet.
#[utoipa::path(
    post,
    path = "/kayaks",
    request_body = CreateKayakRequest,
    responses(
        (status = 201, description = "Kayak added", body = KayakResponse),
        (status = 400, description = "Name is required"),
        (status = 403, description = "Caller may not manage the fleet")
    )
)]
pub async fn create_kayak_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(req): Json<CreateKayakRequest>,
) -> Result<(StatusCode, Json<KayakResponse>), Rejection> {
    caller.ensure(Capability::ManageFleet)?;
    let name = req.name.trim();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name is required".to_string()));
    }

    let kayak = state
        .db
        .create_kayak(name, req.is_stand_up_paddle)
        .await
        .map_err(|e| {
            error!("Failed to create kayak: {:?}", e);
            port_rejection(e, "Failed to create kayak")
        })?;
    info!("Added kayak {} ({})", kayak.id, kayak.name);

    Ok((
        StatusCode::CREATED,
        Json(KayakResponse::from(KayakAvailability {
            kayak,
            available: true,
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testing::{as_caller, frozen_now, seeded_state, state_of};
    use kayak_rental_core::domain::{PaymentMethod, RentalType};

    #[tokio::test]
    async fn test_fleet_shows_rented_kayak_as_unavailable() {
        let (state, _, employee) = seeded_state().await;
        let rental = state
            .config
            .tariff
            .quote(4, RentalType::Simple, PaymentMethod::Cash, None, frozen_now());
        state.db.create_rental(rental).await.unwrap();

        let Json(fleet) = list_kayaks_handler(state_of(&state), as_caller(&employee))
            .await
            .unwrap();
        assert_eq!(fleet.len(), 11);
        let out: Vec<i32> = fleet.iter().filter(|k| !k.available).map(|k| k.id).collect();
        assert_eq!(out, vec![4]);
        assert!(fleet.last().unwrap().is_stand_up_paddle);
    }

    #[tokio::test]
    async fn test_only_admins_add_kayaks() {
        let (state, admin, employee) = seeded_state().await;
        let request = || {
            Json(CreateKayakRequest {
                name: "Kayak 12".to_string(),
                is_stand_up_paddle: false,
            })
        };

        let (status, _) = create_kayak_handler(state_of(&state), as_caller(&employee), request())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, Json(kayak)) = create_kayak_handler(state_of(&state), as_caller(&admin), request())
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(kayak.id, 12);
        assert!(kayak.available);
    }
}
