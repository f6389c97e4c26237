//! services/api/src/web/rentals.rs
//!
//! Handlers for registering, listing and closing rentals.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use kayak_rental_core::domain::{Capability, RentalStatus};
use kayak_rental_core::reporting::{filter_by_window, is_available, RentalSearch};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{port_rejection, Rejection};
use crate::web::middleware::AuthUser;
use crate::web::protocol::{
    ContactInfoBody, PaymentMethodTag, RentalResponse, RentalStatusTag, RentalTypeTag,
};
use crate::web::reports::{window_for, PeriodQuery};
use crate::web::state::AppState;

/// Largest amount a rental may carry: the range of the `BIGINT` column.
pub const MAX_AMOUNT: u64 = i64::MAX as u64;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct RentalListQuery {
    /// One of `day`, `week`, `month`, `custom`. Absent lists every rental.
    pub period: Option<String>,
    /// Custom start: RFC 3339 instant or `YYYY-MM-DD` (local midnight).
    pub start: Option<String>,
    /// Custom end: RFC 3339 instant or `YYYY-MM-DD`.
    pub end: Option<String>,
    #[serde(rename = "type")]
    pub rental_type: Option<RentalTypeTag>,
    pub payment_method: Option<PaymentMethodTag>,
    /// Case-insensitive match on the kayak name or the rental id.
    pub q: Option<String>,
}

impl RentalListQuery {
    fn period(&self) -> PeriodQuery {
        PeriodQuery {
            period: self.period.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }

    fn search(&self) -> RentalSearch {
        RentalSearch {
            rental_type: self.rental_type.map(Into::into),
            payment_method: self.payment_method.map(Into::into),
            text: self.q.clone(),
        }
    }
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct CreateRentalRequest {
    pub kayak_id: i32,
    #[serde(rename = "type")]
    pub rental_type: RentalTypeTag,
    pub payment_method: PaymentMethodTag,
    /// Overrides the tariff price for this rental type.
    pub amount: Option<u64>,
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct UpdateRentalRequest {
    pub status: RentalStatusTag,
    pub contact_info: Option<ContactInfoBody>,
}

/// An active rental with the countdown the rentals board shows.
#[derive(serde::Serialize, ToSchema, Debug, Clone)]
pub struct ActiveRentalResponse {
    #[serde(flatten)]
    pub rental: RentalResponse,
    pub kayak_name: Option<String>,
    pub remaining_seconds: i64,
    pub overdue: bool,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List rentals, optionally restricted to a period, a type, a payment method
/// or a search text.
#[utoipa::path(
    get,
    path = "/rentals",
    params(RentalListQuery),
    responses(
        (status = 200, description = "Rentals in start-time order", body = [RentalResponse]),
        (status = 400, description = "Unknown period")
    )
)]
pub async fn list_rentals_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Query(query): Query<RentalListQuery>,
) -> Result<Json<Vec<RentalResponse>>, Rejection> {
    caller.ensure(Capability::ViewRentals)?;
    let window = window_for(&state, &query.period())?;
    let search = query.search();

    let (rentals, kayaks) = tokio::try_join!(state.db.list_rentals(), state.db.list_kayaks())
        .map_err(|e| {
            error!("Failed to load rentals: {:?}", e);
            port_rejection(e, "Failed to load rentals")
        })?;
    let names: HashMap<i32, String> = kayaks.into_iter().map(|k| (k.id, k.name)).collect();

    let selected = filter_by_window(&rentals, window.as_ref())
        .into_iter()
        .filter(|r| search.matches(r, names.get(&r.kayak_id).map(String::as_str)))
        .cloned()
        .map(RentalResponse::from)
        .collect();
    Ok(Json(selected))
}

/// List active rentals with time remaining until their nominal end.
#[utoipa::path(
    get,
    path = "/rentals/active",
    responses(
        (status = 200, description = "Active rentals", body = [ActiveRentalResponse])
    )
)]
pub async fn active_rentals_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Vec<ActiveRentalResponse>>, Rejection> {
    caller.ensure(Capability::ViewRentals)?;

    let (rentals, kayaks) = tokio::try_join!(state.db.list_rentals(), state.db.list_kayaks())
        .map_err(|e| {
            error!("Failed to load active rentals: {:?}", e);
            port_rejection(e, "Failed to load rentals")
        })?;
    let names: HashMap<i32, String> = kayaks.into_iter().map(|k| (k.id, k.name)).collect();

    let now = state.now();
    let active = rentals
        .into_iter()
        .filter(|r| r.status == RentalStatus::Active)
        .map(|r| ActiveRentalResponse {
            kayak_name: names.get(&r.kayak_id).cloned(),
            remaining_seconds: r.remaining(now).num_seconds(),
            overdue: r.is_overdue(now),
            rental: r.into(),
        })
        .collect();
    Ok(Json(active))
}

/// Register a rental starting now.
#[utoipa::path(
    post,
    path = "/rentals",
    request_body = CreateRentalRequest,
    responses(
        (status = 201, description = "Rental registered", body = RentalResponse),
        (status = 400, description = "Amount is zero or above the maximum"),
        (status = 404, description = "Unknown kayak"),
        (status = 409, description = "Kayak is already out")
    )
)]
pub async fn create_rental_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Json(req): Json<CreateRentalRequest>,
) -> Result<(StatusCode, Json<RentalResponse>), Rejection> {
    caller.ensure(Capability::RegisterRentals)?;
    match req.amount {
        Some(0) => {
            return Err((StatusCode::BAD_REQUEST, "Amount must be positive".to_string()));
        }
        Some(amount) if amount > MAX_AMOUNT => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Amount must not exceed {}", MAX_AMOUNT),
            ));
        }
        _ => {}
    }

    // 1. The kayak must exist and be free. The check is advisory: two
    //    terminals racing can both pass it.
    let kayak = state.db.get_kayak(req.kayak_id).await.map_err(|e| {
        warn!("Rental requested for kayak {}: {:?}", req.kayak_id, e);
        port_rejection(e, "Failed to load kayak")
    })?;
    let rentals = state.db.list_rentals().await.map_err(|e| {
        error!("Failed to load rentals: {:?}", e);
        port_rejection(e, "Failed to load rentals")
    })?;
    if !is_available(kayak.id, &rentals) {
        return Err((
            StatusCode::CONFLICT,
            format!("{} is already rented", kayak.name),
        ));
    }

    // 2. Price it and store it
    let new_rental = state.config.tariff.quote(
        kayak.id,
        req.rental_type.into(),
        req.payment_method.into(),
        req.amount,
        state.now(),
    );
    let rental = state.db.create_rental(new_rental).await.map_err(|e| {
        error!("Failed to create rental: {:?}", e);
        port_rejection(e, "Failed to create rental")
    })?;

    info!(
        "User {} rented {} ({} / {} / {})",
        caller.user_id,
        kayak.name,
        rental.rental_type.as_str(),
        rental.payment_method.as_str(),
        rental.amount
    );
    Ok((StatusCode::CREATED, Json(rental.into())))
}

/// Complete or cancel an active rental.
#[utoipa::path(
    patch,
    path = "/rentals/{id}",
    request_body = UpdateRentalRequest,
    params(("id" = Uuid, Path, description = "Rental id")),
    responses(
        (status = 200, description = "Rental updated", body = RentalResponse),
        (status = 404, description = "Unknown rental"),
        (status = 409, description = "Rental is not active")
    )
)]
pub async fn update_rental_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Path(rental_id): Path<Uuid>,
    Json(req): Json<UpdateRentalRequest>,
) -> Result<Json<RentalResponse>, Rejection> {
    caller.ensure(Capability::RegisterRentals)?;

    let rental = state
        .db
        .update_rental_status(
            rental_id,
            req.status.into(),
            req.contact_info.map(Into::into),
        )
        .await
        .map_err(|e| {
            warn!("Failed to update rental {}: {:?}", rental_id, e);
            port_rejection(e, "Failed to update rental")
        })?;

    info!("Rental {} is now {}", rental.id, rental.status);
    Ok(Json(rental.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::reports::report_summary_handler;
    use crate::web::testing::{as_caller, frozen_now, seeded_state, state_of};
    use chrono::Duration;

    fn rent(
        kayak_id: i32,
        rental_type: RentalTypeTag,
        amount: Option<u64>,
    ) -> Json<CreateRentalRequest> {
        Json(CreateRentalRequest {
            kayak_id,
            rental_type,
            payment_method: PaymentMethodTag::Cash,
            amount,
        })
    }

    #[tokio::test]
    async fn test_rental_is_priced_from_tariff_and_starts_now() {
        let (state, _, employee) = seeded_state().await;

        let (status, Json(rental)) = create_rental_handler(
            state_of(&state),
            as_caller(&employee),
            rent(3, RentalTypeTag::Double, None),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(rental.amount, 8000);
        assert_eq!(rental.status, RentalStatusTag::Active);
        assert_eq!(rental.start_time, frozen_now());
        assert_eq!(rental.end_time, frozen_now() + Duration::minutes(30));
    }

    #[tokio::test]
    async fn test_rented_kayak_cannot_be_rented_again_until_returned() {
        let (state, _, employee) = seeded_state().await;
        let (_, Json(first)) = create_rental_handler(
            state_of(&state),
            as_caller(&employee),
            rent(1, RentalTypeTag::Simple, None),
        )
        .await
        .unwrap();

        let (status, _) = create_rental_handler(
            state_of(&state),
            as_caller(&employee),
            rent(1, RentalTypeTag::Simple, None),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);

        let Json(done) = update_rental_handler(
            state_of(&state),
            as_caller(&employee),
            Path(first.id),
            Json(UpdateRentalRequest {
                status: RentalStatusTag::Completed,
                contact_info: Some(ContactInfoBody {
                    phone: Some(" 555-0101 ".to_string()),
                    email: Some(String::new()),
                }),
            }),
        )
        .await
        .unwrap();
        assert_eq!(done.status, RentalStatusTag::Completed);
        let contact = done.contact_info.unwrap();
        assert_eq!(contact.phone.as_deref(), Some("555-0101"));
        assert_eq!(contact.email, None);

        assert!(create_rental_handler(
            state_of(&state),
            as_caller(&employee),
            rent(1, RentalTypeTag::Simple, None),
        )
        .await
        .is_ok());
    }

    #[tokio::test]
    async fn test_finished_rental_cannot_change_again() {
        let (state, _, employee) = seeded_state().await;
        let (_, Json(rental)) = create_rental_handler(
            state_of(&state),
            as_caller(&employee),
            rent(2, RentalTypeTag::Simple, None),
        )
        .await
        .unwrap();

        let close = |status| {
            update_rental_handler(
                state_of(&state),
                as_caller(&employee),
                Path(rental.id),
                Json(UpdateRentalRequest {
                    status,
                    contact_info: None,
                }),
            )
        };
        assert!(close(RentalStatusTag::Cancelled).await.is_ok());
        let (status, _) = close(RentalStatusTag::Completed).await.unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_amount_is_capped_and_large_totals_stay_exact() {
        let (state, admin, employee) = seeded_state().await;

        let (status, _) = create_rental_handler(
            state_of(&state),
            as_caller(&employee),
            rent(1, RentalTypeTag::Simple, Some(MAX_AMOUNT + 1)),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        for kayak_id in 1..=3 {
            create_rental_handler(
                state_of(&state),
                as_caller(&employee),
                rent(kayak_id, RentalTypeTag::Double, Some(MAX_AMOUNT)),
            )
            .await
            .unwrap();
        }

        let Json(report) = report_summary_handler(
            state_of(&state),
            as_caller(&admin),
            Query(PeriodQuery::default()),
        )
        .await
        .unwrap();
        assert_eq!(report.total_count, 3);
        assert_eq!(report.total_revenue, 3 * u128::from(MAX_AMOUNT));
        assert_eq!(report.by_type.double.revenue, report.total_revenue);
    }

    #[tokio::test]
    async fn test_bad_requests_are_rejected() {
        let (state, _, employee) = seeded_state().await;

        let (status, _) = create_rental_handler(
            state_of(&state),
            as_caller(&employee),
            rent(1, RentalTypeTag::Simple, Some(0)),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = create_rental_handler(
            state_of(&state),
            as_caller(&employee),
            rent(99, RentalTypeTag::Simple, None),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = update_rental_handler(
            state_of(&state),
            as_caller(&employee),
            Path(Uuid::new_v4()),
            Json(UpdateRentalRequest {
                status: RentalStatusTag::Completed,
                contact_info: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_active_board_and_listing() {
        let (state, _, employee) = seeded_state().await;
        create_rental_handler(
            state_of(&state),
            as_caller(&employee),
            rent(11, RentalTypeTag::Simple, Some(5000)),
        )
        .await
        .unwrap();

        let Json(active) = active_rentals_handler(state_of(&state), as_caller(&employee))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].kayak_name.as_deref(), Some("Stand Up Paddle"));
        assert_eq!(active[0].remaining_seconds, 30 * 60);
        assert!(!active[0].overdue);
        assert_eq!(active[0].rental.amount, 5000);

        let Json(today) = list_rentals_handler(
            state_of(&state),
            as_caller(&employee),
            Query(RentalListQuery {
                period: Some("day".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(today.len(), 1);

        let Json(march_first) = list_rentals_handler(
            state_of(&state),
            as_caller(&employee),
            Query(RentalListQuery {
                period: Some("custom".to_string()),
                start: Some("2024-03-01".to_string()),
                end: Some("2024-03-01".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert!(march_first.is_empty());
    }

    #[tokio::test]
    async fn test_active_entry_serializes_flat() {
        let (state, _, employee) = seeded_state().await;
        create_rental_handler(
            state_of(&state),
            as_caller(&employee),
            rent(5, RentalTypeTag::Simple, None),
        )
        .await
        .unwrap();
        let Json(active) = active_rentals_handler(state_of(&state), as_caller(&employee))
            .await
            .unwrap();

        let json = serde_json::to_value(&active[0]).unwrap();
        assert_eq!(json["type"], "simple");
        assert_eq!(json["payment_method"], "cash");
        assert_eq!(json["kayak_name"], "Kayak 5");
        assert!(json.get("contact_info").is_none());
    }

    #[tokio::test]
    async fn test_listing_filters_by_type_payment_and_text() {
        let (state, _, employee) = seeded_state().await;
        let mut ids = Vec::new();
        for (kayak_id, rental_type, payment_method) in [
            (1, RentalTypeTag::Simple, PaymentMethodTag::Cash),
            (2, RentalTypeTag::Double, PaymentMethodTag::Transfer),
            (11, RentalTypeTag::Double, PaymentMethodTag::Cash),
        ] {
            let (_, Json(rental)) = create_rental_handler(
                state_of(&state),
                as_caller(&employee),
                Json(CreateRentalRequest {
                    kayak_id,
                    rental_type,
                    payment_method,
                    amount: None,
                }),
            )
            .await
            .unwrap();
            ids.push(rental.id);
        }

        let list = |query: RentalListQuery| {
            list_rentals_handler(state_of(&state), as_caller(&employee), Query(query))
        };
        let kayaks_of = |rentals: &[RentalResponse]| -> Vec<i32> {
            rentals.iter().map(|r| r.kayak_id).collect()
        };

        let Json(doubles) = list(RentalListQuery {
            rental_type: Some(RentalTypeTag::Double),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(kayaks_of(&doubles), vec![2, 11]);

        let Json(cash_doubles) = list(RentalListQuery {
            rental_type: Some(RentalTypeTag::Double),
            payment_method: Some(PaymentMethodTag::Cash),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(kayaks_of(&cash_doubles), vec![11]);

        let Json(paddle) = list(RentalListQuery {
            q: Some("stand up".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(kayaks_of(&paddle), vec![11]);

        let Json(by_id) = list(RentalListQuery {
            q: Some(ids[1].to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(kayaks_of(&by_id), vec![2]);

        let Json(outside_window) = list(RentalListQuery {
            period: Some("custom".to_string()),
            start: Some("2024-03-01".to_string()),
            end: Some("2024-03-01".to_string()),
            rental_type: Some(RentalTypeTag::Double),
            ..Default::default()
        })
        .await
        .unwrap();
        assert!(outside_window.is_empty());
    }
}
