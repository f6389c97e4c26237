//! services/api/src/web/reports.rs
//!
//! The reporting endpoint, and the query parsing it shares with the rental
//! listing. Custom bounds that do not parse are treated as absent, which turns
//! the window off rather than failing the request.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use kayak_rental_core::domain::{Capability, PaymentMethod, RentalType};
use kayak_rental_core::reporting::{
    aggregate, filter_by_window, resolve_window, Bucket, Period, RentalAggregate, Window,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

use crate::error::{port_rejection, Rejection};
use crate::web::middleware::AuthUser;
use crate::web::state::AppState;

//=========================================================================================
// Query
//=========================================================================================

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct PeriodQuery {
    /// One of `day`, `week`, `month`, `custom`.
    pub period: Option<String>,
    /// Custom start: RFC 3339 instant or `YYYY-MM-DD` (local midnight).
    pub start: Option<String>,
    /// Custom end: RFC 3339 instant or `YYYY-MM-DD`. Always widened to the end of its day.
    pub end: Option<String>,
}

impl PeriodQuery {
    /// `Ok(None)` when no period was given. Unknown period names are a 400.
    pub fn to_period(&self, offset: &FixedOffset) -> Result<Option<Period>, Rejection> {
        let Some(name) = self.period.as_deref() else {
            return Ok(None);
        };
        let period = match name {
            "day" => Period::Day,
            "week" => Period::Week,
            "month" => Period::Month,
            "custom" => Period::Custom {
                start: self.start.as_deref().and_then(|s| parse_bound(s, offset)),
                end: self.end.as_deref().and_then(|s| parse_bound(s, offset)),
            },
            other => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    format!("Unknown period '{}'", other),
                ))
            }
        };
        Ok(Some(period))
    }
}

fn parse_bound(raw: &str, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => offset
            .from_local_datetime(&date.and_time(chrono::NaiveTime::MIN))
            .single()
            .map(|dt| dt.with_timezone(&Utc)),
        Err(_) => {
            debug!("Ignoring unparseable report bound '{}'", raw);
            None
        }
    }
}

/// Resolves the requested period against the state's clock.
pub fn window_for(state: &AppState, query: &PeriodQuery) -> Result<Option<Window>, Rejection> {
    let period = query.to_period(&state.config.report_offset)?;
    Ok(period.and_then(|p| resolve_window(&p, &state.local_now())))
}

//=========================================================================================
// Response
//=========================================================================================

#[derive(Serialize, ToSchema, Debug, Clone, Copy, PartialEq)]
pub struct BucketResponse {
    pub count: u64,
    pub revenue: u128,
    /// Percentage of all rentals in the window, one decimal.
    pub share: f64,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct ByTypeResponse {
    pub simple: BucketResponse,
    pub double: BucketResponse,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct ByPaymentResponse {
    pub cash: BucketResponse,
    pub transfer: BucketResponse,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct WindowResponse {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct ReportResponse {
    pub period: String,
    /// Absent when the report covers every rental.
    pub window: Option<WindowResponse>,
    pub total_count: u64,
    pub total_revenue: u128,
    pub by_type: ByTypeResponse,
    pub by_payment: ByPaymentResponse,
}

impl ReportResponse {
    fn build(period: String, window: Option<Window>, agg: &RentalAggregate) -> Self {
        let bucket = |b: Bucket, share: f64| BucketResponse {
            count: b.count,
            revenue: b.revenue,
            share,
        };
        Self {
            period,
            window: window.map(|w| WindowResponse {
                start: w.start,
                end: w.end,
            }),
            total_count: agg.total_count,
            total_revenue: agg.total_revenue,
            by_type: ByTypeResponse {
                simple: bucket(agg.by_type.simple, agg.type_share(RentalType::Simple)),
                double: bucket(agg.by_type.double, agg.type_share(RentalType::Double)),
            },
            by_payment: ByPaymentResponse {
                cash: bucket(agg.by_payment.cash, agg.payment_share(PaymentMethod::Cash)),
                transfer: bucket(
                    agg.by_payment.transfer,
                    agg.payment_share(PaymentMethod::Transfer),
                ),
            },
        }
    }
}

//=========================================================================================
// Handler
//=========================================================================================

/// Summarise the rentals started in a period. Defaults to the current month.
#[utoipa::path(
    get,
    path = "/reports/summary",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Aggregated rentals", body = ReportResponse),
        (status = 400, description = "Unknown period"),
        (status = 403, description = "Caller may not view reports")
    )
)]
pub async fn report_summary_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthUser>,
    Query(mut query): Query<PeriodQuery>,
) -> Result<Json<ReportResponse>, Rejection> {
    caller.ensure(Capability::ViewReports)?;

    let period = query.period.get_or_insert_with(|| "month".to_string()).clone();
    let window = window_for(&state, &query)?;

    let rentals = state.db.list_rentals().await.map_err(|e| {
        error!("Failed to load rentals for report: {:?}", e);
        port_rejection(e, "Failed to load rentals")
    })?;
    let selected = filter_by_window(&rentals, window.as_ref());
    let agg = aggregate(selected);

    Ok(Json(ReportResponse::build(period, window, &agg)))
}
