use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::auth::SessionClaims;
use crate::error::ApiError;
use crate::model::{
    AvailableRoom, BookingCreated, BookingScope, BookingStatus, BookingSummary, ErrorBody,
    MessageBody, NewBookingForm, Reservation, StatusForm, StayQuery,
};
use crate::reservation;
use crate::validate::ValidatedForm;
use crate::BOOKING_TAG;

/// expose the booking and room endpoints to parent module
pub fn booking_router() -> OpenApiRouter<crate::State> {
    OpenApiRouter::new()
        .routes(routes!(list_bookings, create_booking))
        .routes(routes!(update_booking))
        .routes(routes!(available_rooms))
}

/// Rooms free for a date range
#[utoipa::path(
    get,
    path = "/rooms/available",
    params(StayQuery),
    responses(
        (status = OK, body = Vec<AvailableRoom>),
        (status = BAD_REQUEST, body = ErrorBody)
    ),
    tag = BOOKING_TAG
)]
async fn available_rooms(
    State(crate::State { store, .. }): State<crate::State>,
    query: Result<Query<StayQuery>, QueryRejection>,
) -> Result<Json<Vec<AvailableRoom>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    let stay = query.into_stay()?;
    let rooms = reservation::available_rooms(store.as_ref(), &stay).await?;
    Ok(Json(rooms))
}

/// Bookings visible to the caller
///
/// Admins see every booking, Managers the bookings made by their
/// receptionists, Receptionists their own.
#[utoipa::path(
    get,
    path = "/bookings",
    responses(
        (status = OK, body = Vec<BookingSummary>),
        (status = UNAUTHORIZED, body = ErrorBody)
    ),
    tag = BOOKING_TAG,
    security(("session_cookie" = []))
)]
async fn list_bookings(
    claims: SessionClaims,
    State(crate::State {
        store, enforcer, ..
    }): State<crate::State>,
) -> Result<Json<Vec<BookingSummary>>, ApiError> {
    claims.authorize(&enforcer, "bookings", "read")?;
    let scope = BookingScope::for_staff(claims.role, claims.sub);
    Ok(Json(store.list_bookings(scope).await?))
}

/// Book a room
#[utoipa::path(
    post,
    path = "/bookings",
    request_body = NewBookingForm,
    responses(
        (status = CREATED, body = BookingCreated),
        (status = BAD_REQUEST, body = ErrorBody),
        (status = FORBIDDEN, body = ErrorBody),
        (status = NOT_FOUND, body = ErrorBody)
    ),
    tag = BOOKING_TAG,
    security(("session_cookie" = []))
)]
async fn create_booking(
    claims: SessionClaims,
    State(crate::State {
        store, enforcer, ..
    }): State<crate::State>,
    ValidatedForm(form): ValidatedForm<NewBookingForm>,
) -> Result<(StatusCode, Json<BookingCreated>), ApiError> {
    claims.authorize(&enforcer, "bookings", "create")?;
    let request = Reservation::try_from(form)?;
    let receipt = reservation::create_booking(store.as_ref(), claims.sub, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingCreated {
            message: "Booking created successfully.".to_string(),
            booking_id: receipt.booking_id,
            total_price: receipt.total_price,
        }),
    ))
}

/// Change a booking's status
#[utoipa::path(
    put,
    path = "/bookings/{id}",
    request_body = StatusForm,
    params(("id" = i32, Path, description = "Booking database id")),
    responses(
        (status = OK, body = MessageBody),
        (status = BAD_REQUEST, body = ErrorBody),
        (status = NOT_FOUND, body = ErrorBody)
    ),
    tag = BOOKING_TAG,
    security(("session_cookie" = []))
)]
async fn update_booking(
    claims: SessionClaims,
    State(crate::State {
        store, enforcer, ..
    }): State<crate::State>,
    id: Result<Path<i32>, PathRejection>,
    ValidatedForm(form): ValidatedForm<StatusForm>,
) -> Result<Json<MessageBody>, ApiError> {
    claims.authorize(&enforcer, "bookings", "update")?;
    let Path(id) = id.map_err(|e| ApiError::Validation(e.body_text()))?;
    let status = form
        .status
        .parse::<BookingStatus>()
        .map_err(|_| ApiError::Validation("Invalid status.".to_string()))?;
    reservation::transition_booking(store.as_ref(), id, status).await?;
    Ok(Json(MessageBody::new("Booking status updated.")))
}
