//! Room availability and the booking lifecycle.
//!
//! A booking holds its room while its status is Pending, Confirmed or
//! CheckedIn. Every write here finishes by re-deriving the room status from
//! the bookings that still hold it, so a room is Occupied exactly when at
//! least one non-terminal booking exists for it.
//!
//! The availability check and the insert are separate queries without a
//! transaction; two concurrent requests for the same room can both pass the
//! check.

use crate::error::ApiError;
use crate::model::{AvailableRoom, BookingStatus, NewBooking, Reservation, RoomStatus, Stay};
use crate::store::{HotelStore, StoreResult};

const UNAVAILABLE: &str = "Room is not available for the selected dates.";

#[derive(Debug, Clone, PartialEq)]
pub struct BookingReceipt {
    pub booking_id: i32,
    pub total_price: f64,
}

pub async fn is_room_available(
    store: &dyn HotelStore,
    room_id: i32,
    stay: &Stay,
) -> StoreResult<bool> {
    Ok(store.count_conflicts(room_id, stay, None).await? == 0)
}

pub async fn available_rooms(
    store: &dyn HotelStore,
    stay: &Stay,
) -> StoreResult<Vec<AvailableRoom>> {
    store.available_rooms(stay).await
}

/// Books `reservation.room_id` for the stay on behalf of `staff_id`.
pub async fn create_booking(
    store: &dyn HotelStore,
    staff_id: i32,
    reservation: Reservation,
) -> Result<BookingReceipt, ApiError> {
    let Reservation {
        customer_id,
        room_id,
        stay,
    } = reservation;

    let rate = store
        .room_rate(room_id)
        .await?
        .ok_or(ApiError::NotFound("Room not found."))?;
    if !store.customer_exists(customer_id).await? {
        return Err(ApiError::NotFound("Customer not found."));
    }
    if !is_room_available(store, room_id, &stay).await? {
        return Err(ApiError::Conflict(UNAVAILABLE.to_string()));
    }

    let total_price = stay.price(rate.price_per_night);
    let booking_id = store
        .insert_booking(NewBooking {
            customer_id,
            room_id,
            staff_id,
            stay,
            total_price,
            status: BookingStatus::Confirmed,
        })
        .await?;
    store.set_room_status(room_id, RoomStatus::Occupied).await?;

    tracing::info!(
        booking_id,
        room_id = rate.room_id,
        room = %rate.room_number,
        room_type = %rate.type_name,
        nights = stay.nights(),
        total_price,
        "booking created"
    );
    Ok(BookingReceipt {
        booking_id,
        total_price,
    })
}

/// Moves a booking to `status` and releases or re-occupies its room.
///
/// Reopening a CheckedOut or Cancelled booking re-runs the availability
/// check, since its dates may have been booked by someone else meanwhile.
pub async fn transition_booking(
    store: &dyn HotelStore,
    booking_id: i32,
    status: BookingStatus,
) -> Result<(), ApiError> {
    let booking = store
        .booking(booking_id)
        .await?
        .ok_or(ApiError::NotFound("Booking not found."))?;

    if booking.status.is_terminal() && !status.is_terminal() {
        let clashes = store
            .count_conflicts(booking.room_id, &booking.stay, Some(booking.id))
            .await?;
        if clashes > 0 {
            return Err(ApiError::Conflict(UNAVAILABLE.to_string()));
        }
    }

    store.set_booking_status(booking_id, status).await?;
    let room_status = sync_room_status(store, booking.room_id).await?;
    tracing::info!(
        booking_id,
        customer_id = booking.customer_id,
        made_by = booking.staff_id,
        from = %booking.status,
        to = %status,
        room = %room_status,
        "booking status changed"
    );
    Ok(())
}

/// Recomputes a room's status from the bookings that still hold it.
pub async fn sync_room_status(store: &dyn HotelStore, room_id: i32) -> StoreResult<RoomStatus> {
    let status = if store.count_active_bookings(room_id).await? > 0 {
        RoomStatus::Occupied
    } else {
        RoomStatus::Available
    };
    store.set_room_status(room_id, status).await?;
    Ok(status)
}
