//! Persistence boundary for staff, customers, rooms and bookings.
//!
//! Handlers and the reservation logic only talk to [`HotelStore`]. The
//! production implementation is [`PgStore`]; tests run against an in-memory
//! store with the same semantics.

#[cfg(test)]
pub mod memory;
mod pg;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{
    AvailableRoom, Booking, BookingScope, BookingStatus, BookingSummary, Customer, NewBooking,
    NewCustomer, NewStaff, RoomRate, RoomStatus, Staff, StaffFilter, Stay, UnknownValue,
};

pub use pg::{PgStore, Pool};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool: {0}")]
    Pool(String),
    #[error(transparent)]
    Query(#[from] diesel::result::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<UnknownValue> for StoreError {
    fn from(e: UnknownValue) -> Self {
        StoreError::Corrupt(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait HotelStore: Send + Sync {
    async fn staff_by_username(&self, username: &str) -> StoreResult<Option<Staff>>;

    async fn staff_by_id(&self, id: i32) -> StoreResult<Option<Staff>>;

    /// True when either the username or the email is already taken.
    async fn staff_exists(&self, username: &str, email: &str) -> StoreResult<bool>;

    async fn insert_staff(&self, staff: NewStaff) -> StoreResult<i32>;

    async fn list_staff(&self, filter: StaffFilter) -> StoreResult<Vec<Staff>>;

    /// Case-insensitive substring match on first or last name.
    async fn search_customers(&self, term: Option<&str>) -> StoreResult<Vec<Customer>>;

    async fn customer_email_exists(&self, email: &str) -> StoreResult<bool>;

    async fn customer_exists(&self, id: i32) -> StoreResult<bool>;

    async fn insert_customer(&self, customer: NewCustomer) -> StoreResult<i32>;

    async fn room_rate(&self, room_id: i32) -> StoreResult<Option<RoomRate>>;

    async fn set_room_status(&self, room_id: i32, status: RoomStatus) -> StoreResult<()>;

    /// Counts non-terminal bookings on `room_id` that overlap `stay`,
    /// ignoring `except` when given.
    async fn count_conflicts(
        &self,
        room_id: i32,
        stay: &Stay,
        except: Option<i32>,
    ) -> StoreResult<i64>;

    /// Counts every non-terminal booking on `room_id`, whatever its dates.
    async fn count_active_bookings(&self, room_id: i32) -> StoreResult<i64>;

    /// Rooms with no non-terminal booking overlapping `stay`.
    async fn available_rooms(&self, stay: &Stay) -> StoreResult<Vec<AvailableRoom>>;

    async fn insert_booking(&self, booking: NewBooking) -> StoreResult<i32>;

    async fn booking(&self, id: i32) -> StoreResult<Option<Booking>>;

    async fn set_booking_status(&self, id: i32, status: BookingStatus) -> StoreResult<()>;

    async fn list_bookings(&self, scope: BookingScope) -> StoreResult<Vec<BookingSummary>>;
}
