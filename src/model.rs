use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::error::ApiError;

const REQUIRED: &str = "All fields are required.";

/// `local@domain.tld`: no whitespace, a single `@`, and a dot inside the
/// domain. Empty values pass so the required-field message stands alone.
fn email_shape(email: &str) -> Result<(), ValidationError> {
    if email.is_empty() {
        return Ok(());
    }
    let shaped = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
                && domain
                    .char_indices()
                    .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
        }
        None => false,
    };
    if shaped {
        Ok(())
    } else {
        let mut err = ValidationError::new("email");
        err.message = Some(Cow::Borrowed("Invalid email format."));
        Err(err)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

/// Defines a string-backed enum stored as VARCHAR and sent as JSON strings.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, [$($variant:ident),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(ToSchema, Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok($name::$variant),)+
                    _ => Err(UnknownValue { kind: $kind, value: s.to_string() }),
                }
            }
        }
    };
}

text_enum!(
    /// Staff role. Each role maps to a subject in the ACL policy.
    Role,
    "role",
    [Admin, Manager, Receptionist]
);

text_enum!(RoomStatus, "room status", [Available, Occupied]);

text_enum!(
    /// Lifecycle stage of a booking.
    BookingStatus,
    "booking status",
    [Pending, Confirmed, CheckedIn, CheckedOut, Cancelled]
);

impl BookingStatus {
    /// Terminal bookings no longer hold their room.
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::CheckedOut | BookingStatus::Cancelled)
    }

    pub fn terminal() -> impl Iterator<Item = BookingStatus> {
        Self::ALL.iter().copied().filter(|s| s.is_terminal())
    }
}

/// A validated date range: check-in is strictly before check-out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stay {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

impl Stay {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, ApiError> {
        if check_in >= check_out {
            return Err(ApiError::Validation(
                "Check-out date must be after check-in date.".to_string(),
            ));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    pub fn check_in(&self) -> NaiveDate {
        self.check_in
    }

    pub fn check_out(&self) -> NaiveDate {
        self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Ranges are inclusive on both ends, so a stay ending on the day another
    /// begins counts as overlapping.
    pub fn overlaps(&self, other: &Stay) -> bool {
        self.check_in <= other.check_out && self.check_out >= other.check_in
    }

    pub fn price(&self, per_night: f64) -> f64 {
        per_night * self.nights() as f64
    }
}

#[derive(Clone, Debug)]
pub struct Staff {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub manager_id: Option<i32>,
}

#[derive(Clone, Debug)]
pub struct NewStaff {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub manager_id: Option<i32>,
}

/// Which staff members a listing returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StaffFilter {
    All,
    Role(Role),
    ReceptionistsOf(i32),
}

#[derive(Clone, Debug)]
pub struct Customer {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Clone, Debug)]
pub struct NewCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A room joined with its type.
#[derive(Clone, Debug)]
pub struct RoomRate {
    pub room_id: i32,
    pub room_number: String,
    pub type_name: String,
    pub price_per_night: f64,
}

#[derive(Clone, Debug)]
pub struct Booking {
    pub id: i32,
    pub customer_id: i32,
    pub room_id: i32,
    pub staff_id: i32,
    pub stay: Stay,
    pub total_price: f64,
    pub status: BookingStatus,
}

#[derive(Clone, Debug)]
pub struct NewBooking {
    pub customer_id: i32,
    pub room_id: i32,
    pub staff_id: i32,
    pub stay: Stay,
    pub total_price: f64,
    pub status: BookingStatus,
}

/// Which bookings a staff member may see.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookingScope {
    All,
    Team(i32),
    MadeBy(i32),
}

impl BookingScope {
    pub fn for_staff(role: Role, staff_id: i32) -> Self {
        match role {
            Role::Admin => BookingScope::All,
            Role::Manager => BookingScope::Team(staff_id),
            Role::Receptionist => BookingScope::MadeBy(staff_id),
        }
    }
}

// ---- response bodies ----

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginBody {
    pub message: String,
    pub role: Role,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StaffSummary {
    pub id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
}

impl From<Staff> for StaffSummary {
    fn from(staff: Staff) -> Self {
        Self {
            id: staff.id,
            username: staff.username,
            first_name: staff.first_name,
            last_name: staff.last_name,
            email: staff.email,
            role: staff.role,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

impl From<Customer> for CustomerSummary {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            first_name: customer.first_name,
            last_name: customer.last_name,
            email: customer.email,
            phone: customer.phone,
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CustomerCreated {
    pub message: String,
    pub customer_id: i32,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailableRoom {
    pub room_id: i32,
    pub room_number: String,
    pub type_name: String,
    pub price_per_night: f64,
}

#[derive(ToSchema, Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookingSummary {
    pub booking_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub room_number: String,
    pub type_name: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub total_price: f64,
    pub status: BookingStatus,
    pub receptionist: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct BookingCreated {
    pub message: String,
    pub booking_id: i32,
    pub total_price: f64,
}

// ---- request bodies ----

#[derive(ToSchema, Default, Deserialize, Validate)]
pub struct AuthUser {
    #[serde(default)]
    #[validate(length(min = 1, message = "Username and password are required."))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Username and password are required."))]
    pub password: String,
}

#[derive(Deserialize, ToSchema, Debug, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewStaffForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required."))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required."))]
    pub password: String,
    #[serde(default, alias = "first_name")]
    #[validate(length(min = 1, message = "All fields are required."))]
    pub first_name: String,
    #[serde(default, alias = "last_name")]
    #[validate(length(min = 1, message = "All fields are required."))]
    pub last_name: String,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "All fields are required."),
        custom(function = "email_shape")
    )]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required."))]
    pub role: String,
    pub manager_id: Option<i32>,
}

#[derive(Deserialize, ToSchema, Debug, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomerForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "First name, last name, and email are required."))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "First name, last name, and email are required."))]
    pub last_name: String,
    #[serde(default)]
    #[validate(
        length(min = 1, message = "First name, last name, and email are required."),
        custom(function = "email_shape")
    )]
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Deserialize, ToSchema, Debug, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBookingForm {
    #[validate(required(message = "All fields are required."))]
    pub customer_id: Option<i32>,
    #[validate(required(message = "All fields are required."))]
    pub room_id: Option<i32>,
    #[validate(required(message = "All fields are required."))]
    pub check_in_date: Option<NaiveDate>,
    #[validate(required(message = "All fields are required."))]
    pub check_out_date: Option<NaiveDate>,
}

/// A booking request whose fields are all present and whose stay is valid.
#[derive(Clone, Debug)]
pub struct Reservation {
    pub customer_id: i32,
    pub room_id: i32,
    pub stay: Stay,
}

impl TryFrom<NewBookingForm> for Reservation {
    type Error = ApiError;

    fn try_from(form: NewBookingForm) -> Result<Self, Self::Error> {
        let (Some(customer_id), Some(room_id), Some(check_in), Some(check_out)) = (
            form.customer_id,
            form.room_id,
            form.check_in_date,
            form.check_out_date,
        ) else {
            return Err(ApiError::Validation(REQUIRED.to_string()));
        };
        Ok(Self {
            customer_id,
            room_id,
            stay: Stay::new(check_in, check_out)?,
        })
    }
}

#[derive(Deserialize, ToSchema, Debug, Validate)]
pub struct StatusForm {
    #[serde(default)]
    pub status: String,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StayQuery {
    /// First night, `YYYY-MM-DD`
    pub check_in_date: Option<NaiveDate>,
    /// Departure day, `YYYY-MM-DD`
    pub check_out_date: Option<NaiveDate>,
}

impl StayQuery {
    pub fn into_stay(self) -> Result<Stay, ApiError> {
        match (self.check_in_date, self.check_out_date) {
            (Some(check_in), Some(check_out)) => Stay::new(check_in, check_out),
            _ => Err(ApiError::Validation(
                "checkInDate and checkOutDate are required.".to_string(),
            )),
        }
    }
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Substring of the customer's first or last name
    pub q: Option<String>,
}
