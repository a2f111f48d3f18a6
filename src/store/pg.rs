use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::dsl::{exists, insert_into, not};
use diesel::pg::Pg;
use diesel::{
    BoolExpressionMethods, ExpressionMethods, Insertable, OptionalExtension,
    PgTextExpressionMethods, QueryDsl, Queryable, Selectable, SelectableHelper,
};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use super::{HotelStore, StoreError, StoreResult};
use crate::model::{
    AvailableRoom, Booking, BookingScope, BookingStatus, BookingSummary, Customer, NewBooking,
    NewCustomer, NewStaff, Role, RoomRate, RoomStatus, Staff, StaffFilter, Stay,
};
use crate::schema::{bookings, customers, room_types, rooms, staff};

pub type Pool = bb8::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

type Conn<'a> = bb8::PooledConnection<'a, AsyncDieselConnectionManager<AsyncPgConnection>>;

type SummaryRow = (
    i32,
    String,
    String,
    String,
    String,
    NaiveDate,
    NaiveDate,
    f64,
    String,
    String,
);

#[derive(Selectable, Queryable, Debug)]
#[diesel(table_name = staff)]
#[diesel(check_for_backend(Pg))]
struct StaffRow {
    staff_id: i32,
    username: String,
    password_hash: String,
    role: String,
    first_name: String,
    last_name: String,
    email: String,
    manager_id: Option<i32>,
}

impl TryFrom<StaffRow> for Staff {
    type Error = StoreError;

    fn try_from(row: StaffRow) -> Result<Self, Self::Error> {
        Ok(Staff {
            id: row.staff_id,
            username: row.username,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            manager_id: row.manager_id,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = staff)]
struct NewStaffRow<'a> {
    username: &'a str,
    password_hash: &'a str,
    role: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    manager_id: Option<i32>,
}

#[derive(Selectable, Queryable, Debug)]
#[diesel(table_name = customers)]
#[diesel(check_for_backend(Pg))]
struct CustomerRow {
    customer_id: i32,
    first_name: String,
    last_name: String,
    email: String,
    phone: Option<String>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.customer_id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = customers)]
struct NewCustomerRow<'a> {
    first_name: &'a str,
    last_name: &'a str,
    email: &'a str,
    phone: Option<&'a str>,
}

#[derive(Selectable, Queryable, Debug)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(Pg))]
struct BookingRow {
    booking_id: i32,
    customer_id: i32,
    room_id: i32,
    staff_id: i32,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
    total_price: f64,
    status: String,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let stay = Stay::new(row.check_in_date, row.check_out_date)
            .map_err(|e| StoreError::Corrupt(format!("booking {}: {}", row.booking_id, e)))?;
        Ok(Booking {
            id: row.booking_id,
            customer_id: row.customer_id,
            room_id: row.room_id,
            staff_id: row.staff_id,
            stay,
            total_price: row.total_price,
            status: row.status.parse()?,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = bookings)]
struct NewBookingRow<'a> {
    customer_id: i32,
    room_id: i32,
    staff_id: i32,
    check_in_date: NaiveDate,
    check_out_date: NaiveDate,
    total_price: f64,
    status: &'a str,
}

fn terminal_statuses() -> Vec<&'static str> {
    BookingStatus::terminal().map(BookingStatus::as_str).collect()
}

/// [`HotelStore`] over a bb8 pool of async Postgres connections.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> StoreResult<Conn<'_>> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

#[async_trait]
impl HotelStore for PgStore {
    async fn staff_by_username(&self, name: &str) -> StoreResult<Option<Staff>> {
        let mut conn = self.conn().await?;
        staff::table
            .filter(staff::username.eq(name))
            .select(StaffRow::as_select())
            .first::<StaffRow>(&mut conn)
            .await
            .optional()?
            .map(Staff::try_from)
            .transpose()
    }

    async fn staff_by_id(&self, id: i32) -> StoreResult<Option<Staff>> {
        let mut conn = self.conn().await?;
        staff::table
            .find(id)
            .select(StaffRow::as_select())
            .first::<StaffRow>(&mut conn)
            .await
            .optional()?
            .map(Staff::try_from)
            .transpose()
    }

    async fn staff_exists(&self, name: &str, address: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let found = diesel::select(exists(
            staff::table.filter(staff::username.eq(name).or(staff::email.eq(address))),
        ))
        .get_result::<bool>(&mut conn)
        .await?;
        Ok(found)
    }

    async fn insert_staff(&self, new: NewStaff) -> StoreResult<i32> {
        let mut conn = self.conn().await?;
        let row = NewStaffRow {
            username: &new.username,
            password_hash: &new.password_hash,
            role: new.role.as_str(),
            first_name: &new.first_name,
            last_name: &new.last_name,
            email: &new.email,
            manager_id: new.manager_id,
        };
        let id = insert_into(staff::table)
            .values(&row)
            .returning(staff::staff_id)
            .get_result::<i32>(&mut conn)
            .await?;
        Ok(id)
    }

    async fn list_staff(&self, filter: StaffFilter) -> StoreResult<Vec<Staff>> {
        let mut conn = self.conn().await?;
        let query = staff::table
            .select(StaffRow::as_select())
            .order(staff::staff_id)
            .into_boxed();
        let query = match filter {
            StaffFilter::All => query,
            StaffFilter::Role(role) => query.filter(staff::role.eq(role.as_str())),
            StaffFilter::ReceptionistsOf(manager) => query
                .filter(staff::role.eq(Role::Receptionist.as_str()))
                .filter(staff::manager_id.eq(manager)),
        };
        query
            .load::<StaffRow>(&mut conn)
            .await?
            .into_iter()
            .map(Staff::try_from)
            .collect()
    }

    async fn search_customers(&self, term: Option<&str>) -> StoreResult<Vec<Customer>> {
        let mut conn = self.conn().await?;
        let mut query = customers::table
            .select(CustomerRow::as_select())
            .order(customers::customer_id)
            .into_boxed();
        if let Some(term) = term {
            let pattern = format!("%{}%", term);
            query = query.filter(
                customers::first_name
                    .ilike(pattern.clone())
                    .or(customers::last_name.ilike(pattern)),
            );
        }
        let rows = query.load::<CustomerRow>(&mut conn).await?;
        Ok(rows.into_iter().map(Customer::from).collect())
    }

    async fn customer_email_exists(&self, address: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let found = diesel::select(exists(
            customers::table.filter(customers::email.eq(address)),
        ))
        .get_result::<bool>(&mut conn)
        .await?;
        Ok(found)
    }

    async fn customer_exists(&self, id: i32) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let found = diesel::select(exists(customers::table.find(id)))
            .get_result::<bool>(&mut conn)
            .await?;
        Ok(found)
    }

    async fn insert_customer(&self, new: NewCustomer) -> StoreResult<i32> {
        let mut conn = self.conn().await?;
        let row = NewCustomerRow {
            first_name: &new.first_name,
            last_name: &new.last_name,
            email: &new.email,
            phone: new.phone.as_deref(),
        };
        let id = insert_into(customers::table)
            .values(&row)
            .returning(customers::customer_id)
            .get_result::<i32>(&mut conn)
            .await?;
        Ok(id)
    }

    async fn room_rate(&self, room_id: i32) -> StoreResult<Option<RoomRate>> {
        let mut conn = self.conn().await?;
        let row = rooms::table
            .inner_join(room_types::table)
            .filter(rooms::room_id.eq(room_id))
            .select((
                rooms::room_id,
                rooms::room_number,
                room_types::type_name,
                room_types::price_per_night,
            ))
            .first::<(i32, String, String, f64)>(&mut conn)
            .await
            .optional()?;
        Ok(row.map(
            |(room_id, room_number, type_name, price_per_night)| RoomRate {
                room_id,
                room_number,
                type_name,
                price_per_night,
            },
        ))
    }

    async fn set_room_status(&self, room_id: i32, status: RoomStatus) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        diesel::update(rooms::table.find(room_id))
            .set(rooms::status.eq(status.as_str()))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn count_conflicts(
        &self,
        room_id: i32,
        stay: &Stay,
        except: Option<i32>,
    ) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        let mut query = bookings::table
            .filter(bookings::room_id.eq(room_id))
            .filter(bookings::check_in_date.le(stay.check_out()))
            .filter(bookings::check_out_date.ge(stay.check_in()))
            .filter(bookings::status.ne_all(terminal_statuses()))
            .into_boxed();
        if let Some(id) = except {
            query = query.filter(bookings::booking_id.ne(id));
        }
        let count = query.count().get_result::<i64>(&mut conn).await?;
        Ok(count)
    }

    async fn count_active_bookings(&self, room_id: i32) -> StoreResult<i64> {
        let mut conn = self.conn().await?;
        let count = bookings::table
            .filter(bookings::room_id.eq(room_id))
            .filter(bookings::status.ne_all(terminal_statuses()))
            .count()
            .get_result::<i64>(&mut conn)
            .await?;
        Ok(count)
    }

    async fn available_rooms(&self, stay: &Stay) -> StoreResult<Vec<AvailableRoom>> {
        let mut conn = self.conn().await?;
        let busy = bookings::table
            .filter(bookings::check_in_date.le(stay.check_out()))
            .filter(bookings::check_out_date.ge(stay.check_in()))
            .filter(bookings::status.ne_all(terminal_statuses()))
            .select(bookings::room_id);
        let rows = rooms::table
            .inner_join(room_types::table)
            .filter(not(rooms::room_id.eq_any(busy)))
            .order(rooms::room_id)
            .select((
                rooms::room_id,
                rooms::room_number,
                room_types::type_name,
                room_types::price_per_night,
            ))
            .load::<(i32, String, String, f64)>(&mut conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(
                |(room_id, room_number, type_name, price_per_night)| AvailableRoom {
                    room_id,
                    room_number,
                    type_name,
                    price_per_night,
                },
            )
            .collect())
    }

    async fn insert_booking(&self, new: NewBooking) -> StoreResult<i32> {
        let mut conn = self.conn().await?;
        let row = NewBookingRow {
            customer_id: new.customer_id,
            room_id: new.room_id,
            staff_id: new.staff_id,
            check_in_date: new.stay.check_in(),
            check_out_date: new.stay.check_out(),
            total_price: new.total_price,
            status: new.status.as_str(),
        };
        let id = insert_into(bookings::table)
            .values(&row)
            .returning(bookings::booking_id)
            .get_result::<i32>(&mut conn)
            .await?;
        Ok(id)
    }

    async fn booking(&self, id: i32) -> StoreResult<Option<Booking>> {
        let mut conn = self.conn().await?;
        bookings::table
            .find(id)
            .select(BookingRow::as_select())
            .first::<BookingRow>(&mut conn)
            .await
            .optional()?
            .map(Booking::try_from)
            .transpose()
    }

    async fn set_booking_status(&self, id: i32, status: BookingStatus) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        diesel::update(bookings::table.find(id))
            .set(bookings::status.eq(status.as_str()))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn list_bookings(&self, scope: BookingScope) -> StoreResult<Vec<BookingSummary>> {
        let mut conn = self.conn().await?;
        let query = bookings::table
            .inner_join(customers::table)
            .inner_join(rooms::table.inner_join(room_types::table))
            .inner_join(staff::table)
            .select((
                bookings::booking_id,
                customers::first_name,
                customers::last_name,
                rooms::room_number,
                room_types::type_name,
                bookings::check_in_date,
                bookings::check_out_date,
                bookings::total_price,
                bookings::status,
                staff::username,
            ))
            .order(bookings::booking_id)
            .into_boxed();
        let query = match scope {
            BookingScope::All => query,
            BookingScope::Team(manager) => query.filter(staff::manager_id.eq(manager)),
            BookingScope::MadeBy(staff_id) => query.filter(bookings::staff_id.eq(staff_id)),
        };
        query
            .load::<SummaryRow>(&mut conn)
            .await?
            .into_iter()
            .map(
                |(
                    booking_id,
                    first_name,
                    last_name,
                    room_number,
                    type_name,
                    check_in_date,
                    check_out_date,
                    total_price,
                    status,
                    receptionist,
                )|
                 -> StoreResult<BookingSummary> {
                    Ok(BookingSummary {
                        booking_id,
                        first_name,
                        last_name,
                        room_number,
                        type_name,
                        check_in_date,
                        check_out_date,
                        total_price,
                        status: status.parse()?,
                        receptionist,
                    })
                },
            )
            .collect()
    }
}
