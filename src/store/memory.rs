use std::sync::{Mutex, OnceLock};

use async_trait::async_trait;

use super::{HotelStore, StoreResult};
use crate::model::{
    AvailableRoom, Booking, BookingScope, BookingStatus, BookingSummary, Customer, NewBooking,
    NewCustomer, NewStaff, Role, RoomRate, RoomStatus, Staff, StaffFilter, Stay,
};

pub const PASSWORD: &str = "front-desk";

struct Room {
    id: i32,
    number: String,
    type_id: i32,
    status: RoomStatus,
}

struct RoomType {
    id: i32,
    name: String,
    price_per_night: f64,
}

#[derive(Default)]
struct Tables {
    staff: Vec<Staff>,
    customers: Vec<Customer>,
    room_types: Vec<RoomType>,
    rooms: Vec<Room>,
    bookings: Vec<Booking>,
}

impl Tables {
    fn rate(&self, room: &Room) -> RoomRate {
        let kind = self
            .room_types
            .iter()
            .find(|t| t.id == room.type_id)
            .expect("room type seeded before room");
        RoomRate {
            room_id: room.id,
            room_number: room.number.clone(),
            type_name: kind.name.clone(),
            price_per_night: kind.price_per_night,
        }
    }

    fn holds(&self, room_id: i32, stay: &Stay, except: Option<i32>) -> usize {
        self.bookings
            .iter()
            .filter(|b| b.room_id == room_id && Some(b.id) != except)
            .filter(|b| !b.status.is_terminal() && b.stay.overlaps(stay))
            .count()
    }
}

/// In-memory [`HotelStore`] with the same filtering rules as the SQL store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn add_room_type(&self, name: &str, price_per_night: f64) -> i32 {
        let mut t = self.tables.lock().unwrap();
        let id = t.room_types.len() as i32 + 1;
        t.room_types.push(RoomType {
            id,
            name: name.to_string(),
            price_per_night,
        });
        id
    }

    pub fn add_room(&self, number: &str, type_id: i32) -> i32 {
        let mut t = self.tables.lock().unwrap();
        let id = t.rooms.len() as i32 + 1;
        t.rooms.push(Room {
            id,
            number: number.to_string(),
            type_id,
            status: RoomStatus::Available,
        });
        id
    }

    /// Adds a staff member whose password is [`PASSWORD`].
    pub fn add_staff(&self, username: &str, role: Role, manager: Option<i32>) -> i32 {
        static HASH: OnceLock<String> = OnceLock::new();
        let hash = HASH
            .get_or_init(|| crate::auth::hash_password(PASSWORD).unwrap())
            .clone();
        let mut t = self.tables.lock().unwrap();
        let id = t.staff.len() as i32 + 1;
        t.staff.push(Staff {
            id,
            username: username.to_string(),
            password_hash: hash,
            role,
            first_name: username.to_string(),
            last_name: "Test".to_string(),
            email: format!("{}@hotel.test", username),
            manager_id: manager,
        });
        id
    }

    pub fn add_customer(&self, first_name: &str, last_name: &str, email: &str) -> i32 {
        let mut t = self.tables.lock().unwrap();
        let id = t.customers.len() as i32 + 1;
        t.customers.push(Customer {
            id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            phone: None,
        });
        id
    }

    pub fn room_status(&self, room_id: i32) -> RoomStatus {
        let t = self.tables.lock().unwrap();
        t.rooms.iter().find(|r| r.id == room_id).unwrap().status
    }

    pub fn staff_named(&self, username: &str) -> Option<Staff> {
        let t = self.tables.lock().unwrap();
        t.staff.iter().find(|s| s.username == username).cloned()
    }

    pub fn all_bookings(&self) -> Vec<Booking> {
        self.tables.lock().unwrap().bookings.clone()
    }

    /// Checks that every room is Occupied exactly when a non-terminal
    /// booking holds it.
    pub fn rooms_in_sync(&self) -> bool {
        let t = self.tables.lock().unwrap();
        t.rooms.iter().all(|room| {
            let held = t
                .bookings
                .iter()
                .any(|b| b.room_id == room.id && !b.status.is_terminal());
            held == (room.status == RoomStatus::Occupied)
        })
    }
}

#[async_trait]
impl HotelStore for MemoryStore {
    async fn staff_by_username(&self, username: &str) -> StoreResult<Option<Staff>> {
        Ok(self.staff_named(username))
    }

    async fn staff_by_id(&self, id: i32) -> StoreResult<Option<Staff>> {
        let t = self.tables.lock().unwrap();
        Ok(t.staff.iter().find(|s| s.id == id).cloned())
    }

    async fn staff_exists(&self, username: &str, email: &str) -> StoreResult<bool> {
        let t = self.tables.lock().unwrap();
        Ok(t
            .staff
            .iter()
            .any(|s| s.username == username || s.email == email))
    }

    async fn insert_staff(&self, new: NewStaff) -> StoreResult<i32> {
        let mut t = self.tables.lock().unwrap();
        let id = t.staff.len() as i32 + 1;
        t.staff.push(Staff {
            id,
            username: new.username,
            password_hash: new.password_hash,
            role: new.role,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            manager_id: new.manager_id,
        });
        Ok(id)
    }

    async fn list_staff(&self, filter: StaffFilter) -> StoreResult<Vec<Staff>> {
        let t = self.tables.lock().unwrap();
        Ok(t
            .staff
            .iter()
            .filter(|s| match filter {
                StaffFilter::All => true,
                StaffFilter::Role(role) => s.role == role,
                StaffFilter::ReceptionistsOf(manager) => {
                    s.role == Role::Receptionist && s.manager_id == Some(manager)
                }
            })
            .cloned()
            .collect())
    }

    async fn search_customers(&self, term: Option<&str>) -> StoreResult<Vec<Customer>> {
        let t = self.tables.lock().unwrap();
        let needle = term.map(str::to_lowercase);
        Ok(t
            .customers
            .iter()
            .filter(|c| match &needle {
                None => true,
                Some(n) => {
                    c.first_name.to_lowercase().contains(n)
                        || c.last_name.to_lowercase().contains(n)
                }
            })
            .cloned()
            .collect())
    }

    async fn customer_email_exists(&self, email: &str) -> StoreResult<bool> {
        let t = self.tables.lock().unwrap();
        Ok(t.customers.iter().any(|c| c.email == email))
    }

    async fn customer_exists(&self, id: i32) -> StoreResult<bool> {
        let t = self.tables.lock().unwrap();
        Ok(t.customers.iter().any(|c| c.id == id))
    }

    async fn insert_customer(&self, new: NewCustomer) -> StoreResult<i32> {
        let mut t = self.tables.lock().unwrap();
        let id = t.customers.len() as i32 + 1;
        t.customers.push(Customer {
            id,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            phone: new.phone,
        });
        Ok(id)
    }

    async fn room_rate(&self, room_id: i32) -> StoreResult<Option<RoomRate>> {
        let t = self.tables.lock().unwrap();
        Ok(t.rooms.iter().find(|r| r.id == room_id).map(|r| t.rate(r)))
    }

    async fn set_room_status(&self, room_id: i32, status: RoomStatus) -> StoreResult<()> {
        let mut t = self.tables.lock().unwrap();
        if let Some(room) = t.rooms.iter_mut().find(|r| r.id == room_id) {
            room.status = status;
        }
        Ok(())
    }

    async fn count_conflicts(
        &self,
        room_id: i32,
        stay: &Stay,
        except: Option<i32>,
    ) -> StoreResult<i64> {
        let t = self.tables.lock().unwrap();
        Ok(t.holds(room_id, stay, except) as i64)
    }

    async fn count_active_bookings(&self, room_id: i32) -> StoreResult<i64> {
        let t = self.tables.lock().unwrap();
        Ok(t.bookings
            .iter()
            .filter(|b| b.room_id == room_id && !b.status.is_terminal())
            .count() as i64)
    }

    async fn available_rooms(&self, stay: &Stay) -> StoreResult<Vec<AvailableRoom>> {
        let t = self.tables.lock().unwrap();
        Ok(t.rooms
            .iter()
            .filter(|r| t.holds(r.id, stay, None) == 0)
            .map(|r| {
                let rate = t.rate(r);
                AvailableRoom {
                    room_id: rate.room_id,
                    room_number: rate.room_number,
                    type_name: rate.type_name,
                    price_per_night: rate.price_per_night,
                }
            })
            .collect())
    }

    async fn insert_booking(&self, new: NewBooking) -> StoreResult<i32> {
        let mut t = self.tables.lock().unwrap();
        let id = t.bookings.len() as i32 + 1;
        t.bookings.push(Booking {
            id,
            customer_id: new.customer_id,
            room_id: new.room_id,
            staff_id: new.staff_id,
            stay: new.stay,
            total_price: new.total_price,
            status: new.status,
        });
        Ok(id)
    }

    async fn booking(&self, id: i32) -> StoreResult<Option<Booking>> {
        let t = self.tables.lock().unwrap();
        Ok(t.bookings.iter().find(|b| b.id == id).cloned())
    }

    async fn set_booking_status(&self, id: i32, status: BookingStatus) -> StoreResult<()> {
        let mut t = self.tables.lock().unwrap();
        if let Some(booking) = t.bookings.iter_mut().find(|b| b.id == id) {
            booking.status = status;
        }
        Ok(())
    }

    async fn list_bookings(&self, scope: BookingScope) -> StoreResult<Vec<BookingSummary>> {
        let t = self.tables.lock().unwrap();
        let mut out = Vec::new();
        for b in &t.bookings {
            let made_by = t.staff.iter().find(|s| s.id == b.staff_id).unwrap();
            let visible = match scope {
                BookingScope::All => true,
                BookingScope::Team(manager) => made_by.manager_id == Some(manager),
                BookingScope::MadeBy(staff_id) => b.staff_id == staff_id,
            };
            if !visible {
                continue;
            }
            let customer = t.customers.iter().find(|c| c.id == b.customer_id).unwrap();
            let room = t.rooms.iter().find(|r| r.id == b.room_id).unwrap();
            let rate = t.rate(room);
            out.push(BookingSummary {
                booking_id: b.id,
                first_name: customer.first_name.clone(),
                last_name: customer.last_name.clone(),
                room_number: rate.room_number,
                type_name: rate.type_name,
                check_in_date: b.stay.check_in(),
                check_out_date: b.stay.check_out(),
                total_price: b.total_price,
                status: b.status,
                receptionist: made_by.username.clone(),
            });
        }
        Ok(out)
    }
}
