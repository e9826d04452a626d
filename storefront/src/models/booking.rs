// payhula-storefront/src/models/booking.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "booking_status_enum", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
  Pending,
  Confirmed,
  InProgress,
  Completed,
  Cancelled,
}

impl BookingStatus {
  /// Statuses that hold the time slot.
  pub const ACTIVE: [BookingStatus; 3] = [BookingStatus::Pending, BookingStatus::Confirmed, BookingStatus::InProgress];

  pub fn holds_slot(&self) -> bool {
    Self::ACTIVE.contains(self)
  }
}

/// `service_bookings` row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Booking {
  pub id: Uuid,
  pub service_id: Uuid,
  pub customer_id: Uuid,
  pub staff_id: Option<Uuid>,
  pub start_time: DateTime<Utc>,
  pub end_time: DateTime<Utc>,
  pub status: BookingStatus,
  pub number_of_participants: i32,
  pub customer_notes: Option<String>,
  pub created_at: DateTime<Utc>,
}

impl Booking {
  /// Half-open interval overlap: touching windows do not conflict.
  pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
    start < self.end_time && end > self.start_time
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{Duration, TimeZone};

  fn booking_at(hour: u32, minutes: i64) -> Booking {
    let start = Utc.with_ymd_and_hms(2026, 3, 2, hour, 0, 0).unwrap();
    Booking {
      id: Uuid::new_v4(),
      service_id: Uuid::new_v4(),
      customer_id: Uuid::new_v4(),
      staff_id: None,
      start_time: start,
      end_time: start + Duration::minutes(minutes),
      status: BookingStatus::Pending,
      number_of_participants: 1,
      customer_notes: None,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn overlap_is_strict_on_both_ends() {
    let existing = booking_at(10, 60);
    let at = |h: u32, m: u32| Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap();

    assert!(existing.overlaps(at(10, 30), at(11, 30)));
    assert!(existing.overlaps(at(9, 0), at(12, 0)));
    assert!(existing.overlaps(at(10, 15), at(10, 45)));
    assert!(!existing.overlaps(at(11, 0), at(12, 0)));
    assert!(!existing.overlaps(at(9, 0), at(10, 0)));
  }

  #[test]
  fn cancelled_and_completed_bookings_free_the_slot() {
    assert!(BookingStatus::InProgress.holds_slot());
    assert!(!BookingStatus::Cancelled.holds_slot());
    assert!(!BookingStatus::Completed.holds_slot());
  }
}
