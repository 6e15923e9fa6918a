use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use time::{Duration, OffsetDateTime};
use uniwash_api::models::{Command, ReservationResponse, ReservationState};

use super::{Table, decode_optional_text, decode_text};

/// Lead time before a slot starts and before it ends during which the
/// reserving user may control the machine.
pub const COMMAND_LEAD: Duration = Duration::minutes(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i32,
    pub device_id: i32,
    pub user_id: i32,
    pub business_id: i32,
    pub state: ReservationState,
    pub start_at: OffsetDateTime,
    pub end_at: OffsetDateTime,
    /// Set while the reservation is a tentative hold.
    pub expires_at: Option<OffsetDateTime>,
    pub last_command: Option<Command>,
    pub last_command_time: Option<OffsetDateTime>,
    pub last_command_sms_ref: Option<String>,
    pub on_reminder_sent: bool,
    pub off_reminder_sent: bool,
    pub deleted_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

impl Reservation {
    /// Whether the row still claims its slot at `now`.
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        if self.deleted_at.is_some_and(|deleted_at| deleted_at <= now) {
            return false;
        }

        match self.state {
            ReservationState::Confirmed => true,
            ReservationState::Tentative => self.expires_at.is_some_and(|expires_at| expires_at > now),
            ReservationState::Canceled => false,
        }
    }

    /// Inclusive interval in which an end user may issue commands.
    pub fn command_window(&self) -> (OffsetDateTime, OffsetDateTime) {
        (self.start_at - COMMAND_LEAD, self.end_at - COMMAND_LEAD)
    }

    pub fn into_response(self) -> ReservationResponse {
        ReservationResponse {
            id: self.id,
            device_id: self.device_id,
            user_id: self.user_id,
            business_id: self.business_id,
            state: self.state,
            start: self.start_at,
            end: self.end_at,
            expires_at: self.expires_at,
            last_command: self.last_command,
            last_command_time: self.last_command_time,
            last_command_sms_ref: self.last_command_sms_ref,
            on_reminder_sent: self.on_reminder_sent,
            off_reminder_sent: self.off_reminder_sent,
            user: None,
            device_sku: None,
            usage_count: None,
        }
    }
}

impl<'r> FromRow<'r, SqliteRow> for Reservation {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            device_id: row.try_get("device_id")?,
            user_id: row.try_get("user_id")?,
            business_id: row.try_get("business_id")?,
            state: decode_text(row, "state")?,
            start_at: row.try_get("start_at")?,
            end_at: row.try_get("end_at")?,
            expires_at: row.try_get("expires_at")?,
            last_command: decode_optional_text(row, "last_command")?,
            last_command_time: row.try_get("last_command_time")?,
            last_command_sms_ref: row.try_get("last_command_sms_ref")?,
            on_reminder_sent: row.try_get("on_reminder_sent")?,
            off_reminder_sent: row.try_get("off_reminder_sent")?,
            deleted_at: row.try_get("deleted_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Clone)]
pub struct ReservationTable;

impl Table for ReservationTable {
    fn name(&self) -> &'static str {
        "reservations"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS reservations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id INTEGER NOT NULL,
                user_id INTEGER NOT NULL,
                business_id INTEGER NOT NULL,
                state TEXT NOT NULL,
                start_at TIMESTAMP NOT NULL,
                end_at TIMESTAMP NOT NULL,
                expires_at TIMESTAMP,
                last_command TEXT,
                last_command_time TIMESTAMP,
                last_command_sms_ref TEXT,
                on_reminder_sent BOOLEAN NOT NULL DEFAULT FALSE,
                off_reminder_sent BOOLEAN NOT NULL DEFAULT FALSE,
                deleted_at TIMESTAMP,
                created_at TIMESTAMP NOT NULL,
                CHECK (end_at > start_at),
                FOREIGN KEY (device_id) REFERENCES devices (id) ON DELETE CASCADE,
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE,
                FOREIGN KEY (business_id) REFERENCES businesses (id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_reservations_slot ON reservations (device_id, start_at, end_at);
            CREATE INDEX IF NOT EXISTS idx_reservations_start ON reservations (state, start_at);
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS reservations;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["devices", "users", "businesses"]
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn reservation(state: ReservationState, expires_at: Option<OffsetDateTime>) -> Reservation {
        Reservation {
            id: 1,
            device_id: 1,
            user_id: 1,
            business_id: 1,
            state,
            start_at: datetime!(2025-03-15 06:30 UTC),
            end_at: datetime!(2025-03-15 08:00 UTC),
            expires_at,
            last_command: None,
            last_command_time: None,
            last_command_sms_ref: None,
            on_reminder_sent: false,
            off_reminder_sent: false,
            deleted_at: None,
            created_at: datetime!(2025-03-14 12:00 UTC),
        }
    }

    #[test]
    fn test_hold_liveness_boundary() {
        let now = datetime!(2025-03-15 00:00 UTC);

        let fresh = reservation(ReservationState::Tentative, Some(now + Duration::seconds(1)));
        assert!(fresh.is_live(now));

        let stale = reservation(ReservationState::Tentative, Some(now - Duration::seconds(1)));
        assert!(!stale.is_live(now));

        let at_expiry = reservation(ReservationState::Tentative, Some(now));
        assert!(!at_expiry.is_live(now));
    }

    #[test]
    fn test_confirmed_and_canceled_liveness() {
        let now = datetime!(2025-03-15 00:00 UTC);

        assert!(reservation(ReservationState::Confirmed, None).is_live(now));
        assert!(!reservation(ReservationState::Canceled, None).is_live(now));

        let mut deleted = reservation(ReservationState::Confirmed, None);
        deleted.deleted_at = Some(now);
        assert!(!deleted.is_live(now));
    }

    #[test]
    fn test_command_window() {
        let (open, close) = reservation(ReservationState::Confirmed, None).command_window();

        assert_eq!(open, datetime!(2025-03-15 06:20 UTC));
        assert_eq!(close, datetime!(2025-03-15 07:50 UTC));
    }
}
