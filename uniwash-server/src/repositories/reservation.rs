use std::sync::Arc;

use sqlx::sqlite::SqliteRow;
use sqlx::{Error, FromRow, QueryBuilder, Row, Sqlite, SqlitePool, Transaction};
use time::OffsetDateTime;
use uniwash_api::models::{Command, ReservationResponse, ReservationState, ReservationUser};

use crate::configs::Storage;
use crate::models::{Reservation, TaxonomyKind};

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub device_id: i32,
    pub user_id: i32,
    pub business_id: i32,
    pub start_at: OffsetDateTime,
    pub end_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub business_id: Option<i32>,
    pub user_id: Option<i32>,
    pub device_id: Option<i32>,
    pub state: Option<ReservationState>,
    /// Substring of the reserving user's mobile number.
    pub mobile: Option<String>,
    /// Substring of "first_name last_name".
    pub full_name: Option<String>,
    pub start_from: Option<OffsetDateTime>,
    pub end_until: Option<OffsetDateTime>,
    pub post_ids: Vec<i32>,
    pub city_ids: Vec<i32>,
    pub workspace_ids: Vec<i32>,
    pub dormitory_ids: Vec<i32>,
    /// Also return holds that have not expired yet.
    pub include_tentative: bool,
    pub with_usage_count: bool,
    pub page: u32,
    pub page_size: u32,
}

impl ReservationFilter {
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, Self::MAX_PAGE_SIZE) as i64
    }

    pub fn offset(&self) -> i64 {
        (self.page.max(1) as i64 - 1) * self.limit()
    }
}

#[derive(Debug, Clone)]
pub struct ReservationListRow {
    pub reservation: Reservation,
    pub first_name: String,
    pub last_name: String,
    pub mobile: String,
    pub sku: String,
    pub usage_count: Option<i64>,
}

impl ReservationListRow {
    pub fn into_response(self) -> ReservationResponse {
        let mut response = self.reservation.into_response();
        response.user = Some(ReservationUser {
            first_name: self.first_name,
            last_name: self.last_name,
            mobile: self.mobile,
        });
        response.device_sku = Some(self.sku);
        response.usage_count = self.usage_count;
        response
    }
}

impl<'r> FromRow<'r, SqliteRow> for ReservationListRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, Error> {
        Ok(Self {
            reservation: Reservation::from_row(row)?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            mobile: row.try_get("mobile")?,
            sku: row.try_get("sku")?,
            usage_count: row.try_get("usage_count")?,
        })
    }
}

/// A reservation due for a reminder, joined with what the message needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReminderCandidate {
    pub id: i32,
    pub user_id: i32,
    pub start_at: OffsetDateTime,
    pub end_at: OffsetDateTime,
    pub mobile: String,
    pub sku: String,
}

pub struct ReservationRepository {
    storage: Arc<Storage>,
}

impl ReservationRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    pub fn get_pool(&self) -> &SqlitePool {
        self.storage.get_pool()
    }
}

impl ReservationRepository {
    /// Inserts a tentative hold unless a live reservation already claims the
    /// same device and slot. Returns `None` when the slot is taken.
    ///
    /// The existence check and the insert run as one statement, so SQLite's
    /// writer lock orders concurrent holds for the same slot.
    pub async fn create_hold(
        &self,
        item: &NewReservation,
        now: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<Option<i32>, Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO reservations (device_id, user_id, business_id, state, start_at, end_at, expires_at, created_at)
            SELECT $1, $2, $3, 'tentative', $4, $5, $6, $7
            WHERE NOT EXISTS (
                SELECT 1 FROM reservations
                WHERE device_id = $1 AND start_at = $4 AND end_at = $5
                    AND (deleted_at IS NULL OR deleted_at > $7)
                    AND (state = 'confirmed' OR (state = 'tentative' AND expires_at > $7))
            )
            "#,
        )
        .bind(item.device_id)
        .bind(item.user_id)
        .bind(item.business_id)
        .bind(item.start_at)
        .bind(item.end_at)
        .bind(item.expires_at)
        .bind(now)
        .execute(&mut **transaction)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Ok(Some(result.last_insert_rowid() as i32))
    }

    pub async fn count_live(
        &self,
        device_id: i32,
        start_at: OffsetDateTime,
        end_at: OffsetDateTime,
        now: OffsetDateTime,
    ) -> Result<i64, Error> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reservations
            WHERE device_id = $1 AND start_at = $2 AND end_at = $3
                AND (deleted_at IS NULL OR deleted_at > $4)
                AND (state = 'confirmed' OR (state = 'tentative' AND expires_at > $4))
            "#,
        )
        .bind(device_id)
        .bind(start_at)
        .bind(end_at)
        .bind(now)
        .fetch_one(self.storage.get_pool())
        .await?;

        Ok(count)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Reservation>, Error> {
        let reservation: Option<Reservation> =
            sqlx::query_as("SELECT * FROM reservations WHERE id = $1")
                .bind(id)
                .fetch_optional(self.storage.get_pool())
                .await?;

        Ok(reservation)
    }

    /// Promotes a hold that has not yet expired. Returns whether a row changed.
    pub async fn confirm(
        &self,
        id: i32,
        now: OffsetDateTime,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET state = 'confirmed', expires_at = NULL
            WHERE id = $1 AND state = 'tentative' AND expires_at > $2
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut **transaction)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn cancel(
        &self,
        id: i32,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET state = 'canceled', expires_at = NULL
            WHERE id = $1 AND state != 'canceled'
            "#,
        )
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn update_command(
        &self,
        id: i32,
        command: Command,
        time: OffsetDateTime,
        sms_ref: &str,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query(
            r#"
            UPDATE reservations
            SET last_command = $1, last_command_time = $2, last_command_sms_ref = $3
            WHERE id = $4
            "#,
        )
        .bind(command.as_str())
        .bind(time)
        .bind(sms_ref)
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(())
    }

    /// Marks the reservation as turned on unless it already is. Returns
    /// `false` when another ON got there first.
    pub async fn claim_turn_on(&self, id: i32, transaction: &mut Transaction<'_, Sqlite>) -> Result<bool, Error> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET last_command = 'ON'
            WHERE id = $1 AND (last_command IS NULL OR last_command != 'ON')
            "#,
        )
        .bind(id)
        .execute(&mut **transaction)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Undoes [`Self::claim_turn_on`] unless a later command already replaced it.
    pub async fn release_turn_on(
        &self,
        id: i32,
        previous: Option<Command>,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<(), Error> {
        sqlx::query("UPDATE reservations SET last_command = $1 WHERE id = $2 AND last_command = 'ON'")
            .bind(previous.map(|command| command.as_str()))
            .bind(id)
            .execute(&mut **transaction)
            .await?;

        Ok(())
    }

    /// Confirmed reservations starting within `[from, to]` on a published,
    /// running device whose turn-on reminder has not gone out.
    pub async fn find_turn_on_candidates(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<ReminderCandidate>, Error> {
        let candidates: Vec<ReminderCandidate> = sqlx::query_as(
            r#"
            SELECT r.id, r.user_id, r.start_at, r.end_at, u.mobile, d.sku
            FROM reservations r
                JOIN users u ON u.id = r.user_id
                JOIN devices d ON d.id = r.device_id
                JOIN posts p ON p.id = d.post_id
            WHERE r.state = 'confirmed'
                AND r.deleted_at IS NULL
                AND r.on_reminder_sent = FALSE
                AND r.start_at >= $1 AND r.start_at <= $2
                AND p.status = 'published'
                AND d.machine_status = 'ON'
                AND d.deleted_at IS NULL
            ORDER BY r.start_at, r.id
            LIMIT $3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(candidates)
    }

    /// Confirmed reservations ending within `[from, to]` whose machine was
    /// actually started and is still running.
    pub async fn find_turn_off_candidates(
        &self,
        from: OffsetDateTime,
        to: OffsetDateTime,
        limit: i64,
    ) -> Result<Vec<ReminderCandidate>, Error> {
        let candidates: Vec<ReminderCandidate> = sqlx::query_as(
            r#"
            SELECT r.id, r.user_id, r.start_at, r.end_at, u.mobile, d.sku
            FROM reservations r
                JOIN users u ON u.id = r.user_id
                JOIN devices d ON d.id = r.device_id
            WHERE r.state = 'confirmed'
                AND r.deleted_at IS NULL
                AND r.off_reminder_sent = FALSE
                AND r.end_at >= $1 AND r.end_at <= $2
                AND r.last_command_sms_ref IS NOT NULL AND r.last_command_sms_ref != ''
                AND d.machine_status = 'ON'
                AND d.deleted_at IS NULL
            ORDER BY r.end_at, r.id
            LIMIT $3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(candidates)
    }

    pub async fn mark_on_reminder_sent(&self, id: i32) -> Result<(), Error> {
        sqlx::query("UPDATE reservations SET on_reminder_sent = TRUE WHERE id = $1")
            .bind(id)
            .execute(self.storage.get_pool())
            .await?;

        Ok(())
    }

    pub async fn mark_off_reminder_sent(&self, id: i32) -> Result<(), Error> {
        sqlx::query("UPDATE reservations SET off_reminder_sent = TRUE WHERE id = $1")
            .bind(id)
            .execute(self.storage.get_pool())
            .await?;

        Ok(())
    }

    /// Lists reservations matching `filter`, newest slot first, together with
    /// the number of rows matching without pagination.
    pub async fn find_by_filter(
        &self,
        filter: &ReservationFilter,
        now: OffsetDateTime,
    ) -> Result<(Vec<ReservationListRow>, i64), Error> {
        let mut count_query: QueryBuilder<Sqlite> = QueryBuilder::new(
            r#"
            SELECT COUNT(*) FROM reservations r
                JOIN users u ON u.id = r.user_id
                JOIN devices d ON d.id = r.device_id
            "#,
        );
        push_conditions(&mut count_query, filter, now);

        let total: i64 = count_query
            .build_query_scalar()
            .fetch_one(self.storage.get_pool())
            .await?;

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT r.*, u.first_name, u.last_name, u.mobile, d.sku, ",
        );
        if filter.with_usage_count {
            query.push(
                "(SELECT COUNT(*) FROM reservations c WHERE c.user_id = r.user_id AND c.state = 'confirmed' AND c.deleted_at IS NULL) AS usage_count",
            );
        } else {
            query.push("NULL AS usage_count");
        }
        query.push(
            r#"
            FROM reservations r
                JOIN users u ON u.id = r.user_id
                JOIN devices d ON d.id = r.device_id
            "#,
        );
        push_conditions(&mut query, filter, now);
        query.push(" ORDER BY r.start_at DESC, r.id DESC LIMIT ");
        query.push_bind(filter.limit());
        query.push(" OFFSET ");
        query.push_bind(filter.offset());

        let rows: Vec<ReservationListRow> = query
            .build_query_as()
            .fetch_all(self.storage.get_pool())
            .await?;

        Ok((rows, total))
    }
}

fn push_conditions(query: &mut QueryBuilder<'_, Sqlite>, filter: &ReservationFilter, now: OffsetDateTime) {
    query.push(" WHERE (r.deleted_at IS NULL OR r.deleted_at > ");
    query.push_bind(now);
    query.push(")");

    if filter.include_tentative {
        query.push(" AND (r.state != 'tentative' OR r.expires_at > ");
        query.push_bind(now);
        query.push(")");
    } else {
        query.push(" AND r.state != 'tentative'");
    }

    if let Some(business_id) = filter.business_id {
        query.push(" AND r.business_id = ").push_bind(business_id);
    }
    if let Some(user_id) = filter.user_id {
        query.push(" AND r.user_id = ").push_bind(user_id);
    }
    if let Some(device_id) = filter.device_id {
        query.push(" AND r.device_id = ").push_bind(device_id);
    }
    if let Some(state) = filter.state {
        query.push(" AND r.state = ").push_bind(state.as_str());
    }
    if let Some(mobile) = filter.mobile.as_deref().filter(|mobile| !mobile.is_empty()) {
        query.push(" AND u.mobile LIKE ").push_bind(format!("%{mobile}%"));
    }
    if let Some(full_name) = filter.full_name.as_deref().filter(|name| !name.is_empty()) {
        query
            .push(" AND (u.first_name || ' ' || u.last_name) LIKE ")
            .push_bind(format!("%{full_name}%"));
    }
    if let Some(start_from) = filter.start_from {
        query.push(" AND r.start_at >= ").push_bind(start_from);
    }
    if let Some(end_until) = filter.end_until {
        query.push(" AND r.end_at <= ").push_bind(end_until);
    }
    if !filter.post_ids.is_empty() {
        query.push(" AND d.post_id IN (");
        let mut separated = query.separated(", ");
        for post_id in &filter.post_ids {
            separated.push_bind(*post_id);
        }
        separated.push_unseparated(")");
    }

    for (kind, ids) in [
        (TaxonomyKind::City, &filter.city_ids),
        (TaxonomyKind::Workspace, &filter.workspace_ids),
        (TaxonomyKind::Dormitory, &filter.dormitory_ids),
    ] {
        if ids.is_empty() {
            continue;
        }

        query.push(
            r#" AND d.post_id IN (
                SELECT pt.post_id FROM post_taxonomies pt
                    JOIN taxonomies t ON t.id = pt.taxonomy_id
                WHERE t.kind = "#,
        );
        query.push_bind(kind.as_str());
        query.push(" AND pt.taxonomy_id IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated("))");
    }
}
