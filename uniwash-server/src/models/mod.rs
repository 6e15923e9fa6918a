mod business;
mod device;
mod post;
mod reservation;
mod user;

pub use business::{Business, BusinessMember, BusinessMemberTable, BusinessRole, BusinessTable};
pub use device::{Device, DeviceTable};
pub use post::{Post, PostStatus, PostTable, PostTaxonomyTable, Taxonomy, TaxonomyKind, TaxonomyTable};
pub use reservation::{Reservation, ReservationTable};
pub use user::{User, UserTable};

use std::str::FromStr;

use sqlx::Row;
use sqlx::sqlite::SqliteRow;

pub trait Table {
    /// The name of the table
    fn name(&self) -> &'static str;

    /// The SQL statement to create the table
    fn create(&self) -> String;

    /// The SQL statement to dispose the table
    fn dispose(&self) -> String;

    /// The dependencies of the table
    fn dependencies(&self) -> Vec<&'static str>;
}

fn decode_text<T>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;

    raw.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: e.into(),
    })
}

fn decode_optional_text<T>(row: &SqliteRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr<Err = String>,
{
    let raw: Option<String> = row.try_get(column)?;

    raw.map(|value| {
        value.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: e.into(),
        })
    })
    .transpose()
}
