mod command;
mod device;
mod reservation;
mod slot;

pub use command::*;
pub use device::*;
pub use reservation::*;
pub use slot::*;

use serde::{Deserialize, Serialize};

pub type Id = i32;

time::serde::format_description!(pub date_format, Date, "[year]-[month]-[day]");
time::serde::format_description!(pub clock_format, Time, "[hour]:[minute]");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items of the requested page
    pub items: Vec<T>,
    /// One-based page number
    pub page: u32,
    /// Maximum number of items per page
    pub page_size: u32,
    /// Number of rows matching the filter
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Operation result message
    pub message: String,
}
