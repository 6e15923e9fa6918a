mod actor;
mod clock;
mod command_service;
mod device_service;
mod reminder_service;
mod reservation_service;
mod slot_catalog;
mod sms_service;
mod token_service;

pub use actor::*;
pub use clock::*;
pub use command_service::*;
pub use device_service::*;
pub use reminder_service::*;
pub use reservation_service::*;
pub use slot_catalog::*;
pub use sms_service::*;
pub use token_service::*;
