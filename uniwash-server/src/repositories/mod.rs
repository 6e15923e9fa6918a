mod business;
mod device;
mod reservation;

pub use business::BusinessRepository;
pub use device::DeviceRepository;
pub use reservation::{
    NewReservation, ReminderCandidate, ReservationFilter, ReservationListRow,
    ReservationRepository,
};
