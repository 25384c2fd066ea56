pub mod auth;
pub mod error;
pub mod ids;

pub use auth::{Actor, User, UserRole};
pub use error::AppError;
pub use ids::{AppointmentId, DoctorId, SpecialtyId, UserId};
