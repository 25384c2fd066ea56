pub mod availability;
pub mod doctor;

pub use availability::AvailabilityModel;
pub use doctor::DoctorService;
