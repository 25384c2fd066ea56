pub mod authorization;
pub mod conflict;
pub mod lifecycle;
pub mod scheduling;
pub mod slots;

pub use authorization::AuthorizationGate;
pub use conflict::ConflictChecker;
pub use lifecycle::BookingStateMachine;
pub use scheduling::SchedulingService;
pub use slots::SlotGenerator;
