pub mod ledger;
pub mod models;
pub mod services;

pub use ledger::{AppointmentFilter, InMemoryLedger, Ledger, SortOrder, SupabaseLedger};
pub use models::*;
pub use services::*;
