pub mod directory;
pub mod models;
pub mod services;

pub use directory::{Directory, InMemoryDirectory, SupabaseDirectory};
pub use models::*;
pub use services::*;
