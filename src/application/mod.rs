pub mod ports;
pub mod repositories;
pub mod services;

pub use repositories::{Repositories, RepositoryContext};
pub use services::{SyncCoordinator, SyncHandle, SyncReport};
