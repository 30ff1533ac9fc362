//! User identity records and their lifecycle.
pub mod error;
mod memory;
mod model;
mod mongo;
mod repository;
mod service;
pub mod validator;

pub use memory::*;
pub use model::*;
pub use mongo::*;
pub use repository::*;
pub use service::*;
