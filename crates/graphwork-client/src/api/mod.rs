//! API endpoint implementations.

mod drives;
mod users;

pub use drives::{DrivesApi, RangeTarget, item_path};
pub use users::UsersApi;
