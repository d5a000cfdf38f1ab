pub mod batch;
pub mod column;
pub mod data_row;
pub mod user;

pub use batch::{BatchInfo, NewBatch};
pub use column::KnownColumn;
pub use data_row::{DataRow, OrganizationCount};
pub use user::{NewUser, User};
