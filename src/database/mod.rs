pub mod gateway;
pub mod manager;
pub mod models;
pub mod pg_gateway;
pub mod schema;

pub use gateway::PersistenceGateway;
pub use manager::{DatabaseError, DatabaseManager};
pub use pg_gateway::PgGateway;
