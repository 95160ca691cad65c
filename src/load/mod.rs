pub mod loader;
pub mod record;
pub mod schema;

pub use loader::{LoadMode, VehicleLoader, DEFAULT_BATCH_SIZE};
pub use record::VehicleRecord;
pub use schema::{Column, COLUMNS, TABLE_NAME};
