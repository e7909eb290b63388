pub mod error;
pub mod memory;
pub mod migrate;
pub mod pictures;
pub mod store;
pub mod types;

pub use error::DbError;
pub use memory::MemoryPictureStore;
pub use sqlx::postgres::PgPool;
pub use store::{PgPictureStore, PictureStore};
pub use types::*;
