// Layout store backends. Selection happens once at startup:
// DATABASE_URL → Postgres, LAYOUT_STORE_URL → remote HTTP store,
// neither → in-memory (development and tests).

pub mod handlers;
pub mod http;
pub mod memory;
pub mod postgres;

pub use http::HttpLayoutStore;
pub use memory::InMemoryLayoutStore;
pub use postgres::PgLayoutStore;
