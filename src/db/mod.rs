//! Database module: the lazily connected application pool.
//!
//! Layout:
//! - `pool.rs`: `Database`, a cloneable wrapper over an `sqlx::AnyPool`
//!
//! The scheme of the connection string picks the driver (`postgres://`, `sqlite:`).

pub mod pool;

pub use pool::Database;
