pub mod responses;
pub mod routes;

pub use routes::{AppState, router, serve};
