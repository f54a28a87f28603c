//! The HTTP surface (spec §6 / SPEC_FULL §4.K): wire types in `dto`, route
//! handlers and router assembly in `routes`.

pub mod dto;
pub mod routes;

pub use routes::router;
