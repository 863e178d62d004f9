pub mod app;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
