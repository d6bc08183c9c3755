pub mod middleware;
pub mod models;
pub mod response;
pub mod routes;
