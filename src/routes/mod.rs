pub mod middleware;
#[allow(clippy::module_inception)]
pub mod routes;
