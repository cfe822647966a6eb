pub mod auth;
pub mod convert;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod users;
