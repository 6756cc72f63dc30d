pub mod handlers;
pub mod middleware;
pub mod milestones;
pub mod routes;

pub use routes::create_router;
