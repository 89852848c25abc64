pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod policy;
pub mod routes;
pub mod state;

pub use policy::{AllowAll, Policy, PolicyInput, SubjectPolicy, Who};
pub use routes::router;
pub use state::AppState;
