pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

// Re-export the plan handlers to make them easily accessible to the binary
// that builds the web server router.
pub use middleware::require_auth;
pub use rest::{
    commit_workout_handler, generate_workout_handler, get_diet_handler, get_program_handler,
    get_quota_handler, refresh_diet_handler,
};
