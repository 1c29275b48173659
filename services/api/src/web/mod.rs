pub mod auth;
pub mod middleware;
pub mod mint_task;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the main WebSocket handler to make it easily accessible
// to the binary that will build the web server router.
pub use middleware::require_auth;
pub use rest::{
    create_course_handler, create_module_handler, get_certificate_handler,
    get_course_progress_handler, get_stats_handler, get_user_certificates_handler,
    get_user_progress_handler, mint_certificate_handler, transfer_handler,
};
pub use ws_handler::ws_handler;
