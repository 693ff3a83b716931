pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;

pub use auth::{AdminAuth, AdminSession, CookieMode, DEFAULT_ADMIN_PASSWORD};
pub use error::AdminError;
pub use handlers::{authenticate_handler, dashboard_handler, login_page_handler, logout_handler};
pub use middleware::require_admin;
