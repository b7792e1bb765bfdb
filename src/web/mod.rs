pub mod api;
pub mod auth;
pub mod employer;
pub mod landing;
pub mod models;
pub mod portal;
pub mod responses;
pub mod router;
pub mod state;
pub mod storage;
pub mod templates;
pub mod uploads;

pub use auth::{SESSION_COOKIE, SESSION_TTL_DAYS};
pub use state::AppState;
pub use templates::escape_html;
