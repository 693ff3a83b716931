pub mod error;
pub mod handlers;
pub mod store;

pub use error::FeaturedError;
pub use handlers::{selected_posts_handler, toggle_featured_handler};
pub use store::{FeaturedStore, SharedFeaturedStore};
