pub mod handlers;
pub mod views;

pub use handlers::{blog_index_handler, category_handler, home_handler, post_detail_handler};
pub use views::{PostCard, PostDetail, format_date};
