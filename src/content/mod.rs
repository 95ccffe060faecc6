//! Content module - posts, rich text and reading time

mod post;
pub mod reading_time;
pub mod rich_text;

pub use post::{
    document_path, ContentBlock, NavPost, NavigationNeighbors, PostDetail, PostSummary,
};
pub use reading_time::ReadingTime;
pub use rich_text::RichText;
