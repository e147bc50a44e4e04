pub mod feed;
pub mod item;

pub use feed::{canonical_link, FeedChannel, FeedDocument, FeedEntry};
pub use item::Item;
