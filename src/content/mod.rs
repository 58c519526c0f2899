//! Markdown content: front-matter, documents and the loaded site.

pub mod cache;
pub mod document;
pub mod frontmatter;
pub mod loader;
pub mod site;

pub use cache::ParseCache;
pub use document::{Document, Kind};
pub use loader::{LoadError, Loaded, load};
pub use site::Site;
