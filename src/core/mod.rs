//! Core functionality for grabr

pub mod fetcher;
pub mod media_info;
pub mod rendition;
pub mod request;
pub mod selector;

pub use fetcher::*;
pub use media_info::*;
pub use rendition::*;
pub use request::*;
pub use selector::*;
