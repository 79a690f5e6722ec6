//! Media inspector integrations

pub mod inspector;
pub mod ytdlp;

pub use inspector::*;
pub use ytdlp::*;
