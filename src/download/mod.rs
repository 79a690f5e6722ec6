//! Work slots, delivery and retry policy

pub mod delivery;
pub mod retry;
pub mod work_area;

pub use delivery::*;
pub use retry::*;
pub use work_area::*;
