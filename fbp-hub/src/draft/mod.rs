// Draft pick ownership and the live draft tracker.

pub mod picks;
pub mod tracker;
