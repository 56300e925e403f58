pub mod confirmable;
pub mod general;
pub mod parser;

pub use confirmable::{ban, restart};
pub use general::{help, ping};
