pub mod slack;

pub use slack::*;
