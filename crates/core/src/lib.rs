#![forbid(unsafe_code)]

pub mod model;
pub mod navigator;
pub mod normalize;
pub mod time;

pub use navigator::{Navigator, Step};
pub use normalize::{NormalizedPart, NormalizedTest, PartKind, Position, Unit, UnitQuestion, normalize};
pub use time::Clock;
