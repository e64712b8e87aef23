pub mod prelude;

pub mod evaluations;
pub mod listings;
pub mod searches;
