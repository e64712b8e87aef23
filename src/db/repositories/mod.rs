pub mod evaluation;
pub mod listing;
pub mod search;
