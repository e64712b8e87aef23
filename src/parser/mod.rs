pub mod evaluation;
pub mod listing_page;
