pub mod evaluation;
pub mod listing;
pub mod search;

pub use evaluation::{Evaluation, NO_RED_FLAGS, RedFlags, StoredEvaluation};
pub use listing::{Listing, ListingDetail, ListingSummary, NewListing, TechnicalDetails};
pub use search::Search;
