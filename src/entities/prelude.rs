pub use super::evaluations::Entity as Evaluations;
pub use super::listings::Entity as Listings;
pub use super::searches::Entity as Searches;
