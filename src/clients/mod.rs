pub mod marketplace;
pub mod openai;
pub mod telegram;
