use crate::domain::SearchId;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Search {
    pub id: SearchId,
    pub query: String,
    pub first_seen: String,
    pub last_run: String,
    pub run_count: i32,
}
