pub mod category;
pub mod grid;
pub mod models;
pub mod occurrence_index;
pub mod recurrence;
