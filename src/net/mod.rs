pub mod bridge;
pub mod fetch;
pub mod summarize;
