pub mod animator;
pub mod reconciler;
pub mod scanner;
pub mod schedule;
pub mod state;
pub mod tracker;
