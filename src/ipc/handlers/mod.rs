pub mod core;
pub mod exchange;
pub mod grading;
pub mod hierarchy;
pub mod navigation;
pub mod scores;
