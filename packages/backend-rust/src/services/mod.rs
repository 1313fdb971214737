pub mod allocation;
pub mod learning_style;
pub mod level;
pub mod misconception;
