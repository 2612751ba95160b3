pub mod classes;
pub mod core;
pub mod curriculum;
pub mod groups;
pub mod students;
pub mod tasks;
