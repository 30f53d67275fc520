pub mod appointment;
pub mod school;
pub mod template;
