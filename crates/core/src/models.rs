pub mod appointment;
pub mod school;
pub mod template;
pub mod time_format;
pub mod time_slot;
