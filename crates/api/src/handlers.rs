/// Appointment booking, lookup and lifecycle
pub mod appointment;
/// Per-school availability snapshots
pub mod availability;
