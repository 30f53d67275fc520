//! # Slotbook Core
//!
//! Domain layer of the Slotbook vision-screening booking service. It owns the
//! appointment model, the error taxonomy and every piece of booking logic that
//! does not depend on a particular storage engine or transport:
//!
//! - **Models**: working-hours templates, time slots, appointments and schools
//! - **Slots**: the slot lattice generator and grid alignment checks
//! - **Availability**: free/busy calculation for a school and date
//! - **Store**: the storage traits implemented by `slotbook-db`
//! - **Allocator**: conflict-free booking with bounded transient retries

/// Conflict-free booking, cancellation and rescheduling
pub mod allocator;
/// Free/busy calculation over the slot lattice
pub mod availability;
/// Error taxonomy shared by every layer
pub mod errors;
/// Domain models and request payloads
pub mod models;
/// Slot lattice generation and alignment
pub mod slots;
/// Storage traits implemented by the persistence layer
pub mod store;
/// Working-hours template resolution with default fallback
pub mod templates;
