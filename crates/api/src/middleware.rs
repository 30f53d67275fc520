/// Caller identity extraction
pub mod auth;
/// Booking error to HTTP response mapping
pub mod error_handling;
