//! crates/kayak_rental_core/src/reporting/mod.rs
//!
//! Pure functions behind the dashboard and reports: resolve a period into a
//! window, select the rentals started inside it, and summarise them. None of
//! these perform I/O; callers fetch a snapshot first and pass it in.

pub mod aggregate;
pub mod availability;
pub mod filter;
pub mod window;

pub use aggregate::{aggregate, share_percent, Bucket, ByPayment, ByType, RentalAggregate};
pub use availability::{is_available, project_availability, KayakAvailability};
pub use filter::{filter_by_window, RentalSearch};
pub use window::{resolve_window, Period, Window};
