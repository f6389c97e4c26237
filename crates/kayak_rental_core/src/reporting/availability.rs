//! crates/kayak_rental_core/src/reporting/availability.rs

use crate::domain::{Kayak, Rental, RentalStatus};
use std::collections::HashSet;

/// A kayak together with its derived availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KayakAvailability {
    pub kayak: Kayak,
    pub available: bool,
}

/// A kayak is unavailable iff an active rental references it. Output keeps
/// roster order. Nothing is cached; call again after any rental change.
pub fn project_availability(kayaks: &[Kayak], rentals: &[Rental]) -> Vec<KayakAvailability> {
    let busy: HashSet<i32> = rentals
        .iter()
        .filter(|rental| rental.status == RentalStatus::Active)
        .map(|rental| rental.kayak_id)
        .collect();

    kayaks
        .iter()
        .map(|kayak| KayakAvailability {
            kayak: kayak.clone(),
            available: !busy.contains(&kayak.id),
        })
        .collect()
}

/// Convenience check for a single kayak against the same rule.
pub fn is_available(kayak_id: i32, rentals: &[Rental]) -> bool {
    !rentals
        .iter()
        .any(|rental| rental.kayak_id == kayak_id && rental.status == RentalStatus::Active)
}
