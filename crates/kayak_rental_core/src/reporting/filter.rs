//! crates/kayak_rental_core/src/reporting/filter.rs

use crate::domain::{PaymentMethod, Rental, RentalType};
use crate::reporting::window::Window;

/// Selects the rentals whose start time falls inside `window`, keeping their
/// original order. A `None` window selects everything.
pub fn filter_by_window<'a>(rentals: &'a [Rental], window: Option<&Window>) -> Vec<&'a Rental> {
    match window {
        Some(window) => rentals
            .iter()
            .filter(|rental| window.contains(rental.start_time))
            .collect(),
        None => rentals.iter().collect(),
    }
}

/// Narrows a rental listing. Absent fields match every rental.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RentalSearch {
    pub rental_type: Option<RentalType>,
    pub payment_method: Option<PaymentMethod>,
    /// Matched case-insensitively against the kayak name or the rental id.
    pub text: Option<String>,
}

impl RentalSearch {
    pub fn matches(&self, rental: &Rental, kayak_name: Option<&str>) -> bool {
        if self.rental_type.is_some_and(|t| t != rental.rental_type) {
            return false;
        }
        if self.payment_method.is_some_and(|m| m != rental.payment_method) {
            return false;
        }
        let needle = match self.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text.to_lowercase(),
            _ => return true,
        };
        kayak_name.is_some_and(|name| name.to_lowercase().contains(&needle))
            || rental.id.to_string().contains(&needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PaymentMethod, RentalStatus, RentalType};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn rental_at(start: DateTime<Utc>) -> Rental {
        Rental {
            id: Uuid::new_v4(),
            kayak_id: 1,
            start_time: start,
            end_time: start + Duration::minutes(30),
            rental_type: RentalType::Simple,
            payment_method: PaymentMethod::Cash,
            amount: 6000,
            status: RentalStatus::Completed,
            contact_info: None,
        }
    }

    fn window() -> Window {
        Window {
            start: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap() + Duration::milliseconds(999),
        }
    }

    #[test]
    fn test_keeps_only_rentals_inside_window() {
        let w = window();
        let rentals = vec![
            rental_at(w.start - Duration::milliseconds(1)),
            rental_at(w.start),
            rental_at(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()),
            rental_at(w.end),
            rental_at(w.end + Duration::milliseconds(1)),
        ];

        let selected = filter_by_window(&rentals, Some(&w));

        assert_eq!(selected.len(), 3);
        assert!(selected.iter().all(|r| w.start <= r.start_time && r.start_time <= w.end));
        assert!(selected.iter().all(|r| rentals.iter().any(|orig| orig.id == r.id)));
    }

    #[test]
    fn test_preserves_order() {
        let w = window();
        let rentals = vec![
            rental_at(Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap()),
            rental_at(Utc.with_ymd_and_hms(2024, 2, 20, 0, 0, 0).unwrap()),
            rental_at(Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()),
        ];

        let selected = filter_by_window(&rentals, Some(&w));
        let ids: Vec<Uuid> = selected.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![rentals[0].id, rentals[2].id]);
    }

    #[test]
    fn test_no_window_selects_everything() {
        let rentals = vec![
            rental_at(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            rental_at(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
        ];
        let before = rentals.clone();

        let selected = filter_by_window(&rentals, None);

        assert_eq!(selected.len(), 2);
        assert_eq!(rentals, before);
    }

    #[test]
    fn test_search_by_tags_and_text() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let cash_simple = rental_at(now);
        let transfer_double = Rental {
            rental_type: RentalType::Double,
            payment_method: PaymentMethod::Transfer,
            ..rental_at(now)
        };

        let everything = RentalSearch::default();
        assert!(everything.matches(&cash_simple, None));
        assert!(everything.matches(&transfer_double, Some("Kayak 2")));

        let doubles = RentalSearch {
            rental_type: Some(RentalType::Double),
            ..Default::default()
        };
        assert!(!doubles.matches(&cash_simple, Some("Kayak 1")));
        assert!(doubles.matches(&transfer_double, Some("Kayak 2")));

        let cash_doubles = RentalSearch {
            payment_method: Some(PaymentMethod::Cash),
            ..doubles
        };
        assert!(!cash_doubles.matches(&transfer_double, Some("Kayak 2")));

        let by_name = RentalSearch {
            text: Some("  kAyAk 2 ".to_string()),
            ..Default::default()
        };
        assert!(by_name.matches(&transfer_double, Some("Kayak 2")));
        assert!(!by_name.matches(&cash_simple, Some("Kayak 1")));
        assert!(!by_name.matches(&transfer_double, None));

        let id = transfer_double.id.to_string();
        let by_id = RentalSearch {
            text: Some(id[..8].to_uppercase()),
            ..Default::default()
        };
        assert!(by_id.matches(&transfer_double, None));
        assert!(!by_id.matches(&cash_simple, None));

        let blank = RentalSearch {
            text: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(blank.matches(&cash_simple, None));
    }
}
