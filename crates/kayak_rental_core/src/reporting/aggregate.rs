//! crates/kayak_rental_core/src/reporting/aggregate.rs
//!
//! Grouped counts and revenue over a set of rentals. The type and payment
//! partitions are independent views of the same total.
//!
//! Revenue accumulates in `u128`: a sum of `u64` amounts cannot overflow it
//! before the count itself would.

use crate::domain::{PaymentMethod, Rental, RentalType};

/// Count and revenue for one slice of the data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bucket {
    pub count: u64,
    pub revenue: u128,
}

impl Bucket {
    fn add(&mut self, amount: u64) {
        self.count += 1;
        self.revenue += u128::from(amount);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByType {
    pub simple: Bucket,
    pub double: Bucket,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByPayment {
    pub cash: Bucket,
    pub transfer: Bucket,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RentalAggregate {
    pub total_count: u64,
    pub total_revenue: u128,
    pub by_type: ByType,
    pub by_payment: ByPayment,
}

impl RentalAggregate {
    pub fn type_bucket(&self, rental_type: RentalType) -> Bucket {
        match rental_type {
            RentalType::Simple => self.by_type.simple,
            RentalType::Double => self.by_type.double,
        }
    }

    pub fn payment_bucket(&self, method: PaymentMethod) -> Bucket {
        match method {
            PaymentMethod::Cash => self.by_payment.cash,
            PaymentMethod::Transfer => self.by_payment.transfer,
        }
    }

    /// Share of all rentals that were of `rental_type`, in percent.
    pub fn type_share(&self, rental_type: RentalType) -> f64 {
        share_percent(self.type_bucket(rental_type).count, self.total_count)
    }

    /// Share of all rentals paid with `method`, in percent.
    pub fn payment_share(&self, method: PaymentMethod) -> f64 {
        share_percent(self.payment_bucket(method).count, self.total_count)
    }
}

/// `count` as a percentage of `total`, rounded to one decimal. Zero when
/// `total` is zero.
pub fn share_percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = count as f64 / total as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}

/// Single pass over `rentals`.
pub fn aggregate<'a, I>(rentals: I) -> RentalAggregate
where
    I: IntoIterator<Item = &'a Rental>,
{
    let mut agg = RentalAggregate::default();
    for rental in rentals {
        agg.total_count += 1;
        agg.total_revenue += u128::from(rental.amount);

        match rental.rental_type {
            RentalType::Simple => agg.by_type.simple.add(rental.amount),
            RentalType::Double => agg.by_type.double.add(rental.amount),
        }
        match rental.payment_method {
            PaymentMethod::Cash => agg.by_payment.cash.add(rental.amount),
            PaymentMethod::Transfer => agg.by_payment.transfer.add(rental.amount),
        }
    }
    agg
}
