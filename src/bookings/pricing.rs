// Quote construction
//
// Prices are frozen at booking time: each line snapshots the unit price in
// effect today, including the seasonal multiplier, so later catalog edits
// never change what an existing booking owes. Addon references are validated
// and stored on the line but carry no price of their own.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::bookings::error::BookingError;
use crate::bookings::models::BookingLineRequest;
use crate::catalog::models::Service;

/// One priced line of a quote
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteLine {
    pub service_id: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub addon_ids: Vec<i32>,
}

/// A fully priced booking quote
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub lines: Vec<QuoteLine>,
    pub total_amount: Decimal,
    pub estimated_duration: i32,
    pub loyalty_points: i32,
}

/// Price a set of requested lines against the resolved services, using the
/// seasonal multiplier in effect on `today`.
///
/// `services` must contain every referenced service and addon; inactive or
/// missing entries fail the whole quote.
pub fn build_quote(
    requested: &[BookingLineRequest],
    services: &HashMap<i32, Service>,
    today: NaiveDate,
) -> Result<Quote, BookingError> {
    let mut lines = Vec::with_capacity(requested.len());
    let mut total_amount = Decimal::ZERO;
    let mut estimated_duration = 0i32;
    let mut loyalty_points = 0i32;

    for line in requested {
        let service = resolve(services, line.service_id)?;
        for addon_id in &line.addon_ids {
            resolve(services, *addon_id)?;
        }

        let unit_price = service.current_price(today);
        let line_total = unit_price * Decimal::from(line.quantity);

        total_amount += line_total;
        estimated_duration += service.duration_minutes * line.quantity;
        loyalty_points += service.loyalty_points_earned * line.quantity;

        lines.push(QuoteLine {
            service_id: line.service_id,
            quantity: line.quantity,
            unit_price,
            line_total,
            addon_ids: line.addon_ids.clone(),
        });
    }

    Ok(Quote {
        lines,
        total_amount,
        estimated_duration,
        loyalty_points,
    })
}

fn resolve<'a>(
    services: &'a HashMap<i32, Service>,
    id: i32,
) -> Result<&'a Service, BookingError> {
    services
        .get(&id)
        .filter(|s| s.is_active)
        .ok_or(BookingError::ServiceUnavailable(id))
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    /// Total always equals the sum of line totals
    #[test]
    fn prop_total_is_sum_of_line_totals() {
        proptest!(|(
            prices_cents in proptest::collection::vec(100u32..=50000, 1..=5),
            quantities in proptest::collection::vec(1i32..=10, 5)
        )| {
            let services: HashMap<i32, Service> = prices_cents
                .iter()
                .enumerate()
                .map(|(i, cents)| {
                    let price = Decimal::from(*cents) / dec!(100);
                    let svc = super::tests::service(i as i32 + 1, price, 30, 5);
                    (svc.id, svc)
                })
                .collect();

            let requested: Vec<BookingLineRequest> = (0..prices_cents.len())
                .map(|i| BookingLineRequest {
                    service_id: i as i32 + 1,
                    quantity: quantities[i],
                    addon_ids: vec![],
                })
                .collect();

            let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
            let quote = build_quote(&requested, &services, date).unwrap();

            let sum: Decimal = quote.lines.iter().map(|l| l.line_total).sum();
            prop_assert_eq!(quote.total_amount, sum);
            for l in &quote.lines {
                prop_assert_eq!(l.line_total, l.unit_price * Decimal::from(l.quantity));
            }
        });
    }

    /// Pricing is a pure function: same inputs, same quote
    #[test]
    fn prop_quote_is_deterministic() {
        proptest!(|(price_cents in 100u32..=50000, quantity in 1i32..=10)| {
            let price = Decimal::from(price_cents) / dec!(100);
            let svc = super::tests::service(1, price, 45, 8);
            let services: HashMap<i32, Service> = [(1, svc)].into_iter().collect();
            let requested = vec![BookingLineRequest {
                service_id: 1,
                quantity,
                addon_ids: vec![],
            }];
            let date = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();

            let a = build_quote(&requested, &services, date).unwrap();
            let b = build_quote(&requested, &services, date).unwrap();
            prop_assert_eq!(a, b);
        });
    }
}
