// Service catalog models
//
// Services are read-only from the booking flow's perspective; catalog
// administration happens outside this API.

use chrono::{Datelike, NaiveDate, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::auth::models::Language;

/// Service category tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Basic,
    Premium,
    Deluxe,
    Addon,
}

/// Vehicle types a service can be booked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    Car,
    Suv,
    Van,
    Motorcycle,
}

/// Season tag on a pricing rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

/// Three-language text block; keys are fixed to nl/fr/en
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocalizedText {
    pub nl: String,
    pub fr: String,
    pub en: String,
}

impl LocalizedText {
    /// Text for the requested language, falling back to Dutch when the
    /// translation is missing
    pub fn get(&self, language: Language) -> &str {
        let text = match language {
            Language::Nl => &self.nl,
            Language::Fr => &self.fr,
            Language::En => &self.en,
        };
        if text.is_empty() {
            &self.nl
        } else {
            text
        }
    }
}

/// Three-language string list (feature bullet points)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LocalizedList {
    pub nl: Vec<String>,
    pub fr: Vec<String>,
    pub en: Vec<String>,
}

impl LocalizedList {
    pub fn get(&self, language: Language) -> &[String] {
        let list = match language {
            Language::Nl => &self.nl,
            Language::Fr => &self.fr,
            Language::En => &self.en,
        };
        if list.is_empty() {
            &self.nl
        } else {
            list
        }
    }
}

/// Seasonal price adjustment window
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SeasonalRule {
    pub season: Season,
    /// Multiplier applied to the base price, 0.1 to 3.0
    pub multiplier: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SeasonalRule {
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Weekly availability flags
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WeeklyAvailability {
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
}

impl WeeklyAvailability {
    pub fn is_available_on(&self, date: NaiveDate) -> bool {
        match date.weekday() {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }
}

/// Service database model
#[derive(Debug, Clone, FromRow)]
pub struct Service {
    pub id: i32,
    pub name: Json<LocalizedText>,
    pub description: Json<LocalizedText>,
    pub features: Json<LocalizedList>,
    pub category: ServiceCategory,
    pub price: Decimal,
    pub duration_minutes: i32,
    pub is_active: bool,
    pub sort_order: i32,
    pub loyalty_points_earned: i32,
    pub seasonal_pricing: Json<Vec<SeasonalRule>>,
    pub availability: Json<WeeklyAvailability>,
    pub vehicle_types: Json<Vec<VehicleType>>,
}

impl Service {
    /// Seasonal multiplier in effect on the given date.
    ///
    /// Rules are evaluated in stored order and the first match wins, so
    /// overlapping windows resolve deterministically. No match means 1.0.
    pub fn current_multiplier(&self, date: NaiveDate) -> Decimal {
        self.seasonal_pricing
            .0
            .iter()
            .find(|rule| rule.applies_on(date))
            .map(|rule| rule.multiplier)
            .unwrap_or(Decimal::ONE)
    }

    /// Base price adjusted by the seasonal multiplier for the given date
    pub fn current_price(&self, date: NaiveDate) -> Decimal {
        self.price * self.current_multiplier(date)
    }
}

/// Localized service representation returned by the API
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub features: Vec<String>,
    pub category: ServiceCategory,
    pub price: Decimal,
    /// Price with the current seasonal multiplier applied
    pub current_price: Decimal,
    pub duration_minutes: i32,
    pub loyalty_points_earned: i32,
    pub vehicle_types: Vec<VehicleType>,
    pub availability: WeeklyAvailability,
}

impl ServiceResponse {
    pub fn from_service(service: Service, language: Language, today: NaiveDate) -> Self {
        let current_price = service.current_price(today);
        Self {
            id: service.id,
            name: service.name.0.get(language).to_string(),
            description: service.description.0.get(language).to_string(),
            features: service.features.0.get(language).to_vec(),
            category: service.category,
            price: service.price,
            current_price,
            duration_minutes: service.duration_minutes,
            loyalty_points_earned: service.loyalty_points_earned,
            vehicle_types: service.vehicle_types.0,
            availability: service.availability.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn text(nl: &str, fr: &str, en: &str) -> LocalizedText {
        LocalizedText {
            nl: nl.to_string(),
            fr: fr.to_string(),
            en: en.to_string(),
        }
    }

    fn service_with_rules(rules: Vec<SeasonalRule>) -> Service {
        Service {
            id: 1,
            name: Json(text("Basis wasbeurt", "Lavage de base", "Basic wash")),
            description: Json(text("", "", "")),
            features: Json(LocalizedList {
                nl: vec![],
                fr: vec![],
                en: vec![],
            }),
            category: ServiceCategory::Basic,
            price: dec!(25.00),
            duration_minutes: 30,
            is_active: true,
            sort_order: 0,
            loyalty_points_earned: 10,
            seasonal_pricing: Json(rules),
            availability: Json(WeeklyAvailability {
                monday: true,
                tuesday: true,
                wednesday: true,
                thursday: true,
                friday: true,
                saturday: true,
                sunday: false,
            }),
            vehicle_types: Json(vec![VehicleType::Car]),
        }
    }

    fn rule(season: Season, multiplier: Decimal, start: (i32, u32, u32), end: (i32, u32, u32)) -> SeasonalRule {
        SeasonalRule {
            season,
            multiplier,
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
        }
    }

    #[test]
    fn base_price_when_no_rule_applies() {
        let service = service_with_rules(vec![rule(
            Season::Winter,
            dec!(1.5),
            (2025, 12, 1),
            (2026, 2, 28),
        )]);
        let date = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert_eq!(service.current_price(date), dec!(25.00));
    }

    #[test]
    fn multiplier_applies_inside_window() {
        let service = service_with_rules(vec![rule(
            Season::Winter,
            dec!(1.2),
            (2025, 12, 1),
            (2026, 2, 28),
        )]);
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        assert_eq!(service.current_price(date), dec!(30.000));
    }

    #[test]
    fn window_boundaries_are_inclusive() {
        let service = service_with_rules(vec![rule(
            Season::Summer,
            dec!(2),
            (2025, 6, 1),
            (2025, 8, 31),
        )]);
        assert_eq!(
            service.current_price(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()),
            dec!(50.00)
        );
        assert_eq!(
            service.current_price(NaiveDate::from_ymd_opt(2025, 8, 31).unwrap()),
            dec!(50.00)
        );
        assert_eq!(
            service.current_price(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap()),
            dec!(25.00)
        );
    }

    #[test]
    fn overlapping_rules_resolve_to_first_in_stored_order() {
        let service = service_with_rules(vec![
            rule(Season::Winter, dec!(1.5), (2025, 12, 1), (2026, 2, 28)),
            rule(Season::Winter, dec!(3.0), (2025, 12, 15), (2026, 1, 15)),
        ]);
        let date = NaiveDate::from_ymd_opt(2025, 12, 20).unwrap();
        // Both rules cover the date; the first stored rule wins
        assert_eq!(service.current_multiplier(date), dec!(1.5));
    }

    #[test]
    fn localized_text_falls_back_to_dutch() {
        let t = text("Wasbeurt", "", "Wash");
        assert_eq!(t.get(Language::Nl), "Wasbeurt");
        assert_eq!(t.get(Language::En), "Wash");
        assert_eq!(t.get(Language::Fr), "Wasbeurt");
    }

    #[test]
    fn weekly_availability_by_weekday() {
        let service = service_with_rules(vec![]);
        // 2025-06-15 is a Sunday, 2025-06-16 a Monday
        assert!(!service
            .availability
            .0
            .is_available_on(NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()));
        assert!(service
            .availability
            .0
            .is_available_on(NaiveDate::from_ymd_opt(2025, 6, 16).unwrap()));
    }
}
