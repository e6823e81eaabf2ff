use serde::{Deserialize, Serialize};

pub const CURRENCY_GLYPH: &str = "₹";
pub const UNAVAILABLE_PRICE: &str = "N/A";

// backend name for every cab class
const CAR_ALIAS: &str = "car";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RideOption {
    pub id: String,
    pub name: String,
    pub price: Option<String>,
    pub is_loading_price: bool,
}

/// Price of one vehicle class as quoted by the pricing endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricedClass {
    pub vehicle_class: String,
    pub price: f64,
}

impl RideOption {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price: None,
            is_loading_price: true,
        }
    }

    /// Fixed catalog shown while prices load.
    pub fn catalog() -> Vec<RideOption> {
        vec![
            RideOption::new("bike", "Bike"),
            RideOption::new("auto", "Auto"),
            RideOption::new("cab_economy", "Cab Economy"),
            RideOption::new("cab_premium", "Cab Premium"),
        ]
    }

    pub fn loading(&self) -> Self {
        Self {
            price: None,
            is_loading_price: true,
            ..self.clone()
        }
    }

    pub fn priced(&self, price: String) -> Self {
        Self {
            price: Some(price),
            is_loading_price: false,
            ..self.clone()
        }
    }

    pub fn unavailable(&self) -> Self {
        self.priced(UNAVAILABLE_PRICE.into())
    }

    pub fn matches(&self, class: &PricedClass) -> bool {
        if class.vehicle_class.eq_ignore_ascii_case(&self.name) {
            return true;
        }

        class.vehicle_class.eq_ignore_ascii_case(CAR_ALIAS)
            && self.name.to_lowercase().contains("cab")
    }
}

pub fn format_price(price: f64) -> String {
    format!("{}{}", CURRENCY_GLYPH, price.round() as i64)
}

/// Fills every option with the first matching server price, "N/A" when
/// nothing matches. Ids, names and order are left untouched.
pub fn merge_prices(options: &[RideOption], prices: &[PricedClass]) -> Vec<RideOption> {
    options
        .iter()
        .map(|option| match prices.iter().find(|class| option.matches(class)) {
            Some(class) => option.priced(format_price(class.price)),
            None => option.unavailable(),
        })
        .collect()
}

pub fn mark_unavailable(options: &[RideOption]) -> Vec<RideOption> {
    options.iter().map(|option| option.unavailable()).collect()
}

#[cfg(test)]
fn priced_class(vehicle_class: &str, price: f64) -> PricedClass {
    PricedClass {
        vehicle_class: vehicle_class.into(),
        price,
    }
}

#[test]
fn catalog_starts_loading() {
    let catalog = RideOption::catalog();

    assert_eq!(catalog.len(), 4);
    assert!(catalog
        .iter()
        .all(|option| option.is_loading_price && option.price.is_none()));
}

#[test]
fn car_alias_matches_cab_options() {
    let economy = RideOption::new("cab_economy", "Cab Economy");

    assert!(economy.matches(&priced_class("Car", 120.0)));
    assert!(economy.matches(&priced_class("CAR", 120.0)));
    assert!(economy.matches(&priced_class("cab economy", 120.0)));
    assert!(!economy.matches(&priced_class("Auto", 120.0)));
    assert!(!economy.matches(&priced_class("Cars", 120.0)));

    let bike = RideOption::new("bike", "Bike");
    assert!(!bike.matches(&priced_class("Car", 120.0)));
}

#[test]
fn price_rounds_to_whole_units() {
    assert_eq!(format_price(87.6), "₹88");
    assert_eq!(format_price(87.4), "₹87");
    assert_eq!(format_price(87.5), "₹88");
    assert_eq!(format_price(40.0), "₹40");
}

#[test]
fn merge_fills_matched_and_unmatched_options() {
    let prices = vec![priced_class("bike", 42.2), priced_class("Car", 87.6)];

    let merged = merge_prices(&RideOption::catalog(), &prices);

    let summary: Vec<(&str, Option<&str>, bool)> = merged
        .iter()
        .map(|o| (o.id.as_str(), o.price.as_deref(), o.is_loading_price))
        .collect();

    assert_eq!(
        summary,
        vec![
            ("bike", Some("₹42"), false),
            ("auto", Some("N/A"), false),
            ("cab_economy", Some("₹88"), false),
            ("cab_premium", Some("₹88"), false),
        ]
    );
}

#[test]
fn first_matching_price_wins() {
    let prices = vec![priced_class("Auto", 30.0), priced_class("auto", 99.0)];

    let merged = merge_prices(&[RideOption::new("auto", "Auto")], &prices);

    assert_eq!(merged[0].price.as_deref(), Some("₹30"));
}

#[test]
fn merge_is_idempotent() {
    let prices = vec![priced_class("Auto", 55.5), priced_class("car", 101.49)];
    let catalog = RideOption::catalog();

    let once = merge_prices(&catalog, &prices);
    let twice = merge_prices(&catalog, &prices);
    assert_eq!(once, twice);

    // merging over an already priced list changes nothing either
    assert_eq!(merge_prices(&once, &prices), once);
}

#[test]
fn unavailable_keeps_identity() {
    let catalog = RideOption::catalog();
    let degraded = mark_unavailable(&catalog);

    assert_eq!(degraded.len(), catalog.len());
    for (before, after) in catalog.iter().zip(degraded.iter()) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.name, after.name);
        assert_eq!(after.price.as_deref(), Some("N/A"));
        assert!(!after.is_loading_price);
    }
}
