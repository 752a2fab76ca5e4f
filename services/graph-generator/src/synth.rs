//! Random field synthesis
//!
//! Small fixture pools plus a handful of pure draws over them. Nothing here
//! touches the Data API.

use chrono::{DateTime, Utc};
use rand::Rng;

pub const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
    "Carlos", "Priya", "Wei", "Fatima", "Diego", "Aisha",
];

pub const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Wilson", "Anderson", "Thomas", "Taylor", "Moore", "Jackson",
    "Nguyen", "Patel", "Kim", "Okafor",
];

pub const COMPANY_PREFIXES: &[&str] = &[
    "Summit", "Riverside", "Evergreen", "Blue Ridge", "Lakeside", "Pioneer", "Cedar", "Harbor",
    "Granite", "Prairie", "Northwind", "Oakwood",
];

pub const COMPANY_SUFFIXES: &[&str] = &[
    "Properties", "Holdings", "Dental Group", "Apartments", "Logistics", "Bakery", "Fitness",
    "Medical Center", "School District", "Manufacturing", "Hotel", "Church",
];

pub const STREETS: &[&str] = &[
    "Main St", "Oak Ave", "Maple Dr", "Cedar Ln", "Pine St", "Elm St", "Washington Blvd",
    "Lakeview Rd", "Park Ave", "Hillcrest Dr", "Sunset Blvd", "Mill Rd",
];

/// (city, state, zip)
pub const LOCATIONS: &[(&str, &str, &str)] = &[
    ("Springfield", "IL", "62701"),
    ("Austin", "TX", "78701"),
    ("Denver", "CO", "80202"),
    ("Columbus", "OH", "43215"),
    ("Raleigh", "NC", "27601"),
    ("Boise", "ID", "83702"),
    ("Madison", "WI", "53703"),
    ("Tampa", "FL", "33602"),
    ("Portland", "OR", "97204"),
    ("Albany", "NY", "12207"),
];

pub const EMAIL_DOMAINS: &[&str] = &["example.com", "example.net", "example.org", "mail.example.com"];

pub const LEAD_SOURCES: &[&str] = &[
    "Website", "Referral", "Google Ads", "Facebook", "Yard Sign", "Trade Show", "Cold Call",
    "Repeat Customer",
];

pub const CONTACT_RELATIONSHIPS: &[&str] = &[
    "Owner", "Property Manager", "Office Manager", "Facilities Director", "Tenant", "Billing Contact",
];

/// (description, min unit price, max unit price) in whole dollars
pub const SERVICE_ITEMS: &[(&str, i64, i64)] = &[
    ("HVAC system inspection", 89, 189),
    ("Furnace tune-up", 120, 220),
    ("AC refrigerant recharge", 150, 400),
    ("Thermostat installation", 180, 350),
    ("Duct cleaning", 300, 700),
    ("Water heater replacement", 900, 2400),
    ("Emergency service call", 150, 300),
    ("Electrical panel upgrade", 1200, 3500),
    ("Drain line clearing", 110, 260),
    ("Annual maintenance plan", 199, 399),
];

pub const WORK_DESCRIPTIONS: &[&str] = &[
    "Replace failed blower motor and test airflow",
    "Seasonal maintenance visit",
    "Install new programmable thermostat",
    "Diagnose intermittent heating loss",
    "Flush and inspect water heater",
    "Repair condensate drain leak",
];

pub const NOTES: &[&str] = &[
    "Customer prefers morning appointments.",
    "Gate code required; call ahead.",
    "Pets on premises.",
    "Follow up in two weeks.",
    "Interested in maintenance plan.",
    "Paid by check last time.",
];

/// Uniform pick from a pool. Panics on an empty pool.
pub fn pick<'a, T, R: Rng>(rng: &mut R, pool: &'a [T]) -> &'a T {
    assert!(!pool.is_empty(), "cannot pick from an empty fixture pool");
    &pool[rng.gen_range(0..pool.len())]
}

/// Uniform instant between `start` and `end` inclusive, at millisecond
/// resolution. Panics when `start > end`.
pub fn date_between<R: Rng>(rng: &mut R, start: DateTime<Utc>, end: DateTime<Utc>) -> DateTime<Utc> {
    assert!(start <= end, "date range start {} is after end {}", start, end);
    let millis = rng.gen_range(start.timestamp_millis()..=end.timestamp_millis());
    DateTime::from_timestamp_millis(millis).unwrap_or(start)
}

/// Uniform integer between `min` and `max` inclusive. Panics when `min > max`.
pub fn amount_between<R: Rng>(rng: &mut R, min: i64, max: i64) -> i64 {
    assert!(min <= max, "amount range min {} is above max {}", min, max);
    rng.gen_range(min..=max)
}

/// Email built from name fixtures and a run-local index, so two contacts of
/// the same run never share an address.
pub fn email_for(first: &str, last: &str, index: u32) -> String {
    let domain = EMAIL_DOMAINS[index as usize % EMAIL_DOMAINS.len()];
    format!(
        "{}.{}{}@{}",
        slug(first),
        slug(last),
        index,
        domain
    )
}

/// 555 phone number derived from a run-local index
pub fn phone_for(index: u32) -> String {
    let exchange = 100 + (index / 10_000) % 900;
    let line = index % 10_000;
    format!("(555) {:03}-{:04}", exchange, line)
}

fn slug(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
