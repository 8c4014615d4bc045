//! Validation rulesets, one per record type.

use blp_validation::patterns;
use blp_validation::RuleSet;
use once_cell::sync::Lazy;

use crate::{BOOKING_STATUS_ACTIVE, BOOKING_STATUS_INACTIVE};

pub static BOOKING_RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::builder()
        .pattern("location", &patterns::text_pattern(300))
        .pattern("company", &patterns::text_pattern(300))
        .pattern("capsule_id", &patterns::text_pattern(300))
        .pattern("activity_date", patterns::DATE_PATTERN)
        .pattern("start_of_week", patterns::DATE_PATTERN)
        .pattern(
            "booking_status",
            &format!("^({BOOKING_STATUS_ACTIVE}|{BOOKING_STATUS_INACTIVE})$"),
        )
        .build()
});

pub const BOOKING_QUERY_REQUIRED: &[&str] = &[];
pub const BOOKING_QUERY_OPTIONAL: &[&str] =
    &["company", "start_of_week", "location", "capsule_id"];

pub static BAG_RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::builder()
        .pattern("bag_id", &patterns::text_pattern(300))
        .pattern("color", &patterns::text_pattern(300))
        .no_check("weight")
        .build()
});

pub const BAG_QUERY_REQUIRED: &[&str] = &[];
pub const BAG_QUERY_OPTIONAL: &[&str] = &["bag_id", "color", "weight"];

pub static DELAY_RULES: Lazy<RuleSet> = Lazy::new(|| {
    RuleSet::builder()
        .pattern("flight_no", &patterns::strict_text_pattern(20))
        .pattern("scheduled_dt", patterns::DATETIME_PATTERN)
        .object_list("delays")
        .pattern("delay_type", &patterns::text_pattern(50))
        .pattern("duration", &patterns::num_pattern(6))
        .pattern("reason", &patterns::text_pattern(300))
        .pattern("timestamp", patterns::DATETIME_PATTERN)
        .no_check("ttl")
        .build()
});

pub const DELAY_QUERY_REQUIRED: &[&str] = &["flight_no"];
pub const DELAY_QUERY_OPTIONAL: &[&str] = &["scheduled_dt", "delays", "ttl"];
