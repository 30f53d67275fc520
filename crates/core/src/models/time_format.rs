//! Wall-clock times on the wire are written as `HH:MM`, or `HH:MM:SS` when
//! the seconds are non-zero, and read as either.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serializer, de::Error};

const WIRE_FORMAT: &str = "%H:%M";
const WITH_SECONDS: &str = "%H:%M:%S";

pub fn parse(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, WITH_SECONDS)
        .or_else(|_| NaiveTime::parse_from_str(value, WIRE_FORMAT))
        .ok()
}

pub fn format(time: &NaiveTime) -> String {
    if time.second() == 0 {
        time.format(WIRE_FORMAT).to_string()
    } else {
        time.format(WITH_SECONDS).to_string()
    }
}

pub fn serialize<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(time))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid time of day: {raw}")))
}
