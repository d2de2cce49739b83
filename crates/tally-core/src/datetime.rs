use anyhow::anyhow;
use chrono::NaiveDate;

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_iso_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), ISO_DATE_FORMAT)
        .map_err(|err| anyhow!("invalid date {raw:?} (expected YYYY-MM-DD): {err}"))
}

pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Serde for the `dueDate` field of the persisted task record.
///
/// The slot payload always carries the field as a string; an empty or
/// unparseable value is treated as an absent date rather than poisoning
/// the whole collection.
pub mod iso_date_serde {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::ISO_DATE_FORMAT;

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(value) => {
                serializer.serialize_str(&value.format(ISO_DATE_FORMAT).to_string())
            }
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(None);
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        match NaiveDate::parse_from_str(trimmed, ISO_DATE_FORMAT) {
            Ok(date) => Ok(Some(date)),
            Err(err) => {
                tracing::warn!(raw = %trimmed, error = %err, "discarding unparseable due date");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde::{Deserialize, Serialize};

    use super::{format_iso_date, parse_iso_date};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Wrapper {
        #[serde(default, with = "super::iso_date_serde")]
        due: Option<NaiveDate>,
    }

    #[test]
    fn parse_and_format_round_trip() {
        let date = parse_iso_date("2024-01-05").expect("valid date");
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 5).expect("ymd"));
        assert_eq!(format_iso_date(date), "2024-01-05");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_iso_date("next tuesday").is_err());
        assert!(parse_iso_date("").is_err());
    }

    #[test]
    fn serde_treats_empty_string_as_absent() {
        let parsed: Wrapper = serde_json::from_str(r#"{"due":""}"#).expect("parse");
        assert_eq!(parsed.due, None);

        let parsed: Wrapper = serde_json::from_str(r#"{}"#).expect("parse");
        assert_eq!(parsed.due, None);
    }

    #[test]
    fn serde_treats_unparseable_as_absent() {
        let parsed: Wrapper = serde_json::from_str(r#"{"due":"someday"}"#).expect("parse");
        assert_eq!(parsed.due, None);
    }

    #[test]
    fn serde_round_trips_present_dates() {
        let original = Wrapper {
            due: NaiveDate::from_ymd_opt(2024, 1, 1),
        };
        let encoded = serde_json::to_string(&original).expect("encode");
        assert_eq!(encoded, r#"{"due":"2024-01-01"}"#);
        let decoded: Wrapper = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded, original);
    }

    #[test]
    fn serde_writes_absent_dates_as_empty_string() {
        let encoded = serde_json::to_string(&Wrapper { due: None }).expect("encode");
        assert_eq!(encoded, r#"{"due":""}"#);
    }
}
