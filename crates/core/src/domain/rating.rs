use crate::error::RatingError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_USERNAME_LEN: usize = 30;

/// A single dated rating observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingPoint {
    pub date: NaiveDate,
    pub rating: i32,
}

impl RatingPoint {
    /// Parses an upstream `[year, month, day, rating]` tuple.
    ///
    /// Every component must be a JSON integer; strings, floats and nulls are rejected.
    pub fn from_tuple(raw: &[Value]) -> Result<Self, RatingError> {
        let malformed = |reason: &str| RatingError::MalformedPoint {
            point: Value::from(raw.to_vec()).to_string(),
            reason: reason.to_string(),
        };

        let [year, month, day, rating] = raw else {
            return Err(malformed("expected [year, month, day, rating]"));
        };
        let (Some(year), Some(month), Some(day), Some(rating)) =
            (year.as_i64(), month.as_i64(), day.as_i64(), rating.as_i64())
        else {
            return Err(malformed("components must be integers"));
        };

        if !(1..=12).contains(&month) {
            return Err(malformed("month out of range"));
        }
        if !(1..=31).contains(&day) {
            return Err(malformed("day out of range"));
        }

        let year = i32::try_from(year).map_err(|_| malformed("year out of range"))?;
        let date = NaiveDate::from_ymd_opt(year, month as u32, day as u32)
            .ok_or_else(|| malformed("not a calendar date"))?;
        let rating = i32::try_from(rating).map_err(|_| malformed("rating out of range"))?;

        Ok(Self { date, rating })
    }
}

/// Dense daily ratings over a fixed window ending at `end`, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RatingSeries {
    pub username: String,
    pub current_rating: i32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub ratings: Vec<i32>,
    /// False where the value was carried forward or seeded from the current rating.
    pub observed: Vec<bool>,
    pub skipped_points: usize,
}

impl RatingSeries {
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start.iter_days().take(self.ratings.len()).collect()
    }

    pub fn latest(&self) -> Option<i32> {
        self.ratings.last().copied()
    }
}

/// Lichess usernames: 1..=30 ASCII letters, digits, `_` or `-`.
pub fn validate_username(username: &str) -> Result<&str, RatingError> {
    let ok = !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if ok {
        Ok(username)
    } else {
        Err(RatingError::InvalidUsername {
            username: username.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tuple(v: Value) -> Vec<Value> {
        v.as_array().cloned().unwrap_or_default()
    }

    fn parse(v: Value) -> Result<RatingPoint, RatingError> {
        RatingPoint::from_tuple(&tuple(v))
    }

    #[test]
    fn parses_valid_tuple() {
        let p = parse(json!([2024, 6, 15, 1450])).unwrap();
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(p.rating, 1450);
    }

    #[test]
    fn rejects_out_of_range_month_and_day() {
        let err = parse(json!([2024, 13, 40, 1500])).unwrap_err();
        assert!(matches!(err, RatingError::MalformedPoint { ref point, .. } if point == "[2024,13,40,1500]"));

        assert!(parse(json!([2024, 0, 10, 1500])).is_err());
        assert!(parse(json!([2024, 5, 0, 1500])).is_err());
    }

    #[test]
    fn rejects_impossible_dates_within_range_checks() {
        assert!(parse(json!([2023, 2, 29, 1500])).is_err());
        assert!(parse(json!([2024, 4, 31, 1500])).is_err());
        assert!(parse(json!([2024, 2, 29, 1500])).is_ok());
    }

    #[test]
    fn rejects_wrong_arity_and_overflow() {
        assert!(parse(json!([2024, 6, 1])).is_err());
        assert!(parse(json!([2024, 6, 1, 1500, 7])).is_err());
        assert!(parse(json!([2024, 6, 1, i64::MAX])).is_err());
        assert!(parse(json!([i64::MAX, 6, 1, 1500])).is_err());
    }

    #[test]
    fn rejects_non_integer_components() {
        let err = parse(json!([2024, "6", 20, 1460])).unwrap_err();
        assert!(matches!(err, RatingError::MalformedPoint { ref point, .. } if point == r#"[2024,"6",20,1460]"#));

        assert!(parse(json!([2024, 6, null, 1460])).is_err());
        assert!(parse(json!([2024, 6, 20, 1460.5])).is_err());
        assert!(parse(json!([2024.0, 6, 20, 1460])).is_err());
        assert!(parse(json!({"y": 2024})).is_err());
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("Magnus_Carlsen-1").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("../admin").is_err());
        assert!(validate_username(&"x".repeat(31)).is_err());
    }

    #[test]
    fn series_dates_follow_start() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let s = RatingSeries {
            username: "a".into(),
            current_rating: 1500,
            start,
            end: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            ratings: vec![1, 2, 3],
            observed: vec![false; 3],
            skipped_points: 0,
        };
        assert_eq!(s.dates().last().copied(), Some(s.end));
        assert_eq!(s.latest(), Some(3));
    }
}
