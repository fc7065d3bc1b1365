use chrono::{NaiveDate, TimeZone, Utc};
use jobtrack_data::{timestamp, Filter, Operator, PageOptions, Record};
use serde_json::Value;

use super::InvalidRequest;
use crate::domain::{Country, EmploymentType, JobStatus, UnknownVariant, WorkSettingType};

/// Maps a user supplied enum name to its stored spelling.
pub type EnumCheck = fn(&str) -> Result<&'static str, UnknownVariant>;

/// Which filter keys an entity listing accepts.
///
/// Plain keys are equality filters (a list value is an IN filter).
/// `field__op` keys are comparisons with `op` one of `eq`, `ne`, `lt`, `le`,
/// `gt`, `ge`; on timestamp fields their value may be `YYYY-MM-DD` or RFC 3339.
#[derive(Debug, Clone, Copy)]
pub struct FilterSpec {
    pub fields: &'static [&'static str],
    pub timestamps: &'static [&'static str],
    pub enums: &'static [(&'static str, EnumCheck)],
    /// Accepted `order_by` values.
    pub sortable: &'static [&'static str],
}

fn job_status(name: &str) -> Result<&'static str, UnknownVariant> {
    name.parse::<JobStatus>().map(JobStatus::as_str)
}

fn country(name: &str) -> Result<&'static str, UnknownVariant> {
    name.parse::<Country>().map(Country::as_str)
}

fn work_setting_type(name: &str) -> Result<&'static str, UnknownVariant> {
    name.parse::<WorkSettingType>().map(WorkSettingType::as_str)
}

fn employment_type(name: &str) -> Result<&'static str, UnknownVariant> {
    name.parse::<EmploymentType>().map(EmploymentType::as_str)
}

pub const JOB_FILTERS: FilterSpec = FilterSpec {
    fields: &[
        "status",
        "company",
        "country",
        "city",
        "user_id",
        "work_setting_type",
        "employment_type",
        "platform",
        "title",
    ],
    timestamps: &["created_at", "updated_at"],
    enums: &[
        ("status", job_status as EnumCheck),
        ("country", country as EnumCheck),
        ("work_setting_type", work_setting_type as EnumCheck),
        ("employment_type", employment_type as EnumCheck),
    ],
    sortable: &["created_at", "updated_at", "title", "company", "status", "city", "country"],
};

impl FilterSpec {
    fn accepts(&self, field: &str) -> bool {
        self.fields.contains(&field) || self.timestamps.contains(&field)
    }

    fn enum_check(&self, field: &str) -> Option<EnumCheck> {
        self.enums.iter().find(|(name, _)| *name == field).map(|(_, check)| *check)
    }

    /// Build the filters for a listing. Every rejected key is reported.
    pub fn parse(&self, filters: &Record) -> Result<Vec<Filter>, InvalidRequest> {
        let mut invalid = InvalidRequest::new();
        let mut parsed = Vec::with_capacity(filters.len());
        for (key, value) in filters {
            match self.parse_one(key, value) {
                Ok(filter) => parsed.push(filter),
                Err(message) => invalid.add_error(key.clone(), message),
            }
        }
        invalid.or_ok(parsed)
    }

    fn parse_one(&self, key: &str, value: &Value) -> Result<Filter, String> {
        let (field, operator) = match key.rsplit_once("__") {
            Some((field, op)) => {
                let operator: Operator = op.parse().map_err(|_| format!("Key '{key}' is not accepted"))?;
                (field, Some(operator))
            }
            None => (key, None),
        };
        if !self.accepts(field) {
            return Err(format!("Key '{key}' is not accepted"));
        }
        let values = match value {
            Value::Array(items) => items.clone(),
            Value::Null => return Err(format!("Key '{key}' needs a value")),
            other => vec![other.clone()],
        };
        let values = values
            .iter()
            .map(|v| self.normalize_value(field, v))
            .collect::<Result<Vec<_>, _>>()?;
        match operator {
            Some(operator) => Filter::comparison(field, operator, values).map_err(|err| err.message),
            None => Ok(Filter::new(field, values)),
        }
    }

    fn normalize_value(&self, field: &str, value: &Value) -> Result<Value, String> {
        if self.timestamps.contains(&field) {
            let raw = value
                .as_str()
                .ok_or_else(|| format!("Invalid date {value}. Expected YYYY-MM-DD."))?;
            return parse_date(raw).map(Value::String);
        }
        match (self.enum_check(field), value) {
            (Some(check), Value::String(name)) => check(name).map(Value::from).map_err(|err| err.to_string()),
            (Some(_), other) => Err(format!("Invalid value {other} for '{field}'")),
            (None, other) => Ok(other.clone()),
        }
    }

    pub fn page_options(&self, params: &Record) -> Result<PageOptions, InvalidRequest> {
        parse_page_options(params, self.sortable)
    }
}

/// `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp, in stored form.
fn parse_date(raw: &str) -> Result<String, String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        if let Some(ts) = midnight {
            return Ok(timestamp::format(&ts));
        }
    }
    timestamp::parse(raw)
        .map(|ts| timestamp::format(&ts))
        .map_err(|_| format!("Invalid date format: {raw}. Expected YYYY-MM-DD."))
}

fn non_negative(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Pagination from its wire form: `limit`, `offset`, `order_by`, `ascending`
/// and `cursor`, all optional.
///
/// An empty `sortable` accepts any `order_by`.
pub fn parse_page_options(params: &Record, sortable: &[&str]) -> Result<PageOptions, InvalidRequest> {
    let mut invalid = InvalidRequest::new();
    let mut options = PageOptions::default();
    for (key, value) in params {
        match key.as_str() {
            "limit" => match non_negative(value) {
                Some(limit) if limit > 0 => options.limit = limit,
                _ => invalid.add_error("limit", "'limit' must be a positive integer."),
            },
            "offset" => match non_negative(value) {
                Some(offset) => options.offset = offset,
                None => invalid.add_error("offset", "'offset' must be a non-negative integer."),
            },
            "order_by" => match value.as_str() {
                Some(field) if sortable.is_empty() || sortable.contains(&field) => options.order_by = field.to_string(),
                _ => invalid.add_error("order_by", format!("Cannot order by {value}.")),
            },
            "ascending" => match value {
                Value::Bool(ascending) => options.ascending = *ascending,
                Value::String(s) if s.eq_ignore_ascii_case("true") => options.ascending = true,
                Value::String(s) if s.eq_ignore_ascii_case("false") => options.ascending = false,
                _ => invalid.add_error("ascending", "'ascending' must be a boolean."),
            },
            "cursor" => options.cursor = (!value.is_null()).then(|| value.clone()),
            other => invalid.add_error(other, format!("Key '{other}' is not accepted")),
        }
    }
    invalid.or_ok(options)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn plain_keys_become_equality_filters() {
        let filters = JOB_FILTERS
            .parse(&record(json!({"company": "Acme", "status": ["applied", "OFFERED"]})))
            .unwrap();
        assert!(filters.contains(&Filter::eq("company", "Acme")));
        assert!(filters.contains(&Filter::new("status", vec![json!("APPLIED"), json!("OFFERED")])));
    }

    #[test]
    fn date_comparisons_are_normalised() {
        let filters = JOB_FILTERS.parse(&record(json!({"created_at__gt": "2024-03-01"}))).unwrap();
        assert_eq!(
            filters,
            vec![Filter::compare("created_at", Operator::Gt, "2024-03-01T00:00:00.000000Z")]
        );
        let filters = JOB_FILTERS
            .parse(&record(json!({"updated_at__le": "2024-03-01T10:00:00+02:00"})))
            .unwrap();
        assert_eq!(
            filters,
            vec![Filter::compare("updated_at", Operator::Le, "2024-03-01T08:00:00.000000Z")]
        );
    }

    #[test]
    fn every_bad_key_is_reported() {
        let err = JOB_FILTERS
            .parse(&record(json!({
                "salary": 1,
                "status": ["WAITING"],
                "created_at__gt": "yesterday",
                "city__between": "x",
                "company__eq": ["a", "b"],
            })))
            .unwrap_err();
        let mut parameters: Vec<&str> = err.errors.iter().map(|e| e.parameter.as_str()).collect();
        parameters.sort_unstable();
        assert_eq!(parameters, vec!["city__between", "company__eq", "created_at__gt", "salary", "status"]);
    }

    #[test]
    fn page_options_defaults_and_overrides() {
        let options = JOB_FILTERS.page_options(&Record::new()).unwrap();
        assert_eq!(options, PageOptions::default());
        let options = JOB_FILTERS
            .page_options(&record(json!({"limit": "2", "offset": 4, "order_by": "title", "ascending": false})))
            .unwrap();
        assert_eq!((options.limit, options.offset, options.order_by.as_str(), options.ascending), (2, 4, "title", false));
    }

    #[test]
    fn page_options_reject_negative_and_unknown() {
        let err = JOB_FILTERS
            .page_options(&record(json!({"offset": -1, "order_by": "salary", "page": 3})))
            .unwrap_err();
        assert_eq!(err.errors.len(), 3);
    }
}
