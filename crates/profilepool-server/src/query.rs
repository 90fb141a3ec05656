//! Query string interpretation for the listing endpoints

use profilepool_domain::{EntryFilter, ProfileEntry};
use profilepool_lease::PoolError;
use serde_json::Value;

/// Shape of each element in a listing response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detail {
    /// Only each entry's `meta`
    Meta,
    /// Only each entry's id
    Ids,
    /// Whole entries
    Full,
}

impl Detail {
    /// Interpret the `detail` parameter of the general listing
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            None | Some("") => Detail::Meta,
            Some("id") => Detail::Ids,
            Some(_) => Detail::Full,
        }
    }

    /// Interpret `detail` as a plain flag: full entries when truthy
    pub fn from_flag(value: Option<&str>) -> Self {
        if is_truthy(value) {
            Detail::Full
        } else {
            Detail::Meta
        }
    }
}

/// Parsed query of `GET /profile/`
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// Conditions every listed entry must meet
    pub filter: EntryFilter,
    /// Response shape
    pub detail: Detail,
}

impl ListQuery {
    /// Build a filter from query pairs
    ///
    /// `locked` filters the lock flag, `detail` picks the response shape and
    /// every other key is an equality condition on `meta.<key>`.
    pub fn parse(params: &[(String, String)]) -> Result<Self, PoolError> {
        let mut filter = EntryFilter::all();
        let mut detail = None;

        for (key, value) in params {
            match key.as_str() {
                "detail" => detail = Some(value.as_str()),
                "locked" => filter = filter.locked(parse_bool("locked", value)?),
                _ => filter = filter.meta_eq(key.as_str(), value.as_str()),
            }
        }

        Ok(Self {
            filter,
            detail: Detail::from_param(detail),
        })
    }
}

/// Value of the last occurrence of `key`
pub fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

/// Whether a flag parameter is set
///
/// Absent, empty, `false` and `0` are unset; anything else is set.
pub fn is_truthy(value: Option<&str>) -> bool {
    match value {
        None => false,
        Some(v) => {
            let v = v.trim();
            !(v.is_empty() || v == "0" || v.eq_ignore_ascii_case("false"))
        }
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, PoolError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(PoolError::Validation(format!(
            "Invalid value for {}: expected true or false, got '{}'",
            field, value
        ))),
    }
}

/// Render entries in the requested shape
pub fn render(entries: Vec<ProfileEntry>, detail: Detail) -> Result<Value, serde_json::Error> {
    let items = entries
        .into_iter()
        .map(|entry| match detail {
            Detail::Meta => Ok(Value::Object(entry.meta)),
            Detail::Ids => Ok(Value::String(entry.id.to_string())),
            Detail::Full => serde_json::to_value(entry),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Value::Array(items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use profilepool_domain::{EntryId, Meta};
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn entry(meta: Value) -> ProfileEntry {
        ProfileEntry {
            id: EntryId::new(),
            name: "p1".to_string(),
            locked: false,
            locked_at: None,
            error_count: 0,
            use_count: 0,
            meta: meta.as_object().cloned().unwrap_or_else(Meta::new),
            disabled: false,
        }
    }

    #[test]
    fn test_empty_query_lists_everything_as_meta() {
        let query = ListQuery::parse(&[]).unwrap();
        assert!(query.filter.is_empty());
        assert_eq!(query.detail, Detail::Meta);
    }

    #[test]
    fn test_locked_and_meta_conditions() {
        let query =
            ListQuery::parse(&pairs(&[("locked", "true"), ("region", "eu"), ("detail", "id")]))
                .unwrap();

        assert_eq!(
            query.filter,
            EntryFilter::all().locked(true).meta_eq("region", "eu")
        );
        assert_eq!(query.detail, Detail::Ids);
    }

    #[test]
    fn test_locked_accepts_numeric_flags() {
        let query = ListQuery::parse(&pairs(&[("locked", "0")])).unwrap();
        assert_eq!(query.filter, EntryFilter::all().locked(false));
    }

    #[test]
    fn test_bad_locked_value_rejected() {
        let result = ListQuery::parse(&pairs(&[("locked", "maybe")]));
        assert!(matches!(result, Err(PoolError::Validation(_))));
    }

    #[test]
    fn test_detail_variants() {
        assert_eq!(Detail::from_param(None), Detail::Meta);
        assert_eq!(Detail::from_param(Some("")), Detail::Meta);
        assert_eq!(Detail::from_param(Some("id")), Detail::Ids);
        assert_eq!(Detail::from_param(Some("full")), Detail::Full);
        assert_eq!(Detail::from_param(Some("1")), Detail::Full);

        assert_eq!(Detail::from_flag(Some("true")), Detail::Full);
        assert_eq!(Detail::from_flag(Some("id")), Detail::Full);
        assert_eq!(Detail::from_flag(Some("false")), Detail::Meta);
        assert_eq!(Detail::from_flag(None), Detail::Meta);
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(Some("1")));
        assert!(is_truthy(Some("true")));
        assert!(is_truthy(Some("yes")));
        assert!(!is_truthy(None));
        assert!(!is_truthy(Some("")));
        assert!(!is_truthy(Some("0")));
        assert!(!is_truthy(Some("FALSE")));
    }

    #[test]
    fn test_param_takes_last_occurrence() {
        let params = pairs(&[("error", "0"), ("error", "1")]);
        assert_eq!(param(&params, "error"), Some("1"));
        assert_eq!(param(&params, "detail"), None);
    }

    #[test]
    fn test_render_shapes() {
        let entries = vec![entry(json!({"username": "u"}))];
        let id = entries[0].id.to_string();

        assert_eq!(
            render(entries.clone(), Detail::Meta).unwrap(),
            json!([{"username": "u"}])
        );
        assert_eq!(render(entries.clone(), Detail::Ids).unwrap(), json!([id]));

        let full = render(entries, Detail::Full).unwrap();
        assert_eq!(full[0]["name"], "p1");
        assert_eq!(full[0]["locked_dt"], Value::Null);
        assert_eq!(full[0]["use_cnt"], 0);
    }
}
