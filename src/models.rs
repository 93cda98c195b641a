//! Request and response models
//!
//! Plain serde records. Field constraints that serde cannot express
//! (lengths, bounds) are checked by the `validate` methods, which report
//! every violation with its location so the caller can build a 422 body.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::{child_loc, expect_record, FromParam, LocSegment, RecordShape, ValidationIssue};

/// Longest accepted `Item.description`, in characters
pub const DESCRIPTION_MAX_CHARS: usize = 300;

/// Longest accepted URL, matching common browser limits
const URL_MAX_LEN: usize = 2083;

/// An absolute `http`/`https` URL with a non-empty host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HttpUrl(String);

impl TryFrom<String> for HttpUrl {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.len() > URL_MAX_LEN {
            return Err(format!("URL longer than {URL_MAX_LEN} characters"));
        }
        if value.chars().any(char::is_whitespace) {
            return Err("invalid or missing URL scheme".to_string());
        }

        let rest = value
            .strip_prefix("https://")
            .or_else(|| value.strip_prefix("http://"))
            .ok_or_else(|| "URL scheme not permitted".to_string())?;

        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        // Drop credentials and port before checking the host
        let host = authority.rsplit('@').next().unwrap_or_default();
        let host = host.split(':').next().unwrap_or_default();
        if host.is_empty() {
            return Err("URL host invalid".to_string());
        }

        Ok(Self(value))
    }
}

impl From<HttpUrl> for String {
    fn from(url: HttpUrl) -> Self {
        url.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub url: HttpUrl,
    pub name: String,
}

impl RecordShape for Image {
    fn check_shape(value: &Value, loc: &[LocSegment], issues: &mut Vec<ValidationIssue>) {
        expect_record(value, loc, issues);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub images: Option<Vec<Image>>,
}

impl RecordShape for Item {
    fn check_shape(value: &Value, loc: &[LocSegment], issues: &mut Vec<ValidationIssue>) {
        if let Some(images) = expect_record(value, loc, issues).and_then(|map| map.get("images")) {
            Option::<Vec<Image>>::check_shape(images, &child_loc(loc, "images"), issues);
        }
    }
}

impl Item {
    /// Check the constraints serde cannot express.
    ///
    /// `loc` is the location of this item inside the request, e.g.
    /// `["body"]` or `["body", "item"]`.
    pub fn validate(&self, loc: &[LocSegment]) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if let Some(description) = &self.description {
            if description.chars().count() > DESCRIPTION_MAX_CHARS {
                issues.push(ValidationIssue::new(
                    child_loc(loc, "description"),
                    format!("ensure this value has at most {DESCRIPTION_MAX_CHARS} characters"),
                    "value_error.any_str.max_length",
                ));
            }
        }

        if self.price.is_nan() || self.price <= 0.0 {
            issues.push(ValidationIssue::new(
                child_loc(loc, "price"),
                "ensure this value is greater than 0",
                "value_error.number.not_gt",
            ));
        }

        issues
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl RecordShape for User {
    fn check_shape(value: &Value, loc: &[LocSegment], issues: &mut Vec<ValidationIssue>) {
        expect_record(value, loc, issues);
    }
}

/// Closed set of model names accepted by `/models/{model_name}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelName {
    Alexnet,
    Resnet,
    Lenet,
}

impl ModelName {
    pub const ALL: [Self; 3] = [Self::Alexnet, Self::Resnet, Self::Lenet];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alexnet => "alexnet",
            Self::Resnet => "resnet",
            Self::Lenet => "lenet",
        }
    }

    pub const fn message(self) -> &'static str {
        match self {
            Self::Alexnet => "Deep Learning FTW!",
            Self::Lenet => "LeCNN all the images",
            Self::Resnet => "Have some residuals",
        }
    }
}

impl FromStr for ModelName {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|m| m.as_str() == s).ok_or(())
    }
}

impl FromParam for ModelName {
    const MSG: &'static str =
        "value is not a valid enumeration member; permitted: 'alexnet', 'resnet', 'lenet'";
    const KIND: &'static str = "type_error.enum";

    fn from_param(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_tax() -> f64 {
    10.5
}

/// Item used by the partial-update endpoints; every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item2 {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default = "default_tax")]
    pub tax: f64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Default for Item2 {
    fn default() -> Self {
        Self {
            name: None,
            description: None,
            price: None,
            tax: default_tax(),
            tags: Vec::new(),
        }
    }
}

impl RecordShape for Item2 {
    fn check_shape(value: &Value, loc: &[LocSegment], issues: &mut Vec<ValidationIssue>) {
        expect_record(value, loc, issues);
    }
}

impl Item2 {
    pub const FIELDS: [&'static str; 5] = ["name", "description", "price", "tax", "tags"];

    /// Apply the fields present in `update` on top of `self`.
    ///
    /// Keys that are not `Item2` fields are ignored. Fields absent from
    /// `update` keep their current value.
    pub fn merged(&self, update: &Map<String, Value>) -> Result<Self, serde_json::Error> {
        let mut current = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in update {
            if Self::FIELDS.contains(&key.as_str()) {
                current.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(Value::Object(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body_loc() -> Vec<LocSegment> {
        vec!["body".into()]
    }

    #[test]
    fn test_http_url_accepts_http_and_https() {
        assert!(HttpUrl::try_from("https://example.com/".to_string()).is_ok());
        assert!(HttpUrl::try_from("http://user:pw@example.com:8080/a?b#c".to_string()).is_ok());
    }

    #[test]
    fn test_http_url_rejects_bad_input() {
        assert!(HttpUrl::try_from("ftp://example.com".to_string()).is_err());
        assert!(HttpUrl::try_from("example.com".to_string()).is_err());
        assert!(HttpUrl::try_from("https:///path".to_string()).is_err());
        assert!(HttpUrl::try_from("https://exa mple.com".to_string()).is_err());
    }

    #[test]
    fn test_item_defaults_and_tag_dedup() {
        let item: Item =
            serde_json::from_value(json!({"name": "Foo", "price": 3.5, "tags": ["b", "a", "b"]}))
                .unwrap();
        assert_eq!(item.description, None);
        assert_eq!(item.tax, None);
        assert_eq!(item.tags.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert!(item.images.is_none());
    }

    #[test]
    fn test_item_rejects_bad_image_url() {
        let result: Result<Item, _> = serde_json::from_value(json!({
            "name": "Foo",
            "price": 1,
            "images": [{"url": "not a url", "name": "x"}]
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_item_validate_price_and_description() {
        let item = Item {
            name: "Foo".into(),
            description: Some("x".repeat(DESCRIPTION_MAX_CHARS + 1)),
            price: 0.0,
            tax: None,
            tags: BTreeSet::new(),
            images: None,
        };
        let issues = item.validate(&body_loc());
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].loc, vec![LocSegment::from("body"), "description".into()]);
        assert_eq!(issues[1].kind, "value_error.number.not_gt");
    }

    #[test]
    fn test_item_validate_ok() {
        let item = Item {
            name: "Foo".into(),
            description: Some("x".repeat(DESCRIPTION_MAX_CHARS)),
            price: 0.01,
            tax: Some(0.0),
            tags: BTreeSet::new(),
            images: None,
        };
        assert!(item.validate(&body_loc()).is_empty());
    }

    fn shape_issues<T: RecordShape>(value: &Value) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        T::check_shape(value, &body_loc(), &mut issues);
        issues
    }

    #[test]
    fn test_item_shape_checks_nested_images() {
        let value = json!({"name": "Foo", "price": 1, "images": [["https://a.io", "a"]]});
        let issues = shape_issues::<Item>(&value);
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].loc,
            vec![LocSegment::from("body"), "images".into(), LocSegment::Index(0)]
        );
        assert_eq!(issues[0].kind, "type_error.dict");

        assert!(shape_issues::<Item>(&json!({"name": "Foo", "price": 1, "images": null})).is_empty());
        assert_eq!(shape_issues::<Item>(&json!(["Foo", null, 1.0])).len(), 1);
    }

    #[test]
    fn test_model_name_parse() {
        assert_eq!("lenet".parse::<ModelName>(), Ok(ModelName::Lenet));
        assert!("LeNet".parse::<ModelName>().is_err());
        assert!(ModelName::Lenet.message().contains("LeCNN"));
    }

    #[test]
    fn test_item2_defaults() {
        let item: Item2 = serde_json::from_value(json!({"name": "Foo", "price": 50.2})).unwrap();
        assert!((item.tax - 10.5).abs() < f64::EPSILON);
        assert!(item.tags.is_empty());
    }

    #[test]
    fn test_item2_merged_keeps_untouched_fields() {
        let stored = Item2 {
            name: Some("Bar".into()),
            description: Some("The bartenders".into()),
            price: Some(62.0),
            tax: 20.2,
            tags: vec![],
        };
        let update = json!({"price": 70.5, "unknown": true});
        let merged = stored.merged(update.as_object().unwrap()).unwrap();
        assert_eq!(merged.name.as_deref(), Some("Bar"));
        assert_eq!(merged.description.as_deref(), Some("The bartenders"));
        assert_eq!(merged.price, Some(70.5));
        assert!((merged.tax - 20.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_item2_merged_explicit_null_clears() {
        let stored = Item2 {
            description: Some("old".into()),
            ..Item2::default()
        };
        let update = json!({"description": null});
        let merged = stored.merged(update.as_object().unwrap()).unwrap();
        assert_eq!(merged.description, None);
    }
}
