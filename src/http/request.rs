//! Buffered request and typed parameter extraction
//!
//! `ApiRequest` owns everything a handler may look at: method, path, raw
//! query, headers, the fully read body and the path parameters captured by
//! the router. Extraction helpers return `ApiError::Validation` with the
//! location of the offending value.

use std::collections::{BTreeMap, HashMap};

use hyper::body::Bytes;
use hyper::header::{CONTENT_TYPE, COOKIE};
use hyper::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use serde_path_to_error::Segment;
use uuid::Uuid;

use super::error::{child_loc, ApiError, LocSegment, ValidationIssue};
use super::multipart::{self, MultipartParser, Part};
use super::urlencoded;

/// Conversion from a single path, query, header or form value.
///
/// `MSG` and `KIND` describe a failed conversion in the 422 body.
pub trait FromParam: Sized {
    const MSG: &'static str;
    const KIND: &'static str;

    fn from_param(raw: &str) -> Option<Self>;
}

impl FromParam for String {
    const MSG: &'static str = "str type expected";
    const KIND: &'static str = "type_error.str";

    fn from_param(raw: &str) -> Option<Self> {
        Some(raw.to_string())
    }
}

impl FromParam for i64 {
    const MSG: &'static str = "value is not a valid integer";
    const KIND: &'static str = "type_error.integer";

    fn from_param(raw: &str) -> Option<Self> {
        raw.trim().parse().ok()
    }
}

impl FromParam for Uuid {
    const MSG: &'static str = "value is not a valid uuid";
    const KIND: &'static str = "type_error.uuid";

    fn from_param(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw).ok()
    }
}

/// Body types whose records only accept the JSON object form.
///
/// serde lets a derived struct deserialize from an array of its fields in
/// declaration order. Request bodies reject that form, so every record
/// position is checked on the raw document before the typed parse.
pub trait RecordShape {
    /// Push a `type_error.dict` issue for each record position in `value`
    /// holding something other than an object.
    fn check_shape(_value: &Value, _loc: &[LocSegment], _issues: &mut Vec<ValidationIssue>) {}
}

impl RecordShape for Value {}

impl<K, V> RecordShape for BTreeMap<K, V> {}

impl<T: RecordShape> RecordShape for Option<T> {
    fn check_shape(value: &Value, loc: &[LocSegment], issues: &mut Vec<ValidationIssue>) {
        T::check_shape(value, loc, issues);
    }
}

impl<T: RecordShape> RecordShape for Vec<T> {
    fn check_shape(value: &Value, loc: &[LocSegment], issues: &mut Vec<ValidationIssue>) {
        if let Value::Array(elements) = value {
            for (index, element) in elements.iter().enumerate() {
                T::check_shape(element, &child_loc(loc, index), issues);
            }
        }
    }
}

/// The object at a record position.
///
/// `null` yields `None` without an issue; the typed parse decides whether
/// the record was optional.
pub fn expect_record<'a>(
    value: &'a Value,
    loc: &[LocSegment],
    issues: &mut Vec<ValidationIssue>,
) -> Option<&'a Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        Value::Null => None,
        _ => {
            issues.push(ValidationIssue::not_a_dict(loc.to_vec()));
            None
        }
    }
}

/// Fields and files of a url-encoded or multipart form body.
#[derive(Debug, Default)]
pub struct FormData {
    fields: Vec<(String, String)>,
    files: Vec<Part>,
}

impl FormData {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn required_text(&self, name: &str) -> Result<&str, ApiError> {
        self.text(name)
            .ok_or_else(|| ApiError::validation(ValidationIssue::missing(["body", name])))
    }

    pub fn file(&self, name: &str) -> Option<&Part> {
        self.files.iter().find(|part| part.name == name)
    }

    /// Raw bytes of `name`, whether sent as a file or a plain field
    pub fn required_bytes(&self, name: &str) -> Result<&[u8], ApiError> {
        if let Some(part) = self.file(name) {
            return Ok(&part.data);
        }
        self.required_text(name).map(str::as_bytes)
    }

    /// An uploaded file part; a plain field under `name` is rejected
    pub fn required_file(&self, name: &str) -> Result<&Part, ApiError> {
        if let Some(part) = self.file(name) {
            return Ok(part);
        }
        if self.text(name).is_some() {
            return Err(ApiError::validation(ValidationIssue::new(
                ["body", name],
                "Expected UploadFile, received: <class 'str'>",
                "value_error",
            )));
        }
        Err(ApiError::validation(ValidationIssue::missing(["body", name])))
    }
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    params: HashMap<String, String>,
    max_upload_size: usize,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            max_upload_size: usize::MAX,
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = hyper::header::HeaderValue::from_str(value) {
            self.headers
                .append(hyper::header::HeaderName::from_static(name), value);
        }
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_json(self, value: &Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(value.to_string())
    }

    #[must_use]
    pub const fn with_max_upload_size(mut self, limit: usize) -> Self {
        self.max_upload_size = limit;
        self
    }

    pub fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub const fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Typed path parameter captured by the route template
    pub fn path_param<T: FromParam>(&self, name: &str) -> Result<T, ApiError> {
        let raw = self
            .params
            .get(name)
            .ok_or_else(|| ApiError::Internal(format!("route has no path parameter '{name}'")))?;
        convert(raw, ["path", name])
    }

    /// First raw value of a query parameter
    pub fn query_value(&self, name: &str) -> Option<String> {
        self.query
            .as_deref()
            .and_then(|query| urlencoded::first(query, name))
    }

    /// Optional typed query parameter
    pub fn query<T: FromParam>(&self, name: &str) -> Result<Option<T>, ApiError> {
        self.query_value(name)
            .map(|raw| convert(&raw, ["query", name]))
            .transpose()
    }

    /// Required typed query parameter
    pub fn required_query<T: FromParam>(&self, name: &str) -> Result<T, ApiError> {
        self.query(name)?
            .ok_or_else(|| ApiError::validation(ValidationIssue::missing(["query", name])))
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Value of a cookie from any `Cookie` header
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim_matches('"').to_string())
    }

    /// Parse the body as JSON, keeping the raw document alongside.
    ///
    /// The raw value lets handlers tell an omitted field from one sent with
    /// its default.
    pub fn json_with_value<T>(&self) -> Result<(T, Value), ApiError>
    where
        T: DeserializeOwned + RecordShape,
    {
        if self.body.is_empty() {
            return Err(ApiError::validation(ValidationIssue::missing(["body"])));
        }

        let value: Value = serde_json::from_slice(&self.body).map_err(|e| {
            ApiError::validation(ValidationIssue::new(
                ["body"],
                format!("Expecting value: {e}"),
                "value_error.jsondecode",
            ))
        })?;

        let mut issues = Vec::new();
        T::check_shape(&value, &[LocSegment::from("body")], &mut issues);
        if !issues.is_empty() {
            return Err(ApiError::Validation(issues));
        }

        let parsed = serde_path_to_error::deserialize(&value).map_err(|e| body_issue(&e))?;
        Ok((parsed, value))
    }

    pub fn json<T: DeserializeOwned + RecordShape>(&self) -> Result<T, ApiError> {
        self.json_with_value().map(|(parsed, _)| parsed)
    }

    /// JSON object body whose fields are all optional.
    ///
    /// An empty body reads as `{}`; any other non-object document is
    /// rejected.
    pub fn json_object(&self) -> Result<Map<String, Value>, ApiError> {
        if self.body.is_empty() {
            return Ok(Map::new());
        }
        match self.json::<Value>()? {
            Value::Object(map) => Ok(map),
            _ => Err(ApiError::not_a_dict()),
        }
    }

    /// Parse a url-encoded or multipart form body
    pub fn form(&self) -> Result<FormData, ApiError> {
        let content_type = self.header(CONTENT_TYPE.as_str()).unwrap_or_default();
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match media_type.as_str() {
            "multipart/form-data" => {
                let boundary = multipart::parse_boundary(content_type)?;
                let parts =
                    MultipartParser::new(&boundary, self.max_upload_size).parse(&self.body)?;
                let mut form = FormData::default();
                for part in parts {
                    if part.is_file() {
                        form.files.push(part);
                    } else {
                        let text = String::from_utf8_lossy(&part.data).into_owned();
                        form.fields.push((part.name, text));
                    }
                }
                Ok(form)
            }
            // Missing content type is treated as url-encoded, like most browsers send
            "application/x-www-form-urlencoded" | "" => Ok(FormData {
                fields: urlencoded::parse(&String::from_utf8_lossy(&self.body)),
                files: Vec::new(),
            }),
            _ => Ok(FormData::default()),
        }
    }
}

fn convert<T: FromParam>(raw: &str, loc: [&str; 2]) -> Result<T, ApiError> {
    T::from_param(raw).ok_or_else(|| ApiError::validation(ValidationIssue::new(loc, T::MSG, T::KIND)))
}

/// Map a serde data error onto the location of the offending value.
///
/// serde reports a missing field against the record that lacks it, so the
/// field name is appended to the tracked path.
fn body_issue(err: &serde_path_to_error::Error<serde_json::Error>) -> ApiError {
    let mut loc = vec![LocSegment::from("body")];
    loc.extend(err.path().iter().filter_map(|segment| match segment {
        Segment::Seq { index } => Some(LocSegment::Index(*index)),
        Segment::Map { key } | Segment::Enum { variant: key } => {
            Some(LocSegment::Field(key.clone()))
        }
        _ => None,
    }));

    let message = err.inner().to_string();
    let missing = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split_once('`'))
        .map(|(field, _)| field.to_string());

    let issue = match missing {
        Some(field) => {
            loc.push(LocSegment::from(field));
            ValidationIssue::missing(loc)
        }
        None if message.starts_with("invalid type") => {
            ValidationIssue::new(loc, message, "type_error")
        }
        None => ValidationIssue::new(loc, message, "value_error"),
    };
    ApiError::validation(issue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Login {
        username: String,
        password: String,
    }

    impl RecordShape for Login {
        fn check_shape(value: &Value, loc: &[LocSegment], issues: &mut Vec<ValidationIssue>) {
            expect_record(value, loc, issues);
        }
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Team {
        members: Vec<Login>,
    }

    impl RecordShape for Team {
        fn check_shape(value: &Value, loc: &[LocSegment], issues: &mut Vec<ValidationIssue>) {
            if let Some(map) = expect_record(value, loc, issues) {
                if let Some(members) = map.get("members") {
                    Vec::<Login>::check_shape(members, &child_loc(loc, "members"), issues);
                }
            }
        }
    }

    fn with_params(mut req: ApiRequest, pairs: &[(&str, &str)]) -> ApiRequest {
        req.set_params(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        );
        req
    }

    fn first_issue(err: ApiError) -> ValidationIssue {
        match err {
            ApiError::Validation(mut issues) => issues.remove(0),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_path_param_integer() {
        let req = with_params(ApiRequest::new(Method::GET, "/items/5"), &[("item_id", "5")]);
        assert_eq!(req.path_param::<i64>("item_id").unwrap(), 5);

        let req = with_params(ApiRequest::new(Method::GET, "/items/x"), &[("item_id", "x")]);
        let issue = first_issue(req.path_param::<i64>("item_id").unwrap_err());
        assert_eq!(issue.loc, vec![LocSegment::from("path"), "item_id".into()]);
        assert_eq!(issue.kind, "type_error.integer");
    }

    #[test]
    fn test_path_param_uuid() {
        let id = "b1a7a4a2-9f3e-4a8c-8d7e-2f1a1c7d6e5f";
        let req = with_params(ApiRequest::new(Method::PUT, "/items1/"), &[("item_id", id)]);
        assert_eq!(req.path_param::<Uuid>("item_id").unwrap().to_string(), id);
    }

    #[test]
    fn test_query_params() {
        let req = ApiRequest::new(Method::GET, "/users/").with_query("q=hello+there&skip=3");
        assert_eq!(req.query::<String>("q").unwrap().as_deref(), Some("hello there"));
        assert_eq!(req.query::<i64>("skip").unwrap(), Some(3));
        assert_eq!(req.query::<i64>("limit").unwrap(), None);

        let issue = first_issue(req.required_query::<String>("needy").unwrap_err());
        assert_eq!(issue.kind, "value_error.missing");
    }

    #[test]
    fn test_cookie_lookup() {
        let req = ApiRequest::new(Method::GET, "/items1/")
            .with_header("cookie", "theme=dark; ads_id=abc123");
        assert_eq!(req.cookie("ads_id").as_deref(), Some("abc123"));
        assert_eq!(req.cookie("missing"), None);
    }

    #[test]
    fn test_json_missing_field() {
        let req = ApiRequest::new(Method::POST, "/").with_json(&json!({"username": "a"}));
        let issue = first_issue(req.json::<Login>().unwrap_err());
        assert_eq!(issue.loc, vec![LocSegment::from("body"), "password".into()]);
        assert_eq!(issue.msg, "field required");
    }

    #[test]
    fn test_json_error_location_follows_nesting() {
        let req = ApiRequest::new(Method::POST, "/")
            .with_json(&json!({"members": [{"username": "a", "password": "b"}, {"username": "c"}]}));
        let issue = first_issue(req.json::<Team>().unwrap_err());
        assert_eq!(
            issue.loc,
            vec![
                LocSegment::from("body"),
                "members".into(),
                LocSegment::Index(1),
                "password".into()
            ]
        );
        assert_eq!(issue.kind, "value_error.missing");
    }

    #[test]
    fn test_json_type_error_location() {
        let req = ApiRequest::new(Method::POST, "/")
            .with_json(&json!({"members": [{"username": 7, "password": "b"}]}));
        let issue = first_issue(req.json::<Team>().unwrap_err());
        assert_eq!(
            issue.loc,
            vec![
                LocSegment::from("body"),
                "members".into(),
                LocSegment::Index(0),
                "username".into()
            ]
        );
        assert_eq!(issue.kind, "type_error");
    }

    #[test]
    fn test_json_rejects_records_sent_as_arrays() {
        let req = ApiRequest::new(Method::POST, "/").with_json(&json!(["a", "b"]));
        let issue = first_issue(req.json::<Login>().unwrap_err());
        assert_eq!(issue.loc, vec![LocSegment::from("body")]);
        assert_eq!(issue.kind, "type_error.dict");

        let req = ApiRequest::new(Method::POST, "/")
            .with_json(&json!({"members": [{"username": "a", "password": "b"}, ["c", "d"]]}));
        let issue = first_issue(req.json::<Team>().unwrap_err());
        assert_eq!(
            issue.loc,
            vec![LocSegment::from("body"), "members".into(), LocSegment::Index(1)]
        );
        assert_eq!(issue.kind, "type_error.dict");
    }

    #[test]
    fn test_json_malformed() {
        let req = ApiRequest::new(Method::POST, "/").with_body("{not json");
        let issue = first_issue(req.json::<Value>().unwrap_err());
        assert_eq!(issue.kind, "value_error.jsondecode");
    }

    #[test]
    fn test_json_empty_body() {
        let req = ApiRequest::new(Method::POST, "/");
        let issue = first_issue(req.json::<Value>().unwrap_err());
        assert_eq!(issue.loc, vec![LocSegment::from("body")]);
    }

    #[test]
    fn test_json_object_empty_and_non_object() {
        let req = ApiRequest::new(Method::PUT, "/");
        assert!(req.json_object().unwrap().is_empty());

        let req = ApiRequest::new(Method::PUT, "/").with_json(&json!([1, 2]));
        let issue = first_issue(req.json_object().unwrap_err());
        assert_eq!(issue.kind, "type_error.dict");
    }

    #[test]
    fn test_urlencoded_form() {
        let req = ApiRequest::new(Method::POST, "/login/")
            .with_header("content-type", "application/x-www-form-urlencoded")
            .with_body("username=alice&password=p%40ss");
        let form = req.form().unwrap();
        assert_eq!(form.required_text("username").unwrap(), "alice");
        assert_eq!(form.required_text("password").unwrap(), "p@ss");
        assert!(form.required_text("other").is_err());
    }

    #[test]
    fn test_multipart_form_file() {
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
            \r\n\
            hello\r\n\
            --XyZ--\r\n";
        let req = ApiRequest::new(Method::POST, "/uploadfile/")
            .with_header("content-type", "multipart/form-data; boundary=XyZ")
            .with_body(body);
        let form = req.form().unwrap();
        let file = form.required_file("file").unwrap();
        assert_eq!(file.filename.as_deref(), Some("a.txt"));
        assert_eq!(form.required_bytes("file").unwrap(), b"hello");
    }

    #[test]
    fn test_required_file_rejects_plain_field() {
        let body = "--XyZ\r\n\
            Content-Disposition: form-data; name=\"file\"\r\n\
            \r\n\
            just text\r\n\
            --XyZ--\r\n";
        let req = ApiRequest::new(Method::POST, "/uploadfile/")
            .with_header("content-type", "multipart/form-data; boundary=XyZ")
            .with_body(body);
        let form = req.form().unwrap();
        assert!(form.required_file("file").is_err());
        assert_eq!(form.required_bytes("file").unwrap(), b"just text");
    }
}
