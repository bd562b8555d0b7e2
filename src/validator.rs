//! # Validator Module
//!
//! Request validation against the schemas declared in the OpenAPI document.
//!
//! Problems are reported as [`FieldIssue`]s, one per offending field, each
//! carrying a machine-readable `type`, a `loc` path starting with the request
//! part (`body`, `path`, `query`) and a human-readable `msg`. All issues for a
//! request are collected before it is rejected, so a client sees every bad
//! field in a single 422 response.
//!
//! Body checks run in two passes:
//!
//! 1. A structural walk of the schema (`type`, `required`, `properties`,
//!    `items`) that produces precise per-field issues.
//! 2. A compiled [`jsonschema::Validator`], cached per operation, which has the
//!    final word on anything the walk does not model (enums, bounds, formats).

use crate::router::ParamVec;
use crate::spec::{ParameterLocation, ParameterMeta, ParameterStyle, RouteMeta};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info, warn};

/// Machine-readable category of a [`FieldIssue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Missing,
    JsonInvalid,
    ModelAttributesType,
    StringType,
    FloatType,
    IntType,
    BoolType,
    ListType,
    IntParsing,
    FloatParsing,
    BoolParsing,
    ValueError,
}

impl IssueKind {
    pub fn default_message(&self) -> &'static str {
        match self {
            IssueKind::Missing => "Field required",
            IssueKind::JsonInvalid => "JSON decode error",
            IssueKind::ModelAttributesType => {
                "Input should be a valid dictionary or object to extract fields from"
            }
            IssueKind::StringType => "Input should be a valid string",
            IssueKind::FloatType => "Input should be a valid number",
            IssueKind::IntType => "Input should be a valid integer",
            IssueKind::BoolType => "Input should be a valid boolean",
            IssueKind::ListType => "Input should be a valid list",
            IssueKind::IntParsing => {
                "Input should be a valid integer, unable to parse string as an integer"
            }
            IssueKind::FloatParsing => {
                "Input should be a valid number, unable to parse string as a number"
            }
            IssueKind::BoolParsing => {
                "Input should be a valid boolean, unable to interpret input"
            }
            IssueKind::ValueError => "Value error",
        }
    }

    /// Issue for a JSON value that does not have the schema's `type`.
    fn for_json_type(ty: &str) -> Self {
        match ty {
            "object" => IssueKind::ModelAttributesType,
            "string" => IssueKind::StringType,
            "number" => IssueKind::FloatType,
            "integer" => IssueKind::IntType,
            "boolean" => IssueKind::BoolType,
            "array" => IssueKind::ListType,
            _ => IssueKind::ValueError,
        }
    }

    /// Issue for a string parameter that cannot be read as the schema's `type`.
    fn for_param_type(ty: &str) -> Self {
        match ty {
            "integer" => IssueKind::IntParsing,
            "number" => IssueKind::FloatParsing,
            "boolean" => IssueKind::BoolParsing,
            other => Self::for_json_type(other),
        }
    }
}

/// One offending field in a rejected request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub loc: Vec<String>,
    pub msg: String,
}

impl FieldIssue {
    pub fn new<I, S>(kind: IssueKind, loc: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldIssue {
            kind,
            loc: loc.into_iter().map(Into::into).collect(),
            msg: kind.default_message().to_string(),
        }
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = msg.into();
        self
    }

    /// `loc` joined with dots, for log lines.
    pub fn loc_string(&self) -> String {
        self.loc.join(".")
    }
}

/// `true` for an optional sign followed by one or more ASCII digits.
pub fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Parse an integer literal, clamping values outside the `i64` range to its bounds.
///
/// Returns `None` when `s` is not an integer literal at all.
pub fn saturating_parse_integer(s: &str) -> Option<i64> {
    if !is_integer_literal(s) {
        return None;
    }
    match s.parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) if s.starts_with('-') => Some(i64::MIN),
        Err(_) => Some(i64::MAX),
    }
}

fn convert_primitive(val: &str, schema: Option<&Value>) -> Value {
    let Some(ty) = schema.and_then(|s| s.get("type")).and_then(Value::as_str) else {
        return Value::String(val.to_string());
    };
    match ty {
        "integer" => match val.parse::<i64>() {
            Ok(n) => Value::from(n),
            // Out-of-range integers still count as integers.
            Err(_) if is_integer_literal(val) => val
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(val.to_string())),
            Err(_) => Value::String(val.to_string()),
        },
        "number" => val
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(val.to_string())),
        "boolean" => val
            .parse::<bool>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(val.to_string())),
        _ => Value::String(val.to_string()),
    }
}

/// Convert a raw parameter string into a JSON value typed by its schema.
///
/// Values that cannot be converted are returned as JSON strings, which the
/// type check then reports.
pub fn decode_param_value(
    value: &str,
    schema: Option<&Value>,
    style: Option<ParameterStyle>,
) -> Value {
    match schema.and_then(|s| s.get("type")).and_then(Value::as_str) {
        Some("array") => {
            let items_schema = schema.and_then(|s| s.get("items"));
            let delim = match style.unwrap_or(ParameterStyle::Form) {
                ParameterStyle::SpaceDelimited => ' ',
                ParameterStyle::PipeDelimited => '|',
                _ => ',',
            };
            Value::Array(
                value
                    .split(delim)
                    .filter(|s| !s.is_empty())
                    .map(|p| convert_primitive(p.trim(), items_schema))
                    .collect(),
            )
        }
        Some("object") => {
            serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
        }
        _ => convert_primitive(value, schema),
    }
}

fn json_type_matches(ty: &str, v: &Value) -> bool {
    match ty {
        "object" => v.is_object(),
        "array" => v.is_array(),
        "string" => v.is_string(),
        "number" => v.is_number(),
        "integer" => {
            v.is_i64() || v.is_u64() || v.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        "boolean" => v.is_boolean(),
        "null" => v.is_null(),
        _ => true,
    }
}

/// The schema's `type`, as a list. Empty when the schema does not constrain it.
fn schema_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(a)) => a.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn check_type(schema: &Value, value: &Value, loc: &[String], issues: &mut Vec<FieldIssue>) -> bool {
    let types = schema_types(schema);
    if types.is_empty() || types.iter().any(|t| json_type_matches(t, value)) {
        return true;
    }
    let primary = types.iter().copied().find(|t| *t != "null").unwrap_or("null");
    issues.push(FieldIssue::new(IssueKind::for_json_type(primary), loc.iter().cloned()));
    false
}

/// Structural walk producing one issue per missing or mistyped field.
pub fn collect_schema_issues(
    schema: &Value,
    value: &Value,
    loc: &mut Vec<String>,
    issues: &mut Vec<FieldIssue>,
) {
    if !check_type(schema, value, loc, issues) {
        return;
    }

    if let Value::Object(obj) = value {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for name in required.iter().filter_map(Value::as_str) {
                if !obj.contains_key(name) {
                    loc.push(name.to_string());
                    issues.push(FieldIssue::new(IssueKind::Missing, loc.iter().cloned()));
                    loc.pop();
                }
            }
        }
        if let Some(props) = schema.get("properties").and_then(Value::as_object) {
            for (name, prop_schema) in props {
                if let Some(prop_value) = obj.get(name) {
                    loc.push(name.clone());
                    collect_schema_issues(prop_schema, prop_value, loc, issues);
                    loc.pop();
                }
            }
        }
    }

    if let (Value::Array(items), Some(item_schema)) = (value, schema.get("items")) {
        for (i, item) in items.iter().enumerate() {
            loc.push(i.to_string());
            collect_schema_issues(item_schema, item, loc, issues);
            loc.pop();
        }
    }
}

/// Check path, query and header parameters declared on `route`.
///
/// Header names are matched case-insensitively against the lowercased `headers`.
pub fn validate_parameters(
    route: &RouteMeta,
    path_params: &ParamVec,
    query_params: &ParamVec,
    headers: &HashMap<String, String>,
) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    for param in &route.parameters {
        let raw = match param.location {
            ParameterLocation::Path => lookup(path_params, &param.name),
            ParameterLocation::Query => lookup(query_params, &param.name),
            ParameterLocation::Header => headers
                .get(&param.name.to_ascii_lowercase())
                .map(String::as_str),
            ParameterLocation::Cookie => continue,
        };
        let loc = [param.location.as_str().to_string(), param.name.clone()];
        match raw {
            None if param.required => issues.push(FieldIssue::new(IssueKind::Missing, loc)),
            None => {}
            Some(raw) => {
                if let Some(issue) = check_parameter(param, raw, loc) {
                    issues.push(issue);
                }
            }
        }
    }
    issues
}

fn lookup<'a>(params: &'a ParamVec, name: &str) -> Option<&'a str> {
    params
        .iter()
        .rfind(|(k, _)| k.as_ref() == name)
        .map(|(_, v)| v.as_str())
}

fn check_parameter(param: &ParameterMeta, raw: &str, loc: [String; 2]) -> Option<FieldIssue> {
    let ty = param.schema_type()?;
    if ty == "integer" {
        return (!is_integer_literal(raw)).then(|| FieldIssue::new(IssueKind::IntParsing, loc));
    }
    let decoded = decode_param_value(raw, param.schema.as_ref(), param.style);
    (!json_type_matches(ty, &decoded)).then(|| FieldIssue::new(IssueKind::for_param_type(ty), loc))
}

/// Compiled JSON Schema validators keyed by operation.
///
/// Each schema is compiled once and shared through an `Arc`; a poisoned lock
/// degrades to compiling without caching.
#[derive(Clone, Default)]
pub struct ValidatorCache {
    cache: Arc<RwLock<HashMap<String, Arc<jsonschema::Validator>>>>,
}

impl ValidatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compile(&self, key: &str, schema: &Value) -> Option<Arc<jsonschema::Validator>> {
        if let Ok(cache) = self.cache.read() {
            if let Some(validator) = cache.get(key) {
                return Some(Arc::clone(validator));
            }
        }

        let validator = match jsonschema::validator_for(schema) {
            Ok(v) => Arc::new(v),
            Err(e) => {
                error!(cache_key = %key, error = %e, "Failed to compile JSON Schema");
                return None;
            }
        };

        match self.cache.write() {
            Ok(mut cache) => {
                let entry = cache.entry(key.to_string()).or_insert_with(|| {
                    debug!(cache_key = %key, "Schema validator compiled and cached");
                    Arc::clone(&validator)
                });
                Some(Arc::clone(entry))
            }
            Err(_) => {
                warn!(cache_key = %key, "Validator cache lock poisoned, skipping cache");
                Some(validator)
            }
        }
    }

    /// Compile the request schema of every route ahead of the first request.
    pub fn precompile(&self, routes: &[RouteMeta]) -> usize {
        let compiled = routes
            .iter()
            .filter_map(|r| {
                r.request_schema
                    .as_ref()
                    .and_then(|s| self.get_or_compile(&Self::request_key(r), s))
            })
            .count();
        info!(compiled, "Pre-compiled request schemas");
        compiled
    }

    pub fn size(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    fn request_key(route: &RouteMeta) -> String {
        format!("{}:request", route.handler_name)
    }

    /// Validate a request body against the route's schema.
    pub fn validate_body(&self, route: &RouteMeta, schema: &Value, body: &Value) -> Vec<FieldIssue> {
        let mut issues = Vec::new();
        let mut loc = vec!["body".to_string()];
        collect_schema_issues(schema, body, &mut loc, &mut issues);

        if issues.is_empty() {
            if let Some(validator) = self.get_or_compile(&Self::request_key(route), schema) {
                issues.extend(validator.iter_errors(body).map(|e| {
                    FieldIssue::new(IssueKind::ValueError, ["body"]).with_msg(e.to_string())
                }));
            }
        }
        issues
    }
}
