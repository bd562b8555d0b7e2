use super::types::{
    ParameterLocation, ParameterMeta, ParameterStyle, RouteMeta, SpecIssue, SpecIssues,
};
use oas3::spec::{ObjectOrReference, Parameter};
use oas3::OpenApiV3Spec;
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// Nesting depth at which `$ref` expansion stops, so self-referencing schemas terminate.
const MAX_REF_DEPTH: usize = 16;

/// Resolve a `#/components/schemas/<Name>` reference.
pub fn resolve_schema_ref<'a>(
    spec: &'a OpenApiV3Spec,
    ref_path: &str,
) -> Option<&'a oas3::spec::ObjectSchema> {
    let name = ref_path.strip_prefix("#/components/schemas/")?;
    spec.components
        .as_ref()?
        .schemas
        .get(name)
        .and_then(|schema_ref| match schema_ref {
            ObjectOrReference::Object(schema) => Some(schema),
            _ => None,
        })
}

/// Replace every `$ref` object inside `value` with the schema it points to.
///
/// The original reference name is kept under `x-ref-name` so tooling can still
/// show which component a schema came from.
pub fn expand_schema_refs(spec: &OpenApiV3Spec, value: &mut Value) {
    expand_at_depth(spec, value, 0);
}

fn expand_at_depth(spec: &OpenApiV3Spec, value: &mut Value, depth: usize) {
    if depth > MAX_REF_DEPTH {
        return;
    }
    match value {
        Value::Object(obj) => {
            if let Some(ref_path) = obj.get("$ref").and_then(Value::as_str) {
                let ref_path = ref_path.to_string();
                if let Some(mut resolved) =
                    resolve_schema_ref(spec, &ref_path).and_then(|s| serde_json::to_value(s).ok())
                {
                    expand_at_depth(spec, &mut resolved, depth + 1);
                    if let (Some(name), Value::Object(o)) = (
                        ref_path.strip_prefix("#/components/schemas/"),
                        &mut resolved,
                    ) {
                        o.insert("x-ref-name".to_string(), Value::String(name.to_string()));
                    }
                    *value = resolved;
                    return;
                }
            }
            for v in obj.values_mut() {
                expand_at_depth(spec, v, depth + 1);
            }
        }
        Value::Array(arr) => {
            for v in arr.iter_mut() {
                expand_at_depth(spec, v, depth + 1);
            }
        }
        _ => {}
    }
}

fn schema_to_value(
    spec: &OpenApiV3Spec,
    schema: &ObjectOrReference<oas3::spec::ObjectSchema>,
) -> Option<Value> {
    let mut value = match schema {
        ObjectOrReference::Object(obj) => serde_json::to_value(obj).ok()?,
        ObjectOrReference::Ref { ref_path, .. } => serde_json::json!({ "$ref": ref_path }),
    };
    expand_schema_refs(spec, &mut value);
    // A top-level `$ref` left in place did not resolve.
    (value.get("$ref").is_none()).then_some(value)
}

fn resolve_handler_name(
    operation: &oas3::spec::Operation,
    location: &str,
    issues: &mut Vec<SpecIssue>,
) -> Option<String> {
    let explicit = operation.extensions.iter().find_map(|(key, val)| {
        if key.starts_with("x-handler") {
            val.as_str().map(str::to_string)
        } else {
            None
        }
    });
    let name = explicit.or_else(|| operation.operation_id.clone());
    if name.is_none() {
        issues.push(SpecIssue::new(
            location,
            "MissingHandler",
            "Missing operationId or x-handler-* extension",
        ));
    }
    name
}

/// The `application/json` request body schema and whether a body is required.
pub fn extract_request_schema(
    spec: &OpenApiV3Spec,
    operation: &oas3::spec::Operation,
) -> (Option<Value>, bool) {
    match operation.request_body.as_ref() {
        Some(ObjectOrReference::Object(body)) => {
            let schema = body
                .content
                .get("application/json")
                .and_then(|media| media.schema.as_ref())
                .and_then(|s| schema_to_value(spec, s));
            (schema, body.required.unwrap_or(false))
        }
        _ => (None, false),
    }
}

/// Numeric response codes declared on the operation, ascending. `default` is skipped.
pub fn declared_status_codes(operation: &oas3::spec::Operation) -> Vec<u16> {
    let mut codes: Vec<u16> = operation
        .responses
        .iter()
        .flat_map(|responses| responses.keys())
        .filter_map(|status| status.parse().ok())
        .collect();
    codes.sort_unstable();
    codes.dedup();
    codes
}

fn resolve_parameter_ref<'a>(spec: &'a OpenApiV3Spec, ref_path: &str) -> Option<&'a Parameter> {
    let name = ref_path.strip_prefix("#/components/parameters/")?;
    spec.components
        .as_ref()?
        .parameters
        .get(name)
        .and_then(|param_ref| match param_ref {
            ObjectOrReference::Object(param) => Some(param),
            _ => None,
        })
}

/// Resolve parameter references into [`ParameterMeta`] records.
///
/// Path parameters are always required, whatever the document says.
pub fn extract_parameters(
    spec: &OpenApiV3Spec,
    params: &[ObjectOrReference<Parameter>],
) -> Vec<ParameterMeta> {
    params
        .iter()
        .filter_map(|p| match p {
            ObjectOrReference::Object(obj) => Some(obj),
            ObjectOrReference::Ref { ref_path, .. } => resolve_parameter_ref(spec, ref_path),
        })
        .map(|param| {
            let location = ParameterLocation::from(param.location);
            ParameterMeta {
                name: param.name.clone(),
                location,
                required: location == ParameterLocation::Path || param.required.unwrap_or(false),
                schema: param.schema.as_ref().and_then(|s| schema_to_value(spec, s)),
                style: param.style.map(ParameterStyle::from),
                explode: param.explode,
            }
        })
        .collect()
}

/// Names of the `{placeholders}` in a path template, in order.
pub fn path_template_params(path: &str) -> Vec<&str> {
    static PLACEHOLDER: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\{([^{}/]+)\}").ok())
        .as_ref()
    else {
        return Vec::new();
    };
    re.captures_iter(path)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

fn base_path(spec: &OpenApiV3Spec) -> String {
    let Some(server) = spec.servers.first() else {
        return String::new();
    };
    let url_str = &server.url;
    url::Url::parse(url_str)
        .or_else(|_| url::Url::parse(&format!("http://dummy{url_str}")))
        .map(|u| {
            let p = u.path().trim_end_matches('/');
            if p == "/" || p.is_empty() {
                String::new()
            } else {
                p.to_string()
            }
        })
        .unwrap_or_default()
}

/// Build a [`RouteMeta`] for every operation in the document.
///
/// # Errors
///
/// Returns [`SpecIssues`] when an operation has no handler name or a path
/// placeholder has no matching `in: path` parameter.
pub fn build_routes(spec: &OpenApiV3Spec) -> anyhow::Result<Vec<RouteMeta>> {
    let mut routes = Vec::new();
    let mut issues = Vec::new();
    let base_path = base_path(spec);

    let Some(paths_map) = spec.paths.as_ref() else {
        return Ok(routes);
    };

    for (path, item) in paths_map {
        for (method, operation) in item.methods() {
            let location = format!("{path} -> {method}");

            let Some(handler_name) = resolve_handler_name(operation, &location, &mut issues)
            else {
                continue;
            };

            let (request_schema, request_body_required) = extract_request_schema(spec, operation);
            let status_codes = declared_status_codes(operation);

            let mut parameters = extract_parameters(spec, &item.parameters);
            for param in extract_parameters(spec, &operation.parameters) {
                // Operation-level parameters override path-item ones with the same name.
                parameters.retain(|p| !(p.name == param.name && p.location == param.location));
                parameters.push(param);
            }

            for placeholder in path_template_params(path) {
                let declared = parameters
                    .iter()
                    .any(|p| p.location == ParameterLocation::Path && p.name == placeholder);
                if !declared {
                    issues.push(SpecIssue::new(
                        &location,
                        "UndeclaredPathParameter",
                        format!("Path placeholder '{{{placeholder}}}' has no path parameter"),
                    ));
                }
            }

            routes.push(RouteMeta {
                method: method.clone(),
                path_pattern: Arc::from(path.as_str()),
                handler_name: Arc::from(handler_name.as_str()),
                summary: operation.summary.clone(),
                parameters,
                request_schema,
                request_body_required,
                status_codes,
                base_path: base_path.clone(),
            });
        }
    }

    if issues.is_empty() {
        Ok(routes)
    } else {
        Err(SpecIssues(issues).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_template_params() {
        assert_eq!(path_template_params("/items/{item_id}"), vec!["item_id"]);
        assert_eq!(
            path_template_params("/users/{user_id}/posts/{post_id}"),
            vec!["user_id", "post_id"]
        );
        assert!(path_template_params("/health").is_empty());
    }

    #[test]
    fn test_declared_status_codes_sorted() {
        let spec = crate::spec::load_embedded_spec().unwrap();
        let create = spec
            .routes
            .iter()
            .find(|r| r.handler_name.as_ref() == "create_item")
            .unwrap();
        assert_eq!(create.status_codes, vec![200, 400, 422]);
    }
}
