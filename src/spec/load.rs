use super::build::build_routes;
use super::types::RouteMeta;
use anyhow::Context;
use oas3::OpenApiV3Spec;
use std::path::Path;

/// The service contract compiled into the binary.
pub const EMBEDDED_SPEC: &str = include_str!("../../doc/openapi.yaml");

/// A parsed document plus the routes derived from it.
#[derive(Debug, Clone)]
pub struct LoadedSpec {
    pub routes: Vec<RouteMeta>,
    pub title: String,
    pub slug: String,
    pub version: String,
    /// The document text exactly as it was read, served at `/openapi.yaml`.
    pub raw: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFormat {
    Yaml,
    Json,
}

impl SpecFormat {
    /// `.json` files are JSON, everything else is treated as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SpecFormat::Json,
            _ => SpecFormat::Yaml,
        }
    }
}

/// Drop path-item keys that are neither HTTP verbs, shared fields nor `x-` extensions.
fn strip_unknown_verbs(val: &mut serde_json::Value) {
    const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

    let Some(serde_json::Value::Object(paths_map)) = val.get_mut("paths") else {
        return;
    };
    for item in paths_map.values_mut() {
        if let serde_json::Value::Object(obj) = item {
            obj.retain(|k, _| {
                let lk = k.to_ascii_lowercase();
                match lk.as_str() {
                    "summary" | "description" | "servers" | "parameters" | "$ref" => true,
                    m if METHODS.contains(&m) => true,
                    _ => k.starts_with("x-"),
                }
            });
        }
    }
}

/// Lowercase, non-alphanumerics folded to `_`.
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_ascii_alphanumeric(), "_")
        .trim_matches('_')
        .to_string()
}

/// Parse a document held in memory.
pub fn load_spec_str(content: &str, format: SpecFormat) -> anyhow::Result<LoadedSpec> {
    let mut value: serde_json::Value = match format {
        SpecFormat::Yaml => serde_yaml::from_str(content).context("spec is not valid YAML")?,
        SpecFormat::Json => serde_json::from_str(content).context("spec is not valid JSON")?,
    };

    strip_unknown_verbs(&mut value);
    let spec: OpenApiV3Spec =
        serde_json::from_value(value).context("spec is not a valid OpenAPI 3.x document")?;

    let routes = build_routes(&spec)?;
    Ok(LoadedSpec {
        routes,
        slug: slugify(&spec.info.title),
        title: spec.info.title.clone(),
        version: spec.info.version.clone(),
        raw: content.to_string(),
    })
}

/// Read and parse a document from disk.
pub fn load_spec(path: impl AsRef<Path>) -> anyhow::Result<LoadedSpec> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read spec {}", path.display()))?;
    load_spec_str(&content, SpecFormat::from_path(path))
        .with_context(|| format!("failed to load spec {}", path.display()))
}

pub fn load_embedded_spec() -> anyhow::Result<LoadedSpec> {
    load_spec_str(EMBEDDED_SPEC, SpecFormat::Yaml).context("embedded spec is invalid")
}

/// Load `path` when given, otherwise fall back to the embedded document.
pub fn load_spec_or_embedded(path: Option<&Path>) -> anyhow::Result<LoadedSpec> {
    match path {
        Some(p) => load_spec(p),
        None => load_embedded_spec(),
    }
}
