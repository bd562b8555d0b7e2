use crate::spec::RouteMeta;
use http::Method;
use percent_encoding::percent_decode_str;
use regex::Regex;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of path/query parameters stored inline before spilling to the heap.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Parameter names are shared with the route table, values are per request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A request path resolved to one operation.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<RouteMeta>,
    /// Percent-decoded path segments captured for each `{placeholder}`.
    pub path_params: ParamVec,
    pub handler_name: Arc<str>,
    /// Filled in by the server from the query string.
    pub query_params: ParamVec,
}

impl RouteMatch {
    /// Last occurrence wins when a name repeats.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum RouteOutcome {
    Matched(RouteMatch),
    /// The path is known but not under this method.
    MethodNotAllowed { allowed: Vec<Method> },
    NotFound,
}

#[derive(Debug, Clone)]
struct CompiledRoute {
    method: Method,
    regex: Regex,
    route: Arc<RouteMeta>,
    param_names: Vec<Arc<str>>,
}

/// Regex route table built from [`RouteMeta`] records.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<CompiledRoute>,
    base_path: String,
}

impl Router {
    /// Compile the route table.
    ///
    /// Templates with more literal segments are tried first, so `/items/special`
    /// wins over `/items/{item_id}` regardless of declaration order.
    pub fn new(routes: Vec<RouteMeta>) -> Result<Self, regex::Error> {
        let base_path = routes
            .first()
            .map(|r| r.base_path.clone())
            .unwrap_or_default();

        let mut routes = routes;
        routes.sort_by(|a, b| {
            let key = |r: &RouteMeta| {
                let literal = r
                    .path_pattern
                    .split('/')
                    .filter(|s| !s.is_empty() && !s.starts_with('{'))
                    .count();
                (literal, r.path_pattern.len())
            };
            key(b).cmp(&key(a))
        });

        let mut compiled = Vec::with_capacity(routes.len());
        for route in routes {
            let full_path = format!("{}{}", base_path, route.path_pattern);
            let (regex, param_names) = Self::path_to_regex(&full_path)?;
            debug!(
                method = %route.method,
                path = %full_path,
                handler = %route.handler_name,
                "Compiled route"
            );
            compiled.push(CompiledRoute {
                method: route.method.clone(),
                regex,
                route: Arc::new(route),
                param_names,
            });
        }

        info!(routes_count = compiled.len(), base_path = %base_path, "Router initialized");
        Ok(Self {
            routes: compiled,
            base_path,
        })
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn routes(&self) -> impl Iterator<Item = &RouteMeta> + '_ {
        self.routes.iter().map(|c| c.route.as_ref())
    }

    pub fn route(&self, method: &Method, path: &str) -> RouteOutcome {
        let mut allowed = Vec::new();
        for compiled in &self.routes {
            let Some(captures) = compiled.regex.captures(path) else {
                continue;
            };
            if compiled.method != *method {
                if !allowed.contains(&compiled.method) {
                    allowed.push(compiled.method.clone());
                }
                continue;
            }

            let mut path_params = ParamVec::new();
            for (i, name) in compiled.param_names.iter().enumerate() {
                if let Some(val) = captures.get(i + 1) {
                    // Decoded per segment, so an encoded `/` never splits a placeholder.
                    let decoded = percent_decode_str(val.as_str()).decode_utf8_lossy();
                    path_params.push((Arc::clone(name), decoded.into_owned()));
                }
            }
            return RouteOutcome::Matched(RouteMatch {
                route: Arc::clone(&compiled.route),
                path_params,
                handler_name: Arc::clone(&compiled.route.handler_name),
                query_params: ParamVec::new(),
            });
        }

        if allowed.is_empty() {
            RouteOutcome::NotFound
        } else {
            RouteOutcome::MethodNotAllowed { allowed }
        }
    }

    /// Compile a path template into an anchored regex and its placeholder names.
    pub(crate) fn path_to_regex(path: &str) -> Result<(Regex, Vec<Arc<str>>), regex::Error> {
        if path == "/" {
            return Ok((Regex::new(r"^/$")?, Vec::new()));
        }

        let mut pattern = String::with_capacity(path.len() + 8);
        pattern.push('^');
        let mut param_names = Vec::with_capacity(path.matches('{').count());

        for segment in path.split('/') {
            if segment.starts_with('{') && segment.ends_with('}') {
                let param_name = segment.trim_start_matches('{').trim_end_matches('}');
                pattern.push_str("/([^/]+)");
                param_names.push(Arc::from(param_name));
            } else if !segment.is_empty() {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
            }
        }

        pattern.push('$');
        Ok((Regex::new(&pattern)?, param_names))
    }
}
