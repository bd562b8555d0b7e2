use super::request::{parse_request, ParsedRequest, RequestBody};
use super::response::{write_response, ContentType, ServiceResponse};
use crate::dispatcher::{Dispatcher, HandlerResponse};
use crate::error::ApiError;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::middleware::{MetricsMiddleware, TracingMiddleware};
use crate::registry;
use crate::router::{ParamVec, RouteMatch, RouteOutcome, Router};
use crate::spec::LoadedSpec;
use crate::validator::{self, FieldIssue, IssueKind, ValidatorCache};
use anyhow::Context;
use http::Method;
use may_minihttp::{HttpService, Request, Response};
use serde_json::Value;
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The `may_minihttp` service: built-in endpoints, routing, validation, dispatch.
#[derive(Clone)]
pub struct AppService {
    router: Arc<Router>,
    dispatcher: Arc<Dispatcher>,
    validators: ValidatorCache,
    metrics: Option<Arc<MetricsMiddleware>>,
    spec_document: Arc<str>,
}

impl AppService {
    pub fn new(router: Router, dispatcher: Dispatcher, spec_document: impl Into<Arc<str>>) -> Self {
        Self {
            router: Arc::new(router),
            dispatcher: Arc::new(dispatcher),
            validators: ValidatorCache::new(),
            metrics: None,
            spec_document: spec_document.into(),
        }
    }

    /// Serve `/metrics` from `metrics` and count pre-dispatch rejections in it.
    pub fn with_metrics(mut self, metrics: Arc<MetricsMiddleware>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Wire up router, handler coroutines and middleware for a loaded document.
    pub fn from_spec(spec: &LoadedSpec, metrics_enabled: bool) -> anyhow::Result<Self> {
        let router = Router::new(spec.routes.clone()).context("failed to compile route table")?;

        let mut dispatcher = Dispatcher::new();
        dispatcher.add_middleware(Arc::new(TracingMiddleware));
        let metrics = metrics_enabled.then(|| Arc::new(MetricsMiddleware::new()));
        if let Some(m) = &metrics {
            dispatcher.add_middleware(Arc::clone(m) as Arc<dyn crate::middleware::Middleware>);
        }

        // SAFETY: handler coroutines only run the controllers in this crate, which
        // neither block the OS thread nor keep thread-local state.
        let missing = unsafe { registry::register_from_spec(&mut dispatcher, &spec.routes) }
            .context("failed to spawn handler coroutines")?;
        if !missing.is_empty() {
            warn!(missing = ?missing, "Routes without a controller will answer 500");
        }

        let mut service = AppService::new(router, dispatcher, spec.raw.as_str());
        service.validators.precompile(&spec.routes);
        if let Some(m) = metrics {
            service = service.with_metrics(m);
        }
        info!(
            title = %spec.title,
            routes = spec.routes.len(),
            metrics = metrics_enabled,
            "Service initialized"
        );
        Ok(service)
    }

    pub fn metrics(&self) -> Option<&Arc<MetricsMiddleware>> {
        self.metrics.as_ref()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Produce the response for one request.
    pub fn handle(&self, req: ParsedRequest) -> ServiceResponse {
        let request_id = RequestId::from_header_or_new(req.header(REQUEST_ID_HEADER));
        if let Some(m) = &self.metrics {
            m.inc_top_level_request();
        }

        if req.method == "GET" {
            match req.path.as_str() {
                "/openapi.yaml" => {
                    return ServiceResponse::text(200, ContentType::Yaml, self.spec_document.as_bytes());
                }
                "/metrics" => {
                    if let Some(m) = &self.metrics {
                        return ServiceResponse::text(200, ContentType::PlainText, m.render_prometheus());
                    }
                }
                _ => {}
            }
        }

        match self.route_and_dispatch(request_id, req) {
            Ok(resp) => resp.into(),
            Err(err) => {
                if let Some(m) = &self.metrics {
                    m.record_rejection(err.status());
                }
                HandlerResponse::from(err).into()
            }
        }
    }

    fn route_and_dispatch(
        &self,
        request_id: RequestId,
        req: ParsedRequest,
    ) -> Result<HandlerResponse, ApiError> {
        let method = Method::from_bytes(req.method.as_bytes()).map_err(|_| ApiError::MethodNotAllowed)?;
        let mut route_match = match self.router.route(&method, &req.path) {
            RouteOutcome::Matched(m) => m,
            RouteOutcome::MethodNotAllowed { allowed } => {
                debug!(request_id = %request_id, method = %method, path = %req.path, allowed = ?allowed, "Method not allowed");
                return Err(ApiError::MethodNotAllowed);
            }
            RouteOutcome::NotFound => {
                debug!(request_id = %request_id, method = %method, path = %req.path, "No route matched");
                return Err(ApiError::route_not_found());
            }
        };
        route_match.query_params = req
            .query_params
            .iter()
            .map(|(k, v)| (Arc::<str>::from(k.as_str()), v.clone()))
            .collect::<ParamVec>();

        let body = self.validate(request_id, &route_match, &req)?;
        Ok(self.dispatcher.dispatch(route_match, body, request_id))
    }

    /// Collect every parameter and body issue; reject with all of them at once.
    fn validate(
        &self,
        request_id: RequestId,
        route_match: &RouteMatch,
        req: &ParsedRequest,
    ) -> Result<Option<Value>, ApiError> {
        let route = &route_match.route;
        let mut issues = validator::validate_parameters(
            route,
            &route_match.path_params,
            &route_match.query_params,
            &req.headers,
        );

        let body = match (&route.request_schema, &req.body) {
            (Some(_), RequestBody::Empty) => {
                if route.request_body_required {
                    issues.push(FieldIssue::new(IssueKind::Missing, ["body"]));
                }
                None
            }
            (Some(_), RequestBody::Invalid(error)) => {
                debug!(request_id = %request_id, error = %error, "Request body is not JSON");
                issues.push(FieldIssue::new(IssueKind::JsonInvalid, ["body"]));
                None
            }
            (Some(schema), RequestBody::Json(value)) => {
                issues.extend(self.validators.validate_body(route, schema, value));
                Some(value.clone())
            }
            (None, body) => body.clone().into_json(),
        };

        if issues.is_empty() {
            return Ok(body);
        }
        warn!(
            request_id = %request_id,
            handler = %route_match.handler_name,
            issue_count = issues.len(),
            fields = ?issues.iter().map(FieldIssue::loc_string).collect::<Vec<_>>(),
            "Request validation failed"
        );
        Err(ApiError::Validation(issues))
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let parsed = parse_request(req);
        write_response(res, self.handle(parsed));
        Ok(())
    }
}
