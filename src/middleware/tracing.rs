use std::time::Duration;

use tracing::{error, info, warn};

use super::Middleware;
use crate::dispatcher::{HandlerRequest, HandlerResponse};

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Logs one event when a handler call starts and one when it finishes.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &HandlerRequest) -> Option<HandlerResponse> {
        info!(
            request_id = %req.request_id,
            method = %req.method,
            path = %req.path,
            handler = %req.handler_name,
            "Request started"
        );
        None
    }

    fn after(&self, req: &HandlerRequest, res: &mut HandlerResponse, latency: Duration) {
        let latency_ms = duration_ms(latency);
        match res.status {
            500.. => error!(
                request_id = %req.request_id,
                handler = %req.handler_name,
                status = res.status,
                latency_ms,
                "Request failed"
            ),
            400..=499 => warn!(
                request_id = %req.request_id,
                handler = %req.handler_name,
                status = res.status,
                latency_ms,
                "Request rejected"
            ),
            _ => info!(
                request_id = %req.request_id,
                handler = %req.handler_name,
                status = res.status,
                latency_ms,
                "Request completed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::from_micros(2_500)), 2);
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
    }
}
