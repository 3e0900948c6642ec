use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::graph::transport::{
    Transport, TransportFailure, TransportRequest, TransportResponse,
};

type Step = Result<TransportResponse, TransportFailure>;

struct Route {
    fragment: String,
    steps: VecDeque<Step>,
    /// Served after the queued steps run out (an `always` route).
    fallback: Option<Step>,
}

/// A scripted transport: responses are keyed by URL substring and served in
/// FIFO order per route, with optional repeating fallbacks. Every request is
/// logged so tests can assert on call counts, ordering and bearer tokens.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<Vec<Route>>,
    log: Mutex<Vec<TransportRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response for the next request whose URL contains `fragment`.
    pub fn enqueue(&self, fragment: &str, response: TransportResponse) {
        self.push(fragment, Ok(response));
    }

    /// Queue one network-level failure for the next matching request.
    pub fn enqueue_failure(&self, fragment: &str, failure: TransportFailure) {
        self.push(fragment, Err(failure));
    }

    /// Serve `response` for every matching request once queued steps (if
    /// any) are exhausted.
    pub fn always(&self, fragment: &str, response: TransportResponse) {
        let mut routes = self.routes.lock();
        if let Some(route) = routes.iter_mut().find(|r| r.fragment == fragment) {
            route.fallback = Some(Ok(response));
        } else {
            routes.push(Route {
                fragment: fragment.to_owned(),
                steps: VecDeque::new(),
                fallback: Some(Ok(response)),
            });
        }
    }

    fn push(&self, fragment: &str, step: Step) {
        let mut routes = self.routes.lock();
        if let Some(route) = routes.iter_mut().find(|r| r.fragment == fragment) {
            route.steps.push_back(step);
        } else {
            routes.push(Route {
                fragment: fragment.to_owned(),
                steps: VecDeque::from([step]),
                fallback: None,
            });
        }
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.log.lock().clone()
    }

    /// How many requests hit URLs containing `fragment`.
    pub fn count_matching(&self, fragment: &str) -> usize {
        self.log
            .lock()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }

    /// Convenience: number of token-endpoint requests.
    pub fn token_requests(&self) -> usize {
        self.count_matching("oauth2")
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, TransportFailure> {
        self.log.lock().push(request.clone());

        let mut routes = self.routes.lock();
        let route = routes
            .iter_mut()
            .find(|r| request.url.contains(&r.fragment) && (!r.steps.is_empty() || r.fallback.is_some()))
            .unwrap_or_else(|| panic!("no scripted response for {}", request.url));

        if let Some(step) = route.steps.pop_front() {
            step
        } else {
            route
                .fallback
                .clone()
                .expect("route matched without steps or fallback")
        }
    }
}
