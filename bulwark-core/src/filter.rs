// Filter chain: ordered request processing ahead of the router

use crate::{Error, HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, trace};

/// Boxed response future produced by filters and handlers
pub type ResponseFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// The remainder of the chain, handed to each filter
pub type Next = Box<dyn FnOnce(HttpRequest) -> ResponseFuture + Send>;

/// Terminal request handler
pub type HandlerFn = Arc<dyn Fn(HttpRequest) -> ResponseFuture + Send + Sync>;

/// Wrap an async function as a [`HandlerFn`].
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(move |req| -> ResponseFuture { Box::pin(f(req)) })
}

/// A pipeline stage. A filter may inspect or modify the request, short-circuit
/// with an error or response, or pass the request on through `next`.
#[async_trait]
pub trait Filter: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    async fn filter(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error>;
}

/// Ordered list of filters applied before the terminal handler
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Arc<Vec<Arc<dyn Filter>>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter; filters run in insertion order.
    pub fn add_filter<F: Filter + 'static>(&mut self, filter: F) {
        self.add_shared(Arc::new(filter));
    }

    /// Append an already shared filter.
    pub fn add_shared(&mut self, filter: Arc<dyn Filter>) {
        let mut filters = (*self.filters).clone();
        filters.push(filter);
        self.filters = Arc::new(filters);
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run the request through every filter, then the handler.
    pub async fn execute(&self, req: HttpRequest, handler: HandlerFn) -> Result<HttpResponse, Error> {
        debug!(
            filter_count = self.filters.len(),
            path = %req.path,
            method = %req.method,
            "Executing filter chain"
        );
        self.execute_from(0, req, handler).await
    }

    fn execute_from(&self, index: usize, req: HttpRequest, handler: HandlerFn) -> ResponseFuture {
        let Some(filter) = self.filters.get(index).cloned() else {
            trace!("Filter chain complete, calling handler");
            return handler(req);
        };

        let chain = self.clone();
        trace!(filter = filter.name(), index, "Executing filter");
        Box::pin(async move {
            filter
                .filter(
                    req,
                    Box::new(move |req| chain.execute_from(index + 1, req, handler)),
                )
                .await
        })
    }
}
