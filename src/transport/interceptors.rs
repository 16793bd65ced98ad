use std::sync::{Arc, Mutex};

use super::request::{HttpRequest, HttpResponse};

/// Observes or rewrites a request after it has been fully built and before
/// it is sent.
pub trait RequestInterceptor: Send + Sync {
    fn intercept(&self, request: HttpRequest) -> HttpRequest;
}

/// Observes or rewrites a response right after it is received.
pub trait ResponseInterceptor: Send + Sync {
    fn intercept(&self, response: HttpResponse) -> HttpResponse;
}

impl<F> RequestInterceptor for F
where
    F: Fn(HttpRequest) -> HttpRequest + Send + Sync,
{
    fn intercept(&self, request: HttpRequest) -> HttpRequest {
        self(request)
    }
}

impl<F> ResponseInterceptor for F
where
    F: Fn(HttpResponse) -> HttpResponse + Send + Sync,
{
    fn intercept(&self, response: HttpResponse) -> HttpResponse {
        self(response)
    }
}

/// Ordered interceptor list. Runs in registration order; removal is by
/// `Arc` identity, so registering the same closure twice yields two entries.
pub struct InterceptorChain<I: ?Sized> {
    entries: Mutex<Vec<Arc<I>>>,
}

impl<I: ?Sized> Default for InterceptorChain<I> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }
}

impl<I: ?Sized> InterceptorChain<I> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, interceptor: Arc<I>) -> Arc<I> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(interceptor.clone());
        interceptor
    }

    /// Returns `true` if the exact handle was registered.
    pub fn remove(&self, interceptor: &Arc<I>) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let target = Arc::as_ptr(interceptor) as *const ();
        match entries
            .iter()
            .position(|e| Arc::as_ptr(e) as *const () == target)
        {
            Some(idx) => {
                entries.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current list so the lock is never held across a call.
    fn current(&self) -> Vec<Arc<I>> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl InterceptorChain<dyn RequestInterceptor> {
    pub fn apply(&self, mut request: HttpRequest) -> HttpRequest {
        for interceptor in self.current() {
            request = interceptor.intercept(request);
        }
        request
    }
}

impl InterceptorChain<dyn ResponseInterceptor> {
    pub fn apply(&self, mut response: HttpResponse) -> HttpResponse {
        for interceptor in self.current() {
            response = interceptor.intercept(response);
        }
        response
    }
}
