//! Ordered stage chains and their tower integration

use async_trait::async_trait;
use axum::{extract::Request, response::Response};
use futures_util::future::{BoxFuture, FutureExt};
use std::{
    convert::Infallible,
    future::Future,
    sync::Arc,
    task::{Context, Poll},
};
use tower::{Layer, Service};

use super::{
    common::{Cors, Recovery, RequestLogging, UserAgentLog},
    context::RequestContext,
};

/// One link of a pipeline.
///
/// A stage either answers the request itself (short-circuit) or hands it to
/// `next` and may post-process the response on the way out.
#[async_trait]
pub trait Stage: Send + Sync {
    async fn handle(&self, req: Request, next: Next<'_>) -> Response;

    /// Header edits this stage makes to every response, including answers
    /// produced by an outer stage that short-circuits past it
    fn decorate(&self, _response: &mut Response) {}
}

/// Terminal handler reached after the last stage
pub type Endpoint = Box<dyn FnOnce(Request) -> BoxFuture<'static, Response> + Send>;

/// Remaining stages of a pipeline plus its terminal handler
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    endpoint: Endpoint,
}

impl<'a> Next<'a> {
    pub fn new(stages: &'a [Arc<dyn Stage>], endpoint: Endpoint) -> Self {
        Self { stages, endpoint }
    }

    /// Pass the request to the next stage, or to the endpoint after the last one
    pub async fn run(self, req: Request) -> Response {
        let Next { stages, endpoint } = self;
        match stages.split_first() {
            Some((stage, rest)) => stage.handle(req, Next::new(rest, endpoint)).await,
            None => endpoint(req).await,
        }
    }

    /// Answer with `response` without running the remaining stages or the
    /// endpoint. Skipped stages still get to decorate it, innermost first.
    pub fn respond(self, mut response: Response) -> Response {
        for stage in self.stages.iter().rev() {
            stage.decorate(&mut response);
        }
        response
    }
}

impl Next<'static> {
    /// Continuation that calls `handler` directly
    pub fn endpoint<F, Fut>(handler: F) -> Self
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Next::new(&[], Box::new(move |req| handler(req).boxed()))
    }
}

/// Stages applied in order: the first one listed runs first on the way in
/// and last on the way out.
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Arc<Vec<Arc<dyn Stage>>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compose(stages: Vec<Arc<dyn Stage>>) -> Self {
        Self {
            stages: Arc::new(stages),
        }
    }

    /// Request logging, panic recovery, permissive CORS, user-agent logging
    pub fn standard() -> Self {
        Self::new()
            .with(RequestLogging)
            .with(Recovery)
            .with(Cors::permissive())
            .with(UserAgentLog)
    }

    /// Append `stage` as the new innermost stage
    pub fn with<S: Stage + 'static>(mut self, stage: S) -> Self {
        Arc::make_mut(&mut self.stages).push(Arc::new(stage));
        self
    }

    /// Drive `req` through every stage and finally `endpoint`
    pub async fn run(&self, mut req: Request, endpoint: Endpoint) -> Response {
        RequestContext::ensure(&mut req);
        Next::new(&self.stages, endpoint).run(req).await
    }

    pub fn layer(self) -> PipelineLayer {
        PipelineLayer { pipeline: self }
    }
}

/// Mounts a [`Pipeline`] in front of an axum router or method router
#[derive(Clone)]
pub struct PipelineLayer {
    pipeline: Pipeline,
}

impl<S> Layer<S> for PipelineLayer {
    type Service = PipelineService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PipelineService {
            pipeline: self.pipeline.clone(),
            inner,
        }
    }
}

#[derive(Clone)]
pub struct PipelineService<S> {
    pipeline: Pipeline,
    inner: S,
}

impl<S> Service<Request> for PipelineService<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Response, Infallible>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // Keep the service that was polled ready, leave a fresh clone behind
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let pipeline = self.pipeline.clone();

        Box::pin(async move {
            let endpoint: Endpoint = Box::new(move |req| {
                async move {
                    match inner.call(req).await {
                        Ok(response) => response,
                        Err(never) => match never {},
                    }
                }
                .boxed()
            });
            Ok(pipeline.run(req, endpoint).await)
        })
    }
}
