//! Job definitions.
//!
//! A [`Job`] pairs a reusable zero-argument callable with a diagnostic
//! [`JobName`]. The callable is invoked once per run, so a group can be
//! run any number of times.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use funcgroups_core::JobName;

type AsyncBody<T> = dyn Fn() -> BoxFuture<'static, T> + Send + Sync;
type BlockingBody<T> = dyn Fn() -> T + Send + Sync;

enum Body<T> {
    Async(Arc<AsyncBody<T>>),
    Blocking(Arc<BlockingBody<T>>),
}

impl<T> Clone for Body<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Async(f) => Self::Async(Arc::clone(f)),
            Self::Blocking(f) => Self::Blocking(Arc::clone(f)),
        }
    }
}

/// A unit of work submitted to a group.
///
/// `T` is what the job produces: `()` for [`JobGroup`](crate::JobGroup)
/// jobs, `Result<(), E>` for [`TryJobGroup`](crate::TryJobGroup) jobs
/// (see [`TryJob`]).
pub struct Job<T = ()> {
    name: JobName,
    body: Body<T>,
}

/// A job that reports failure through `Err(E)`.
pub type TryJob<E> = Job<Result<(), E>>;

impl<T: Send + 'static> Job<T> {
    /// Wrap an async callable.
    ///
    /// The name is resolved from the callable's type: an `async fn` item
    /// gets its path, a closure gets the function it was written in.
    /// Override it with [`with_name`](Self::with_name).
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self {
            name: JobName::of::<F>(),
            body: Body::Async(Arc::new(move || f().boxed())),
        }
    }

    /// Wrap a synchronous callable; it runs on Tokio's blocking pool.
    pub fn blocking<F>(f: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            name: JobName::of::<F>(),
            body: Body::Blocking(Arc::new(f)),
        }
    }

    pub fn with_name(mut self, name: impl Into<JobName>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &JobName {
        &self.name
    }

    /// Build the future for one execution of this job.
    ///
    /// A panic inside the job is caught and turned into `Err(message)`,
    /// so the caller always gets exactly one outcome per execution.
    pub(crate) fn execute(&self) -> impl Future<Output = Result<T, String>> + Send + 'static {
        let body = self.body.clone();
        async move {
            match body {
                Body::Async(f) => AssertUnwindSafe(async move { f().await })
                    .catch_unwind()
                    .await
                    .map_err(|payload| panic_message(&*payload)),
                Body::Blocking(f) => tokio::task::spawn_blocking(move || f())
                    .await
                    .map_err(|err| match err.try_into_panic() {
                        Ok(payload) => panic_message(&*payload),
                        Err(err) => err.to_string(),
                    }),
            }
        }
    }
}

impl<T> Clone for Job<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            body: self.body.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Job<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.body {
            Body::Async(_) => "async",
            Body::Blocking(_) => "blocking",
        };
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("kind", &kind)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
