use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;

use crate::config::{
    ConfigSource, ConnectionResolver, ConnectionString, DEFAULT_CONNECTION_STRING_KEY,
};
use crate::connection::ConnectionStats;
use crate::error::VsqlError;
use crate::executor::QueryExecutor;
use crate::params::ParamSet;
use crate::queue::CallbackQueue;
use crate::row::Row;
use crate::types::RowValues;

/// Called after every enqueue, for hosts that only tick when asked to.
pub type TickRequester = Arc<dyn Fn() + Send + Sync>;

/// Options for a [`Bridge`].
#[derive(Clone)]
pub struct BridgeOptions {
    pub connection_string_key: String,
    /// Worker threads for a bridge-owned runtime; `None` uses Tokio's default.
    pub worker_threads: Option<usize>,
    pub tick_requester: Option<TickRequester>,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            connection_string_key: DEFAULT_CONNECTION_STRING_KEY.to_string(),
            worker_threads: None,
            tick_requester: None,
        }
    }
}

impl fmt::Debug for BridgeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeOptions")
            .field("connection_string_key", &self.connection_string_key)
            .field("worker_threads", &self.worker_threads)
            .field("tick_requester", &self.tick_requester.is_some())
            .finish()
    }
}

/// Fluent builder for [`BridgeOptions`].
#[derive(Debug, Clone, Default)]
pub struct BridgeOptionsBuilder {
    opts: BridgeOptions,
}

impl BridgeOptionsBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn connection_string_key(mut self, key: impl Into<String>) -> Self {
        self.opts.connection_string_key = key.into();
        self
    }

    #[must_use]
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.opts.worker_threads = Some(threads);
        self
    }

    #[must_use]
    pub fn tick_requester(mut self, requester: impl Fn() + Send + Sync + 'static) -> Self {
        self.opts.tick_requester = Some(Arc::new(requester));
        self
    }

    #[must_use]
    pub fn finish(self) -> BridgeOptions {
        self.opts
    }

    /// Build a [`Bridge`] with its own runtime.
    ///
    /// # Errors
    /// Returns `VsqlError::Io` if the runtime cannot be started.
    pub fn build(self, source: impl ConfigSource + 'static) -> Result<Bridge, VsqlError> {
        Bridge::new(self.finish(), source)
    }
}

/// State shared between the host thread and background operations.
struct BridgeContext {
    resolver: ConnectionResolver,
    queue: CallbackQueue,
    executor: QueryExecutor,
    tick_requester: Option<TickRequester>,
}

impl BridgeContext {
    fn new(options: BridgeOptions, source: impl ConfigSource + 'static) -> Self {
        Self {
            resolver: ConnectionResolver::new(options.connection_string_key, source),
            queue: CallbackQueue::new(),
            executor: QueryExecutor::default(),
            tick_requester: options.tick_requester,
        }
    }

    fn deliver<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.queue.enqueue(callback);
        if let Some(request_tick) = &self.tick_requester {
            request_tick();
        }
    }
}

/// The operations a host registers, plus the tick hook that delivers their
/// results.
///
/// Each operation resolves the connection string on the calling thread,
/// runs on the bridge's runtime with its own connection, and queues the
/// caller's callback with the result. Callbacks only run inside
/// [`Bridge::on_tick`], on whichever thread calls it.
///
/// ```rust,no_run
/// use vsql::prelude::*;
///
/// let bridge = Bridge::new(
///     BridgeOptions::default(),
///     StaticConfig("sqlite:game.db".into()),
/// )?;
/// bridge.execute(
///     "UPDATE players SET money = money + @amount WHERE id = @id",
///     ParamSet::new().with("amount", 100).with("id", 7),
///     |affected| println!("{affected} rows updated"),
/// );
/// loop {
///     bridge.on_tick();
///     # break;
/// }
/// # Ok::<(), VsqlError>(())
/// ```
pub struct Bridge {
    context: Arc<BridgeContext>,
    handle: Handle,
    runtime: Option<Runtime>,
}

impl Bridge {
    /// Start a bridge that owns a multi-threaded runtime.
    ///
    /// # Errors
    /// Returns `VsqlError::Io` if the runtime cannot be started.
    pub fn new(
        options: BridgeOptions,
        source: impl ConfigSource + 'static,
    ) -> Result<Self, VsqlError> {
        let mut builder = tokio::runtime::Builder::new_multi_thread();
        builder.enable_all().thread_name("vsql-io");
        if let Some(threads) = options.worker_threads {
            builder.worker_threads(threads);
        }
        let runtime = builder.build()?;
        let handle = runtime.handle().clone();
        Ok(Self {
            context: Arc::new(BridgeContext::new(options, source)),
            handle,
            runtime: Some(runtime),
        })
    }

    /// Run operations on a runtime the embedder already has.
    #[must_use]
    pub fn with_handle(
        handle: Handle,
        options: BridgeOptions,
        source: impl ConfigSource + 'static,
    ) -> Self {
        Self {
            context: Arc::new(BridgeContext::new(options, source)),
            handle,
            runtime: None,
        }
    }

    #[must_use]
    pub fn builder() -> BridgeOptionsBuilder {
        BridgeOptionsBuilder::new()
    }

    /// Resolve the connection string now and queue `on_ready`.
    pub fn ready<F>(&self, on_ready: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.context.resolver.resolve();
        self.context.deliver(on_ready);
    }

    /// Run a non-query; `on_done` gets the affected row count, or 0 on failure.
    pub fn execute<F>(
        &self,
        query: impl Into<String>,
        params: ParamSet,
        on_done: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let query = query.into();
        self.spawn_op(
            move |ctx, cs| async move { ctx.executor.execute(&cs, &query, &params).await },
            on_done,
        )
    }

    /// Run `queries` in one transaction; `on_done` gets `true` if it committed.
    pub fn transaction<F>(
        &self,
        queries: Vec<String>,
        params: ParamSet,
        on_done: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(bool) + Send + 'static,
    {
        self.spawn_op(
            move |ctx, cs| async move { ctx.executor.transaction(&cs, &queries, &params).await },
            on_done,
        )
    }

    /// Run a query; `on_done` gets its first cell, or `Null`.
    pub fn fetch_scalar<F>(
        &self,
        query: impl Into<String>,
        params: ParamSet,
        on_done: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(RowValues) + Send + 'static,
    {
        let query = query.into();
        self.spawn_op(
            move |ctx, cs| async move { ctx.executor.fetch_scalar(&cs, &query, &params).await },
            on_done,
        )
    }

    /// Run a query; `on_done` gets every row, or none on failure.
    pub fn fetch_all<F>(
        &self,
        query: impl Into<String>,
        params: ParamSet,
        on_done: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Vec<Row>) + Send + 'static,
    {
        let query = query.into();
        self.spawn_op(
            move |ctx, cs| async move { ctx.executor.fetch_all(&cs, &query, &params).await },
            on_done,
        )
    }

    /// Deliver the callbacks queued so far. Call once per host tick.
    pub fn on_tick(&self) -> usize {
        self.context.queue.drain_once()
    }

    #[must_use]
    pub fn pending_callbacks(&self) -> usize {
        self.context.queue.len()
    }

    #[must_use]
    pub fn stats(&self) -> &ConnectionStats {
        self.context.executor.stats()
    }

    /// The connection string this bridge uses, resolving it if needed.
    #[must_use]
    pub fn connection_string(&self) -> ConnectionString {
        self.context.resolver.resolve()
    }

    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    fn spawn_op<T, W, Fut, F>(&self, work: W, on_done: F) -> JoinHandle<()>
    where
        W: FnOnce(Arc<BridgeContext>, ConnectionString) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        F: FnOnce(T) + Send + 'static,
    {
        let connection_string = self.context.resolver.resolve();
        let ctx = Arc::clone(&self.context);
        let pending = work(Arc::clone(&ctx), connection_string);
        self.handle.spawn(async move {
            let result = pending.await;
            ctx.deliver(move || on_done(result));
        })
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("resolver", &self.context.resolver)
            .field("queue", &self.context.queue)
            .field("owns_runtime", &self.runtime.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
