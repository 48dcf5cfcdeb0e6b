use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::context::Context;
use crate::types::RowValues;

/// The query shapes a [`Database`](crate::database::Database) reports to its hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    SelectOne,
    Select,
    Insert,
    Update,
    Delete,
    Exec,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryKind::SelectOne => "select_one",
            QueryKind::Select => "select",
            QueryKind::Insert => "insert",
            QueryKind::Update => "update",
            QueryKind::Delete => "delete",
            QueryKind::Exec => "exec",
        };
        f.write_str(name)
    }
}

/// Upcast helper so `dyn ExecutorHook` can be downcast to its concrete type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Observer invoked around every query a [`Database`](crate::database::Database) runs.
///
/// Every method has an empty default body, so an implementation only
/// overrides the events it cares about:
///
/// ```rust
/// use sql_registry::prelude::*;
///
/// #[derive(Debug, Default)]
/// struct SlowSelectLogger;
///
/// impl ExecutorHook for SlowSelectLogger {
///     fn before_select(&self, _ctx: &Context, query: &str, _args: &[RowValues]) {
///         println!("select: {query}");
///     }
/// }
/// ```
///
/// `before_*` runs immediately before the statement reaches the connection,
/// `after_*` immediately after it returns, whether it succeeded or not.
/// Hooks are observers: a panic inside one is caught and logged, and the
/// query carries on.
#[allow(unused_variables)]
pub trait ExecutorHook: AsAny + Send + Sync {
    fn before_select_one(&self, ctx: &Context, query: &str, args: &[RowValues]) {}
    fn after_select_one(&self, ctx: &Context, query: &str, args: &[RowValues]) {}

    fn before_select(&self, ctx: &Context, query: &str, args: &[RowValues]) {}
    fn after_select(&self, ctx: &Context, query: &str, args: &[RowValues]) {}

    fn before_insert(&self, ctx: &Context, query: &str, args: &[RowValues]) {}
    fn after_insert(&self, ctx: &Context, query: &str, args: &[RowValues]) {}

    fn before_update(&self, ctx: &Context, query: &str, args: &[RowValues]) {}
    fn after_update(&self, ctx: &Context, query: &str, args: &[RowValues]) {}

    fn before_delete(&self, ctx: &Context, query: &str, args: &[RowValues]) {}
    fn after_delete(&self, ctx: &Context, query: &str, args: &[RowValues]) {}

    fn before_exec(&self, ctx: &Context, query: &str, args: &[RowValues]) {}
    fn after_exec(&self, ctx: &Context, query: &str, args: &[RowValues]) {}

    /// Concrete type name of the hook, used in logs and `Debug` output.
    fn hook_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl dyn ExecutorHook {
    /// True if the hook's concrete type is `T`.
    #[must_use]
    pub fn is<T: ExecutorHook>(&self) -> bool {
        self.as_any().is::<T>()
    }

    #[must_use]
    pub fn downcast_ref<T: ExecutorHook>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
}

impl fmt::Debug for dyn ExecutorHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ExecutorHook").field(&self.hook_name()).finish()
    }
}

/// Hook used when a configuration supplies none. Every event is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultExecutorHook;

impl ExecutorHook for DefaultExecutorHook {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Before,
    After,
}

/// Fire one hook event, containing any panic it raises.
pub(crate) fn notify(
    hook: &dyn ExecutorHook,
    kind: QueryKind,
    phase: Phase,
    ctx: &Context,
    query: &str,
    args: &[RowValues],
) {
    let outcome = catch_unwind(AssertUnwindSafe(|| match (kind, phase) {
        (QueryKind::SelectOne, Phase::Before) => hook.before_select_one(ctx, query, args),
        (QueryKind::SelectOne, Phase::After) => hook.after_select_one(ctx, query, args),
        (QueryKind::Select, Phase::Before) => hook.before_select(ctx, query, args),
        (QueryKind::Select, Phase::After) => hook.after_select(ctx, query, args),
        (QueryKind::Insert, Phase::Before) => hook.before_insert(ctx, query, args),
        (QueryKind::Insert, Phase::After) => hook.after_insert(ctx, query, args),
        (QueryKind::Update, Phase::Before) => hook.before_update(ctx, query, args),
        (QueryKind::Update, Phase::After) => hook.after_update(ctx, query, args),
        (QueryKind::Delete, Phase::Before) => hook.before_delete(ctx, query, args),
        (QueryKind::Delete, Phase::After) => hook.after_delete(ctx, query, args),
        (QueryKind::Exec, Phase::Before) => hook.before_exec(ctx, query, args),
        (QueryKind::Exec, Phase::After) => hook.after_exec(ctx, query, args),
    }));
    if let Err(payload) = outcome {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        tracing::warn!(
            hook = hook.hook_name(),
            event = %kind,
            phase = ?phase,
            "executor hook panicked: {message}"
        );
    }
}
