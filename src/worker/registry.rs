//! # Function Registry
//!
//! Maps function references to callable task functions. Bare names resolve in
//! the function namespace; `object.method` resolves through a named object's
//! [`MethodTable`]. The registry is built by the embedding application and
//! injected into each [`crate::worker::Worker`].
//!
//! Invocation is bounded by a timeout and panics are caught, so a faulting
//! function becomes an `Err` the worker records instead of taking the loop down.

use crate::error::{Result, TaskhiveError};
use crate::models::FunctionRef;
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub type TaskResult = anyhow::Result<Value>;

/// A registered task function
pub type TaskFn = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, TaskResult> + Send + Sync>;

fn boxed_async<F, Fut>(f: F) -> TaskFn
where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    Arc::new(move |args| f(args).boxed())
}

// The call happens inside the returned future so a panic surfaces where
// `invoke` can catch it.
fn boxed_sync<F>(f: F) -> TaskFn
where
    F: Fn(Vec<Value>) -> TaskResult + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Arc::new(move |args| {
        let f = f.clone();
        async move { f(args) }.boxed()
    })
}

/// Methods of one named object
#[derive(Clone, Default)]
pub struct MethodTable {
    methods: HashMap<String, TaskFn>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method<F, Fut>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        self.methods.insert(name.into(), boxed_async(f));
        self
    }

    pub fn sync_method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> TaskResult + Send + Sync + 'static,
    {
        self.methods.insert(name.into(), boxed_sync(f));
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodTable")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Default)]
pub struct FunctionRegistry {
    functions: DashMap<String, TaskFn>,
    objects: DashMap<String, MethodTable>,
}

impl std::fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.len())
            .field("objects", &self.objects.len())
            .finish()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async function under a bare name
    pub fn register<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskResult> + Send + 'static,
    {
        let name = name.into();
        info!(function = %name, "📝 Registering task function");
        self.functions.insert(name, boxed_async(f));
    }

    /// Register a synchronous function under a bare name
    ///
    /// A synchronous function runs on the worker's task; the invocation timeout
    /// cannot interrupt it while it runs.
    pub fn register_sync<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Vec<Value>) -> TaskResult + Send + Sync + 'static,
    {
        let name = name.into();
        info!(function = %name, "📝 Registering task function");
        self.functions.insert(name, boxed_sync(f));
    }

    /// Register a named object whose methods are reachable as `object.method`
    pub fn register_object(&self, name: impl Into<String>, methods: MethodTable) {
        let name = name.into();
        info!(object = %name, methods = methods.len(), "📝 Registering object");
        self.objects.insert(name, methods);
    }

    pub fn contains(&self, reference: &FunctionRef) -> bool {
        self.resolve(reference).is_ok()
    }

    pub fn function_count(&self) -> usize {
        self.functions.len() + self.objects.iter().map(|o| o.len()).sum::<usize>()
    }

    pub fn resolve(&self, reference: &FunctionRef) -> Result<TaskFn> {
        let found = match reference {
            FunctionRef::Function(name) => self.functions.get(name).map(|f| f.value().clone()),
            FunctionRef::Method { object, method } => self
                .objects
                .get(object)
                .and_then(|table| table.methods.get(method).cloned()),
        };
        found.ok_or_else(|| TaskhiveError::FunctionNotFound(reference.to_string()))
    }

    /// Resolve and call `reference`, bounded by `timeout`
    pub async fn invoke(
        &self,
        reference: &FunctionRef,
        args: Vec<Value>,
        timeout: Duration,
    ) -> Result<Value> {
        let function = self.resolve(reference)?;
        let name = reference.to_string();
        debug!(function = %name, args = args.len(), "▶️ Invoking task function");

        let call = AssertUnwindSafe(async move { function(args).await }).catch_unwind();
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(e))) => {
                warn!(function = %name, error = %e, "❌ Task function returned an error");
                Err(TaskhiveError::invocation(name, format!("{e:#}")))
            }
            Ok(Err(panic)) => {
                let panic_msg = if let Some(s) = panic.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                error!(function = %name, panic_msg = %panic_msg, "💥 Task function panicked");
                Err(TaskhiveError::invocation(name, format!("panicked: {panic_msg}")))
            }
            Err(_) => {
                warn!(function = %name, timeout_ms = timeout.as_millis(), "⏰ Task function timed out");
                Err(TaskhiveError::invocation(
                    name,
                    format!("timed out after {}ms", timeout.as_millis()),
                ))
            }
        }
    }
}

/// `multiply(*args)`: product of numeric arguments, integer when every argument is
pub fn multiply(args: Vec<Value>) -> TaskResult {
    if args.iter().all(Value::is_i64) {
        let product = args
            .iter()
            .filter_map(Value::as_i64)
            .try_fold(1i64, i64::checked_mul)
            .ok_or_else(|| anyhow::anyhow!("integer overflow"))?;
        return Ok(Value::from(product));
    }
    let mut product = 1.0;
    for arg in &args {
        product *= arg
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("not a number: {arg}"))?;
    }
    Ok(Value::from(product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const LONG: Duration = Duration::from_secs(60);

    fn registry() -> FunctionRegistry {
        let registry = FunctionRegistry::new();
        registry.register_sync("multiply", multiply);
        registry.register("echo", |args: Vec<Value>| async move {
            Ok::<_, anyhow::Error>(Value::Array(args))
        });
        registry.register_object(
            "math",
            MethodTable::new()
                .sync_method("multiply", multiply)
                .sync_method("fail", |_| Err(anyhow::anyhow!("no good")))
                .sync_method("explode", |_| panic!("kaboom")),
        );
        registry
    }

    #[tokio::test]
    async fn test_invoke_bare_function() {
        let value = registry()
            .invoke(&FunctionRef::function("multiply"), vec![json!(4), json!(5), json!(6)], LONG)
            .await
            .unwrap();
        assert_eq!(value, json!(120));
    }

    #[tokio::test]
    async fn test_invoke_method() {
        let registry = registry();
        let value = registry
            .invoke(&"math.multiply".parse().unwrap(), vec![json!(2), json!(3)], LONG)
            .await
            .unwrap();
        assert_eq!(value, json!(6));
        let echoed = registry
            .invoke(&FunctionRef::function("echo"), vec![json!("a")], LONG)
            .await
            .unwrap();
        assert_eq!(echoed, json!(["a"]));
    }

    #[tokio::test]
    async fn test_unregistered_reference() {
        let registry = registry();
        for reference in ["divide", "math.divide", "physics.multiply"] {
            let err = registry
                .invoke(&reference.parse().unwrap(), vec![], LONG)
                .await
                .unwrap_err();
            assert!(matches!(err, TaskhiveError::FunctionNotFound(r) if r == reference));
        }
    }

    #[tokio::test]
    async fn test_error_and_panic_become_invocation_errors() {
        let registry = registry();
        let err = registry
            .invoke(&"math.fail".parse().unwrap(), vec![], LONG)
            .await
            .unwrap_err();
        assert!(matches!(&err, TaskhiveError::Invocation { message, .. } if message == "no good"));

        let err = registry
            .invoke(&"math.explode".parse().unwrap(), vec![], LONG)
            .await
            .unwrap_err();
        assert!(matches!(&err, TaskhiveError::Invocation { message, .. } if message.contains("kaboom")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let registry = FunctionRegistry::new();
        registry.register("sleepy", |_| async {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok::<_, anyhow::Error>(Value::Null)
        });
        let err = registry
            .invoke(&FunctionRef::function("sleepy"), vec![], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(&err, TaskhiveError::Invocation { message, .. } if message.contains("timed out")));
    }

    #[test]
    fn test_multiply() {
        assert_eq!(multiply(vec![json!(1), json!(2), json!(3)]).unwrap(), json!(6));
        assert_eq!(multiply(vec![]).unwrap(), json!(1));
        assert_eq!(multiply(vec![json!(1.5), json!(2)]).unwrap(), json!(3.0));
        assert!(multiply(vec![json!("x")]).is_err());
        assert!(multiply(vec![json!(i64::MAX), json!(2)]).is_err());
    }

    #[test]
    fn test_counts_and_contains() {
        let registry = registry();
        assert_eq!(registry.function_count(), 5);
        assert!(registry.contains(&FunctionRef::method("math", "fail")));
        assert!(!registry.contains(&FunctionRef::function("fail")));
    }
}
