//! Function registry
//!
//! Tasks name the function they call; the worker looks the name up here.
//! The built-in set covers diagnostics (`echo`, `sleep`), arithmetic
//! (`sum`) and arbitrary commands (`shell`).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// A function that tasks can call
#[async_trait]
pub trait TaskFunction: Send + Sync {
    async fn call(&self, args: Vec<Value>, kwargs: Map<String, Value>) -> Result<Value>;
}

/// Named functions available to tasks
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn TaskFunction>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with all built-in functions
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("echo", Echo);
        registry.register("sum", Sum);
        registry.register("sleep", Sleep);
        registry.register("shell", Shell);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, function: impl TaskFunction + 'static) {
        self.functions.insert(name.into(), Arc::new(function));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TaskFunction>> {
        self.functions.get(name).cloned()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Returns the first positional argument (or `value=`)
struct Echo;

#[async_trait]
impl TaskFunction for Echo {
    async fn call(&self, args: Vec<Value>, mut kwargs: Map<String, Value>) -> Result<Value> {
        Ok(args
            .into_iter()
            .next()
            .or_else(|| kwargs.remove("value"))
            .unwrap_or(Value::Null))
    }
}

/// Adds all numeric positional arguments
///
/// Integer inputs give an integer result; any float makes it a float.
struct Sum;

#[async_trait]
impl TaskFunction for Sum {
    async fn call(&self, args: Vec<Value>, _kwargs: Map<String, Value>) -> Result<Value> {
        let mut int_total: i64 = 0;
        let mut float_total: f64 = 0.0;
        let mut is_float = false;

        for (index, arg) in args.iter().enumerate() {
            match arg {
                Value::Number(n) if !is_float && n.is_i64() => {
                    let value = n.as_i64().unwrap_or_default();
                    int_total = int_total
                        .checked_add(value)
                        .ok_or_else(|| anyhow!("integer overflow at argument {}", index))?;
                }
                Value::Number(n) => {
                    if !is_float {
                        is_float = true;
                        float_total = int_total as f64;
                    }
                    float_total += n
                        .as_f64()
                        .ok_or_else(|| anyhow!("argument {} is not representable", index))?;
                }
                other => bail!("argument {} is not a number: {}", index, other),
            }
        }

        if is_float {
            Ok(Value::from(float_total))
        } else {
            Ok(Value::from(int_total))
        }
    }
}

/// Sleeps for `seconds` (keyword or first argument) and returns null
struct Sleep;

#[async_trait]
impl TaskFunction for Sleep {
    async fn call(&self, args: Vec<Value>, kwargs: Map<String, Value>) -> Result<Value> {
        let seconds = kwargs
            .get("seconds")
            .or_else(|| args.first())
            .and_then(Value::as_f64)
            .ok_or_else(|| anyhow!("sleep requires a numeric 'seconds' argument"))?;

        let duration = Duration::try_from_secs_f64(seconds)
            .map_err(|e| anyhow!("invalid sleep duration {}: {}", seconds, e))?;

        tokio::time::sleep(duration).await;
        Ok(Value::Null)
    }
}

/// Runs a command through `sh -c` and returns its stdout
struct Shell;

#[async_trait]
impl TaskFunction for Shell {
    async fn call(&self, args: Vec<Value>, kwargs: Map<String, Value>) -> Result<Value> {
        let command = kwargs
            .get("command")
            .or_else(|| args.first())
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("shell requires a string 'command' argument"))?;

        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to spawn sh")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "command exited with {}: {}",
                output.status,
                stderr.trim_end()
            );
        }

        Ok(Value::String(
            String::from_utf8_lossy(&output.stdout).into_owned(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn call(name: &str, args: Value, kwargs: Value) -> Result<Value> {
        let registry = FunctionRegistry::with_builtins();
        let function = registry.get(name).unwrap();
        let args = serde_json::from_value(args).unwrap();
        let kwargs = serde_json::from_value(kwargs).unwrap();
        function.call(args, kwargs).await
    }

    #[test]
    fn test_builtin_names() {
        let registry = FunctionRegistry::with_builtins();
        assert_eq!(registry.names(), vec!["echo", "shell", "sleep", "sum"]);
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_echo() {
        assert_eq!(
            call("echo", json!([{"a": 1}, 2]), json!({})).await.unwrap(),
            json!({"a": 1})
        );
        assert_eq!(
            call("echo", json!([]), json!({"value": "hi"})).await.unwrap(),
            json!("hi")
        );
        assert_eq!(call("echo", json!([]), json!({})).await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_sum() {
        assert_eq!(call("sum", json!([1, 2, 3]), json!({})).await.unwrap(), json!(6));
        assert_eq!(
            call("sum", json!([1, 2.5]), json!({})).await.unwrap(),
            json!(3.5)
        );
        assert_eq!(call("sum", json!([]), json!({})).await.unwrap(), json!(0));
        assert!(call("sum", json!([1, "two"]), json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_sleep() {
        assert_eq!(
            call("sleep", json!([]), json!({"seconds": 0.01})).await.unwrap(),
            Value::Null
        );
        assert!(call("sleep", json!([-1]), json!({})).await.is_err());
        assert!(call("sleep", json!(["soon"]), json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_shell() {
        assert_eq!(
            call("shell", json!(["echo hello"]), json!({})).await.unwrap(),
            json!("hello\n")
        );

        let err = call("shell", json!([]), json!({"command": "echo oops >&2; exit 3"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("oops"));
    }
}
