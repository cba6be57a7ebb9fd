//! In-process tool server with a static declaration table.
//!
//! Each entry declares its name, description and typed parameter list next to
//! the handler that implements it, so the advertised schema and the argument
//! validation cannot drift apart.

use crate::error::{AppError, Result};
use crate::ingestion::{tools_list_response, ParameterKind, ParameterSpec, ToolDescriptor};
use crate::server::{Arguments, ToolServer};
use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};

use ParameterKind::{Integer, ListOfNumber, Number, String as Text};

type Handler = fn(&Arguments) -> Result<Value>;

/// One row of the declaration table.
pub struct BuiltinTool {
    pub name: &'static str,
    pub description: &'static str,
    params: &'static [(&'static str, ParameterKind)],
    handler: Handler,
}

impl BuiltinTool {
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(
            self.name,
            self.description,
            self.params
                .iter()
                .map(|(name, kind)| ParameterSpec::required(*name, *kind))
                .collect(),
        )
    }

    pub fn call(&self, args: &Arguments) -> Result<Value> {
        (self.handler)(args)
    }
}

const AB_INT: &[(&str, ParameterKind)] = &[("a", Integer), ("b", Integer)];
const TEXT: &[(&str, ParameterKind)] = &[("text", Text)];

pub static BUILTIN_TOOLS: &[BuiltinTool] = &[
    BuiltinTool {
        name: "add",
        description: "Add two numbers",
        params: AB_INT,
        handler: add,
    },
    BuiltinTool {
        name: "subtract",
        description: "Subtract two numbers",
        params: AB_INT,
        handler: subtract,
    },
    BuiltinTool {
        name: "multiply",
        description: "Multiply two numbers",
        params: AB_INT,
        handler: multiply,
    },
    BuiltinTool {
        name: "divide",
        description: "Divide a by b (float)",
        params: &[("a", Number), ("b", Number)],
        handler: divide,
    },
    BuiltinTool {
        name: "factorial",
        description: "n! (non-negative integer)",
        params: &[("n", Integer)],
        handler: factorial,
    },
    BuiltinTool {
        name: "sqrt",
        description: "Square root of x (non-negative)",
        params: &[("x", Number)],
        handler: sqrt,
    },
    BuiltinTool {
        name: "random_int",
        description: "Random integer N such that low ≤ N ≤ high",
        params: &[("low", Integer), ("high", Integer)],
        handler: random_int,
    },
    BuiltinTool {
        name: "current_datetime",
        description: "Current date–time in ISO-8601 format (UTC)",
        params: &[],
        handler: current_datetime,
    },
    BuiltinTool {
        name: "count_characters",
        description: "Number of characters in text",
        params: TEXT,
        handler: count_characters,
    },
    BuiltinTool {
        name: "to_upper",
        description: "Convert text to UPPERCASE",
        params: TEXT,
        handler: to_upper,
    },
    BuiltinTool {
        name: "to_lower",
        description: "Convert text to lowercase",
        params: TEXT,
        handler: to_lower,
    },
    BuiltinTool {
        name: "reverse_text",
        description: "Return text reversed",
        params: TEXT,
        handler: reverse_text,
    },
    BuiltinTool {
        name: "word_count",
        description: "Count words separated by whitespace",
        params: TEXT,
        handler: word_count,
    },
    BuiltinTool {
        name: "average",
        description: "Arithmetic mean of a list of numbers",
        params: &[("nums", ListOfNumber)],
        handler: average,
    },
    BuiltinTool {
        name: "get_weather",
        description: "(Stub) Always returns sunny for the demo",
        params: &[("city", Text)],
        handler: get_weather,
    },
];

/// Tool server backed by `BUILTIN_TOOLS`.
pub struct BuiltinServer {
    tools: Vec<&'static BuiltinTool>,
}

impl BuiltinServer {
    /// Server exposing the whole built-in catalog.
    pub fn new() -> Self {
        Self {
            tools: BUILTIN_TOOLS.iter().collect(),
        }
    }

    /// Server exposing only the named built-in tools, in table order.
    pub fn only(names: &[&str]) -> Self {
        Self {
            tools: BUILTIN_TOOLS
                .iter()
                .filter(|t| names.contains(&t.name))
                .collect(),
        }
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    fn find(&self, name: &str) -> Result<&'static BuiltinTool> {
        self.tools
            .iter()
            .copied()
            .find(|t| t.name == name)
            .ok_or_else(|| AppError::UnknownTool(name.to_string()))
    }
}

impl Default for BuiltinServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolServer for BuiltinServer {
    async fn list_tools(&self) -> Result<Value> {
        Ok(tools_list_response(&self.descriptors()))
    }

    async fn call_tool(&self, name: &str, arguments: &Arguments) -> Result<Value> {
        let tool = self.find(name)?;
        let result = tool.call(arguments);

        metrics::counter!("tool_calls_total", "tool" => tool.name).increment(1);
        match &result {
            Ok(value) => tracing::debug!(tool = name, result = %value, "Tool call succeeded"),
            Err(e) => tracing::debug!(tool = name, error = %e, "Tool call failed"),
        }

        result
    }
}

// ---------------------------------------------------------------------------
// Argument validation
// ---------------------------------------------------------------------------

fn arg<'a>(args: &'a Arguments, name: &str) -> Result<&'a Value> {
    args.get(name)
        .ok_or_else(|| AppError::InvalidArgument(format!("missing required argument '{}'", name)))
}

fn integer(args: &Arguments, name: &str) -> Result<i64> {
    let value = arg(args, name)?;
    if let Some(i) = value.as_i64() {
        return Ok(i);
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
        _ => Err(AppError::InvalidArgument(format!(
            "'{}' must be an integer, got {}",
            name, value
        ))),
    }
}

fn number(args: &Arguments, name: &str) -> Result<f64> {
    let value = arg(args, name)?;
    value.as_f64().ok_or_else(|| {
        AppError::InvalidArgument(format!("'{}' must be a number, got {}", name, value))
    })
}

fn text<'a>(args: &'a Arguments, name: &str) -> Result<&'a str> {
    let value = arg(args, name)?;
    value.as_str().ok_or_else(|| {
        AppError::InvalidArgument(format!("'{}' must be a string, got {}", name, value))
    })
}

fn numbers(args: &Arguments, name: &str) -> Result<Vec<f64>> {
    let value = arg(args, name)?;
    let invalid =
        || AppError::InvalidArgument(format!("'{}' must be a list of numbers, got {}", name, value));
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_f64().ok_or_else(invalid))
        .collect()
}

fn overflow(op: &str) -> AppError {
    AppError::InvalidArgument(format!("integer overflow in {}", op))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn add(args: &Arguments) -> Result<Value> {
    let (a, b) = (integer(args, "a")?, integer(args, "b")?);
    a.checked_add(b).map(Value::from).ok_or_else(|| overflow("add"))
}

fn subtract(args: &Arguments) -> Result<Value> {
    let (a, b) = (integer(args, "a")?, integer(args, "b")?);
    a.checked_sub(b).map(Value::from).ok_or_else(|| overflow("subtract"))
}

fn multiply(args: &Arguments) -> Result<Value> {
    let (a, b) = (integer(args, "a")?, integer(args, "b")?);
    a.checked_mul(b).map(Value::from).ok_or_else(|| overflow("multiply"))
}

fn divide(args: &Arguments) -> Result<Value> {
    let (a, b) = (number(args, "a")?, number(args, "b")?);
    if b == 0.0 {
        return Err(AppError::InvalidArgument("division by zero".into()));
    }
    Ok(json!(a / b))
}

fn factorial(args: &Arguments) -> Result<Value> {
    let n = integer(args, "n")?;
    if n < 0 {
        return Err(AppError::InvalidArgument(
            "factorial() not defined for negative values".into(),
        ));
    }
    (1..=n)
        .try_fold(1i64, |acc, k| acc.checked_mul(k))
        .map(Value::from)
        .ok_or_else(|| overflow("factorial"))
}

fn sqrt(args: &Arguments) -> Result<Value> {
    let x = number(args, "x")?;
    if x < 0.0 {
        return Err(AppError::InvalidArgument("square root of negative".into()));
    }
    Ok(json!(x.sqrt()))
}

fn random_int(args: &Arguments) -> Result<Value> {
    let (low, high) = (integer(args, "low")?, integer(args, "high")?);
    if low > high {
        return Err(AppError::InvalidArgument(format!(
            "empty range for random_int ({}, {})",
            low, high
        )));
    }
    Ok(json!(rand::thread_rng().gen_range(low..=high)))
}

fn current_datetime(_args: &Arguments) -> Result<Value> {
    let now = chrono::Utc::now().naive_utc();
    Ok(json!(now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()))
}

fn count_characters(args: &Arguments) -> Result<Value> {
    Ok(json!(text(args, "text")?.chars().count()))
}

fn to_upper(args: &Arguments) -> Result<Value> {
    Ok(json!(text(args, "text")?.to_uppercase()))
}

fn to_lower(args: &Arguments) -> Result<Value> {
    Ok(json!(text(args, "text")?.to_lowercase()))
}

fn reverse_text(args: &Arguments) -> Result<Value> {
    Ok(json!(text(args, "text")?.chars().rev().collect::<String>()))
}

fn word_count(args: &Arguments) -> Result<Value> {
    Ok(json!(text(args, "text")?.split_whitespace().count()))
}

fn average(args: &Arguments) -> Result<Value> {
    let nums = numbers(args, "nums")?;
    if nums.is_empty() {
        return Err(AppError::InvalidArgument("empty list".into()));
    }
    Ok(json!(nums.iter().sum::<f64>() / nums.len() as f64))
}

fn get_weather(args: &Arguments) -> Result<Value> {
    Ok(json!(format!("sunny in {}", text(args, "city")?)))
}
