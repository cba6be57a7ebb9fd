//! Per-tool argument resolution strategies.
//!
//! Each strategy looks at the tool's declared parameters and the raw query
//! and either fills arguments or gives up. Giving up means the whole tool is
//! filled in manually; strategies never return a partial fill.

use crate::ingestion::{ParameterKind, ToolDescriptor};
use crate::resolve::extract::{colon_text, extract_location, extract_numbers};
use crate::server::Arguments;
use serde_json::{json, Value};

/// Query text plus the numbers pulled out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery<'a> {
    pub text: &'a str,
    pub numbers: Vec<f64>,
}

impl<'a> ParsedQuery<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            numbers: extract_numbers(text),
        }
    }
}

pub trait ArgumentResolver: Send + Sync {
    /// `Some` with the extracted arguments, or `None` when the operator has to
    /// supply every parameter.
    fn resolve(&self, tool: &ToolDescriptor, query: &ParsedQuery<'_>) -> Option<Arguments>;
}

/// Integer part of `n`; out-of-range values stay floats for the tool to reject.
fn truncated(n: f64) -> Value {
    ParameterKind::Integer.number_value(n.trunc())
}

/// Two numeric operands, taken from the first two numbers in the query.
pub struct BinaryNumeric;

impl ArgumentResolver for BinaryNumeric {
    fn resolve(&self, tool: &ToolDescriptor, query: &ParsedQuery<'_>) -> Option<Arguments> {
        let [lhs, rhs] = tool.parameters.as_slice() else {
            return None;
        };
        if !lhs.kind.is_numeric() || !rhs.kind.is_numeric() {
            return None;
        }
        let [a, b, ..] = query.numbers.as_slice() else {
            return None;
        };

        let mut args = Arguments::new();
        args.insert(lhs.name.clone(), lhs.kind.number_value(*a));
        args.insert(rhs.name.clone(), rhs.kind.number_value(*b));
        Some(args)
    }
}

/// One numeric parameter, from the first number in the query. Integer
/// parameters truncate.
pub struct SingleNumber;

impl ArgumentResolver for SingleNumber {
    fn resolve(&self, tool: &ToolDescriptor, query: &ParsedQuery<'_>) -> Option<Arguments> {
        let [param] = tool.parameters.as_slice() else {
            return None;
        };
        let n = *query.numbers.first()?;

        let value = match param.kind {
            ParameterKind::Integer => truncated(n),
            _ => json!(n),
        };

        let mut args = Arguments::new();
        args.insert(param.name.clone(), value);
        Some(args)
    }
}

/// Low/high integer bounds; falls back to a default range instead of asking.
pub struct BoundedRange {
    pub default_low: i64,
    pub default_high: i64,
}

impl Default for BoundedRange {
    fn default() -> Self {
        Self {
            default_low: 1,
            default_high: 100,
        }
    }
}

impl ArgumentResolver for BoundedRange {
    fn resolve(&self, tool: &ToolDescriptor, query: &ParsedQuery<'_>) -> Option<Arguments> {
        let [low, high] = tool.parameters.as_slice() else {
            return None;
        };

        let (lo, hi) = match query.numbers.as_slice() {
            [a, b, ..] => (truncated(*a), truncated(*b)),
            _ => (json!(self.default_low), json!(self.default_high)),
        };

        let mut args = Arguments::new();
        args.insert(low.name.clone(), lo);
        args.insert(high.name.clone(), hi);
        Some(args)
    }
}

/// Tools without parameters resolve immediately.
pub struct NoArguments;

impl ArgumentResolver for NoArguments {
    fn resolve(&self, _tool: &ToolDescriptor, _query: &ParsedQuery<'_>) -> Option<Arguments> {
        Some(Arguments::new())
    }
}

/// A single text parameter: the text after the first colon, or the whole query.
pub struct FreeText;

impl ArgumentResolver for FreeText {
    fn resolve(&self, tool: &ToolDescriptor, query: &ParsedQuery<'_>) -> Option<Arguments> {
        let [param] = tool.parameters.as_slice() else {
            return None;
        };

        let mut args = Arguments::new();
        args.insert(param.name.clone(), json!(colon_text(query.text)));
        Some(args)
    }
}

/// A location parameter: words after "in ", else the free-text rule.
pub struct Location;

impl ArgumentResolver for Location {
    fn resolve(&self, tool: &ToolDescriptor, query: &ParsedQuery<'_>) -> Option<Arguments> {
        let [param] = tool.parameters.as_slice() else {
            return None;
        };

        let place = extract_location(query.text).unwrap_or_else(|| colon_text(query.text));

        let mut args = Arguments::new();
        args.insert(param.name.clone(), json!(place));
        Some(args)
    }
}

/// A list of numbers: every number in the query, in order.
pub struct NumberList;

impl ArgumentResolver for NumberList {
    fn resolve(&self, tool: &ToolDescriptor, query: &ParsedQuery<'_>) -> Option<Arguments> {
        let [param] = tool.parameters.as_slice() else {
            return None;
        };
        if query.numbers.is_empty() {
            return None;
        }

        let mut args = Arguments::new();
        args.insert(param.name.clone(), json!(query.numbers));
        Some(args)
    }
}

/// Always defers to manual fill-in.
pub struct Manual;

impl ArgumentResolver for Manual {
    fn resolve(&self, _tool: &ToolDescriptor, _query: &ParsedQuery<'_>) -> Option<Arguments> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::ParameterSpec;

    fn tool(params: &[(&str, ParameterKind)]) -> ToolDescriptor {
        ToolDescriptor::new(
            "t",
            "",
            params
                .iter()
                .map(|(n, k)| ParameterSpec::required(*n, *k))
                .collect(),
        )
    }

    #[test]
    fn test_binary_needs_two_numbers() {
        let t = tool(&[("a", ParameterKind::Integer), ("b", ParameterKind::Integer)]);
        let args = BinaryNumeric.resolve(&t, &ParsedQuery::new("7 times 6")).unwrap();
        assert_eq!(args["a"], json!(7));
        assert_eq!(args["b"], json!(6));
        assert!(BinaryNumeric.resolve(&t, &ParsedQuery::new("just 7")).is_none());
    }

    #[test]
    fn test_binary_float_params_keep_floats() {
        let t = tool(&[("a", ParameterKind::Number), ("b", ParameterKind::Number)]);
        let args = BinaryNumeric.resolve(&t, &ParsedQuery::new("divide 1 by 4")).unwrap();
        assert_eq!(args["a"], json!(1.0));
        assert_eq!(args["b"], json!(4.0));
    }

    #[test]
    fn test_single_number_truncates_integers() {
        let int_tool = tool(&[("n", ParameterKind::Integer)]);
        let args = SingleNumber.resolve(&int_tool, &ParsedQuery::new("5.9 factorial")).unwrap();
        assert_eq!(args["n"], json!(5));

        let float_tool = tool(&[("x", ParameterKind::Number)]);
        let args = SingleNumber.resolve(&float_tool, &ParsedQuery::new("root of 2")).unwrap();
        assert_eq!(args["x"], json!(2.0));

        assert!(SingleNumber.resolve(&float_tool, &ParsedQuery::new("root")).is_none());
    }

    #[test]
    fn test_out_of_range_integers_stay_floats() {
        let range = tool(&[("low", ParameterKind::Integer), ("high", ParameterKind::Integer)]);
        let args = BoundedRange::default()
            .resolve(&range, &ParsedQuery::new("between 1 and 99999999999999999999"))
            .unwrap();
        assert_eq!(args["low"], json!(1));
        assert!(args["high"].as_i64().is_none());
        assert_eq!(args["high"].as_f64(), Some(1e20));
    }

    #[test]
    fn test_bounded_range_defaults() {
        let t = tool(&[("low", ParameterKind::Integer), ("high", ParameterKind::Integer)]);
        let args = BoundedRange::default().resolve(&t, &ParsedQuery::new("random number")).unwrap();
        assert_eq!(args["low"], json!(1));
        assert_eq!(args["high"], json!(100));

        let args = BoundedRange::default()
            .resolve(&t, &ParsedQuery::new("between 5 and 10.7"))
            .unwrap();
        assert_eq!(args["low"], json!(5));
        assert_eq!(args["high"], json!(10));

        // A single number is not enough for a range
        let args = BoundedRange::default().resolve(&t, &ParsedQuery::new("up to 6")).unwrap();
        assert_eq!(args["high"], json!(100));
    }

    #[test]
    fn test_number_list() {
        let t = tool(&[("nums", ParameterKind::ListOfNumber)]);
        let args = NumberList.resolve(&t, &ParsedQuery::new("mean of 1, 2 and 4.5")).unwrap();
        assert_eq!(args["nums"], json!([1.0, 2.0, 4.5]));
        assert!(NumberList.resolve(&t, &ParsedQuery::new("mean of nothing")).is_none());
    }

    #[test]
    fn test_shape_mismatch_gives_up() {
        let t = tool(&[("text", ParameterKind::String), ("other", ParameterKind::String)]);
        assert!(FreeText.resolve(&t, &ParsedQuery::new("x")).is_none());
        assert!(BinaryNumeric.resolve(&tool(&[]), &ParsedQuery::new("1 2")).is_none());
    }
}
