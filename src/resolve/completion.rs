//! Resolved arguments and the "parameter needed" protocol.
//!
//! The resolver never prompts. It returns a [`ResolvedArgs`] whose
//! `next_missing` names the parameter the caller has to obtain; the caller
//! feeds the operator's text back through `supply` and repeats until
//! `is_complete`.

use crate::error::{AppError, Result};
use crate::ingestion::{ParameterKind, ParameterSpec, ToolDescriptor};
use crate::resolve::extract::parse_whole_number;
use crate::server::Arguments;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedArgs {
    tool: String,
    values: Arguments,
    /// Still-needed parameters, in schema order
    missing: Vec<ParameterSpec>,
    manual: bool,
}

impl ResolvedArgs {
    /// Pair a strategy's output with the tool schema.
    ///
    /// `None` means nothing could be extracted and every parameter has to be
    /// filled in manually.
    pub fn new(tool: &ToolDescriptor, extracted: Option<Arguments>) -> Self {
        let manual = extracted.is_none();
        let values = extracted.unwrap_or_default();
        let missing = tool
            .parameters
            .iter()
            .filter(|p| !values.contains_key(&p.name))
            .cloned()
            .collect();

        Self {
            tool: tool.name.clone(),
            values,
            missing,
            manual,
        }
    }

    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn values(&self) -> &Arguments {
        &self.values
    }

    pub fn missing(&self) -> &[ParameterSpec] {
        &self.missing
    }

    /// True when the resolver extracted nothing and every value came (or will
    /// come) from the operator.
    pub fn is_manual(&self) -> bool {
        self.manual
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// The next parameter the caller must supply, if any.
    pub fn next_missing(&self) -> Option<&ParameterSpec> {
        self.missing.first()
    }

    /// Fill a missing parameter from operator text.
    ///
    /// Empty input for an optional parameter leaves it unset. Anything else is
    /// coerced with [`coerce`] and stored, valid or not; the tool reports bad
    /// values at invocation.
    ///
    /// # Errors
    /// `InvalidArgument` if `name` is not awaiting a value.
    pub fn supply(&mut self, name: &str, raw: &str) -> Result<()> {
        let position = self
            .missing
            .iter()
            .position(|p| p.name == name)
            .ok_or_else(|| {
                AppError::InvalidArgument(format!(
                    "parameter '{}' of '{}' is not awaiting a value",
                    name, self.tool
                ))
            })?;
        let spec = self.missing.remove(position);

        if raw.trim().is_empty() && !spec.required {
            tracing::debug!(tool = %self.tool, param = %spec.name, "Optional parameter skipped");
            return Ok(());
        }

        self.values.insert(spec.name, coerce(spec.kind, raw));
        Ok(())
    }

    pub fn into_arguments(self) -> Arguments {
        self.values
    }
}

/// Convert operator text to a JSON value for a parameter of `kind`.
///
/// Text that is entirely a decimal number becomes a number whatever the
/// declared kind (integral values are JSON integers for integer parameters).
/// List parameters accept numbers separated by commas or whitespace.
/// Anything that does not parse keeps the raw text. Type mismatches are left
/// for the tool to reject.
pub fn coerce(kind: ParameterKind, raw: &str) -> Value {
    match kind {
        ParameterKind::ListOfNumber => match parse_number_list(raw) {
            Some(numbers) => json!(numbers),
            None => Value::String(raw.to_string()),
        },
        ParameterKind::Number | ParameterKind::Integer | ParameterKind::String => {
            match parse_whole_number(raw) {
                Some(n) => kind.number_value(n),
                None => Value::String(raw.to_string()),
            }
        }
    }
}

fn parse_number_list(raw: &str) -> Option<Vec<f64>> {
    let numbers = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(parse_whole_number)
        .collect::<Option<Vec<f64>>>()?;

    (!numbers.is_empty()).then_some(numbers)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_tool() -> ToolDescriptor {
        ToolDescriptor::new(
            "add",
            "Add two numbers",
            vec![
                ParameterSpec::required("a", ParameterKind::Integer),
                ParameterSpec::required("b", ParameterKind::Integer),
            ],
        )
    }

    #[test]
    fn test_manual_marks_everything_missing() {
        let args = ResolvedArgs::new(&add_tool(), None);
        assert!(args.is_manual());
        assert!(!args.is_complete());
        let names: Vec<&str> = args.missing().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_supply_in_schema_order() {
        let mut args = ResolvedArgs::new(&add_tool(), None);

        let first = args.next_missing().unwrap().name.clone();
        assert_eq!(first, "a");
        args.supply(&first, "3").unwrap();

        let second = args.next_missing().unwrap().name.clone();
        assert_eq!(second, "b");
        args.supply(&second, "-4").unwrap();

        assert!(args.is_complete());
        assert_eq!(args.into_arguments(), json!({"a": 3, "b": -4}).as_object().unwrap().clone());
    }

    #[test]
    fn test_supply_unknown_parameter_rejected() {
        let mut args = ResolvedArgs::new(&add_tool(), None);
        assert!(matches!(args.supply("c", "1"), Err(AppError::InvalidArgument(_))));
        // Supplying twice is rejected as well
        args.supply("a", "1").unwrap();
        assert!(args.supply("a", "2").is_err());
    }

    #[test]
    fn test_uncoercible_input_passes_through() {
        let mut args = ResolvedArgs::new(&add_tool(), None);
        args.supply("a", "three").unwrap();
        args.supply("b", "2.5").unwrap();
        assert_eq!(args.values()["a"], json!("three"));
        assert_eq!(args.values()["b"], json!(2.5));
    }

    #[test]
    fn test_optional_empty_input_skipped() {
        let tool = ToolDescriptor::new(
            "greet",
            "",
            vec![
                ParameterSpec::required("name", ParameterKind::String),
                ParameterSpec::optional("times", ParameterKind::Integer),
            ],
        );
        let mut args = ResolvedArgs::new(&tool, None);
        args.supply("name", "").unwrap();
        args.supply("times", "  ").unwrap();
        assert!(args.is_complete());
        assert_eq!(args.values().len(), 1);
        assert_eq!(args.values()["name"], json!(""));
    }

    #[test]
    fn test_coerce() {
        assert_eq!(coerce(ParameterKind::Number, " 7 "), json!(7.0));
        assert_eq!(coerce(ParameterKind::Integer, "7"), json!(7));
        assert_eq!(coerce(ParameterKind::Integer, "7.0"), json!(7));
        assert_eq!(coerce(ParameterKind::String, "42"), json!(42.0));
        assert_eq!(coerce(ParameterKind::String, " 4.5 "), json!(4.5));
        assert_eq!(coerce(ParameterKind::String, "stressed"), json!("stressed"));
        assert_eq!(coerce(ParameterKind::ListOfNumber, "1, 2 3.5"), json!([1.0, 2.0, 3.5]));
        assert_eq!(coerce(ParameterKind::ListOfNumber, "1, two"), json!("1, two"));
        assert_eq!(coerce(ParameterKind::ListOfNumber, ""), json!(""));
    }
}
