// src/core/parameters.rs

//! Typed tool parameters.
//!
//! A [`Parameter`] couples a [`ParameterType`] (the closed set of supported kinds, each
//! carrying its own constraints) with an optional current [`Value`]. Every mutation goes
//! through validation, so a parameter never holds a value that violates its declaration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised when a value does not satisfy its parameter's declaration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The value is of a different kind than the parameter declares.
    #[error("expected a {expected} value, got a {found} value")]
    TypeMismatch {
        /// The kind the parameter declares.
        expected: &'static str,
        /// The kind that was supplied.
        found: &'static str,
    },
    /// A raw string could not be parsed into the declared kind.
    #[error("'{value}' is not a valid {expected}")]
    Unparsable {
        /// The raw input.
        value: String,
        /// The kind it was parsed as.
        expected: &'static str,
    },
    /// A numeric value is smaller than the declared minimum.
    #[error("{value} is below the minimum of {min}")]
    BelowMinimum {
        /// The offending value.
        value: String,
        /// The inclusive lower bound.
        min: String,
    },
    /// A numeric value is larger than the declared maximum.
    #[error("{value} is above the maximum of {max}")]
    AboveMaximum {
        /// The offending value.
        value: String,
        /// The inclusive upper bound.
        max: String,
    },
    /// A choice value is not part of the declared choice set.
    #[error("'{value}' is not one of the allowed choices ({choices})")]
    NotAChoice {
        /// The offending value.
        value: String,
        /// The allowed choices, comma separated.
        choices: String,
    },
    /// A path does not end with one of the declared extensions.
    #[error("'{path}' does not have an allowed extension ({extensions})")]
    BadExtension {
        /// The offending path.
        path: String,
        /// The allowed extensions, comma separated.
        extensions: String,
    },
    /// Several raw values were supplied for a single-valued parameter.
    #[error("a single value is expected but {count} were given")]
    TooManyValues {
        /// How many values were supplied.
        count: usize,
    },
    /// A value store or mapping refers to a key that does not exist in the tree.
    #[error("no parameter with key '{key}'")]
    UnknownKey {
        /// The unresolved key.
        key: String,
    },
    /// Wraps another validation error with the key of the parameter it happened on.
    #[error("parameter '{key}': {source}")]
    Parameter {
        /// The key of the parameter.
        key: String,
        /// The underlying violation.
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Attaches the parameter key to this error.
    pub fn for_key(self, key: &str) -> Self {
        Self::Parameter {
            key: key.to_string(),
            source: Box::new(self),
        }
    }
}

/// A concrete parameter value.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Value {
    /// Free text.
    Str(String),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A boolean switch.
    Bool(bool),
    /// A file system path.
    Path(PathBuf),
    /// One entry of a choice set.
    Choice(String),
    /// An ordered list of values of the same kind.
    List(Vec<Value>),
}

impl Value {
    /// A short name of the value's kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::Path(_) => "path",
            Self::Choice(_) => "choice",
            Self::List(_) => "list",
        }
    }

    /// Whether the value carries no usable content (empty text, empty path or empty list).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Str(s) | Self::Choice(s) => s.is_empty(),
            Self::Path(p) => p.as_os_str().is_empty(),
            Self::List(items) => items.iter().all(Value::is_empty),
            Self::Int(_) | Self::Float(_) | Self::Bool(_) => false,
        }
    }

    /// Renders the value as command-line tokens. Lists yield one token per non-empty entry.
    pub fn to_tokens(&self) -> Vec<String> {
        match self {
            Self::List(items) => items.iter().flat_map(Value::to_tokens).collect(),
            other if other.is_empty() => Vec::new(),
            other => vec![other.to_string()],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) | Self::Choice(s) => write!(f, "{s}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// The declared kind of a parameter together with its constraints.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ParameterType {
    /// Free text.
    String,
    /// An integer with optional inclusive bounds.
    Int {
        /// Lower bound.
        min: Option<i64>,
        /// Upper bound.
        max: Option<i64>,
    },
    /// A float with optional inclusive bounds.
    Float {
        /// Lower bound.
        min: Option<f64>,
        /// Upper bound.
        max: Option<f64>,
    },
    /// A boolean switch.
    Bool,
    /// A file path, optionally restricted to a set of extensions (without the dot).
    Path {
        /// Allowed extensions; empty means any.
        extensions: Vec<String>,
    },
    /// One value out of a fixed set.
    Choice {
        /// The allowed values.
        choices: Vec<String>,
    },
    /// A list whose entries follow the element type.
    List(Box<ParameterType>),
}

impl ParameterType {
    /// A short name of the kind, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int { .. } => "int",
            Self::Float { .. } => "float",
            Self::Bool => "bool",
            Self::Path { .. } => "path",
            Self::Choice { .. } => "choice",
            Self::List(_) => "list",
        }
    }

    /// Whether the parameter holds several values.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Checks that `value` is of this kind and satisfies its constraints.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        match (self, value) {
            (Self::String, Value::Str(_)) | (Self::Bool, Value::Bool(_)) => Ok(()),
            (Self::Int { min, max }, Value::Int(v)) => check_bounds(*v, *min, *max),
            (Self::Float { min, max }, Value::Float(v)) => {
                if v.is_nan() {
                    return Err(ValidationError::Unparsable {
                        value: v.to_string(),
                        expected: "float",
                    });
                }
                check_bounds(*v, *min, *max)
            }
            (Self::Path { extensions }, Value::Path(p)) => check_extension(p, extensions),
            (Self::Choice { choices }, Value::Choice(c)) => {
                if choices.iter().any(|allowed| allowed == c) {
                    Ok(())
                } else {
                    Err(ValidationError::NotAChoice {
                        value: c.clone(),
                        choices: choices.join(", "),
                    })
                }
            }
            (Self::List(element), Value::List(items)) => {
                items.iter().try_for_each(|item| element.validate(item))
            }
            (expected, found) => Err(ValidationError::TypeMismatch {
                expected: expected.name(),
                found: found.kind_name(),
            }),
        }
    }

    /// Parses a single raw string into a value of this kind and validates it.
    /// For list types the string is parsed as one element wrapped in a list.
    pub fn parse(&self, raw: &str) -> Result<Value, ValidationError> {
        let value = match self {
            Self::String => Value::Str(raw.to_string()),
            Self::Int { .. } => Value::Int(raw.trim().parse().map_err(|_| {
                ValidationError::Unparsable {
                    value: raw.to_string(),
                    expected: "int",
                }
            })?),
            Self::Float { .. } => Value::Float(raw.trim().parse().map_err(|_| {
                ValidationError::Unparsable {
                    value: raw.to_string(),
                    expected: "float",
                }
            })?),
            Self::Bool => Value::Bool(parse_bool(raw)?),
            Self::Path { .. } => Value::Path(PathBuf::from(raw)),
            Self::Choice { .. } => Value::Choice(raw.to_string()),
            Self::List(element) => Value::List(vec![element.parse(raw)?]),
        };
        self.validate(&value)?;
        Ok(value)
    }

    /// Parses a sequence of raw strings. Lists accept any number of entries, every other
    /// kind accepts at most one. An empty sequence yields `None`.
    pub fn parse_all(&self, raw: &[String]) -> Result<Option<Value>, ValidationError> {
        match self {
            Self::List(element) => {
                if raw.is_empty() {
                    return Ok(None);
                }
                let items = raw
                    .iter()
                    .map(|r| element.parse(r))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Some(Value::List(items)))
            }
            single => match raw {
                [] => Ok(None),
                [one] => single.parse(one).map(Some),
                many => Err(ValidationError::TooManyValues { count: many.len() }),
            },
        }
    }
}

fn check_bounds<T: PartialOrd + fmt::Display>(
    value: T,
    min: Option<T>,
    max: Option<T>,
) -> Result<(), ValidationError> {
    if let Some(min) = min
        && value < min
    {
        return Err(ValidationError::BelowMinimum {
            value: value.to_string(),
            min: min.to_string(),
        });
    }
    if let Some(max) = max
        && value > max
    {
        return Err(ValidationError::AboveMaximum {
            value: value.to_string(),
            max: max.to_string(),
        });
    }
    Ok(())
}

fn check_extension(path: &std::path::Path, extensions: &[String]) -> Result<(), ValidationError> {
    // An empty path is an unset value, not a violation.
    if extensions.is_empty() || path.as_os_str().is_empty() {
        return Ok(());
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let allowed = extensions.iter().any(|ext| {
        let ext = ext.trim_start_matches('.').to_lowercase();
        file_name.ends_with(&format!(".{ext}"))
    });
    if allowed {
        Ok(())
    } else {
        Err(ValidationError::BadExtension {
            path: path.display().to_string(),
            extensions: extensions.join(", "),
        })
    }
}

fn parse_bool(raw: &str) -> Result<bool, ValidationError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ValidationError::Unparsable {
            value: raw.to_string(),
            expected: "bool",
        }),
    }
}

/// A declared tool parameter and its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    ty: ParameterType,
    value: Option<Value>,
    default: Option<Value>,
    required: bool,
    advanced: bool,
    description: Option<String>,
}

impl Parameter {
    /// Creates an unset, optional, basic parameter of the given type.
    pub fn new(ty: ParameterType) -> Self {
        Self {
            ty,
            value: None,
            default: None,
            required: false,
            advanced: false,
            description: None,
        }
    }

    /// Declares a default. The default is validated and becomes the current value.
    pub fn with_default(mut self, default: Value) -> Result<Self, ValidationError> {
        self.ty.validate(&default)?;
        self.value = Some(default.clone());
        self.default = Some(default);
        Ok(self)
    }

    /// Marks the parameter as required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Marks the parameter as advanced (hidden from the basic view).
    pub fn advanced(mut self, advanced: bool) -> Self {
        self.advanced = advanced;
        self
    }

    /// Attaches a human readable description.
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The declared type.
    pub fn ty(&self) -> &ParameterType {
        &self.ty
    }

    /// The current value, if any.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The declared default, if any.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Whether a value must be supplied.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Whether the parameter is hidden from the basic view.
    pub fn is_advanced(&self) -> bool {
        self.advanced
    }

    /// The description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Whether the parameter holds a usable value. Empty strings and lists count as unset.
    pub fn is_set(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !v.is_empty())
    }

    /// Replaces the current value after validating it.
    pub fn set_value(&mut self, value: Value) -> Result<(), ValidationError> {
        self.ty.validate(&value)?;
        self.value = Some(value);
        Ok(())
    }

    /// Parses raw strings (as supplied by a dialog or the command line) and stores the result.
    /// An empty slice clears the value.
    pub fn set_from_strings(&mut self, raw: &[String]) -> Result<(), ValidationError> {
        self.value = self.ty.parse_all(raw)?;
        Ok(())
    }

    /// Removes the current value.
    pub fn clear(&mut self) {
        self.value = None;
    }

    /// Restores the declared default (or unsets the value when there is none).
    pub fn reset(&mut self) {
        self.value = self.default.clone();
    }

    /// Re-checks the current value against the declaration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.value {
            Some(v) => self.ty.validate(v),
            None => Ok(()),
        }
    }
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_seeds_current_value() {
        let p = Parameter::new(ParameterType::Int {
            min: Some(0),
            max: Some(10),
        })
        .with_default(Value::Int(3))
        .unwrap();
        assert_eq!(p.value(), Some(&Value::Int(3)));
        assert_eq!(p.default_value(), Some(&Value::Int(3)));
        assert!(p.is_set());
    }

    #[test]
    fn test_invalid_default_is_rejected() {
        let result = Parameter::new(ParameterType::Int {
            min: Some(0),
            max: Some(10),
        })
        .with_default(Value::Int(11));
        assert!(matches!(
            result,
            Err(ValidationError::AboveMaximum { .. })
        ));
    }

    #[test]
    fn test_set_value_type_mismatch() {
        let mut p = Parameter::new(ParameterType::Bool);
        let err = p.set_value(Value::Str("yes".into())).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TypeMismatch {
                expected: "bool",
                found: "string"
            }
        );
        assert!(p.value().is_none());
    }

    #[test]
    fn test_choice_outside_set_is_rejected() {
        let ty = ParameterType::Choice {
            choices: strings(&["blastn", "blastp"]),
        };
        assert!(ty.parse("blastp").is_ok());
        let err = ty.parse("tblastx").unwrap_err();
        assert!(err.to_string().contains("blastn, blastp"));
    }

    #[test]
    fn test_float_bounds_and_parse_errors() {
        let ty = ParameterType::Float {
            min: Some(0.0),
            max: Some(1.0),
        };
        assert_eq!(ty.parse("0.5").unwrap(), Value::Float(0.5));
        assert!(matches!(
            ty.parse("-0.1"),
            Err(ValidationError::BelowMinimum { .. })
        ));
        assert!(matches!(
            ty.parse("abc"),
            Err(ValidationError::Unparsable { .. })
        ));
    }

    #[test]
    fn test_path_extension_restriction() {
        let ty = ParameterType::Path {
            extensions: strings(&["fa", ".fasta"]),
        };
        assert!(ty.parse("db.fa").is_ok());
        assert!(ty.parse("dir/DB.FASTA").is_ok());
        assert!(matches!(
            ty.parse("db.txt"),
            Err(ValidationError::BadExtension { .. })
        ));
    }

    #[test]
    fn test_bool_parsing() {
        assert_eq!(ParameterType::Bool.parse("Yes").unwrap(), Value::Bool(true));
        assert_eq!(ParameterType::Bool.parse("0").unwrap(), Value::Bool(false));
        assert!(ParameterType::Bool.parse("maybe").is_err());
    }

    #[test]
    fn test_list_parsing_preserves_order() {
        let mut p = Parameter::new(ParameterType::List(Box::new(ParameterType::Path {
            extensions: Vec::new(),
        })));
        p.set_from_strings(&strings(&["b.txt", "a.txt", "c.txt"]))
            .unwrap();
        assert_eq!(
            p.value().unwrap().to_tokens(),
            strings(&["b.txt", "a.txt", "c.txt"])
        );
    }

    #[test]
    fn test_list_element_validation() {
        let ty = ParameterType::List(Box::new(ParameterType::Int {
            min: None,
            max: Some(5),
        }));
        assert!(ty.parse_all(&strings(&["1", "9"])).is_err());
    }

    #[test]
    fn test_single_value_rejects_many() {
        let mut p = Parameter::new(ParameterType::String);
        let err = p.set_from_strings(&strings(&["a", "b"])).unwrap_err();
        assert_eq!(err, ValidationError::TooManyValues { count: 2 });
    }

    #[test]
    fn test_empty_string_counts_as_unset() {
        let mut p = Parameter::new(ParameterType::String);
        p.set_value(Value::Str(String::new())).unwrap();
        assert!(!p.is_set());
        assert!(p.value().unwrap().to_tokens().is_empty());
    }

    #[test]
    fn test_reset_and_clear() {
        let mut p = Parameter::new(ParameterType::String)
            .with_default(Value::Str("x".into()))
            .unwrap();
        p.set_value(Value::Str("y".into())).unwrap();
        p.clear();
        assert!(p.value().is_none());
        p.reset();
        assert_eq!(p.value(), Some(&Value::Str("x".into())));
    }

    #[test]
    fn test_error_with_key_context() {
        let err = ValidationError::TooManyValues { count: 3 }.for_key("tool.x");
        assert_eq!(
            err.to_string(),
            "parameter 'tool.x': a single value is expected but 3 were given"
        );
    }
}
