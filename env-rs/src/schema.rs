//! Option schema for the `input` section of a run document.
//!
//! Every option is declared once with its name, kind, requirement and usage
//! text. [`Schema::validate`] checks all of them in a single pass and returns
//! the complete list of problems rather than stopping at the first one.

use std::fmt;

use serde_json::{Map, Value};

/// Length constraint for array options.
#[derive(Debug, Clone, PartialEq)]
pub enum Arity {
    Fixed(usize),
    /// Length given by another (integer) option of the same schema.
    Option(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionKind {
    Int { min: i64 },
    Real,
    RealArray(Arity),
    String,
    Choice(&'static [&'static str]),
}

impl OptionKind {
    fn expected(&self) -> String {
        match self {
            OptionKind::Int { min } => format!("an integer >= {min}"),
            OptionKind::Real => "a number".to_string(),
            OptionKind::RealArray(Arity::Fixed(n)) => format!("an array of {n} numbers"),
            OptionKind::RealArray(Arity::Option(name)) => format!("an array of `{name}` numbers"),
            OptionKind::String => "a string".to_string(),
            OptionKind::Choice(choices) => format!("one of {}", choices.join(", ")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Requirement {
    Required,
    /// Absence is allowed and leaves the option unset.
    Optional,
    /// Absence is allowed and fills in the given value.
    Default(Value),
}

#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub name: &'static str,
    pub kind: OptionKind,
    pub requirement: Requirement,
    pub usage: &'static str,
}

impl OptionSpec {
    pub fn required(name: &'static str, kind: OptionKind, usage: &'static str) -> Self {
        Self {
            name,
            kind,
            requirement: Requirement::Required,
            usage,
        }
    }

    pub fn optional(name: &'static str, kind: OptionKind, usage: &'static str) -> Self {
        Self {
            name,
            kind,
            requirement: Requirement::Optional,
            usage,
        }
    }

    pub fn with_default(
        name: &'static str,
        kind: OptionKind,
        default: Value,
        usage: &'static str,
    ) -> Self {
        Self {
            name,
            kind,
            requirement: Requirement::Default(default),
            usage,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Problem {
    Missing,
    Malformed { expected: String },
    Arity { expected: usize, found: usize },
    UnknownChoice { found: String },
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::Missing => write!(f, "not specified"),
            Problem::Malformed { expected } => write!(f, "malformed, expected {expected}"),
            Problem::Arity { expected, found } => {
                write!(f, "expected {expected} values, found {found}")
            }
            Problem::UnknownChoice { found } => write!(f, "`{found}` not recognized"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("option `{option}` {problem}. Use {usage}")]
pub struct ConfigError {
    pub option: String,
    pub problem: Problem,
    pub usage: String,
}

/// All validation failures of one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigErrors(pub Vec<ConfigError>);

impl ConfigErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn mentions(&self, option: &str) -> bool {
        self.0.iter().any(|e| e.option == option)
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}

/// Result of a successful validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    /// Every declared option that is present or defaulted.
    pub options: Map<String, Value>,
    /// Options present in the input but not declared by the schema.
    pub unknown: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    options: Vec<OptionSpec>,
}

impl Schema {
    pub fn new(options: Vec<OptionSpec>) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    pub fn get(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.name == name)
    }

    pub fn validate(&self, input: &Map<String, Value>) -> Result<Validated, ConfigErrors> {
        let mut errors = Vec::new();
        let mut options = Map::new();

        // Arrays sized by another option are checked after the scalars resolve.
        let (deferred, immediate): (Vec<_>, Vec<_>) = self
            .options
            .iter()
            .partition(|o| matches!(o.kind, OptionKind::RealArray(Arity::Option(_))));

        for spec in immediate.into_iter().chain(deferred) {
            let value = match (input.get(spec.name), &spec.requirement) {
                (Some(value), _) => value.clone(),
                (None, Requirement::Required) => {
                    errors.push(error(spec, Problem::Missing));
                    continue;
                }
                (None, Requirement::Optional) => continue,
                (None, Requirement::Default(default)) => default.clone(),
            };
            match check(spec, &value, &options) {
                Ok(()) => {
                    options.insert(spec.name.to_string(), value);
                }
                Err(problem) => errors.push(error(spec, problem)),
            }
        }

        if !errors.is_empty() {
            return Err(ConfigErrors(errors));
        }

        let unknown = input
            .keys()
            .filter(|k| self.get(k).is_none())
            .cloned()
            .collect();
        Ok(Validated { options, unknown })
    }
}

fn error(spec: &OptionSpec, problem: Problem) -> ConfigError {
    ConfigError {
        option: spec.name.to_string(),
        problem,
        usage: spec.usage.to_string(),
    }
}

fn malformed(spec: &OptionSpec) -> Problem {
    Problem::Malformed {
        expected: spec.kind.expected(),
    }
}

fn check(spec: &OptionSpec, value: &Value, resolved: &Map<String, Value>) -> Result<(), Problem> {
    match &spec.kind {
        OptionKind::Int { min } => match value.as_i64() {
            Some(v) if v >= *min => Ok(()),
            _ => Err(malformed(spec)),
        },
        OptionKind::Real => value.as_f64().map(|_| ()).ok_or_else(|| malformed(spec)),
        OptionKind::String => value.as_str().map(|_| ()).ok_or_else(|| malformed(spec)),
        OptionKind::Choice(choices) => {
            let found = value.as_str().ok_or_else(|| malformed(spec))?;
            if choices.iter().any(|c| *c == found) {
                Ok(())
            } else {
                Err(Problem::UnknownChoice {
                    found: found.to_string(),
                })
            }
        }
        OptionKind::RealArray(arity) => {
            let values = value.as_array().ok_or_else(|| malformed(spec))?;
            if !values.iter().all(|v| v.as_f64().is_some()) {
                return Err(malformed(spec));
            }
            let expected = match arity {
                Arity::Fixed(n) => Some(*n),
                // An invalid referenced option has already been reported.
                Arity::Option(name) => resolved
                    .get(*name)
                    .and_then(Value::as_u64)
                    .map(|n| n as usize),
            };
            match expected {
                Some(expected) if expected != values.len() => Err(Problem::Arity {
                    expected,
                    found: values.len(),
                }),
                _ => Ok(()),
            }
        }
    }
}
