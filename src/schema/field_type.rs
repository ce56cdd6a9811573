// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Field types, their resolution from rules, and the checks they apply to
//! values.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use regex::Regex;
use serde_yaml::{Mapping, Number, Value};

use super::{as_number, render, RecordType, SchemaBuilder};
use crate::rules::paths::key_string;
use crate::Error;

/// Types that can be parametrized with a list of `opts`.
const GENERICS: [&str; 7] = ["List", "Set", "Tuple", "Dict", "Optional", "Union", "Literal"];

/// Types that take keyword constraints from a mapping of `opts`.
const FACTORIES: [&str; 4] = ["conint", "confloat", "constr", "conlist"];

/// Numeric constraints.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bounds {
    pub gt: Option<f64>,
    pub ge: Option<f64>,
    pub lt: Option<f64>,
    pub le: Option<f64>,
    pub multiple_of: Option<f64>,
}

impl Bounds {
    fn check(&self, n: f64) -> Result<(), String> {
        if n.is_nan() && *self != Self::default() {
            return Err("ensure this value is a number".to_string());
        }
        if let Some(gt) = self.gt.filter(|gt| n <= *gt) {
            return Err(format!("ensure this value is greater than {gt}"));
        }
        if let Some(ge) = self.ge.filter(|ge| n < *ge) {
            return Err(format!("ensure this value is greater than or equal to {ge}"));
        }
        if let Some(lt) = self.lt.filter(|lt| n >= *lt) {
            return Err(format!("ensure this value is less than {lt}"));
        }
        if let Some(le) = self.le.filter(|le| n > *le) {
            return Err(format!("ensure this value is less than or equal to {le}"));
        }
        if let Some(m) = self.multiple_of.filter(|m| n % m != 0.0) {
            return Err(format!("ensure this value is a multiple of {m}"));
        }
        Ok(())
    }

    fn is_empty_range(&self) -> bool {
        match (self.gt.or(self.ge), self.lt.or(self.le)) {
            (Some(lower), Some(upper)) => lower >= upper,
            _ => false,
        }
    }
}

/// A compiled `constr` pattern.  Two patterns are equal if their sources are.
#[derive(Clone, Debug)]
pub struct Pattern(Regex);

impl Pattern {
    /// Returns the source of the pattern.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// The type of a record field.
///
/// Non-strict scalar types coerce compatible values, e.g. `int` accepts
/// `"5"` and `5.0`, and `float` accepts `5`.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldType {
    Any,
    Bool {
        strict: bool,
    },
    Int {
        strict: bool,
        bounds: Bounds,
    },
    Float {
        strict: bool,
        bounds: Bounds,
    },
    Str {
        strict: bool,
        min_length: Option<usize>,
        max_length: Option<usize>,
        pattern: Option<Pattern>,
    },
    /// Any path, not checked against the filesystem.
    Path,
    /// Path to an existing file.
    FilePath,
    /// Path to an existing directory.
    DirectoryPath,
    /// Path to an existing file, relative to the given config directory.
    ConfFilePath(Option<PathBuf>),
    /// A `YYYY-MM-DD` date.
    Date,
    /// One of the given values.
    Literal(Vec<Value>),
    List {
        item: Box<FieldType>,
        min_items: Option<usize>,
        max_items: Option<usize>,
    },
    /// A list without duplicates.
    Set(Box<FieldType>),
    Tuple(Vec<FieldType>),
    Dict(Box<FieldType>, Box<FieldType>),
    Optional(Box<FieldType>),
    Union(Vec<FieldType>),
    /// A nested record.
    Record(Arc<RecordType>),
}

impl FieldType {
    /// Returns a lax `int` type without bounds.
    pub fn int() -> Self {
        FieldType::Int {
            strict: false,
            bounds: Bounds::default(),
        }
    }

    /// Returns a lax `float` type without bounds.
    pub fn float() -> Self {
        FieldType::Float {
            strict: false,
            bounds: Bounds::default(),
        }
    }

    /// Returns a lax `str` type without constraints.
    pub fn str() -> Self {
        FieldType::Str {
            strict: false,
            min_length: None,
            max_length: None,
            pattern: None,
        }
    }

    /// Returns a list type with the given item type.
    pub fn list(item: FieldType) -> Self {
        FieldType::List {
            item: Box::new(item),
            min_items: None,
            max_items: None,
        }
    }

    /// Checks the value against the type.
    ///
    /// Returns the value, converted where the type coerces, or the reason
    /// why the value was rejected.
    pub fn check(&self, value: &Value) -> Result<Value, String> {
        match self {
            FieldType::Any => Ok(value.clone()),
            FieldType::Bool { strict } => check_bool(value, *strict).map(Value::Bool),
            FieldType::Int { strict, bounds } => {
                let n = check_int(value, *strict)?;
                bounds.check(n as f64)?;
                Ok(Value::Number(n.into()))
            }
            FieldType::Float { strict, bounds } => {
                let n = check_float(value, *strict)?;
                bounds.check(n)?;
                Ok(Value::Number(Number::from(n)))
            }
            FieldType::Str {
                strict,
                min_length,
                max_length,
                pattern,
            } => {
                let s = check_str(value, *strict)?;
                let len = s.chars().count();
                if let Some(min) = min_length.filter(|min| len < *min) {
                    return Err(format!("ensure this value has at least {min} characters"));
                }
                if let Some(max) = max_length.filter(|max| len > *max) {
                    return Err(format!("ensure this value has at most {max} characters"));
                }
                if let Some(pattern) = pattern {
                    if !pattern.0.find(&s).is_some_and(|m| m.start() == 0) {
                        return Err(format!(
                            "string does not match regex \"{}\"",
                            pattern.as_str()
                        ));
                    }
                }
                Ok(Value::String(s))
            }
            FieldType::Path => check_str(value, true).map(Value::String),
            FieldType::FilePath => {
                let s = check_str(value, true)?;
                if !std::path::Path::new(&s).is_file() {
                    return Err(format!("file \"{s}\" does not exist"));
                }
                Ok(Value::String(s))
            }
            FieldType::DirectoryPath => {
                let s = check_str(value, true)?;
                if !std::path::Path::new(&s).is_dir() {
                    return Err(format!("directory \"{s}\" does not exist"));
                }
                Ok(Value::String(s))
            }
            FieldType::ConfFilePath(confdir) => {
                let s = check_str(value, true)?;
                let path = match confdir {
                    Some(dir) => dir.join(&s),
                    None => PathBuf::from(&s),
                };
                if !path.exists() {
                    return Err(format!(
                        "file or directory at path \"{}\" does not exist",
                        path.display()
                    ));
                }
                if !path.is_file() {
                    return Err(format!(
                        "path \"{}\" does not point to a file",
                        path.display()
                    ));
                }
                Ok(Value::String(s))
            }
            FieldType::Date => {
                let s = check_str(value, true)?;
                NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map(|d| Value::String(d.to_string()))
                    .map_err(|_| "invalid date format, expected YYYY-MM-DD".to_string())
            }
            FieldType::Literal(options) => {
                if options.contains(value) {
                    Ok(value.clone())
                } else {
                    Err(format!(
                        "unexpected value; permitted: {}",
                        options.iter().map(render).collect::<Vec<_>>().join(", ")
                    ))
                }
            }
            FieldType::List {
                item,
                min_items,
                max_items,
            } => {
                let items = check_items(value, item)?;
                if let Some(min) = min_items.filter(|min| items.len() < *min) {
                    return Err(format!("ensure this value has at least {min} items"));
                }
                if let Some(max) = max_items.filter(|max| items.len() > *max) {
                    return Err(format!("ensure this value has at most {max} items"));
                }
                Ok(Value::Sequence(items))
            }
            FieldType::Set(item) => {
                let mut unique = vec![];
                for v in check_items(value, item)? {
                    if !unique.contains(&v) {
                        unique.push(v);
                    }
                }
                Ok(Value::Sequence(unique))
            }
            FieldType::Tuple(types) => {
                let Value::Sequence(items) = value else {
                    return Err("value is not a valid tuple".to_string());
                };
                if items.len() != types.len() {
                    return Err(format!(
                        "wrong tuple length {}, expected {}",
                        items.len(),
                        types.len()
                    ));
                }
                items
                    .iter()
                    .zip(types)
                    .enumerate()
                    .map(|(i, (v, ty))| ty.check(v).map_err(|e| format!("item {i}: {e}")))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Sequence)
            }
            FieldType::Dict(key_type, value_type) => {
                let Value::Mapping(mapping) = value else {
                    return Err("value is not a valid dict".to_string());
                };
                let mut checked = Mapping::new();
                for (k, v) in mapping {
                    let name = key_string(k);
                    let k = key_type
                        .check(k)
                        .map_err(|e| format!("key {name}: {e}"))?;
                    let v = value_type.check(v).map_err(|e| format!("{name}: {e}"))?;
                    checked.insert(k, v);
                }
                Ok(Value::Mapping(checked))
            }
            FieldType::Optional(inner) => {
                if value.is_null() {
                    Ok(Value::Null)
                } else {
                    inner.check(value)
                }
            }
            FieldType::Union(types) => {
                let mut reasons = vec![];
                for ty in types {
                    match ty.check(value) {
                        Ok(v) => return Ok(v),
                        Err(e) => reasons.push(format!("{ty}: {e}")),
                    }
                }
                Err(format!("no matching type ({})", reasons.join("; ")))
            }
            FieldType::Record(record_type) => {
                let Value::Mapping(mapping) = value else {
                    return Err(format!("{} expects a mapping", record_type.name()));
                };
                record_type
                    .validate(mapping)
                    .map(Value::Mapping)
                    .map_err(|e| e.desc().to_string())
            }
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let join = |types: &[FieldType]| {
            types
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            FieldType::Any => write!(f, "Any"),
            FieldType::Bool { .. } => write!(f, "bool"),
            FieldType::Int { .. } => write!(f, "int"),
            FieldType::Float { .. } => write!(f, "float"),
            FieldType::Str { .. } => write!(f, "str"),
            FieldType::Path => write!(f, "Path"),
            FieldType::FilePath => write!(f, "FilePath"),
            FieldType::DirectoryPath => write!(f, "DirectoryPath"),
            FieldType::ConfFilePath(_) => write!(f, "ConfFilePath"),
            FieldType::Date => write!(f, "date"),
            FieldType::Literal(options) => write!(
                f,
                "Literal[{}]",
                options.iter().map(render).collect::<Vec<_>>().join(", ")
            ),
            FieldType::List { item, .. } => write!(f, "List[{item}]"),
            FieldType::Set(item) => write!(f, "Set[{item}]"),
            FieldType::Tuple(types) => write!(f, "Tuple[{}]", join(types)),
            FieldType::Dict(k, v) => write!(f, "Dict[{k}, {v}]"),
            FieldType::Optional(inner) => write!(f, "Optional[{inner}]"),
            FieldType::Union(types) => write!(f, "Union[{}]", join(types)),
            FieldType::Record(record_type) => write!(f, "{}", record_type.name()),
        }
    }
}

fn check_bool(value: &Value, strict: bool) -> Result<bool, String> {
    let err = || "value could not be parsed to a boolean".to_string();
    match value {
        Value::Bool(b) => Ok(*b),
        _ if strict => Err("value is not a valid boolean".to_string()),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(err()),
        },
        Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(err()),
        },
        _ => Err(err()),
    }
}

fn check_int(value: &Value, strict: bool) -> Result<i64, String> {
    let err = || "value is not a valid integer".to_string();
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => n.as_i64().ok_or_else(err),
        _ if strict => Err(err()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
            _ => Err(err()),
        },
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| err()),
        _ => Err(err()),
    }
}

fn check_float(value: &Value, strict: bool) -> Result<f64, String> {
    let err = || "value is not a valid float".to_string();
    match value {
        Value::Number(n) if strict && !n.is_f64() => Err(err()),
        Value::Number(_) => as_number(value).ok_or_else(err),
        _ if strict => Err(err()),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| err()),
        _ => Err(err()),
    }
}

fn check_str(value: &Value, strict: bool) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) if !strict => Ok(n.to_string()),
        _ => Err("str type expected".to_string()),
    }
}

fn check_items(value: &Value, item: &FieldType) -> Result<Vec<Value>, String> {
    let Value::Sequence(items) = value else {
        return Err("value is not a valid list".to_string());
    };
    items
        .iter()
        .enumerate()
        .map(|(i, v)| item.check(v).map_err(|e| format!("item {i}: {e}")))
        .collect()
}

/// Null, false, zero and empty `opts` are ignored.
fn is_empty_opts(opts: &Value) -> bool {
    match opts {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Sequence(s) => s.is_empty(),
        Value::Mapping(m) => m.is_empty(),
        Value::Tagged(_) => false,
    }
}

/// Type resolution.
impl SchemaBuilder {
    /// Resolves the type of a rule: `{type: <name>, opts: <options>}`.
    ///
    /// A list of `opts` parametrizes generic types (`List`, `Dict`,
    /// `Literal`, ...), and a mapping of `opts` is passed as constraints to
    /// the constrained types (`conint`, `confloat`, `constr`, `conlist`).
    /// Options of any other shape are ignored with a warning.
    pub fn resolve_type(&mut self, rule: &Mapping) -> Result<FieldType, Error> {
        let name = match rule.get("type") {
            Some(Value::String(name)) => name.as_str(),
            Some(other) => {
                return Err(Error::invalid_rule(format!(
                    "Type must be a name, found {}",
                    render(other)
                )))
            }
            None => return Err(Error::invalid_rule("Rule has no type.")),
        };

        match rule.get("opts").filter(|o| !is_empty_opts(o)) {
            Some(Value::Sequence(items)) if GENERICS.contains(&name) => {
                self.parametrize(name, items)
            }
            Some(Value::Mapping(kwargs)) if FACTORIES.contains(&name) => {
                self.construct(name, kwargs)
            }
            Some(other) => {
                let ty = self.bare_type(name)?;
                self.warnings.push(format!(
                    "{name}: ambiguous option ignored: {}",
                    render(other)
                ));
                Ok(ty)
            }
            None => self.bare_type(name),
        }
    }

    fn bare_type(&mut self, name: &str) -> Result<FieldType, Error> {
        let bounded_int = |bounds| FieldType::Int {
            strict: false,
            bounds,
        };
        let bounded_float = |bounds| FieldType::Float {
            strict: false,
            bounds,
        };
        let positive = || Bounds {
            gt: Some(0.0),
            ..Default::default()
        };
        let negative = || Bounds {
            lt: Some(0.0),
            ..Default::default()
        };
        let non_negative = || Bounds {
            ge: Some(0.0),
            ..Default::default()
        };
        let non_positive = || Bounds {
            le: Some(0.0),
            ..Default::default()
        };

        let ty = match name {
            "Any" | "Union" => FieldType::Any,
            "bool" => FieldType::Bool { strict: false },
            "StrictBool" => FieldType::Bool { strict: true },
            "int" | "conint" => FieldType::int(),
            "StrictInt" => FieldType::Int {
                strict: true,
                bounds: Bounds::default(),
            },
            "PositiveInt" => bounded_int(positive()),
            "NegativeInt" => bounded_int(negative()),
            "NonNegativeInt" => bounded_int(non_negative()),
            "NonPositiveInt" => bounded_int(non_positive()),
            "float" | "confloat" => FieldType::float(),
            "StrictFloat" => FieldType::Float {
                strict: true,
                bounds: Bounds::default(),
            },
            "PositiveFloat" => bounded_float(positive()),
            "NegativeFloat" => bounded_float(negative()),
            "NonNegativeFloat" => bounded_float(non_negative()),
            "NonPositiveFloat" => bounded_float(non_positive()),
            "str" | "constr" => FieldType::str(),
            "StrictStr" => FieldType::Str {
                strict: true,
                min_length: None,
                max_length: None,
                pattern: None,
            },
            "Path" => FieldType::Path,
            "FilePath" => FieldType::FilePath,
            "DirectoryPath" => FieldType::DirectoryPath,
            "ConfFilePath" => {
                if self.config.confdir.is_none() {
                    self.warnings
                        .push("ConfFilePath: confdir not set, validation might fail");
                }
                FieldType::ConfFilePath(self.config.confdir.clone())
            }
            "date" => FieldType::Date,
            "List" | "Tuple" | "conlist" => FieldType::list(FieldType::Any),
            "Set" => FieldType::Set(Box::new(FieldType::Any)),
            "Dict" => FieldType::Dict(Box::new(FieldType::Any), Box::new(FieldType::Any)),
            "Optional" => FieldType::Optional(Box::new(FieldType::Any)),
            "Literal" => {
                return Err(Error::invalid_rule(
                    "Literal needs a list of permitted values in opts.",
                ))
            }
            _ => return Err(Error::unknown_type(format!("Unknown type: {name}"))),
        };
        Ok(ty)
    }

    fn parametrize(&mut self, name: &str, items: &[Value]) -> Result<FieldType, Error> {
        if name == "Literal" {
            return Ok(FieldType::Literal(items.to_vec()));
        }

        let mut params = items
            .iter()
            .map(|item| match item {
                Value::String(param) => self.bare_type(param),
                other => Err(Error::invalid_rule(format!(
                    "{name}: type parameters must be type names, found {}",
                    render(other)
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let arity = |expected: usize| {
            Error::invalid_rule(format!(
                "{name} takes {expected} type parameter(s), found {}",
                items.len()
            ))
        };
        let ty = match name {
            "List" | "Set" | "Optional" => {
                if params.len() != 1 {
                    return Err(arity(1));
                }
                let item = Box::new(params.remove(0));
                match name {
                    "List" => FieldType::List {
                        item,
                        min_items: None,
                        max_items: None,
                    },
                    "Set" => FieldType::Set(item),
                    _ => FieldType::Optional(item),
                }
            }
            "Dict" => {
                if params.len() != 2 {
                    return Err(arity(2));
                }
                let value_type = params.remove(1);
                FieldType::Dict(Box::new(params.remove(0)), Box::new(value_type))
            }
            "Tuple" => FieldType::Tuple(params),
            "Union" => FieldType::Union(params),
            _ => {
                return Err(Error::internal(format!(
                    "{name} is not a parametrizable type."
                )))
            }
        };
        Ok(ty)
    }

    fn construct(&mut self, name: &str, kwargs: &Mapping) -> Result<FieldType, Error> {
        let number = |key: &str, value: &Value| {
            as_number(value).ok_or_else(|| {
                Error::invalid_rule(format!(
                    "{name}: {key} must be a number, found {}",
                    render(value)
                ))
            })
        };
        let count = |key: &str, value: &Value| {
            value.as_u64().map(|n| n as usize).ok_or_else(|| {
                Error::invalid_rule(format!(
                    "{name}: {key} must be a non-negative integer, found {}",
                    render(value)
                ))
            })
        };
        let unexpected = |key: &str| {
            Error::invalid_rule(format!("{name}: unexpected keyword argument '{key}'"))
        };

        match name {
            "conint" | "confloat" => {
                let mut bounds = Bounds::default();
                for (k, v) in kwargs {
                    let key = key_string(k);
                    let slot = match key.as_str() {
                        "gt" => &mut bounds.gt,
                        "ge" => &mut bounds.ge,
                        "lt" => &mut bounds.lt,
                        "le" => &mut bounds.le,
                        "multiple_of" => &mut bounds.multiple_of,
                        _ => return Err(unexpected(&key)),
                    };
                    *slot = Some(number(&key, v)?);
                }
                if bounds.is_empty_range() {
                    self.warnings
                        .push(format!("{name}: no value satisfies the bounds {bounds:?}"));
                }
                Ok(if name == "conint" {
                    FieldType::Int {
                        strict: false,
                        bounds,
                    }
                } else {
                    FieldType::Float {
                        strict: false,
                        bounds,
                    }
                })
            }
            "constr" => {
                let (mut min_length, mut max_length, mut pattern) = (None, None, None);
                for (k, v) in kwargs {
                    let key = key_string(k);
                    match key.as_str() {
                        "min_length" => min_length = Some(count(&key, v)?),
                        "max_length" => max_length = Some(count(&key, v)?),
                        "regex" => {
                            let source = v.as_str().ok_or_else(|| {
                                Error::invalid_rule(format!("{name}: regex must be a string"))
                            })?;
                            let regex = Regex::new(source).map_err(|e| {
                                Error::invalid_rule(format!("{name}: invalid regex: {e}"))
                            })?;
                            pattern = Some(Pattern(regex));
                        }
                        _ => return Err(unexpected(&key)),
                    }
                }
                Ok(FieldType::Str {
                    strict: false,
                    min_length,
                    max_length,
                    pattern,
                })
            }
            "conlist" => {
                let (mut item, mut min_items, mut max_items) = (FieldType::Any, None, None);
                for (k, v) in kwargs {
                    let key = key_string(k);
                    match key.as_str() {
                        "item_type" => {
                            let param = v.as_str().ok_or_else(|| {
                                Error::invalid_rule(format!(
                                    "{name}: item_type must be a type name"
                                ))
                            })?;
                            item = self.bare_type(param)?;
                        }
                        "min_items" => min_items = Some(count(&key, v)?),
                        "max_items" => max_items = Some(count(&key, v)?),
                        _ => return Err(unexpected(&key)),
                    }
                }
                Ok(FieldType::List {
                    item: Box::new(item),
                    min_items,
                    max_items,
                })
            }
            _ => Err(Error::internal(format!("{name} is not a constrained type."))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mapping, yaml};
    use crate::{ErrorKind, SchemaConfig};

    #[test]
    fn test_parametrized_types() -> Result<(), Error> {
        let mut builder = SchemaBuilder::default();

        let ty = builder.resolve_type(&mapping("{type: Literal, opts: [foo, bar]}"))?;
        assert_eq!(ty, FieldType::Literal(vec![yaml("foo"), yaml("bar")]));

        let ty = builder.resolve_type(&mapping("{type: List, opts: [int]}"))?;
        assert_eq!(ty, FieldType::list(FieldType::int()));

        let ty = builder.resolve_type(&mapping("{type: Dict, opts: [str, bool]}"))?;
        assert_eq!(
            ty,
            FieldType::Dict(
                Box::new(FieldType::str()),
                Box::new(FieldType::Bool { strict: false })
            )
        );

        assert!(builder
            .resolve_type(&mapping("{type: Dict, opts: [str]}"))
            .is_err_and(|e| e
                == Error::invalid_rule("Dict takes 2 type parameter(s), found 1")));
        assert!(builder
            .resolve_type(&mapping("{type: List, opts: [integer]}"))
            .is_err_and(|e| e == Error::unknown_type("Unknown type: integer")));
        assert!(builder.warnings().is_empty());

        Ok(())
    }

    #[test]
    fn test_constrained_types() -> Result<(), Error> {
        let mut builder = SchemaBuilder::default();

        let ty = builder.resolve_type(&mapping("{type: conint, opts: {gt: 0, le: 10}}"))?;
        assert_eq!(
            ty,
            FieldType::Int {
                strict: false,
                bounds: Bounds {
                    gt: Some(0.0),
                    le: Some(10.0),
                    ..Default::default()
                }
            }
        );

        assert!(builder
            .resolve_type(&mapping("{type: confloat, opts: {gt: 0, max: 10}}"))
            .is_err_and(|e| e.kind() == ErrorKind::InvalidRule));

        builder.resolve_type(&mapping("{type: confloat, opts: {gt: 1, lt: 1}}"))?;
        assert!(builder.warnings().contains("no value satisfies the bounds"));

        let ty = builder.resolve_type(&mapping(
            "{type: conlist, opts: {item_type: PositiveInt, min_items: 2}}",
        ))?;
        assert!(ty.check(&yaml("[1, 2]")).is_ok());
        assert_eq!(
            ty.check(&yaml("[1]")),
            Err("ensure this value has at least 2 items".to_string())
        );
        assert_eq!(
            ty.check(&yaml("[1, -2]")),
            Err("item 1: ensure this value is greater than 0".to_string())
        );

        let ty = builder.resolve_type(&mapping(
            r#"{type: constr, opts: {regex: "^[a-z_]+$", max_length: 8}}"#,
        ))?;
        assert!(ty.check(&yaml("ccgt")).is_ok());
        assert!(ty.check(&yaml("CCGT")).is_err());
        assert!(ty.check(&yaml("combined_cycle")).is_err());

        Ok(())
    }

    #[test]
    fn test_bare_types() -> Result<(), Error> {
        let mut builder = SchemaBuilder::default();

        let ty = builder.resolve_type(&mapping("{type: PositiveInt}"))?;
        assert_eq!(
            ty,
            FieldType::Int {
                strict: false,
                bounds: Bounds {
                    gt: Some(0.0),
                    ..Default::default()
                }
            }
        );
        assert!(builder.warnings().is_empty());

        let ambiguous = builder.resolve_type(&mapping("{type: PositiveInt, opts: foo}"))?;
        assert_eq!(ambiguous, ty);
        assert!(builder.warnings().contains("ambiguous option ignored"));

        builder.resolve_type(&mapping("{type: int, opts: [1, 2]}"))?;
        assert_eq!(builder.warnings().len(), 2);

        assert!(builder
            .resolve_type(&mapping("{type: Decimal}"))
            .is_err_and(|e| e == Error::unknown_type("Unknown type: Decimal")));
        assert!(builder
            .resolve_type(&mapping("{type: Literal}"))
            .is_err_and(|e| e.kind() == ErrorKind::InvalidRule));
        assert!(builder
            .resolve_type(&mapping("{opts: [int]}"))
            .is_err_and(|e| e == Error::invalid_rule("Rule has no type.")));

        Ok(())
    }

    #[test]
    fn test_scalar_checks() {
        let positive = FieldType::Float {
            strict: false,
            bounds: Bounds {
                gt: Some(0.0),
                ..Default::default()
            },
        };
        assert_eq!(positive.check(&yaml("2")), Ok(Value::from(2.0)));
        assert_eq!(positive.check(&yaml("\"2.5\"")), Ok(Value::from(2.5)));
        assert_eq!(
            positive.check(&yaml("-1")),
            Err("ensure this value is greater than 0".to_string())
        );
        assert_eq!(
            positive.check(&yaml(".nan")),
            Err("ensure this value is a number".to_string())
        );

        let int = FieldType::int();
        assert_eq!(int.check(&yaml("\"5\"")), Ok(Value::from(5)));
        assert_eq!(int.check(&yaml("3.0")), Ok(Value::from(3)));
        assert!(int.check(&yaml("3.5")).is_err());
        let strict = FieldType::Int {
            strict: true,
            bounds: Bounds::default(),
        };
        assert!(strict.check(&yaml("\"5\"")).is_err());

        let multiple = FieldType::Int {
            strict: false,
            bounds: Bounds {
                multiple_of: Some(5.0),
                ..Default::default()
            },
        };
        assert!(multiple.check(&yaml("15")).is_ok());
        assert_eq!(
            multiple.check(&yaml("13")),
            Err("ensure this value is a multiple of 5".to_string())
        );

        let boolean = FieldType::Bool { strict: false };
        assert_eq!(boolean.check(&yaml("yes")), Ok(Value::Bool(true)));
        assert_eq!(boolean.check(&yaml("0")), Ok(Value::Bool(false)));
        assert!(boolean.check(&yaml("maybe")).is_err());
        assert!(FieldType::Bool { strict: true }.check(&yaml("\"true\"")).is_err());

        assert_eq!(FieldType::str().check(&yaml("42")), Ok(yaml("\"42\"")));
        assert!(FieldType::str().check(&yaml("[a]")).is_err());

        assert_eq!(
            FieldType::Date.check(&yaml("2005-01-01")),
            Ok(yaml("2005-01-01"))
        );
        assert!(FieldType::Date.check(&yaml("2005-13-01")).is_err());

        let literal = FieldType::Literal(vec![yaml("energy"), yaml("energy_per_cap")]);
        assert!(literal.check(&yaml("energy")).is_ok());
        assert_eq!(
            literal.check(&yaml("power")),
            Err("unexpected value; permitted: \"energy\", \"energy_per_cap\"".to_string())
        );
    }

    #[test]
    fn test_collection_checks() {
        let carriers = FieldType::Dict(
            Box::new(FieldType::str()),
            Box::new(FieldType::Bool { strict: true }),
        );
        assert!(carriers.check(&yaml("{electricity: true, heat: false}")).is_ok());
        assert_eq!(
            carriers.check(&yaml("{electricity: 1}")),
            Err("electricity: value is not a valid boolean".to_string())
        );

        let set = FieldType::Set(Box::new(FieldType::int()));
        assert_eq!(set.check(&yaml("[1, 2, 1, \"2\"]")), Ok(yaml("[1, 2]")));

        let tuple = FieldType::Tuple(vec![FieldType::str(), FieldType::float()]);
        assert!(tuple.check(&yaml("[lat, 51.5]")).is_ok());
        assert_eq!(
            tuple.check(&yaml("[lat]")),
            Err("wrong tuple length 1, expected 2".to_string())
        );

        let optional = FieldType::Optional(Box::new(FieldType::int()));
        assert_eq!(optional.check(&Value::Null), Ok(Value::Null));
        assert!(optional.check(&yaml("x")).is_err());

        let union = FieldType::Union(vec![FieldType::int(), FieldType::Path]);
        assert_eq!(union.check(&yaml("\"7\"")), Ok(Value::from(7)));
        assert_eq!(union.check(&yaml("file.csv")), Ok(yaml("file.csv")));
        assert!(union.check(&yaml("[]")).is_err());
    }

    #[test]
    fn test_conf_file_path() -> Result<(), Error> {
        let dir = tempfile::tempdir().map_err(|e| Error::io(e.to_string()))?;
        std::fs::write(dir.path().join("demand.csv"), "t,v\n")
            .map_err(|e| Error::io(e.to_string()))?;

        let mut builder = SchemaBuilder::new(SchemaConfig {
            confdir: Some(dir.path().to_path_buf()),
            ..Default::default()
        });
        let ty = builder.resolve_type(&mapping("{type: ConfFilePath}"))?;
        assert!(builder.warnings().is_empty());
        assert_eq!(ty.check(&yaml("demand.csv")), Ok(yaml("demand.csv")));
        assert!(ty
            .check(&yaml("supply.csv"))
            .is_err_and(|e| e.contains("does not exist")));
        assert!(ty.check(&yaml("\".\"")).is_err_and(|e| e.contains("not point to a file")));

        let mut builder = SchemaBuilder::default();
        builder.resolve_type(&mapping("{type: ConfFilePath}"))?;
        assert!(builder.warnings().contains("confdir not set"));

        Ok(())
    }
}
