// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Record types, and the records instantiated from them.

use std::path::Path;
use std::sync::Arc;

use serde_yaml::{Mapping, Value};

use super::{render, BoundValidator, FieldType, ValidationContext, ValidatorScope};
use crate::rules::merge;
use crate::rules::paths::key_string;
use crate::Error;

/// Words that can't be used as field names.
const KEYWORDS: [&str; 51] = [
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "Self", "static", "struct", "super", "trait", "true", "try", "type",
    "typeof", "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// A field of a record type.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    name: String,
    ty: FieldType,
    default: Option<Value>,
    doc: Option<String>,
}

impl Field {
    /// Creates a mandatory field.
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            doc: None,
        }
    }

    /// Gives the field a default value.  Defaults are not type checked.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }
}

/// A named record type: an ordered list of typed fields, and the validators
/// that run when a record is instantiated.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordType {
    name: String,
    lineage: Vec<String>,
    fields: Vec<Field>,
    validators: Vec<BoundValidator>,
}

/// Creates a record type.
///
/// When a `base` is given, its fields come first, and its validators are
/// kept.  A field of the same name replaces the base field in its position,
/// and a validator with the same name, scope and parameters replaces the base
/// validator.  New validators are all kept, even when two of them are equal.
/// Mandatory fields are then moved before fields with defaults, keeping their
/// relative order.
pub fn synthesize(
    name: &str,
    fields: Vec<Field>,
    validators: Vec<BoundValidator>,
    base: Option<&RecordType>,
) -> Result<RecordType, Error> {
    let mut seen: Vec<&str> = vec![];
    for field in &fields {
        let fname = field.name();
        let mut chars = fname.chars();
        let is_identifier = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !is_identifier {
            return Err(Error::invalid_field_name(format!(
                "{name}: field names must be valid identifiers: '{fname}'"
            )));
        }
        if KEYWORDS.contains(&fname) {
            return Err(Error::invalid_field_name(format!(
                "{name}: field names must not be keywords: '{fname}'"
            )));
        }
        if seen.contains(&fname) {
            return Err(Error::invalid_field_name(format!(
                "{name}: field name duplicated: '{fname}'"
            )));
        }
        seen.push(fname);
    }

    let mut merged = base.map(|b| b.fields.clone()).unwrap_or_default();
    for field in fields {
        match merged.iter_mut().find(|f| f.name == field.name) {
            Some(slot) => *slot = field,
            None => merged.push(field),
        }
    }
    let (mut ordered, defaulted): (Vec<_>, Vec<_>) =
        merged.into_iter().partition(|f| f.default.is_none());
    ordered.extend(defaulted);

    let mut all_validators = base.map(|b| b.validators.clone()).unwrap_or_default();
    let inherited = all_validators.len();
    for validator in validators {
        let redeclared = all_validators[..inherited].iter().position(|v| {
            v.name() == validator.name()
                && v.scope() == validator.scope()
                && v.params() == validator.params()
        });
        match redeclared {
            Some(i) => all_validators[i] = validator,
            None => all_validators.push(validator),
        }
    }
    for validator in &all_validators {
        if let ValidatorScope::Field(fname) = validator.scope() {
            if !ordered.iter().any(|f| &f.name == fname) {
                return Err(Error::invalid_rule(format!(
                    "{name}: validator {validator} refers to unknown field '{fname}'"
                )));
            }
        }
    }

    let mut lineage = vec![name.to_string()];
    if let Some(base) = base {
        lineage.extend(base.lineage.iter().cloned());
    }

    tracing::debug!(
        "Created type {name} ({}) with fields: {}",
        lineage.join(" <- "),
        ordered
            .iter()
            .map(|f| format!("{}: {}", f.name, f.ty))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(RecordType {
        name: name.to_string(),
        lineage,
        fields: ordered,
        validators: all_validators,
    })
}

impl RecordType {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name of the type followed by the names of its ancestors,
    /// closest first.
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn validators(&self) -> &[BoundValidator] {
        &self.validators
    }

    /// Returns true if the type is, or derives from, one of the named types.
    pub fn inherits_from<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names
            .iter()
            .any(|n| self.lineage.iter().any(|l| l == n.as_ref()))
    }

    /// Validates `values` and creates a record from them.
    ///
    /// All fields are checked even after one of them fails, and the failures
    /// are reported together.  Record validators then run on the fields that
    /// passed.
    pub fn instantiate(self: &Arc<Self>, values: Mapping) -> Result<Record, Error> {
        let values = self.validate(&values)?;
        Ok(Record {
            ty: Arc::clone(self),
            values,
        })
    }

    /// Reads and merges the given YAML files, and instantiates a record from
    /// the result.
    pub fn instantiate_from_yaml<P: AsRef<Path>>(
        self: &Arc<Self>,
        paths: &[P],
    ) -> Result<Record, Error> {
        self.instantiate_doc(merge::merge_files(paths, merge::read_yaml)?)
    }

    /// Reads and merges the given JSON files, and instantiates a record from
    /// the result.
    pub fn instantiate_from_json<P: AsRef<Path>>(
        self: &Arc<Self>,
        paths: &[P],
    ) -> Result<Record, Error> {
        self.instantiate_doc(merge::merge_files(paths, merge::read_json)?)
    }

    fn instantiate_doc(self: &Arc<Self>, doc: Value) -> Result<Record, Error> {
        match doc {
            Value::Mapping(values) => self.instantiate(values),
            other => Err(Error::parse(format!(
                "{}: expected a mapping, found {}",
                self.name,
                render(&other)
            ))),
        }
    }

    /// Validates `input`, returning the checked values in field order.
    pub(crate) fn validate(&self, input: &Mapping) -> Result<Mapping, Error> {
        let mut errors = vec![];

        let mut input = input.clone();
        for validator in self.record_validators(true) {
            input = self.run_record_validator(validator, &input)?;
        }

        for key in input.keys() {
            let key = key_string(key);
            if self.field(&key).is_none() {
                errors.push(Error::field_validation(format!(
                    "{}.{key}: unexpected field",
                    self.name
                )));
            }
        }

        let mut values = Mapping::new();
        for field in &self.fields {
            let checked = match (input.get(field.name()), field.default()) {
                (Some(value), _) => self.check_field(field, value.clone(), false, &values),
                (None, Some(default)) => self.check_field(field, default.clone(), true, &values),
                (None, None) => Err(Error::field_validation(format!(
                    "{}.{}: field required",
                    self.name, field.name
                ))),
            };
            match checked {
                Ok(value) => {
                    values.insert(Value::String(field.name.clone()), value);
                }
                Err(err) => errors.push(err),
            }
        }

        // each record validator sees the values left by the last one that passed
        for validator in self.record_validators(false) {
            match self.run_record_validator(validator, &values) {
                Ok(checked) => values = checked,
                Err(err) => errors.push(err),
            }
        }

        if !errors.is_empty() {
            return Err(Error::aggregate(errors));
        }
        Ok(values)
    }

    fn record_validators(&self, pre: bool) -> impl Iterator<Item = &BoundValidator> {
        self.validators
            .iter()
            .filter(move |v| v.scope() == &ValidatorScope::Record && v.opts().pre == pre)
    }

    fn run_record_validator(
        &self,
        validator: &BoundValidator,
        values: &Mapping,
    ) -> Result<Mapping, Error> {
        let ctx = ValidationContext {
            record_type: self,
            field: None,
            values,
        };
        let fail = |reason: String| {
            Error::record_validation(format!("{} ({validator}): {reason}", self.name))
        };
        match validator.apply(&ctx, &Value::Mapping(values.clone())) {
            Ok(Value::Mapping(checked)) => Ok(checked),
            Ok(other) => Err(fail(format!(
                "validator returned {}, expected a mapping",
                render(&other)
            ))),
            Err(reason) => Err(fail(reason)),
        }
    }

    fn check_field(
        &self,
        field: &Field,
        value: Value,
        defaulted: bool,
        values: &Mapping,
    ) -> Result<Value, Error> {
        let ctx = ValidationContext {
            record_type: self,
            field: Some(field.name()),
            values,
        };
        let fail = |value: &Value, reason: String| {
            let shown = match field.ty() {
                FieldType::Record(_) => String::new(),
                _ => format!(" = {}", render(value)),
            };
            Error::field_validation(format!("{}.{}{shown}: {reason}", self.name, field.name))
        };
        let validators = self
            .validators
            .iter()
            .filter(|v| matches!(v.scope(), ValidatorScope::Field(f) if f == &field.name));

        if defaulted {
            // Nested records still need their own defaults filled in.
            let mut value = match field.ty() {
                FieldType::Record(_) => field.ty().check(&value).map_err(|e| fail(&value, e))?,
                _ => value,
            };
            for validator in validators.filter(|v| v.opts().always) {
                value = validator.apply(&ctx, &value).map_err(|e| fail(&value, e))?;
            }
            return Ok(value);
        }

        let (pre, post): (Vec<_>, Vec<_>) = validators.partition(|v| v.opts().pre);
        let mut value = value;
        for validator in pre {
            value = validator.apply(&ctx, &value).map_err(|e| fail(&value, e))?;
        }
        value = field.ty().check(&value).map_err(|e| fail(&value, e))?;
        for validator in post {
            value = validator.apply(&ctx, &value).map_err(|e| fail(&value, e))?;
        }
        Ok(value)
    }
}

/// A validated record.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    ty: Arc<RecordType>,
    values: Mapping,
}

impl Record {
    /// Returns the value of a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Returns the values of all fields, in field order.
    pub fn values(&self) -> &Mapping {
        &self.values
    }

    pub fn type_name(&self) -> &str {
        self.ty.name()
    }

    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.ty
    }

    /// Returns a new record with some values replaced, validated again.
    /// The record itself is left unchanged.
    pub fn with_overrides(&self, overrides: &Mapping) -> Result<Record, Error> {
        let mut values = self.values.clone();
        for (k, v) in overrides {
            values.insert(k.clone(), v.clone());
        }
        self.ty.instantiate(values)
    }

    pub fn to_value(&self) -> Value {
        Value::Mapping(self.values.clone())
    }

    /// Writes the record as YAML.
    ///
    /// The output can't always be read back with the same type, e.g. when
    /// the type has record validators that transform values.
    pub fn to_yaml(&self, path: &Path) -> Result<(), Error> {
        merge::to_yaml(&self.to_value(), path)
    }

    /// Writes the record as JSON.  Fails if a value has non-string keys.
    pub fn to_json(&self, path: &Path) -> Result<(), Error> {
        merge::to_json(&self.to_value(), path)
    }
}
