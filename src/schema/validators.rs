// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Named validators, and their binding to the fields and records of a rule.

use std::collections::HashMap;

use serde_yaml::{Mapping, Value};

use super::{as_number, render, RecordType, SchemaBuilder};
use crate::rules::paths::key_string;
use crate::Error;

/// The signature of validator functions.
///
/// A validator receives the context it runs in, the value to check and its
/// parameters from the rule.  It returns the (possibly converted) value, or
/// the reason why the value was rejected.
///
/// Field validators receive the value of their field.  Record validators
/// receive all the values of the record as a mapping.
pub type ValidatorFn = fn(&ValidationContext<'_>, &Value, &Mapping) -> Result<Value, String>;

/// What a validator can see besides the value it validates.
pub struct ValidationContext<'a> {
    /// The type of the record being validated.
    pub record_type: &'a RecordType,
    /// The field being validated, `None` for record validators.
    pub field: Option<&'a str>,
    /// The fields validated so far, in declaration order.
    pub values: &'a Mapping,
}

/// What a validator is attached to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValidatorScope {
    /// A single field, by name.
    Field(String),
    /// The whole record.
    Record,
}

/// When and how a validator runs, from `validator_opts`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidatorOpts {
    /// Run before the type check, on the raw value.
    pub pre: bool,
    /// Run on every item of a list, or every value of a mapping.
    pub each_item: bool,
    /// Also run on default values.
    pub always: bool,
}

/// A validator function with its parameters.
#[derive(Clone)]
pub struct BoundValidator {
    name: String,
    func: ValidatorFn,
    params: Mapping,
    scope: ValidatorScope,
    opts: ValidatorOpts,
}

impl BoundValidator {
    /// Creates a validator that runs `func` with the given parameters.
    pub fn new(
        name: impl Into<String>,
        func: ValidatorFn,
        params: Mapping,
        scope: ValidatorScope,
        opts: ValidatorOpts,
    ) -> Self {
        Self {
            name: name.into(),
            func,
            params,
            scope,
            opts,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &Mapping {
        &self.params
    }

    pub fn scope(&self) -> &ValidatorScope {
        &self.scope
    }

    pub fn opts(&self) -> ValidatorOpts {
        self.opts
    }

    /// Runs the validator on `value`.
    pub(crate) fn apply(
        &self,
        ctx: &ValidationContext<'_>,
        value: &Value,
    ) -> Result<Value, String> {
        if !self.opts.each_item {
            return (self.func)(ctx, value, &self.params);
        }
        match value {
            Value::Sequence(items) => items
                .iter()
                .map(|v| (self.func)(ctx, v, &self.params))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Sequence),
            Value::Mapping(mapping) => {
                let mut checked = Mapping::new();
                for (k, v) in mapping {
                    checked.insert(k.clone(), (self.func)(ctx, v, &self.params)?);
                }
                Ok(Value::Mapping(checked))
            }
            other => (self.func)(ctx, other, &self.params),
        }
    }
}

impl std::fmt::Debug for BoundValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundValidator")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("scope", &self.scope)
            .field("opts", &self.opts)
            .finish()
    }
}

impl PartialEq for BoundValidator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.params == other.params
            && self.scope == other.scope
            && self.opts == other.opts
    }
}

impl std::fmt::Display for BoundValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let params = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", key_string(k), show(v)))
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{}[{params}]", self.name)
    }
}

#[derive(Clone, Copy)]
struct ValidatorDef {
    func: ValidatorFn,
    required: &'static [&'static str],
    optional: &'static [&'static str],
}

impl ValidatorDef {
    fn check_params(&self, name: &str, params: &Mapping) -> Result<(), Error> {
        for required in self.required {
            if !params.contains_key(*required) {
                return Err(Error::invalid_rule(format!(
                    "{name}: missing parameter '{required}'"
                )));
            }
        }
        for key in params.keys().map(key_string) {
            if !self.required.contains(&key.as_str()) && !self.optional.contains(&key.as_str()) {
                return Err(Error::invalid_rule(format!(
                    "{name}: unexpected parameter '{key}'"
                )));
            }
        }
        Ok(())
    }
}

/// The validator functions that rules can refer to by name.
///
/// The default registry holds the built-in validators.
#[derive(Clone)]
pub struct ValidatorRegistry {
    validators: HashMap<String, ValidatorDef>,
}

impl ValidatorRegistry {
    /// Creates a registry without any validators.
    pub fn empty() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// Registers a validator under `name`, replacing any validator of the
    /// same name.
    ///
    /// Rules using the validator must give all `required` parameters, and
    /// may give the `optional` ones.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        func: ValidatorFn,
        required: &'static [&'static str],
        optional: &'static [&'static str],
    ) {
        self.validators.insert(
            name.into(),
            ValidatorDef {
                func,
                required,
                optional,
            },
        );
    }

    /// Returns true if a validator with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.validators.contains_key(name)
    }

    fn get(&self, name: &str) -> Option<&ValidatorDef> {
        self.validators.get(name)
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("trange_check", trange_check, &[], &[]);
        registry.register("range_check", range_check, &["min_key"], &[]);
        registry.register("quadrant", quadrant, &["axes", "signs"], &[]);
        registry.register("threshold", threshold, &["threshold"], &[]);
        registry.register("mult_of", mult_of, &["factor"], &[]);
        registry.register("zero_sum", zero_sum, &["total"], &[]);
        registry.register("sum_by_name", sum_by_name, &["total"], &[]);
        registry.register("inheritance", inheritance, &["allowed_in"], &[]);
        registry.register("not_in", not_in, &["excluded"], &[]);
        registry.register("carrier_validation", carrier_validation, &["direction"], &[]);
        registry.register(
            "node_coordinate_validation",
            node_coordinate_validation,
            &[],
            &["coord_systems"],
        );
        registry.register("minmax_cost_options", minmax_cost_options, &[], &[]);
        registry.register("energy_cap_per_unit", energy_cap_per_unit, &[], &[]);
        registry.register(
            "gte_storage_discharge_depth",
            gte_storage_discharge_depth,
            &[],
            &[],
        );
        registry.register("require", require, &["key"], &["inherits_from"]);
        registry
    }
}

/// Validator resolution.
impl SchemaBuilder {
    /// Resolves the validators of a rule for the field `key`.
    ///
    /// `validator` is a name or a list of names.  `validator_params` is a
    /// mapping for a single validator, or a list of mappings in the same
    /// order as the names.  With `root_validator: true` the validators are
    /// attached to the record instead of the field.
    pub fn resolve_validators(
        &mut self,
        key: &str,
        rule: &Mapping,
    ) -> Result<Vec<BoundValidator>, Error> {
        let Some(spec) = rule.get("validator") else {
            return Ok(vec![]);
        };
        let params = rule.get("validator_params").filter(|p| !p.is_null());

        let funcs: Vec<(String, Mapping)> = match spec {
            Value::String(name) => {
                let params = match params {
                    None => Mapping::new(),
                    Some(Value::Mapping(params)) => params.clone(),
                    Some(Value::Sequence(list)) if list.len() == 1 => param_set(name, &list[0])?,
                    Some(other) => {
                        return Err(Error::mismatched_validator_params(format!(
                            "{name}, {}: no. of validators and param sets don't match",
                            render(other)
                        )))
                    }
                };
                vec![(name.clone(), params)]
            }
            Value::Sequence(names) => {
                let names = names
                    .iter()
                    .map(|n| {
                        n.as_str().map(str::to_string).ok_or_else(|| {
                            Error::invalid_rule(format!(
                                "{key}: validator names must be strings, found {}",
                                render(n)
                            ))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let param_sets = match params {
                    None => vec![Mapping::new(); names.len()],
                    Some(Value::Sequence(list)) if list.len() == names.len() => names
                        .iter()
                        .zip(list)
                        .map(|(name, p)| param_set(name, p))
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(other) => {
                        return Err(Error::mismatched_validator_params(format!(
                            "{}, {}: no. of validators and param sets don't match",
                            render(spec),
                            render(other)
                        )))
                    }
                };
                names.into_iter().zip(param_sets).collect()
            }
            other => {
                return Err(Error::invalid_rule(format!(
                    "{}: must be a 'str' or 'list'",
                    render(other)
                )))
            }
        };

        let opts = self.validator_opts(key, rule)?;
        let scope = match rule.get("root_validator") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {
                ValidatorScope::Field(key.to_string())
            }
            Some(Value::Bool(true)) => ValidatorScope::Record,
            Some(other) => {
                return Err(Error::invalid_rule(format!(
                    "{key}: root_validator must be a boolean, found {}",
                    render(other)
                )))
            }
        };

        funcs
            .into_iter()
            .map(|(name, params)| {
                let def = self
                    .registry
                    .get(&name)
                    .ok_or_else(|| Error::unknown_validator(format!("Unknown validator: {name}")))?;
                def.check_params(&name, &params)?;
                Ok(BoundValidator::new(name, def.func, params, scope.clone(), opts))
            })
            .collect()
    }

    fn validator_opts(&mut self, key: &str, rule: &Mapping) -> Result<ValidatorOpts, Error> {
        let mut opts = ValidatorOpts::default();
        let raw = match rule.get("validator_opts") {
            None | Some(Value::Null) => return Ok(opts),
            Some(Value::Mapping(raw)) => raw,
            Some(other) => {
                return Err(Error::invalid_rule(format!(
                    "{key}: validator_opts must be a mapping, found {}",
                    render(other)
                )))
            }
        };
        for (k, v) in raw {
            let name = key_string(k);
            let slot = match name.as_str() {
                "pre" => &mut opts.pre,
                "each_item" => &mut opts.each_item,
                "always" => &mut opts.always,
                "allow_reuse" => continue,
                _ => {
                    self.warnings
                        .push(format!("{key}: validator option '{name}' ignored"));
                    continue;
                }
            };
            *slot = v.as_bool().ok_or_else(|| {
                Error::invalid_rule(format!("{key}: validator option '{name}' must be a boolean"))
            })?;
        }
        Ok(opts)
    }
}

fn param_set(name: &str, params: &Value) -> Result<Mapping, Error> {
    match params {
        Value::Null => Ok(Mapping::new()),
        Value::Mapping(params) => Ok(params.clone()),
        other => Err(Error::invalid_rule(format!(
            "{name}: validator parameters must be a mapping, found {}",
            render(other)
        ))),
    }
}

/// Formats values for validator messages: strings without quotes.
fn show(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Sequence(items) => {
            format!("[{}]", items.iter().map(show).collect::<Vec<_>>().join(", "))
        }
        Value::Mapping(mapping) => format!(
            "{{{}}}",
            mapping
                .iter()
                .map(|(k, v)| format!("{}: {}", key_string(k), show(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Value::Tagged(tagged) => show(&tagged.value),
    }
}

fn param<'a>(params: &'a Mapping, key: &str) -> Result<&'a Value, String> {
    params
        .get(key)
        .ok_or_else(|| format!("missing validator parameter '{key}'"))
}

fn number(value: &Value) -> Result<f64, String> {
    as_number(value).ok_or_else(|| format!("{} is not a number", show(value)))
}

/// Names from a parameter that is a single name or a list of names.
fn names(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().map(show).collect(),
        other => vec![show(other)],
    }
}

fn trange_check(_: &ValidationContext<'_>, val: &Value, _: &Mapping) -> Result<Value, String> {
    match val {
        Value::Sequence(items) if items.len() == 2 => Ok(val.clone()),
        Value::Sequence(items) => Err(format!("range has too many elements: {}", items.len())),
        other => Err(format!("{} is not a range", show(other))),
    }
}

fn range_check(
    ctx: &ValidationContext<'_>,
    val: &Value,
    params: &Mapping,
) -> Result<Value, String> {
    let min_key = show(param(params, "min_key")?);
    if let Some(min) = ctx.values.get(min_key.as_str()) {
        if number(min)? > number(val)? {
            return Err(format!("{min_key}: {} > {}", show(min), show(val)));
        }
    }
    Ok(val.clone())
}

fn quadrant(_: &ValidationContext<'_>, values: &Value, params: &Mapping) -> Result<Value, String> {
    let axes = names(param(params, "axes")?);
    let signs = match param(params, "signs")? {
        Value::Sequence(signs) => signs.iter().map(number).collect::<Result<Vec<_>, _>>()?,
        other => vec![number(other)?],
    };
    let coords: Vec<Option<f64>> = axes
        .iter()
        .map(|axis| values.get(axis.as_str()).and_then(as_number))
        .collect();
    let inside = coords.iter().all(Option::is_some)
        && coords
            .iter()
            .zip(&signs)
            .filter(|(_, s)| **s != 0.0)
            .all(|(c, s)| c.is_some_and(|c| c * s > 0.0));
    if inside {
        Ok(values.clone())
    } else {
        Err(format!(
            "{} not in quadrant: {}",
            show(values),
            show(param(params, "signs")?)
        ))
    }
}

fn threshold(_: &ValidationContext<'_>, val: &Value, params: &Mapping) -> Result<Value, String> {
    let limit = param(params, "threshold")?;
    if number(val)? > number(limit)? {
        return Err(format!("above threshold: {} > {}", show(val), show(limit)));
    }
    Ok(val.clone())
}

fn mult_of(_: &ValidationContext<'_>, val: &Value, params: &Mapping) -> Result<Value, String> {
    let factor = param(params, "factor")?;
    if number(val)? % number(factor)? != 0.0 {
        return Err(format!("{} is not a multiple of {}", show(val), show(factor)));
    }
    Ok(val.clone())
}

fn zero_sum(_: &ValidationContext<'_>, values: &Value, params: &Mapping) -> Result<Value, String> {
    let total = param(params, "total")?;
    let Value::Mapping(mapping) = values else {
        return Err(format!("{} is not a mapping", show(values)));
    };
    let sum = mapping.values().map(number).sum::<Result<f64, _>>()?;
    if sum != number(total)? {
        let listed = Value::Sequence(mapping.values().cloned().collect());
        return Err(format!("{} do not add up to {}", show(&listed), show(total)));
    }
    Ok(values.clone())
}

fn sum_by_name(
    _: &ValidationContext<'_>,
    values: &Value,
    params: &Mapping,
) -> Result<Value, String> {
    let total = param(params, "total")?;
    let Value::Mapping(mapping) = values else {
        return Err(format!("{} is not a mapping", show(values)));
    };
    let term = |key: &str| mapping.get(key).map(number).unwrap_or(Ok(0.0));
    if term("first")? + term("second")? != number(total)? {
        let listed = Value::Sequence(mapping.values().cloned().collect());
        return Err(format!("{} do not add up to {}", show(&listed), show(total)));
    }
    Ok(values.clone())
}

fn inheritance(
    ctx: &ValidationContext<'_>,
    val: &Value,
    params: &Mapping,
) -> Result<Value, String> {
    let allowed = names(param(params, "allowed_in")?);
    if ctx.record_type.inherits_from(&allowed) {
        return Ok(val.clone());
    }
    Err(format!(
        "{} does not inherit from either of [{}]",
        ctx.record_type.name(),
        allowed.join(", ")
    ))
}

fn not_in(ctx: &ValidationContext<'_>, val: &Value, params: &Mapping) -> Result<Value, String> {
    let excluded = names(param(params, "excluded")?);
    let present = match val {
        Value::Mapping(mapping) => mapping.keys().map(key_string).collect(),
        other => names(other),
    };
    let mut common = present
        .into_iter()
        .filter(|v| excluded.contains(v))
        .collect::<Vec<_>>();
    common.dedup();
    if common.is_empty() {
        return Ok(val.clone());
    }
    Err(format!(
        "{{{}}} disallowed in {}\ndisallowed values: [{}]",
        common.join(", "),
        ctx.record_type.name(),
        excluded.join(", ")
    ))
}

fn carrier_validation(
    ctx: &ValidationContext<'_>,
    val: &Value,
    params: &Mapping,
) -> Result<Value, String> {
    let prefix = format!("carrier_{}", show(param(params, "direction")?));
    let known = ctx
        .values
        .iter()
        .any(|(k, v)| key_string(k).starts_with(&prefix) && names(v).contains(&show(val)));
    if known {
        return Ok(val.clone());
    }
    Err(format!(
        "{} is attempting to export an unknown output carrier",
        ctx.record_type.name()
    ))
}

fn node_coordinate_validation(
    _: &ValidationContext<'_>,
    val: &Value,
    _: &Mapping,
) -> Result<Value, String> {
    let Value::Mapping(coords) = val else {
        return Err(format!("{}: coordinates must be a mapping", show(val)));
    };
    let mut keys = coords.keys().map(key_string).collect::<Vec<_>>();
    keys.sort();
    if keys == ["x", "y"] || keys == ["lat", "lon"] {
        return Ok(val.clone());
    }
    Err(format!(
        "{{{}}}: incompatible coordinate system, should be one of [{{x, y}}, {{lat, lon}}]",
        keys.join(", ")
    ))
}

fn minmax_cost_options(
    ctx: &ValidationContext<'_>,
    val: &Value,
    _: &Mapping,
) -> Result<Value, String> {
    let objective = ctx.values.get("objective").and_then(Value::as_str);
    if objective != Some("minmax_cost_optimization") {
        return Ok(val.clone());
    }
    let has = |key: &str| val.as_mapping().is_some_and(|m| m.contains_key(key));
    if has("cost_class") || has("sense") {
        return Ok(val.clone());
    }
    Err("'minmax_cost_optimization': define one of 'cost_class' or 'sense'".to_string())
}

fn energy_cap_per_unit(
    ctx: &ValidationContext<'_>,
    val: &Value,
    _: &Mapping,
) -> Result<Value, String> {
    match ctx.values.get("energy_cap_per_unit") {
        Some(v) if !v.is_null() => Ok(val.clone()),
        _ => Err("Units are defined, 'energy_cap_per_unit' must be specified.".to_string()),
    }
}

fn gte_storage_discharge_depth(
    ctx: &ValidationContext<'_>,
    val: &Value,
    _: &Mapping,
) -> Result<Value, String> {
    let depth = match ctx.values.get("storage_discharge_depth") {
        Some(depth) => number(depth)?,
        None => 0.0,
    };
    if number(val)? >= depth {
        return Ok(val.clone());
    }
    Err(
        "If defining both `storage_initial` and `storage_discharge_depth` then \
         `storage_initial` >= `storage_discharge_depth`"
            .to_string(),
    )
}

fn require(ctx: &ValidationContext<'_>, val: &Value, params: &Mapping) -> Result<Value, String> {
    let key = show(param(params, "key")?);
    let missing = ctx.values.get(key.as_str()).map_or(true, Value::is_null);
    match params.get("inherits_from").map(names) {
        Some(parents) if !parents.is_empty() => {
            if missing && ctx.record_type.inherits_from(&parents) {
                return Err(format!(
                    "{} inherits from [{}], '{key}' must be specified.",
                    ctx.record_type.name(),
                    parents.join(", ")
                ));
            }
        }
        _ if missing => return Err(format!("'{key}' must be specified.")),
        _ => {}
    }
    Ok(val.clone())
}
