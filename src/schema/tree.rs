// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Record types for whole rule trees.

use std::sync::Arc;

use serde_yaml::{Mapping, Value};

use super::{
    render, synthesize, BoundValidator, Field, FieldType, Record, RecordType, SchemaBuilder,
    ValidatorScope,
};
use crate::rules::paths::{key_string, resolve_optional, TYPE_SPEC_KEYS};
use crate::Error;

/// Name of the type created for the top level of a rule tree.
const CONFIG_TYPE_NAME: &str = "config";

/// A `default` with this value stands for a `null` default.
pub(crate) const NONE_SENTINEL: &str = "_None";

impl SchemaBuilder {
    /// Creates the field described by a leaf rule, and the validators the
    /// rule declares.
    ///
    /// The validators are meant for the record that holds the field: they
    /// are scoped to the field, or to the whole record for root validators.
    pub fn field_from_rule(
        &mut self,
        key: &str,
        rule: &Mapping,
    ) -> Result<(Field, Vec<BoundValidator>), Error> {
        let ty = self.resolve_type(rule).map_err(|e| e.context(key))?;
        let validators = self.resolve_validators(key, rule).map_err(|e| e.context(key))?;

        let mut field = Field::new(key, ty);
        match rule.get("default") {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) if s == NONE_SENTINEL => field = field.with_default(Value::Null),
            Some(default) => field = field.with_default(default.clone()),
        }
        if let Some(doc) = rule.get("doc").and_then(Value::as_str) {
            field = field.with_doc(doc);
        }
        Ok((field, validators))
    }

    /// Creates the record type for a rule tree.
    ///
    /// Leaf rules become fields.  Every other mapping becomes a field holding
    /// a nested record, which defaults to `{}` when all of its fields have
    /// defaults.  Root validators declared on a branch apply to the nested
    /// record, other validators declared on a branch apply to the branch
    /// field.
    pub fn config_type(&mut self, rules: &Value) -> Result<Arc<RecordType>, Error> {
        let Value::Mapping(rules) = rules else {
            return Err(Error::invalid_rule(format!(
                "Rules must be a mapping, found {}",
                render(rules)
            )));
        };
        let (config_type, validators) = self.branch_type(CONFIG_TYPE_NAME, rules)?;
        if let Some(validator) = validators.first() {
            return Err(Error::invalid_rule(format!(
                "{CONFIG_TYPE_NAME}: validator {validator} on the top level must be a root validator"
            )));
        }
        Ok(Arc::new(config_type))
    }

    /// Validates a config document against a rule tree.
    ///
    /// Optional rules for keys absent from the config are dropped before the
    /// type is created.
    pub fn config(&mut self, rules: &Value, conf: &Value) -> Result<Record, Error> {
        let Value::Mapping(values) = conf else {
            return Err(Error::parse(format!(
                "Config must be a mapping, found {}",
                render(conf)
            )));
        };
        let config_type = self.config_type(&resolve_optional(rules, conf))?;
        config_type.instantiate(values.clone())
    }

    /// Returns the type for `branch`, and the validators declared on the
    /// branch that apply to its field in the parent.
    fn branch_type(
        &mut self,
        name: &str,
        branch: &Mapping,
    ) -> Result<(RecordType, Vec<BoundValidator>), Error> {
        let mut fields = vec![];
        let mut validators = vec![];

        for (k, v) in branch {
            let key = key_string(k);
            if TYPE_SPEC_KEYS.contains(&key.as_str()) {
                continue;
            }
            let Value::Mapping(rule) = v else {
                self.warnings
                    .push(format!("{name}.{key}: not a rule, ignored: {}", render(v)));
                continue;
            };

            if rule.contains_key("type") {
                let (field, field_validators) = self.field_from_rule(&key, rule)?;
                fields.push(field);
                validators.extend(field_validators);
                continue;
            }

            let (nested, branch_validators) = self.branch_type(&key, rule)?;
            let all_defaulted = nested.fields().iter().all(|f| f.default().is_some());
            let mut field = Field::new(&key, FieldType::Record(Arc::new(nested)));
            if all_defaulted {
                field = field.with_default(Value::Mapping(Mapping::new()));
            }
            if let Some(doc) = rule.get("doc").and_then(Value::as_str) {
                field = field.with_doc(doc);
            }
            fields.push(field);
            validators.extend(branch_validators);
        }

        let (root, outer): (Vec<_>, Vec<_>) = self
            .resolve_validators(name, branch)
            .map_err(|e| e.context(name))?
            .into_iter()
            .partition(|v| v.scope() == &ValidatorScope::Record);
        validators.extend(root);

        let record_type = synthesize(name, fields, validators, None)?;
        Ok((record_type, outer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mapping, yaml};
    use crate::ErrorKind;

    #[test]
    fn test_threshold() -> Result<(), Error> {
        let mut builder = SchemaBuilder::default();
        let config_type = builder.config_type(&yaml(
            "foo: {type: PositiveFloat, validator: threshold, validator_params: {threshold: 5}}",
        ))?;

        let config = config_type.instantiate(mapping("{foo: 2}"))?;
        assert_eq!(config.get("foo").and_then(Value::as_f64), Some(2.0));

        assert!(config_type
            .instantiate(mapping("{foo: -1}"))
            .is_err_and(|e| e.kind() == ErrorKind::FieldValidation
                && e.desc().contains("greater than 0")));
        assert!(config_type
            .instantiate(mapping("{foo: 6}"))
            .is_err_and(|e| e.desc().contains("above threshold: 6.0 > 5")));
        Ok(())
    }

    #[test]
    fn test_validator_chain() -> Result<(), Error> {
        let mut builder = SchemaBuilder::default();
        let config_type = builder.config_type(&yaml(
            r#"
            foo:
              type: PositiveFloat
              validator: [threshold, mult_of]
              validator_params: [{threshold: 15}, {factor: 3}]
            "#,
        ))?;

        let config = config_type.instantiate(mapping("{foo: 9}"))?;
        assert_eq!(config.get("foo").and_then(Value::as_f64), Some(9.0));
        assert!(config_type
            .instantiate(mapping("{foo: 10}"))
            .is_err_and(|e| e.desc().contains("not a multiple")));
        assert!(config_type
            .instantiate(mapping("{foo: 16}"))
            .is_err_and(|e| e.desc().contains("above threshold")));
        assert!(config_type
            .instantiate(mapping("{foo: 18}"))
            .is_err_and(|e| e.desc().contains("above threshold")));
        Ok(())
    }

    #[test]
    fn test_root_validator_on_branch() -> Result<(), Error> {
        let mut builder = SchemaBuilder::default();
        let config_type = builder.config_type(&yaml(
            r#"
            zero_sum_total:
              validator: zero_sum
              validator_params: {total: 15}
              root_validator: true
              foo: {type: PositiveInt}
              bar: {type: PositiveInt}
            "#,
        ))?;

        let config = config_type.instantiate(mapping("{zero_sum_total: {foo: 5, bar: 10}}"))?;
        assert_eq!(
            config.get("zero_sum_total"),
            Some(&yaml("{foo: 5, bar: 10}"))
        );
        for bad in [
            "{zero_sum_total: {foo: 15, bar: 10}}",
            "{zero_sum_total: {foo: 5, bar: 1}}",
        ] {
            assert!(config_type
                .instantiate(mapping(bad))
                .is_err_and(|e| e.desc().contains("do not add up to 15")));
        }
        Ok(())
    }

    #[test]
    fn test_root_validator_on_intermediate_branch() -> Result<(), Error> {
        let mut builder = SchemaBuilder::default();
        let config_type = builder.config_type(&yaml(
            r#"
            top:
              validator: sum_by_name
              validator_params: {total: 15}
              root_validator: true
              first: {type: PositiveInt}
              second: {type: PositiveInt}
              nest:
                leaf: {type: conint, opts: {multiple_of: 5}}
            "#,
        ))?;

        let config =
            config_type.instantiate(mapping("{top: {first: 5, second: 10, nest: {leaf: 15}}}"))?;
        assert_eq!(config.get("top").and_then(|t| t.get("nest")), Some(&yaml("{leaf: 15}")));

        assert!(config_type
            .instantiate(mapping("{top: {first: 5, second: 1, nest: {leaf: 15}}}"))
            .is_err_and(|e| e.desc().contains("do not add up")));
        assert!(config_type
            .instantiate(mapping("{top: {first: 5, second: 10, nest: {leaf: 13}}}"))
            .is_err_and(|e| e.desc().contains("multiple of")));
        Ok(())
    }

    #[test]
    fn test_field_validator_on_branch() -> Result<(), Error> {
        let rules = yaml(
            r#"
            coordinates:
              validator: node_coordinate_validation
              x: {type: float, optional: true}
              y: {type: float, optional: true}
              lat: {type: float, optional: true}
              lon: {type: float, optional: true}
            "#,
        );
        let mut builder = SchemaBuilder::default();
        let config = builder.config(&rules, &yaml("{coordinates: {lat: 51.5, lon: 0}}"))?;
        assert_eq!(
            config.get("coordinates"),
            Some(&yaml("{lat: 51.5, lon: 0.0}"))
        );

        assert!(builder
            .config(&rules, &yaml("{coordinates: {x: 1, lat: 2}}"))
            .is_err_and(|e| e.desc().contains("incompatible coordinate system")));

        let mut builder = SchemaBuilder::default();
        assert!(builder
            .config_type(&yaml(
                "{validator: threshold, validator_params: {threshold: 1}, foo: {type: int}}"
            ))
            .is_err_and(|e| e.kind() == ErrorKind::InvalidRule));
        Ok(())
    }

    #[test]
    fn test_optional() -> Result<(), Error> {
        let rules = yaml(
            r#"
            foo: {type: int, default: 0}
            bar: {type: int, optional: true}
            baz: {type: float}
            parent:
              child: {type: bool, default: false}
              cousin: {type: bool, optional: true}
            array1: {type: List, opts: [int]}
            array2: {type: List, opts: [int], optional: true}
            "#,
        );
        let conf = yaml(
            r#"
            foo: 42
            baz: 3.14
            parent:
              cousin: true
            array1: [7, 49]
            array2: [-3, 3]
            "#,
        );

        let mut builder = SchemaBuilder::default();
        let config = builder.config(&rules, &conf)?;
        assert!(config.get("bar").is_none());
        assert!(config.record_type().field("bar").is_none());
        assert_eq!(
            config.get("parent"),
            Some(&yaml("{child: false, cousin: true}"))
        );
        assert_eq!(config.get("array2"), Some(&yaml("[-3, 3]")));
        Ok(())
    }

    #[test]
    fn test_defaults() -> Result<(), Error> {
        let mut builder = SchemaBuilder::default();
        let config_type = builder.config_type(&yaml(
            r#"
            run:
              mode: {type: Literal, opts: [plan, operate], default: plan}
              seed: {type: Optional, opts: [int], default: _None, doc: random seed}
            model:
              name: {type: str}
            "#,
        ))?;

        let run = config_type.field("run").map(|f| f.default().cloned());
        assert_eq!(run, Some(Some(yaml("{}"))));
        assert_eq!(config_type.field("model").map(|f| f.default()), Some(None));

        let FieldType::Record(run_type) = config_type
            .field("run")
            .map(Field::ty)
            .cloned()
            .unwrap_or(FieldType::Any)
        else {
            panic!("run should be a nested record");
        };
        assert_eq!(run_type.field("seed").and_then(Field::doc), Some("random seed"));

        let config = config_type.instantiate(mapping("{model: {name: test}}"))?;
        assert_eq!(config.get("run"), Some(&yaml("{mode: plan, seed: null}")));
        assert!(config_type
            .instantiate(Mapping::new())
            .is_err_and(|e| e == Error::field_validation("config.model: field required")));
        Ok(())
    }

    #[test]
    fn test_rule_errors() {
        let mut builder = SchemaBuilder::default();
        assert!(builder
            .config_type(&yaml("{run: {mode: {type: Mode}}}"))
            .is_err_and(|e| e == Error::unknown_type("mode: Unknown type: Mode")));
        assert!(builder
            .config_type(&yaml("[1, 2]"))
            .is_err_and(|e| e.kind() == ErrorKind::InvalidRule));

        builder
            .config_type(&yaml("{run: {mode: plan, seed: {type: int}}}"))
            .ok();
        assert!(builder.warnings().contains("run.mode: not a rule, ignored"));
    }
}
