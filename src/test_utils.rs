// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module is only compiled when running unit tests and contains features
//! that are shared by all tests of the crate.
//!
//! - helpers for writing documents and paths inline, as YAML and dotted
//!   strings respectively.
//! - a small set of technology rules and specs, resembling those of an
//!   energy system model.

use serde_yaml::{Mapping, Value};

use crate::rules::paths::{PathKey, RulePath};

/// Parses an inline YAML document.
pub(crate) fn yaml(text: &str) -> Value {
    serde_yaml::from_str(text).unwrap_or_else(|e| panic!("invalid test YAML: {e}\n{text}"))
}

/// Parses an inline YAML mapping.
pub(crate) fn mapping(text: &str) -> Mapping {
    match yaml(text) {
        Value::Mapping(m) => m,
        Value::Null => Mapping::new(),
        other => panic!("expected a mapping, found {other:?}"),
    }
}

/// Turns a dotted string into a path.  Numeric segments become indices.
pub(crate) fn path(dotted: &str) -> RulePath {
    dotted
        .split('.')
        .map(|segment| match segment.parse::<usize>() {
            Ok(index) => PathKey::Index(index),
            Err(_) => PathKey::Key(segment.to_string()),
        })
        .collect()
}

/// Attribute rules for technologies.
pub(crate) fn tech_rules() -> Value {
    yaml(
        r#"
        name: {type: str}
        carrier:
          type: Dict
          opts: [str, bool]
          optional: true
          validator: not_in
          validator_params: {excluded: [resource]}
        constraints:
          energy_cap_max: {type: PositiveFloat, optional: true}
          energy_eff: {type: confloat, opts: {gt: 0, le: 1}, default: 1.0}
          lifetime: {type: PositiveInt, default: 25, doc: in years}
        costs:
          om_annual: {type: float, optional: true, scaling_label: per_cap}
        "#,
    )
}

/// Technology specs with a small inheritance hierarchy.
pub(crate) fn tech_specs() -> Value {
    yaml(
        r#"
        ccgt:
          parent: supply
          name: Combined cycle gas turbine
          carrier: {electricity: true}
          constraints: {energy_eff: 0.5}
          costs: {om_annual: 12.5}
        supply:
          name: Supply
          constraints: {energy_cap_max: 10}
        demand:
          name: Demand
        "#,
    )
}

/// Attribute rules for nodes and edges.
pub(crate) fn location_rules() -> Value {
    yaml(
        r#"
        available_area: {type: NonNegativeFloat, optional: true}
        distance: {type: PositiveFloat, optional: true}
        coordinates:
          type: Dict
          opts: [str, float]
          optional: true
          validator: node_coordinate_validation
        "#,
    )
}
