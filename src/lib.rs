// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

/*!
# typedconfig

This is a library for validating the configuration of an energy system model
against a set of rules, where the rules themselves are written in YAML.

A rule names the type of a value, and optionally its default, validators and
whether it may be left out:

```yaml
lifetime: {type: PositiveInt, default: 25}
carrier:
  type: Dict
  opts: [str, bool]
  optional: true
  validator: not_in
  validator_params: {excluded: [resource]}
```

Rules are turned into [`RecordType`]s at runtime, and configuration values are
validated by instantiating [`Record`]s of those types.

## Rule trees

The [`SchemaBuilder`] turns a whole tree of rules into one record type with
[`config_type`][SchemaBuilder::config_type], where every branch becomes a
nested record.  [`config`][SchemaBuilder::config] validates a config document
against such a tree in one step.

## Properties, nodes and edges

Models are made of properties (technologies, in an energy system model) that
inherit values from a parent property.
[`properties`][SchemaBuilder::properties] creates a separate record type for
each property, deriving it from the type of its parent, after checking that
the hierarchy has no cycles.

[`nodes`][SchemaBuilder::nodes] and [`edges`][SchemaBuilder::edges] create
the locations of a model and the links between them, each with its own set of
properties.  The [`Network`] connects them, and the [`ModelBuilder`] does all
of the above from a set of files.

## Errors and warnings

Broken rules stop schema construction with an [`Error`].  Invalid config
values are collected, so that all of them can be reported at once.  Problems
that don't stop construction, like type options that had to be ignored, are
recorded as [`Warnings`] and logged with `tracing`.
*/

mod assembly;
pub use assembly::{Edge, EdgeSet, Node, NodeSet};

mod builder;
pub use builder::{config_from_files, ModelBuilder};

mod config;
pub use config::SchemaConfig;

mod error;
pub use error::{Error, ErrorKind, Warnings};

mod graph;
pub use graph::InheritanceGraph;

mod network;
pub use network::{iterators, Network};

mod properties;
pub use properties::{attr_defaults, AttributeRules, PropertySet};

pub mod rules;

mod schema;
pub use schema::{
    synthesize, BoundValidator, Bounds, Field, FieldType, Pattern, Record, RecordType,
    SchemaBuilder, ValidationContext, ValidatorFn, ValidatorOpts, ValidatorRegistry,
    ValidatorScope,
};

#[cfg(test)]
mod test_utils;
