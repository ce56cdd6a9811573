// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! Helpers for working with rule trees and config documents before any types
//! are created from them.
//!
//! Rules and configs are plain YAML (or JSON) documents, held as
//! [`serde_yaml::Value`]s.  The [`paths`] module classifies the paths of such
//! a document, and the [`merge`] module reads, merges and writes them.

pub mod merge;
pub mod paths;
