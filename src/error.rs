// License: MIT
// Copyright © 2024 Frequenz Energy-as-a-Service GmbH

//! This module defines the `Error` struct and the `ErrorKind` enum, which are
//! used to represent errors that can occur in the library, and the `Warnings`
//! collector for problems that don't abort schema construction.

/// A macro for defining the `ErrorKind` enum, the `Display` implementation for
/// it, and the constructors for the `Error` struct.
macro_rules! ErrorKind {
    ($(
        ($kind:ident, $ctor:ident)
    ),*) => {
        /// The kind of error that occurred.
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum ErrorKind {
            $(
                $kind,
            )*
        }

        impl std::fmt::Display for ErrorKind {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$kind => write!(f, "{}", stringify!($kind)),
                    )*
                }
            }
        }

        /// Constructors for [`Error`].
        impl Error {
            $(
                #[doc = concat!(
                    "Creates a new [`Error`] with the `",
                    stringify!($kind),
                    "` kind and the given description."
                )]
                pub(crate) fn $ctor(desc: impl Into<String>) -> crate::Error {
                    Self {
                        kind: ErrorKind::$kind,
                        desc: desc.into(),
                    }
                }
            )*
        }
    };
}

ErrorKind!(
    (AggregateValidation, aggregate_validation),
    (CyclicInheritance, cyclic_inheritance),
    (FieldValidation, field_validation),
    (Internal, internal),
    (InvalidEdge, invalid_edge),
    (InvalidFieldName, invalid_field_name),
    (InvalidRule, invalid_rule),
    (Io, io),
    (MismatchedValidatorParams, mismatched_validator_params),
    (NodeNotFound, node_not_found),
    (Parse, parse),
    (RecordValidation, record_validation),
    (Serialization, serialization),
    (UnknownParent, unknown_parent),
    (UnknownProperty, unknown_property),
    (UnknownType, unknown_type),
    (UnknownValidator, unknown_validator)
);

/// An error that can occur while building a schema from rules, or while
/// validating a configuration against it.
#[derive(Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    desc: String,
}

impl Error {
    /// Returns the kind of the error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the description of the error.
    pub fn desc(&self) -> &str {
        &self.desc
    }

    /// Returns true if the error was caused by a bad configuration value,
    /// rather than by a broken rule file.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::FieldValidation
                | ErrorKind::RecordValidation
                | ErrorKind::AggregateValidation
                | ErrorKind::UnknownProperty
        )
    }

    /// Prefixes the description with the name of the entity the error
    /// belongs to, keeping the kind.
    pub(crate) fn context(self, ctx: impl std::fmt::Display) -> Self {
        Self {
            kind: self.kind,
            desc: format!("{ctx}: {}", self.desc),
        }
    }

    /// Folds a list of errors into one.
    ///
    /// A single error is returned unchanged, so that callers can match on its
    /// kind.  Several errors become one `AggregateValidation` error listing
    /// all of them.
    pub(crate) fn aggregate(mut errors: Vec<Error>) -> Error {
        match errors.len() {
            0 => Error::internal("No errors to aggregate."),
            1 => errors.remove(0),
            n => Error::aggregate_validation(format!(
                "{n} errors:\n{}",
                errors
                    .iter()
                    .map(|e| format!("  - {e}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            )),
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.desc)
    }
}

impl std::error::Error for Error {}

/// Non-fatal problems found while building a schema, for example type
/// options that had to be ignored.
///
/// Every warning is also logged when it is recorded.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Warnings {
    messages: Vec<String>,
}

impl Warnings {
    pub(crate) fn push(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        tracing::warn!("{msg}");
        self.messages.push(msg);
    }

    /// Returns an iterator over the recorded warnings, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    /// Returns the number of recorded warnings.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if no warnings were recorded.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns true if any warning contains the given text.
    pub fn contains(&self, text: &str) -> bool {
        self.messages.iter().any(|m| m.contains(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate() {
        let single = Error::aggregate(vec![Error::field_validation("x: bad")]);
        assert_eq!(single, Error::field_validation("x: bad"));

        let many = Error::aggregate(vec![
            Error::field_validation("x: bad"),
            Error::record_validation("y: worse"),
        ]);
        assert_eq!(many.kind(), ErrorKind::AggregateValidation);
        assert_eq!(
            many.to_string(),
            "AggregateValidation: 2 errors:\n  - FieldValidation: x: bad\n  - RecordValidation: y: worse"
        );
        assert!(many.is_validation());
        assert!(!Error::cyclic_inheritance("a -> a").is_validation());
    }

    #[test]
    fn test_context() {
        let err = Error::field_validation("foo_t.foo = 6: above threshold").context("supply");
        assert_eq!(err.kind(), ErrorKind::FieldValidation);
        assert_eq!(err.desc(), "supply: foo_t.foo = 6: above threshold");
    }
}
