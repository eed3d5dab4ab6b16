//! Error types for entity construction, schema compilation and rendering.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building an entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field `{field}` for {entity}")]
    MissingField { entity: &'static str, field: String },

    #[error("invalid `{field}` for {entity}: {message}")]
    Invalid {
        entity: &'static str,
        field: String,
        message: String,
    },
}

impl ValidationError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        1
    }
}

/// Errors during type-to-schema compilation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// No classification step claimed the source. Inside the compiler this
    /// only means "try the next step"; callers see it once every step and the
    /// fallback have abstained.
    #[error("cannot create schema from type: {source_type}")]
    Unresolved { source_type: String },

    /// A member type failed; `path` locates it from the top-level source.
    #[error("failed to compile {path}: {source}")]
    Nested {
        path: String,
        #[source]
        source: Box<CompileError>,
    },

    #[error("type nesting exceeds {limit} levels at {path}")]
    DepthExceeded { limit: usize, path: String },

    #[error("type '{name}' contains itself at {path}")]
    Cycle { name: String, path: String },
}

impl CompileError {
    /// Wrap a member failure, folding nested paths into one.
    pub(crate) fn nested(segment: &str, err: CompileError) -> Self {
        match err {
            CompileError::Nested { path, source } => CompileError::Nested {
                path: format!("{}/{}", segment, path),
                source,
            },
            other => CompileError::Nested {
                path: segment.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, past every `Nested` wrapper.
    pub fn root_cause(&self) -> &CompileError {
        match self {
            CompileError::Nested { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors during rendering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("entity nesting exceeds {limit} levels at {entity}")]
    DepthExceeded { limit: usize, entity: &'static str },

    #[error("cannot represent non-finite number {value} in JSON")]
    NonFiniteNumber { value: f64 },
}

impl RenderError {
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors parsing a textual type expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type expression at {position}: {message}")]
pub struct ParseError {
    /// Byte offset into the expression.
    pub position: usize,
    pub message: String,
}

/// Errors building a document from a route manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Input errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("type '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: ParseError,
    },

    #[error("type '{name}': {source}")]
    Compile {
        name: String,
        #[source]
        source: CompileError,
    },

    #[error("unknown HTTP method \"{method}\" for {path}")]
    UnknownMethod { path: String, method: String },

    #[error("unknown parameter location \"{location}\" for '{name}' in {path}")]
    UnknownLocation {
        path: String,
        name: String,
        location: String,
    },

    #[error(transparent)]
    Render(#[from] RenderError),

    // Validation errors (exit code 1)
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ManifestError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ManifestError::FileNotFound { .. } | ManifestError::ReadError { .. } => 3,
            ManifestError::Validation(e) => e.exit_code(),
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_field_and_entity() {
        let err = ValidationError::MissingField {
            entity: "Response",
            field: "description".into(),
        };
        assert_eq!(
            err.to_string(),
            "missing required field `description` for Response"
        );
    }

    #[test]
    fn nested_paths_fold() {
        let inner = CompileError::Unresolved {
            source_type: "Widget".into(),
        };
        let err = CompileError::nested("items", inner);
        let err = CompileError::nested("properties/tags", err);

        match &err {
            CompileError::Nested { path, .. } => assert_eq!(path, "properties/tags/items"),
            other => panic!("expected nested error, got {:?}", other),
        }
        assert!(matches!(
            err.root_cause(),
            CompileError::Unresolved { source_type } if source_type == "Widget"
        ));
        assert_eq!(
            err.to_string(),
            "failed to compile properties/tags/items: cannot create schema from type: Widget"
        );
    }

    #[test]
    fn manifest_error_exit_codes() {
        let err = ManifestError::FileNotFound {
            path: PathBuf::from("routes.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = ManifestError::UnknownMethod {
            path: "/pets".into(),
            method: "fetch".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = ManifestError::Validation(ValidationError::MissingField {
            entity: "Info",
            field: "title".into(),
        });
        assert_eq!(err.exit_code(), 1);
    }
}
