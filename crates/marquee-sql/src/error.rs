use thiserror::Error;

/// Errors raised while rendering a statement to SQL text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// The value has no inline literal form (e.g. a nested collection).
    #[error("cannot escape {type_name} as an inline SQL literal")]
    Escape { type_name: &'static str },

    /// The statement (or batch) needs more placeholders than the backend
    /// protocol allows.
    #[error("statement uses parameter ${ordinal}, backend limit is {limit}")]
    ParameterOverflow { ordinal: usize, limit: usize },

    /// The same parameter name was bound to two different values within one
    /// statement.
    #[error("parameter \"{name}\" bound to two different values")]
    ParameterCollision { name: String },
}
