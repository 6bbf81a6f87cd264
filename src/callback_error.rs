use thiserror::Error;

/// Broad category of a [`CallbackError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Raised while decorating a function.
    Configuration,
    /// A spent callback was handed to a new owner.
    Ownership,
    /// A callback was released twice.
    Usage,
    /// The call's arguments do not fit the declared signature.
    Binding,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("wrapped function '{function}' has no parameter '{parameter}'")]
    MissingParameter { function: String, parameter: String },

    #[error("cannot take ownership of a callback which is already consumed")]
    AlreadyConsumed,

    #[error("cannot release a callback which is already released")]
    AlreadyReleased,

    #[error("'{function}' takes {expected} positional arguments but {given} were given")]
    TooManyPositional {
        function: String,
        expected: usize,
        given: usize,
    },

    #[error("'{function}' got multiple values for argument '{parameter}'")]
    MultipleValues { function: String, parameter: String },

    #[error("'{function}' got an unexpected keyword argument '{parameter}'")]
    UnexpectedKeyword { function: String, parameter: String },

    #[error("'{function}' is missing required argument '{parameter}'")]
    MissingArgument { function: String, parameter: String },

    #[error("argument '{parameter}' is not a {expected}")]
    ArgumentType {
        parameter: String,
        expected: &'static str,
    },
}

impl CallbackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CallbackError::MissingParameter { .. } => ErrorKind::Configuration,
            CallbackError::AlreadyConsumed => ErrorKind::Ownership,
            CallbackError::AlreadyReleased => ErrorKind::Usage,
            CallbackError::TooManyPositional { .. }
            | CallbackError::MultipleValues { .. }
            | CallbackError::UnexpectedKeyword { .. }
            | CallbackError::MissingArgument { .. }
            | CallbackError::ArgumentType { .. } => ErrorKind::Binding,
        }
    }
}
