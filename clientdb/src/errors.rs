use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic, ReadExecutor};

/// Error kinds for ClientDb operations.
///
/// This enum represents all possible error types that can occur during document
/// store operations. Each error kind describes a specific category of failure,
/// enabling precise error handling.
///
/// # Examples
///
/// ```rust,ignore
/// use clientdb::errors::{ClientDbError, ErrorKind, ClientDbResult};
///
/// fn example() -> ClientDbResult<()> {
///     Err(ClientDbError::new("Document does not have an id", ErrorKind::NotIdentifiable))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Identity errors - used in add/update/upsert/delete operations
    /// One or more documents lack the required identifier field
    NotIdentifiable,
    /// A structurally identical document already exists in the collection
    DuplicateDocument,
    /// The targeted document was not found in the collection
    NotFound,

    // Operation errors
    /// The operation is not valid in the current context (e.g. empty argument list)
    InvalidOperation,

    // Validation errors - used in document/field and registry validation
    /// Generic validation error (empty field key, empty collection name)
    ValidationError,
    /// A subscription was registered with a malformed configuration
    InvalidSubscription,

    // Registry errors
    /// Collection does not exist
    CollectionNotFound,

    // Generic/internal errors - used as fallback
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotIdentifiable => write!(f, "Not identifiable"),
            ErrorKind::DuplicateDocument => write!(f, "Duplicate document"),
            ErrorKind::NotFound => write!(f, "Not found"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::ValidationError => write!(f, "Validation error"),
            ErrorKind::InvalidSubscription => write!(f, "Invalid subscription"),
            ErrorKind::CollectionNotFound => write!(f, "Collection not found"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom ClientDb error type.
///
/// `ClientDbError` encapsulates error information including the error message,
/// kind, and optional cause. It supports error chaining and backtraces for
/// debugging.
///
/// # Examples
///
/// ```rust,ignore
/// use clientdb::errors::{ClientDbError, ErrorKind};
///
/// // Create a simple error
/// let err = ClientDbError::new("Doc should have \"id\"", ErrorKind::NotIdentifiable);
///
/// // Create an error with a cause
/// let cause = ClientDbError::new("Field key is empty", ErrorKind::ValidationError);
/// let err = ClientDbError::new_with_cause("Add failed", ErrorKind::InvalidOperation, cause);
/// ```
///
/// # Type alias
///
/// The `ClientDbResult<T>` type alias is equivalent to `Result<T, ClientDbError>`
/// and is used throughout the codebase for operations that can fail.
#[derive(Clone)]
pub struct ClientDbError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<ClientDbError>>,
    backtrace: Atomic<Backtrace>,
}

impl ClientDbError {
    /// Creates a new `ClientDbError` with the specified message and error kind.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        ClientDbError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `ClientDbError` with a cause error.
    ///
    /// This creates an error chain where the cause error is preserved for debugging.
    ///
    /// # Arguments
    ///
    /// * `message` - A description of the error
    /// * `error_kind` - The category of error
    /// * `cause` - The underlying error that caused this error
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: ClientDbError) -> Self {
        ClientDbError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&Box<ClientDbError>> {
        self.cause.as_ref()
    }
}

impl Display for ClientDbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for ClientDbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => self
                .backtrace
                .read_with(|bt| write!(f, "{}\n{:?}", self.message, bt)),
        }
    }
}

impl Error for ClientDbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for ClientDb operations.
///
/// `ClientDbResult<T>` is shorthand for `Result<T, ClientDbError>`.
/// All fallible ClientDb operations return this type.
pub type ClientDbResult<T> = Result<T, ClientDbError>;

// From trait implementations for automatic error conversion
impl From<String> for ClientDbError {
    fn from(msg: String) -> Self {
        ClientDbError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for ClientDbError {
    fn from(msg: &str) -> Self {
        ClientDbError::new(msg, ErrorKind::InternalError)
    }
}
