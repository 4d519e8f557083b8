use docmap_store::StoreError;
use docmap_types::TypeError;

/// Errors from encoding, decoding and validation.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A mandatory field was absent after decoding.
    #[error("{entity}: missing mandatory field {field}")]
    MissingMandatoryField { entity: &'static str, field: String },

    /// A stored value does not fit the declared field type.
    ///
    /// `field` is a dotted path from the outermost entity.
    #[error("field {field}: expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    /// A wrapper tagged with one entity type was decoded into another.
    #[error("wrapper tagged {found} cannot decode into {expected}")]
    EntityMismatch { expected: &'static str, found: String },

    /// An opaque value's type has no registered blob codec.
    #[error("no blob codec registered for {0}")]
    UnregisteredCodec(&'static str),

    /// A blob codec failed to serialize or deserialize.
    #[error("blob codec for {type_name} failed: {reason}")]
    Blob {
        type_name: &'static str,
        reason: String,
    },

    /// A referenced entity has no identity value to point at.
    #[error("cannot reference {0} without an identity value")]
    MissingIdentity(&'static str),

    /// A reference needed resolving but no store was supplied.
    #[error("no storage configured")]
    NoStore,

    /// The entity's static schema is inconsistent.
    #[error("invalid schema for {entity}: {reason}")]
    InvalidSchema { entity: &'static str, reason: String },

    /// Failure from the storage collaborator during reference resolution.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CodecError {
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            field: String::new(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Prefix a type mismatch with the field it occurred in.
    pub(crate) fn at_field(self, name: &str) -> Self {
        match self {
            Self::TypeMismatch {
                field,
                expected,
                found,
            } => Self::TypeMismatch {
                field: if field.is_empty() {
                    name.to_owned()
                } else {
                    format!("{name}.{field}")
                },
                expected,
                found,
            },
            other => other,
        }
    }

    /// Returns `true` for errors caused by missing setup rather than bad data.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::NoStore | Self::UnregisteredCodec(_) | Self::InvalidSchema { .. })
    }
}

impl From<TypeError> for CodecError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::Mismatch { expected, found } => Self::mismatch(expected, found),
            other => Self::mismatch("convertible value", other.to_string()),
        }
    }
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
