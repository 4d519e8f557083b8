use docmap_codec::CodecError;
use docmap_store::StoreError;
use thiserror::Error;

/// Coarse classification of an [`OdmError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing setup: no store, no blob codec, bad schema or config.
    Configuration,
    /// An instance failed its mandatory-field or identity rules.
    Validation,
    /// A write was refused by storage.
    Persistence,
    /// Stored data does not fit the entity type.
    Codec,
    /// Any other storage failure, including during reference resolution.
    Storage,
}

#[derive(Debug, Error)]
pub enum OdmError {
    #[error("no storage configured")]
    NoStore,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{entity}: missing mandatory field {field}")]
    Validation { entity: &'static str, field: String },

    #[error("could not insert document")]
    InsertFailed,

    #[error("{entity}: identity field {field} cannot be changed")]
    IdentityImmutable {
        entity: &'static str,
        field: &'static str,
    },

    #[error("codec error: {0}")]
    Codec(CodecError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl OdmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoStore | Self::Config(_) => ErrorKind::Configuration,
            Self::Validation { .. } | Self::IdentityImmutable { .. } => ErrorKind::Validation,
            Self::InsertFailed => ErrorKind::Persistence,
            Self::Codec(e) if e.is_configuration() => ErrorKind::Configuration,
            Self::Codec(CodecError::Store(_)) | Self::Store(_) => ErrorKind::Storage,
            Self::Codec(_) => ErrorKind::Codec,
        }
    }
}

impl From<CodecError> for OdmError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::NoStore => Self::NoStore,
            CodecError::MissingMandatoryField { entity, field } => Self::Validation { entity, field },
            CodecError::Store(e) => Self::Store(e),
            other => Self::Codec(other),
        }
    }
}

pub type OdmResult<T> = Result<T, OdmError>;
