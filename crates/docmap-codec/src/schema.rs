use crate::error::{CodecError, CodecResult};

/// Identity field used when a schema does not name one.
pub const DEFAULT_ID_FIELD: &str = "_id";

/// Leading marker of private field names. Such keys are never encoded or
/// decoded, except for the schema's own identity field.
pub const RESERVED_PREFIX: char = '_';

/// Static description of one entity type.
///
/// Schemas are built in `const` context so each entity type can expose a
/// `static` descriptor:
///
/// ```
/// use docmap_codec::EntitySchema;
///
/// static ACCOUNT: EntitySchema = EntitySchema::new("Account", "accounts")
///     .with_id_field("user_id")
///     .requiring(&["user_id"])
///     .marshaling(&["user_id", "balance"]);
///
/// assert!(ACCOUNT.is_mandatory("user_id"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntitySchema {
    /// Name written into reference wrappers.
    pub type_name: &'static str,
    /// Storage location (collection) holding this type's documents.
    pub collection: &'static str,
    /// Field whose value uniquely addresses a stored record.
    pub id_field: &'static str,
    /// Fields left out of documents written by `save`.
    pub ignored: &'static [&'static str],
    /// Fields exposed by a marshaled dump.
    pub marshaled: &'static [&'static str],
    /// Fields that must be set once an instance is constructed.
    pub mandatory: &'static [&'static str],
}

impl EntitySchema {
    /// A schema with the default identity field and empty field sets.
    pub const fn new(type_name: &'static str, collection: &'static str) -> Self {
        Self {
            type_name,
            collection,
            id_field: DEFAULT_ID_FIELD,
            ignored: &[],
            marshaled: &[],
            mandatory: &[],
        }
    }

    pub const fn with_id_field(self, id_field: &'static str) -> Self {
        Self { id_field, ..self }
    }

    pub const fn ignoring(self, ignored: &'static [&'static str]) -> Self {
        Self { ignored, ..self }
    }

    pub const fn marshaling(self, marshaled: &'static [&'static str]) -> Self {
        Self { marshaled, ..self }
    }

    pub const fn requiring(self, mandatory: &'static [&'static str]) -> Self {
        Self { mandatory, ..self }
    }

    pub fn is_ignored(&self, field: &str) -> bool {
        self.ignored.iter().any(|f| *f == field)
    }

    pub fn is_marshaled(&self, field: &str) -> bool {
        self.marshaled.iter().any(|f| *f == field)
    }

    pub fn is_mandatory(&self, field: &str) -> bool {
        self.mandatory.iter().any(|f| *f == field)
    }

    pub fn is_identity(&self, field: &str) -> bool {
        self.id_field == field
    }

    /// Whether `field` is private to the instance and must not cross the codec.
    pub fn is_reserved(&self, field: &str) -> bool {
        field.starts_with(RESERVED_PREFIX) && !self.is_identity(field)
    }

    /// Check the descriptor for contradictions.
    pub fn check(&self) -> CodecResult<()> {
        let fail = |reason: String| {
            Err(CodecError::InvalidSchema {
                entity: self.type_name,
                reason,
            })
        };

        if self.type_name.is_empty() {
            return fail("empty type name".into());
        }
        if self.collection.is_empty() {
            return fail("empty collection name".into());
        }
        if self.id_field.is_empty() {
            return fail("empty identity field".into());
        }
        if self.is_ignored(self.id_field) {
            return fail(format!("identity field {} cannot be ignored", self.id_field));
        }
        for (set, names) in [
            ("ignored", self.ignored),
            ("marshaled", self.marshaled),
            ("mandatory", self.mandatory),
        ] {
            if let Some(name) = names.iter().find(|n| self.is_reserved(n)) {
                return fail(format!("{set} field {name} uses the reserved prefix"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static ACCOUNT: EntitySchema = EntitySchema::new("Account", "accounts")
        .with_id_field("user_id")
        .ignoring(&["session_token"])
        .marshaling(&["user_id", "balance"])
        .requiring(&["user_id"]);

    #[test]
    fn defaults() {
        let s = EntitySchema::new("Note", "notes");
        assert_eq!(s.id_field, "_id");
        assert!(s.ignored.is_empty());
        assert!(s.marshaled.is_empty());
        assert!(s.mandatory.is_empty());
        assert!(s.check().is_ok());
    }

    #[test]
    fn membership() {
        assert!(ACCOUNT.is_identity("user_id"));
        assert!(ACCOUNT.is_ignored("session_token"));
        assert!(ACCOUNT.is_marshaled("balance"));
        assert!(!ACCOUNT.is_marshaled("session_token"));
        assert!(ACCOUNT.is_mandatory("user_id"));
        assert!(!ACCOUNT.is_mandatory("balance"));
    }

    #[test]
    fn reserved_prefix_spares_identity() {
        let s = EntitySchema::new("Note", "notes");
        assert!(!s.is_reserved("_id"));
        assert!(s.is_reserved("_collection"));
        assert!(ACCOUNT.is_reserved("_id"));
        assert!(!ACCOUNT.is_reserved("balance"));
    }

    #[test]
    fn check_accepts_valid_schema() {
        assert!(ACCOUNT.check().is_ok());
    }

    #[test]
    fn check_rejects_ignored_identity() {
        let s = EntitySchema::new("Note", "notes").ignoring(&["_id"]);
        assert!(matches!(s.check(), Err(CodecError::InvalidSchema { .. })));
    }

    #[test]
    fn check_rejects_reserved_mandatory_field() {
        let s = EntitySchema::new("Note", "notes").requiring(&["_secret"]);
        let err = s.check().unwrap_err();
        assert!(err.to_string().contains("_secret"));
    }

    #[test]
    fn check_rejects_empty_collection() {
        let s = EntitySchema::new("Note", "");
        assert!(s.check().is_err());
    }
}
