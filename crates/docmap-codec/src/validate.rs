use crate::entity::{Entity, FieldWriter};
use crate::error::{CodecError, CodecResult};

/// Names of the fields `entity` currently has set, in declaration order.
pub fn present_fields<E: Entity>(entity: &E) -> CodecResult<Vec<String>> {
    let mut probe = FieldWriter::probing(E::schema());
    entity.write_fields(&mut probe)?;
    Ok(probe.into_present())
}

/// Check that every mandatory field is set.
///
/// Runs when an instance is constructed from stored data. Later edits are
/// not re-checked.
pub fn validate<E: Entity>(entity: &E) -> CodecResult<()> {
    let schema = E::schema();
    if schema.mandatory.is_empty() {
        return Ok(());
    }

    let present = present_fields(entity)?;
    match schema
        .mandatory
        .iter()
        .find(|field| !present.iter().any(|p| p.as_str() == **field))
    {
        Some(field) => Err(CodecError::MissingMandatoryField {
            entity: schema.type_name,
            field: (*field).to_owned(),
        }),
        None => Ok(()),
    }
}
