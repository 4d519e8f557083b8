use std::collections::BTreeSet;

use docmap_types::{Document, FieldValue, Value};
use tracing::trace;

use crate::blob::CodecRegistry;
use crate::entity::{Entity, FieldWriter};
use crate::error::{CodecError, CodecResult};

/// Settings threaded through one encoding pass, including nested entities.
#[derive(Clone, Copy, Debug)]
pub struct EncodeContext<'a> {
    registry: &'a CodecRegistry,
    compact_timestamps: bool,
}

impl<'a> EncodeContext<'a> {
    pub fn new(registry: &'a CodecRegistry) -> Self {
        Self {
            registry,
            compact_timestamps: false,
        }
    }

    /// Write timestamp fields as float epoch seconds.
    pub fn compact(self, compact_timestamps: bool) -> Self {
        Self {
            compact_timestamps,
            ..self
        }
    }

    pub fn registry(&self) -> &'a CodecRegistry {
        self.registry
    }

    pub fn compact_timestamps(&self) -> bool {
        self.compact_timestamps
    }
}

/// Options for a top-level [`encode`] call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    pub compact_timestamps: bool,
    /// Top-level field names to leave out. Nested entities are encoded in full.
    pub suppress: BTreeSet<String>,
    /// Write unset top-level fields as `null` instead of omitting them.
    pub unset_as_null: bool,
}

impl EncodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compact(mut self, on: bool) -> Self {
        self.compact_timestamps = on;
        self
    }

    pub fn unset_as_null(mut self, on: bool) -> Self {
        self.unset_as_null = on;
        self
    }

    pub fn suppress<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suppress.extend(fields.into_iter().map(Into::into));
        self
    }
}

/// Encode `entity` into a storable document.
///
/// Unset fields are omitted unless `unset_as_null` is set. Reserved (`_`-prefixed) fields other than the
/// identity are never written. When an entity offers the same name twice,
/// the first value wins.
pub fn encode<E: Entity>(
    entity: &E,
    registry: &CodecRegistry,
    options: &EncodeOptions,
) -> CodecResult<Document> {
    let ctx = EncodeContext::new(registry).compact(options.compact_timestamps);
    let doc = encode_with(entity, &ctx, &options.suppress, options.unset_as_null)?;
    trace!(
        entity = E::schema().type_name,
        fields = doc.len(),
        "encoded entity"
    );
    Ok(doc)
}

pub(crate) fn encode_with<E: Entity>(
    entity: &E,
    ctx: &EncodeContext<'_>,
    suppress: &BTreeSet<String>,
    unset_as_null: bool,
) -> CodecResult<Document> {
    let mut writer = FieldWriter::encoding(E::schema(), ctx, suppress, unset_as_null);
    entity.write_fields(&mut writer)?;
    Ok(writer.into_document())
}

/// Current value of the entity's identity field, if set.
pub fn identity_value<E: Entity>(entity: &E, registry: &CodecRegistry) -> CodecResult<Option<Value>> {
    identity_with(entity, &EncodeContext::new(registry))
}

pub(crate) fn identity_with<E: Entity>(
    entity: &E,
    ctx: &EncodeContext<'_>,
) -> CodecResult<Option<Value>> {
    let schema = E::schema();
    // Identities are compared against stored values, so never compacted.
    let ctx = EncodeContext::new(ctx.registry());
    let mut writer = FieldWriter::capturing(schema, &ctx, schema.id_field);
    entity.write_fields(&mut writer)?;

    match writer.into_captured() {
        None | Some(FieldValue::Scalar(Value::Null)) => Ok(None),
        Some(FieldValue::Scalar(value)) => Ok(Some(value)),
        Some(other) => Err(CodecError::TypeMismatch {
            field: schema.id_field.to_owned(),
            expected: "scalar identity".into(),
            found: other.kind().into(),
        }),
    }
}

/// Encode `entity` for display or export.
///
/// Ignored fields are left out. With `marshaled`, only the schema's marshaled
/// fields are kept.
pub fn dump<E: Entity>(
    entity: &E,
    registry: &CodecRegistry,
    marshaled: bool,
    compact_timestamps: bool,
) -> CodecResult<Document> {
    let schema = E::schema();
    let options = EncodeOptions::new()
        .compact(compact_timestamps)
        .suppress(schema.ignored.iter().copied());
    let mut doc = encode(entity, registry, &options)?;
    if marshaled {
        doc.retain(|name, _| schema.is_marshaled(name));
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode, DecodeContext};
    use crate::fixtures::{registry, Account, Address, Order, Palette, Sticker, Tangle};
    use crate::validate::present_fields;
    use crate::persist::{Embedded, Opaque, Ref};
    use chrono::{TimeZone, Utc};
    use docmap_types::field::{DATA_KEY, ID_FIELD_KEY, ID_VALUE_KEY, TYPE_KEY};

    fn encode_plain<E: Entity>(entity: &E) -> Document {
        encode(entity, &registry(), &EncodeOptions::new()).unwrap()
    }

    // --- scalars and omission ----------------------------------------------

    #[test]
    fn unset_fields_are_omitted() {
        let doc = encode_plain(&Account::new("u1"));
        assert_eq!(doc.get("user_id"), Some(&Value::from("u1")));
        assert!(!doc.contains_key("balance"));
        assert!(!doc.contains_key("created"));
    }

    #[test]
    fn unset_fields_can_be_written_as_null() {
        let mut account = Account::new("u1");
        account.scratch = Some("local".into());
        let options = EncodeOptions::new()
            .unset_as_null(true)
            .suppress(["session_token"]);
        let doc = encode(&account, &registry(), &options).unwrap();
        assert_eq!(doc.get("user_id"), Some(&Value::from("u1")));
        assert_eq!(doc.get("balance"), Some(&Value::Null));
        assert_eq!(doc.get("nickname"), Some(&Value::Null));
        assert!(!doc.contains_key("session_token"));
        assert!(!doc.contains_key("_scratch"));
    }

    #[test]
    fn null_value_is_written_as_unset() {
        let sticker = Sticker {
            id: Some("s1".into()),
            payload: Some(Value::Null),
        };
        let registry = registry();
        let doc = encode(&sticker, &registry, &EncodeOptions::new()).unwrap();
        assert!(!doc.contains_key("payload"));
        assert!(!present_fields(&sticker).unwrap().contains(&"payload".to_string()));

        let back: Sticker = decode(&doc, &DecodeContext::new(&registry)).unwrap();
        assert_eq!(back.payload, None);

        let set = Sticker {
            payload: Some(Value::from(3)),
            ..sticker
        };
        let doc = encode(&set, &registry, &EncodeOptions::new()).unwrap();
        assert_eq!(doc.get("payload"), Some(&Value::Int(3)));
    }

    #[test]
    fn reserved_fields_are_never_written() {
        let mut account = Account::new("u1");
        account.scratch = Some("local".into());
        let doc = encode_plain(&account);
        assert!(!doc.contains_key("_scratch"));
    }

    #[test]
    fn first_write_wins_on_duplicate_names() {
        let doc = encode_plain(&Tangle::default());
        assert_eq!(doc.get("label"), Some(&Value::from("first")));
    }

    #[test]
    fn suppress_drops_top_level_only() {
        let mut order = Order::new("o1");
        order.ship_to = Some(Embedded(Address::new("Main St", "Springfield")));
        let options = EncodeOptions::new().suppress(["city", "number"]);
        let doc = encode(&order, &registry(), &options).unwrap();
        assert!(!doc.contains_key("number"));

        let ship_to = doc.get("ship_to").and_then(Value::as_map).unwrap();
        let data = ship_to.get(DATA_KEY).and_then(Value::as_map).unwrap();
        assert_eq!(data.get("city"), Some(&Value::from("Springfield")));
    }

    // --- wrappers -----------------------------------------------------------

    #[test]
    fn embedded_entity_uses_document_wrapper() {
        let mut order = Order::new("o1");
        order.ship_to = Some(Embedded(Address::new("Main St", "Springfield")));
        let doc = encode_plain(&order);
        let wrapper = doc.get("ship_to").and_then(Value::as_map).unwrap();
        assert_eq!(wrapper.len(), 2);
        assert_eq!(wrapper.get(TYPE_KEY), Some(&Value::from("document")));
    }

    #[test]
    fn reference_carries_identity_only() {
        let mut order = Order::new("o1");
        let mut buyer = Account::new("u7");
        buyer.balance = Some(12.5);
        order.buyer = Some(Ref(buyer));

        let doc = encode_plain(&order);
        let wrapper = doc.get("buyer").and_then(Value::as_map).unwrap();
        assert_eq!(wrapper.get(TYPE_KEY), Some(&Value::from("Account")));
        assert_eq!(wrapper.get(ID_FIELD_KEY), Some(&Value::from("user_id")));
        assert_eq!(wrapper.get(ID_VALUE_KEY), Some(&Value::from("u7")));
        assert!(!wrapper.contains_key(DATA_KEY));
    }

    #[test]
    fn reference_without_identity_fails() {
        let mut order = Order::new("o1");
        order.buyer = Some(Ref(Account::default()));
        let err = encode(&order, &registry(), &EncodeOptions::new()).unwrap_err();
        assert!(matches!(err, CodecError::MissingIdentity("Account")));
    }

    #[test]
    fn opaque_field_uses_binary_wrapper() {
        let mut order = Order::new("o1");
        order.palette = Some(Opaque(Palette::sample()));
        let doc = encode_plain(&order);
        let wrapper = doc.get("palette").and_then(Value::as_map).unwrap();
        assert_eq!(wrapper.get(TYPE_KEY), Some(&Value::from("binary")));
        assert!(wrapper.get(DATA_KEY).and_then(Value::as_bytes).is_some());
    }

    #[test]
    fn opaque_without_codec_is_configuration_error() {
        let mut order = Order::new("o1");
        order.palette = Some(Opaque(Palette::sample()));
        let err = encode(&order, &CodecRegistry::new(), &EncodeOptions::new()).unwrap_err();
        assert!(err.is_configuration());
    }

    // --- compact mode -------------------------------------------------------

    #[test]
    fn compact_mode_reaches_nested_entities() {
        let created = Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap();
        let mut address = Address::new("Main St", "Springfield");
        address.verified_at = Some(created);
        let mut order = Order::new("o1");
        order.placed_at = Some(created);
        order.ship_to = Some(Embedded(address));

        let doc = encode(&order, &registry(), &EncodeOptions::new().compact(true)).unwrap();
        assert_eq!(doc.get("placed_at"), Some(&Value::Float(created.timestamp() as f64)));
        let nested = doc
            .get("ship_to")
            .and_then(Value::as_map)
            .and_then(|w| w.get(DATA_KEY))
            .and_then(Value::as_map)
            .unwrap();
        assert!(matches!(nested.get("verified_at"), Some(Value::Float(_))));
    }

    // --- identity and dump --------------------------------------------------

    #[test]
    fn identity_value_reads_id_field() {
        let registry = registry();
        assert_eq!(
            identity_value(&Account::new("u3"), &registry).unwrap(),
            Some(Value::from("u3"))
        );
        assert_eq!(identity_value(&Account::default(), &registry).unwrap(), None);
    }

    #[test]
    fn dump_hides_ignored_fields() {
        let mut account = Account::new("u1");
        account.session_token = Some("secret".into());
        account.balance = Some(3.0);
        let doc = dump(&account, &registry(), false, false).unwrap();
        assert!(!doc.contains_key("session_token"));
        assert!(doc.contains_key("balance"));
    }

    #[test]
    fn marshaled_dump_keeps_only_marshaled_fields() {
        let mut account = Account::new("u1");
        account.balance = Some(3.0);
        account.nickname = Some("ace".into());
        let doc = dump(&account, &registry(), true, false).unwrap();
        let keys: Vec<_> = doc.keys().cloned().collect();
        assert_eq!(keys, ["balance", "user_id"]);
    }
}
