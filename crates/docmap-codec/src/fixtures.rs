//! Sample entities shared by the unit tests.

use chrono::{DateTime, Utc};
use docmap_types::Value;
use serde::{Deserialize, Serialize};

use crate::blob::CodecRegistry;
use crate::entity::{Entity, FieldReader, FieldWriter};
use crate::error::CodecResult;
use crate::persist::{Embedded, Opaque, Ref};
use crate::schema::EntitySchema;

pub(crate) fn registry() -> CodecRegistry {
    let mut registry = CodecRegistry::new();
    registry.register_bincode::<Palette>();
    registry
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Palette {
    pub name: String,
    pub colors: Vec<(u8, u8, u8)>,
}

impl Palette {
    pub fn sample() -> Self {
        Self {
            name: "dusk".into(),
            colors: vec![(10, 20, 30), (200, 100, 0)],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Account {
    pub user_id: Option<String>,
    pub balance: Option<f64>,
    pub nickname: Option<String>,
    pub created: Option<DateTime<Utc>>,
    pub session_token: Option<String>,
    pub scratch: Option<String>,
}

static ACCOUNT: EntitySchema = EntitySchema::new("Account", "accounts")
    .with_id_field("user_id")
    .ignoring(&["session_token"])
    .marshaling(&["user_id", "balance"])
    .requiring(&["user_id"]);

impl Account {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::default()
        }
    }
}

impl Entity for Account {
    fn schema() -> &'static EntitySchema {
        &ACCOUNT
    }

    fn write_fields(&self, out: &mut FieldWriter<'_>) -> CodecResult<()> {
        out.field("user_id", &self.user_id)?;
        out.field("balance", &self.balance)?;
        out.field("nickname", &self.nickname)?;
        out.field("created", &self.created)?;
        out.field("session_token", &self.session_token)?;
        out.field("_scratch", &self.scratch)
    }

    fn read_field(&mut self, name: &str, input: FieldReader<'_>) -> CodecResult<()> {
        match name {
            "user_id" => self.user_id = input.read()?,
            "balance" => self.balance = input.read()?,
            "nickname" => self.nickname = input.read()?,
            "created" => self.created = input.read()?,
            "session_token" => self.session_token = input.read()?,
            "_scratch" => self.scratch = input.read()?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Address {
    pub street: Option<String>,
    pub city: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
}

static ADDRESS: EntitySchema = EntitySchema::new("Address", "addresses").requiring(&["street"]);

impl Address {
    pub fn new(street: &str, city: &str) -> Self {
        Self {
            street: Some(street.into()),
            city: Some(city.into()),
            verified_at: None,
        }
    }
}

impl Entity for Address {
    fn schema() -> &'static EntitySchema {
        &ADDRESS
    }

    fn write_fields(&self, out: &mut FieldWriter<'_>) -> CodecResult<()> {
        out.field("street", &self.street)?;
        out.field("city", &self.city)?;
        out.field("verified_at", &self.verified_at)
    }

    fn read_field(&mut self, name: &str, input: FieldReader<'_>) -> CodecResult<()> {
        match name {
            "street" => self.street = input.read()?,
            "city" => self.city = input.read()?,
            "verified_at" => self.verified_at = input.read()?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Order {
    pub number: Option<String>,
    pub placed_at: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
    pub ship_to: Option<Embedded<Address>>,
    pub buyer: Option<Ref<Account>>,
    pub palette: Option<Opaque<Palette>>,
}

static ORDER: EntitySchema = EntitySchema::new("Order", "orders")
    .with_id_field("number")
    .requiring(&["number"]);

impl Order {
    pub fn new(number: &str) -> Self {
        Self {
            number: Some(number.into()),
            ..Self::default()
        }
    }
}

impl Entity for Order {
    fn schema() -> &'static EntitySchema {
        &ORDER
    }

    fn write_fields(&self, out: &mut FieldWriter<'_>) -> CodecResult<()> {
        out.field("number", &self.number)?;
        out.field("placed_at", &self.placed_at)?;
        out.field("tags", &self.tags)?;
        out.field("ship_to", &self.ship_to)?;
        out.field("buyer", &self.buyer)?;
        out.field("palette", &self.palette)
    }

    fn read_field(&mut self, name: &str, input: FieldReader<'_>) -> CodecResult<()> {
        match name {
            "number" => self.number = input.read()?,
            "placed_at" => self.placed_at = input.read()?,
            "tags" => self.tags = input.read()?,
            "ship_to" => self.ship_to = input.read()?,
            "buyer" => self.buyer = input.read()?,
            "palette" => self.palette = input.read()?,
            _ => {}
        }
        Ok(())
    }
}

/// Offers the same field name twice.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Tangle;

static TANGLE: EntitySchema = EntitySchema::new("Tangle", "tangles");

impl Entity for Tangle {
    fn schema() -> &'static EntitySchema {
        &TANGLE
    }

    fn write_fields(&self, out: &mut FieldWriter<'_>) -> CodecResult<()> {
        out.value("label", &String::from("first"))?;
        out.value("label", &String::from("second"))
    }

    fn read_field(&mut self, _name: &str, _input: FieldReader<'_>) -> CodecResult<()> {
        Ok(())
    }
}

/// Holds a free-form value.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Sticker {
    pub id: Option<String>,
    pub payload: Option<Value>,
}

static STICKER: EntitySchema = EntitySchema::new("Sticker", "stickers");

impl Entity for Sticker {
    fn schema() -> &'static EntitySchema {
        &STICKER
    }

    fn write_fields(&self, out: &mut FieldWriter<'_>) -> CodecResult<()> {
        out.field("_id", &self.id)?;
        out.field("payload", &self.payload)
    }

    fn read_field(&mut self, name: &str, input: FieldReader<'_>) -> CodecResult<()> {
        match name {
            "_id" => self.id = input.read()?,
            "payload" => self.payload = input.read()?,
            _ => {}
        }
        Ok(())
    }
}
