use docmap_types::{Document, Value};

use crate::error::{StoreError, StoreResult};
use crate::filter::Filter;

/// Sort direction for a `$sort` stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_value(self) -> Value {
        match self {
            Self::Ascending => Value::Int(1),
            Self::Descending => Value::Int(-1),
        }
    }
}

/// An aggregation pipeline: an ordered list of single-key stage documents.
///
/// The mapping layer passes pipelines through to storage without looking at
/// them. The builder methods produce the stage shapes the in-memory backend
/// understands (`$match`, `$sort`, `$skip`, `$limit`, `$project`); callers
/// targeting another backend may push arbitrary stage documents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pipeline {
    stages: Vec<Document>,
}

impl Pipeline {
    /// Create an empty pipeline (returns every document).
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Wrap pre-built stage documents.
    pub fn from_stages(stages: Vec<Document>) -> Self {
        Self { stages }
    }

    /// Append a raw stage document.
    pub fn push(mut self, stage: Document) -> Self {
        self.stages.push(stage);
        self
    }

    /// Keep documents matching `filter`.
    pub fn filter(self, filter: Filter) -> Self {
        let conditions = filter.conditions().clone();
        self.push(Document::new().with("$match", conditions))
    }

    /// Sort by one field.
    pub fn sort(self, field: &str, order: SortOrder) -> Self {
        self.push(Document::new().with("$sort", Document::new().with(field, order.as_value())))
    }

    pub fn skip(self, n: usize) -> Self {
        self.push(Document::new().with("$skip", count_value(n)))
    }

    pub fn limit(self, n: usize) -> Self {
        self.push(Document::new().with("$limit", count_value(n)))
    }

    /// Keep only the named fields.
    pub fn project(self, fields: &[&str]) -> Self {
        let projection = fields
            .iter()
            .fold(Document::new(), |doc, f| doc.with(*f, Value::Int(1)));
        self.push(Document::new().with("$project", projection))
    }

    pub fn stages(&self) -> &[Document] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

fn count_value(n: usize) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

/// A parsed pipeline stage, as interpreted by the in-memory backend.
#[derive(Clone, Debug, PartialEq)]
pub enum Stage {
    Match(Filter),
    /// Sort keys in field-name order (stage documents are name-ordered maps).
    Sort(Vec<(String, SortOrder)>),
    Skip(usize),
    Limit(usize),
    Project(Vec<String>),
}

impl Stage {
    /// Parse a single-key stage document.
    pub fn parse(stage: &Document) -> StoreResult<Self> {
        let mut entries = stage.iter();
        let (name, arg) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(StoreError::InvalidStage {
                    stage: Value::from(stage.clone()).to_string(),
                    reason: "stage must have exactly one key".into(),
                })
            }
        };

        match name.as_str() {
            "$match" => Ok(Self::Match(Filter::from(map_arg(name, arg)?))),
            "$sort" => {
                let body = map_arg(name, arg)?;
                let keys = body
                    .iter()
                    .map(|(field, dir)| {
                        let order = match dir.as_i64() {
                            Some(1) => SortOrder::Ascending,
                            Some(-1) => SortOrder::Descending,
                            _ => return Err(invalid(name, format!("bad direction for {field}: {dir}"))),
                        };
                        Ok((field.clone(), order))
                    })
                    .collect::<StoreResult<Vec<_>>>()?;
                Ok(Self::Sort(keys))
            }
            "$skip" => Ok(Self::Skip(count_arg(name, arg)?)),
            "$limit" => Ok(Self::Limit(count_arg(name, arg)?)),
            "$project" => {
                let body = map_arg(name, arg)?;
                let fields = body
                    .iter()
                    .filter(|(_, keep)| keep.as_i64() == Some(1) || keep.as_bool() == Some(true))
                    .map(|(field, _)| field.clone())
                    .collect();
                Ok(Self::Project(fields))
            }
            other => Err(StoreError::UnsupportedStage(other.to_owned())),
        }
    }

    /// Run this stage over a batch of documents.
    pub fn apply(&self, mut docs: Vec<Document>) -> Vec<Document> {
        match self {
            Self::Match(filter) => {
                docs.retain(|d| filter.matches(d));
                docs
            }
            Self::Sort(keys) => {
                docs.sort_by(|a, b| {
                    keys.iter()
                        .map(|(field, order)| {
                            let av = a.get(field).unwrap_or(&Value::Null);
                            let bv = b.get(field).unwrap_or(&Value::Null);
                            match order {
                                SortOrder::Ascending => av.sort_cmp(bv),
                                SortOrder::Descending => bv.sort_cmp(av),
                            }
                        })
                        .find(|ord| ord.is_ne())
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                docs
            }
            Self::Skip(n) => docs.into_iter().skip(*n).collect(),
            Self::Limit(n) => {
                docs.truncate(*n);
                docs
            }
            Self::Project(fields) => docs
                .into_iter()
                .map(|mut d| {
                    d.retain(|k, _| fields.iter().any(|f| f == k));
                    d
                })
                .collect(),
        }
    }
}

fn invalid(stage: &str, reason: String) -> StoreError {
    StoreError::InvalidStage {
        stage: stage.to_owned(),
        reason,
    }
}

fn map_arg(stage: &str, arg: &Value) -> StoreResult<Document> {
    match arg {
        Value::Map(map) => Ok(Document::from(map.clone())),
        other => Err(invalid(stage, format!("expected map, found {}", other.kind()))),
    }
}

fn count_arg(stage: &str, arg: &Value) -> StoreResult<usize> {
    arg.as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(stage, format!("expected non-negative integer, found {arg}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_types::doc;

    fn people() -> Vec<Document> {
        vec![
            doc! { "name" => "carol", "age" => 41 },
            doc! { "name" => "alice", "age" => 30 },
            doc! { "name" => "bob", "age" => 35 },
        ]
    }

    fn run(pipeline: &Pipeline, docs: Vec<Document>) -> Vec<Document> {
        pipeline
            .stages()
            .iter()
            .map(|s| Stage::parse(s).unwrap())
            .fold(docs, |acc, stage| stage.apply(acc))
    }

    fn names(docs: &[Document]) -> Vec<&str> {
        docs.iter()
            .map(|d| d.get("name").and_then(Value::as_str).unwrap())
            .collect()
    }

    #[test]
    fn builder_emits_single_key_stages() {
        let p = Pipeline::new().filter(Filter::eq("a", 1)).skip(2).limit(3);
        assert_eq!(p.len(), 3);
        for stage in p.stages() {
            assert_eq!(stage.len(), 1);
        }
    }

    #[test]
    fn sort_ascending_and_descending() {
        let asc = run(&Pipeline::new().sort("age", SortOrder::Ascending), people());
        assert_eq!(names(&asc), ["alice", "bob", "carol"]);
        let desc = run(&Pipeline::new().sort("name", SortOrder::Descending), people());
        assert_eq!(names(&desc), ["carol", "bob", "alice"]);
    }

    #[test]
    fn match_skip_limit() {
        let p = Pipeline::new()
            .sort("age", SortOrder::Ascending)
            .skip(1)
            .limit(1);
        assert_eq!(names(&run(&p, people())), ["bob"]);

        let p = Pipeline::new().filter(Filter::eq("age", 30));
        assert_eq!(names(&run(&p, people())), ["alice"]);
    }

    #[test]
    fn project_keeps_named_fields() {
        let out = run(&Pipeline::new().project(&["name"]), people());
        assert!(out.iter().all(|d| d.len() == 1 && d.contains_key("name")));
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let err = Stage::parse(&doc! { "$lookup" => doc! {} }).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedStage(ref s) if s == "$lookup"));
    }

    #[test]
    fn multi_key_stage_is_invalid() {
        let err = Stage::parse(&doc! { "$skip" => 1, "$limit" => 1 }).unwrap_err();
        assert!(matches!(err, StoreError::InvalidStage { .. }));
    }

    #[test]
    fn negative_limit_is_invalid() {
        let err = Stage::parse(&doc! { "$limit" => -1 }).unwrap_err();
        assert!(matches!(err, StoreError::InvalidStage { .. }));
    }

    #[test]
    fn bad_sort_direction_is_invalid() {
        let err = Stage::parse(&doc! { "$sort" => doc! { "age" => 2 } }).unwrap_err();
        assert!(matches!(err, StoreError::InvalidStage { .. }));
    }
}
