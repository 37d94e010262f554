use serde_json::Value;
use tracing::{debug, warn};

use crate::encoding::{decode_key, encode_key};
use crate::error::Error;
use crate::filter::{RowView, matches_all};
use crate::index::HashIndex;
use crate::record::RecordStore;
use crate::types::{Operator, Record, SelectionCriterion, TableSchema};

use super::{Table, check_criteria, with_key};

/// How a query reaches its candidate records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPath {
    /// Resolve one record by key; `criterion` is the position of the
    /// `key = value` criterion used.
    PointLookup { criterion: usize },
    /// Fetch the index bucket of an indexed field; `criterion` is the
    /// position of the `field = value` criterion used.
    IndexScan { criterion: usize },
    /// Visit every record.
    FullScan,
}

impl AccessPath {
    /// Pick the access path for `criteria`: a key equality first, then an
    /// equality on an indexed field, otherwise a full scan. The first
    /// qualifying criterion wins.
    pub fn choose(schema: &TableSchema, criteria: &[SelectionCriterion]) -> Self {
        let is_eq = |c: &SelectionCriterion| c.operator == Operator::Eq;
        if let Some(pos) = criteria
            .iter()
            .position(|c| is_eq(c) && schema.is_key(&c.field_name))
        {
            return AccessPath::PointLookup { criterion: pos };
        }
        if let Some(pos) = criteria
            .iter()
            .position(|c| is_eq(c) && schema.is_indexed(&c.field_name))
        {
            return AccessPath::IndexScan { criterion: pos };
        }
        AccessPath::FullScan
    }
}

impl Table {
    /// Return every record matching all of `criteria`, with the key field
    /// merged in.
    ///
    /// Uses a key lookup or an index bucket when a suitable equality
    /// criterion is present; the result is the same as [`scan_table`]
    /// would return, in key order for scans and bucket order for index
    /// lookups.
    ///
    /// [`scan_table`]: Table::scan_table
    pub fn query_table(&self, criteria: &[SelectionCriterion]) -> Result<Vec<Record>, Error> {
        let schema = self.live_schema()?;
        check_criteria(&schema, criteria)?;
        let path = AccessPath::choose(&schema, criteria);
        debug!(table = %schema.name, ?path, criteria = criteria.len(), "query");
        self.run_query(&schema, criteria, path)
    }

    /// Like [`query_table`](Table::query_table) but always visits every
    /// record, ignoring keys and indexes.
    pub fn scan_table(&self, criteria: &[SelectionCriterion]) -> Result<Vec<Record>, Error> {
        let schema = self.live_schema()?;
        check_criteria(&schema, criteria)?;
        self.run_query(&schema, criteria, AccessPath::FullScan)
    }

    /// The access path [`query_table`](Table::query_table) would take.
    pub fn explain(&self, criteria: &[SelectionCriterion]) -> Result<AccessPath, Error> {
        let schema = self.live_schema()?;
        check_criteria(&schema, criteria)?;
        Ok(AccessPath::choose(&schema, criteria))
    }

    /// Primary key values of every matching record.
    pub(super) fn matching_keys(&self, criteria: &[SelectionCriterion]) -> Result<Vec<Value>, Error> {
        let schema = self.live_schema()?;
        check_criteria(&schema, criteria)?;
        let path = AccessPath::choose(&schema, criteria);
        Ok(self
            .run_query(&schema, criteria, path)?
            .into_iter()
            .map(|mut rec| rec.remove(&schema.key_field).unwrap_or(Value::Null))
            .collect())
    }

    fn run_query(
        &self,
        schema: &TableSchema,
        criteria: &[SelectionCriterion],
        path: AccessPath,
    ) -> Result<Vec<Record>, Error> {
        let backend = self.backend();
        let records = RecordStore::open(backend, &schema.name)?;
        let all: Vec<&SelectionCriterion> = criteria.iter().collect();

        let candidates: Vec<String> = match path {
            AccessPath::PointLookup { criterion } => {
                // A literal that cannot be a key matches nothing.
                match encode_key(&criteria[criterion].value) {
                    Ok(encoded) if records.contains(&encoded) => vec![encoded],
                    _ => Vec::new(),
                }
            }
            AccessPath::IndexScan { criterion } => {
                let c = &criteria[criterion];
                let index = HashIndex::open(backend, &schema.name, &c.field_name)?;
                index.bucket(&c.value)?
            }
            AccessPath::FullScan => {
                let mut out = Vec::new();
                for entry in records.scan() {
                    let (key, record) = entry?;
                    if row_matches(schema, &all, key, record)? {
                        out.push(with_key(schema, key, record)?);
                    }
                }
                return Ok(out);
            }
        };

        let mut out = Vec::with_capacity(candidates.len());
        for key in candidates {
            let Some(record) = records.get(&key)? else {
                warn!(table = %schema.name, key = %key, "index entry points at a missing record");
                continue;
            };
            if row_matches(schema, &all, &key, record)? {
                out.push(with_key(schema, &key, record)?);
            }
        }
        Ok(out)
    }
}

fn row_matches(
    schema: &TableSchema,
    criteria: &[&SelectionCriterion],
    encoded_key: &str,
    record: &Record,
) -> Result<bool, Error> {
    let key = decode_key(encoded_key)?;
    let row = RowView {
        table: &schema.name,
        key_field: &schema.key_field,
        key: &key,
        record,
    };
    Ok(matches_all(criteria, &row)?)
}
