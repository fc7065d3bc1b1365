//! Connection-free SQL compilation of filters, pagination and writes.
//!
//! # Example
//!
//! ```ignore
//! let table = Table::new("job", &["id", "created_at", "updated_at", "title"]);
//! let stmt = SqlBuilder::new(&table, Dialect::Sqlite)
//!     .select(&[Filter::eq("title", "Engineer")], Some(&PageOptions::new(2, 0)), false)?;
//! // SELECT "id", ... FROM "job" WHERE "title" = ? ORDER BY "created_at" ASC LIMIT 2 OFFSET 0
//! ```

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::DataError;
use crate::filter::Filter;
use crate::page::PageOptions;
use crate::tenant::{require_tenant, TENANT_COLUMN};
use crate::{timestamp, Record};

/// Always-false predicate for filters that can never match.
const NEVER: &str = "1 = 0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// `?` placeholders; row locks are taken with a no-op write.
    #[default]
    Sqlite,
    /// `$1, $2, ...` placeholders and `FOR UPDATE`.
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => "?".to_string(),
        }
    }

    /// Whether `SELECT ... FOR UPDATE` is available.
    pub fn supports_for_update(self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

/// Schema of one table: its name and the columns a gateway may read and write.
///
/// Multi-tenant tables carry an extra `tenant` column that is never exposed in
/// returned records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub multitenant: bool,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            multitenant: false,
        }
    }

    pub fn multitenant(mut self) -> Self {
        self.multitenant = true;
        self
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// A compiled statement and its bind values, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

struct Binds {
    dialect: Dialect,
    values: Vec<Value>,
}

impl Binds {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            values: Vec::new(),
        }
    }

    fn push(&mut self, value: Value) -> String {
        self.values.push(value);
        self.dialect.placeholder(self.values.len())
    }

    fn finish(self, sql: String) -> Statement {
        Statement {
            sql,
            params: self.values,
        }
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Compiles statements against one [`Table`].
#[derive(Debug, Clone)]
pub struct SqlBuilder<'a> {
    table: &'a Table,
    dialect: Dialect,
    tenant: Option<String>,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(table: &'a Table, dialect: Dialect) -> Self {
        Self {
            table,
            dialect,
            tenant: None,
        }
    }

    /// Builder bound to the ambient tenant when the table is multi-tenant.
    pub fn scoped(table: &'a Table, dialect: Dialect) -> Result<Self, DataError> {
        let builder = Self::new(table, dialect);
        if table.multitenant {
            let tenant = require_tenant(&table.name)?;
            Ok(builder.tenant(tenant))
        } else {
            Ok(builder)
        }
    }

    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn table(&self) -> &Table {
        self.table
    }

    fn table_name(&self) -> String {
        quote(&self.table.name)
    }

    fn column_list(&self) -> String {
        self.table
            .columns
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn tenant_column(&self) -> Option<&str> {
        match (&self.tenant, self.table.multitenant) {
            (Some(_), true) => Some(TENANT_COLUMN),
            _ => None,
        }
    }

    /// Known columns only, an explicit `id: null` dropped, tenant added.
    pub fn sanitize(&self, item: &Record) -> Record {
        let mut clean: Record = item
            .iter()
            .filter(|(key, value)| {
                self.table.has_column(key) && !(key.as_str() == "id" && value.is_null())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if let (Some(column), Some(tenant)) = (self.tenant_column(), &self.tenant) {
            clean.insert(column.to_string(), Value::String(tenant.clone()));
        }
        clean
    }

    fn predicate(&self, filter: &Filter, binds: &mut Binds) -> String {
        let field = filter.field();
        if !self.table.has_column(field) {
            return NEVER.to_string();
        }
        let column = quote(field);
        match filter {
            Filter::In { values, .. } => {
                let (nulls, values): (Vec<&Value>, Vec<&Value>) =
                    values.iter().partition(|v| v.is_null());
                let mut alternatives = Vec::new();
                match values.as_slice() {
                    [] => {}
                    [single] => {
                        let ph = binds.push((*single).clone());
                        alternatives.push(format!("{column} = {ph}"));
                    }
                    many => {
                        let placeholders: Vec<_> =
                            many.iter().map(|v| binds.push((*v).clone())).collect();
                        alternatives.push(format!("{column} IN ({})", placeholders.join(", ")));
                    }
                }
                if !nulls.is_empty() {
                    alternatives.push(format!("{column} IS NULL"));
                }
                match alternatives.len() {
                    0 => NEVER.to_string(),
                    1 => alternatives.swap_remove(0),
                    _ => format!("({})", alternatives.join(" OR ")),
                }
            }
            Filter::Compare {
                operator, value, ..
            } => {
                let ph = binds.push(value.clone());
                format!("{column} {} {ph}", operator.sql())
            }
        }
    }

    fn append_where(&self, sql: &mut String, binds: &mut Binds, mut clauses: Vec<String>) {
        if let (Some(column), Some(tenant)) = (self.tenant_column(), &self.tenant) {
            let ph = binds.push(Value::String(tenant.clone()));
            clauses.push(format!("{} = {ph}", quote(column)));
        }
        if clauses.is_empty() {
            return;
        }
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }

    fn filter_clauses(&self, filters: &[Filter], binds: &mut Binds) -> Vec<String> {
        filters.iter().map(|f| self.predicate(f, binds)).collect()
    }

    fn id_clause(&self, id: &Value, binds: &mut Binds) -> Vec<String> {
        let ph = binds.push(id.clone());
        vec![format!("{} = {ph}", quote("id"))]
    }

    /// `SELECT` of the table's columns.
    ///
    /// Ordering by a column the table does not have fails with `Unsupported`.
    pub fn select(
        &self,
        filters: &[Filter],
        params: Option<&PageOptions>,
        for_update: bool,
    ) -> Result<Statement, DataError> {
        let mut binds = Binds::new(self.dialect);
        let mut sql = format!("SELECT {} FROM {}", self.column_list(), self.table_name());
        let mut clauses = self.filter_clauses(filters, &mut binds);

        if let Some(params) = params {
            if !self.table.has_column(&params.order_by) {
                return Err(DataError::Unsupported(format!(
                    "cannot order {} by unknown column '{}'",
                    self.table.name, params.order_by
                )));
            }
            if let Some(cursor) = &params.cursor {
                let op = if params.ascending { ">" } else { "<" };
                let ph = binds.push(cursor.clone());
                clauses.push(format!("{} {op} {ph}", quote(&params.order_by)));
            }
            self.append_where(&mut sql, &mut binds, clauses);
            let direction = if params.ascending { "ASC" } else { "DESC" };
            sql.push_str(&format!(
                " ORDER BY {} {direction} LIMIT {} OFFSET {}",
                quote(&params.order_by),
                params.limit,
                params.offset
            ));
        } else {
            self.append_where(&mut sql, &mut binds, clauses);
        }

        if for_update && self.dialect.supports_for_update() {
            sql.push_str(" FOR UPDATE");
        }
        Ok(binds.finish(sql))
    }

    pub fn get(&self, id: &Value, for_update: bool) -> Result<Statement, DataError> {
        self.select(&[Filter::for_id(id.clone())], None, for_update)
    }

    pub fn insert(&self, item: &Record) -> Statement {
        let clean = self.sanitize(item);
        let mut binds = Binds::new(self.dialect);
        let sql = if clean.is_empty() {
            format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                self.table_name(),
                self.column_list()
            )
        } else {
            let columns: Vec<_> = clean.keys().map(|c| quote(c)).collect();
            let placeholders: Vec<_> = clean.values().map(|v| binds.push(v.clone())).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                self.table_name(),
                columns.join(", "),
                placeholders.join(", "),
                self.column_list()
            )
        };
        binds.finish(sql)
    }

    /// Insert, overwriting every given column when the id is already taken.
    pub fn upsert(&self, item: &Record) -> Statement {
        let clean = self.sanitize(item);
        let mut binds = Binds::new(self.dialect);
        let columns: Vec<_> = clean.keys().map(|c| quote(c)).collect();
        let placeholders: Vec<_> = clean.values().map(|v| binds.push(v.clone())).collect();

        let mut key = vec![quote("id")];
        if let Some(column) = self.tenant_column() {
            key.push(quote(column));
        }
        let mut assignments: Vec<_> = clean
            .keys()
            .filter(|c| c.as_str() != "id" && Some(c.as_str()) != self.tenant_column())
            .map(|c| format!("{0} = excluded.{0}", quote(c)))
            .collect();
        if assignments.is_empty() {
            assignments.push(format!("{0} = excluded.{0}", quote("id")));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO UPDATE SET {} RETURNING {}",
            self.table_name(),
            columns.join(", "),
            placeholders.join(", "),
            key.join(", "),
            assignments.join(", "),
            self.column_list()
        );
        binds.finish(sql)
    }

    /// Conditional `UPDATE` keyed on id, and on `updated_at` when given.
    ///
    /// Zero returned rows means either the record is missing or it changed
    /// since `if_unmodified_since`; callers tell them apart with [`Self::exists`].
    pub fn update(
        &self,
        item: &Record,
        if_unmodified_since: Option<DateTime<Utc>>,
    ) -> Result<Statement, DataError> {
        let id = crate::gateway::require_id(item)?;
        let clean = self.sanitize(item);
        let mut binds = Binds::new(self.dialect);

        let mut assignments: Vec<_> = clean
            .iter()
            .filter(|(c, _)| c.as_str() != "id" && Some(c.as_str()) != self.tenant_column())
            .map(|(c, v)| format!("{} = {}", quote(c), binds.push(v.clone())))
            .collect();
        if assignments.is_empty() {
            assignments.push(format!("{0} = {0}", quote("id")));
        }

        let mut sql = format!("UPDATE {} SET {}", self.table_name(), assignments.join(", "));
        let mut clauses = self.id_clause(&id, &mut binds);
        if let Some(since) = if_unmodified_since {
            let ph = binds.push(Value::String(timestamp::format(&since)));
            clauses.push(format!("{} = {ph}", quote("updated_at")));
        }
        self.append_where(&mut sql, &mut binds, clauses);
        sql.push_str(&format!(" RETURNING {}", self.column_list()));
        Ok(binds.finish(sql))
    }

    /// No-op write that takes the row's write lock where `FOR UPDATE` is missing.
    pub fn lock_row(&self, id: &Value) -> Statement {
        let mut binds = Binds::new(self.dialect);
        let mut sql = format!("UPDATE {} SET {1} = {1}", self.table_name(), quote("id"));
        let clauses = self.id_clause(id, &mut binds);
        self.append_where(&mut sql, &mut binds, clauses);
        binds.finish(sql)
    }

    pub fn delete(&self, id: &Value) -> Statement {
        let mut binds = Binds::new(self.dialect);
        let mut sql = format!("DELETE FROM {}", self.table_name());
        let clauses = self.id_clause(id, &mut binds);
        self.append_where(&mut sql, &mut binds, clauses);
        sql.push_str(&format!(" RETURNING {}", quote("id")));
        binds.finish(sql)
    }

    pub fn delete_many(&self, ids: &[Value]) -> Statement {
        self.delete_where(&[Filter::new("id", ids.to_vec())])
    }

    /// `DELETE` of every row matching all `filters`. No filters means the whole table.
    pub fn delete_where(&self, filters: &[Filter]) -> Statement {
        let mut binds = Binds::new(self.dialect);
        let mut sql = format!("DELETE FROM {}", self.table_name());
        let clauses = self.filter_clauses(filters, &mut binds);
        self.append_where(&mut sql, &mut binds, clauses);
        binds.finish(sql)
    }

    pub fn count(&self, filters: &[Filter]) -> Statement {
        let mut binds = Binds::new(self.dialect);
        let mut sql = format!("SELECT COUNT(*) AS count FROM {}", self.table_name());
        let clauses = self.filter_clauses(filters, &mut binds);
        self.append_where(&mut sql, &mut binds, clauses);
        binds.finish(sql)
    }

    pub fn exists(&self, filters: &[Filter]) -> Statement {
        let mut binds = Binds::new(self.dialect);
        let mut inner = format!("SELECT 1 FROM {}", self.table_name());
        let clauses = self.filter_clauses(filters, &mut binds);
        self.append_where(&mut inner, &mut binds, clauses);
        binds.finish(format!("SELECT EXISTS({inner} LIMIT 1) AS present"))
    }
}

/// Writes needed to make a stored child collection match a new one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildDiff {
    pub inserts: Vec<Record>,
    pub updates: Vec<Record>,
    pub deletes: Vec<Value>,
}

impl ChildDiff {
    /// Compare children by id. Children whose fields are unchanged produce no
    /// write; children without an id, or with an unknown one, are inserted.
    pub fn compute(old: &[Record], new: &[Record]) -> Self {
        let old_by_id: HashMap<String, &Record> = old
            .iter()
            .filter_map(|child| child.get("id").map(|id| (id.to_string(), child)))
            .collect();
        let mut kept = HashSet::new();
        let mut diff = ChildDiff::default();

        for child in new {
            let previous = child
                .get("id")
                .filter(|id| !id.is_null())
                .and_then(|id| old_by_id.get(&id.to_string()).map(|prev| (id.to_string(), *prev)));
            match previous {
                Some((key, prev)) => {
                    kept.insert(key);
                    if child.iter().any(|(k, v)| prev.get(k) != Some(v)) {
                        diff.updates.push(child.clone());
                    }
                }
                None => diff.inserts.push(child.clone()),
            }
        }

        diff.deletes = old
            .iter()
            .filter_map(|child| child.get("id"))
            .filter(|id| !kept.contains(&id.to_string()))
            .cloned()
            .collect();
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Operator;
    use chrono::TimeZone;
    use serde_json::json;

    fn table() -> Table {
        Table::new("job", &["id", "created_at", "updated_at", "title", "status"])
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    const COLUMNS: &str = r#""id", "created_at", "updated_at", "title", "status""#;

    #[test]
    fn select_without_filters_has_no_where() {
        let table = table();
        let stmt = SqlBuilder::new(&table, Dialect::Sqlite).select(&[], None, false).unwrap();
        assert_eq!(stmt.sql, format!(r#"SELECT {COLUMNS} FROM "job""#));
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn equality_filter_arity() {
        let table = table();
        let builder = SqlBuilder::new(&table, Dialect::Sqlite);

        let none = builder.count(&[Filter::new("title", vec![])]);
        assert_eq!(none.sql, r#"SELECT COUNT(*) AS count FROM "job" WHERE 1 = 0"#);

        let one = builder.count(&[Filter::eq("title", "Engineer")]);
        assert_eq!(one.sql, r#"SELECT COUNT(*) AS count FROM "job" WHERE "title" = ?"#);
        assert_eq!(one.params, vec![json!("Engineer")]);

        let many = builder.count(&[Filter::new("status", vec![json!("ADDED"), json!("APPLIED")])]);
        assert_eq!(many.sql, r#"SELECT COUNT(*) AS count FROM "job" WHERE "status" IN (?, ?)"#);
    }

    #[test]
    fn unknown_column_is_always_false() {
        let table = table();
        let stmt = SqlBuilder::new(&table, Dialect::Sqlite).count(&[
            Filter::eq("title", "x"),
            Filter::eq("salary", 10),
        ]);
        assert_eq!(stmt.sql, r#"SELECT COUNT(*) AS count FROM "job" WHERE "title" = ? AND 1 = 0"#);
        assert_eq!(stmt.params.len(), 1);
    }

    #[test]
    fn comparison_and_pagination_postgres() {
        let table = table();
        let params = PageOptions::new(2, 4).order_by("created_at", false);
        let stmt = SqlBuilder::new(&table, Dialect::Postgres)
            .select(
                &[Filter::compare("created_at", Operator::Gt, "2024-01-01T00:00:00.000000Z")],
                Some(&params),
                true,
            )
            .unwrap();
        assert_eq!(
            stmt.sql,
            format!(
                r#"SELECT {COLUMNS} FROM "job" WHERE "created_at" > $1 ORDER BY "created_at" DESC LIMIT 2 OFFSET 4 FOR UPDATE"#
            )
        );
    }

    #[test]
    fn for_update_is_dropped_on_sqlite() {
        let table = table();
        let stmt = SqlBuilder::new(&table, Dialect::Sqlite).get(&json!("a"), true).unwrap();
        assert!(!stmt.sql.contains("FOR UPDATE"));
    }

    #[test]
    fn unknown_order_by_is_unsupported() {
        let table = table();
        let params = PageOptions::default().order_by("salary", true);
        let err = SqlBuilder::new(&table, Dialect::Sqlite).select(&[], Some(&params), false);
        assert!(matches!(err, Err(DataError::Unsupported(_))));
    }

    #[test]
    fn cursor_becomes_keyset_predicate() {
        let table = table();
        let params = PageOptions::new(5, 0).order_by("id", true).cursor("b");
        let stmt = SqlBuilder::new(&table, Dialect::Sqlite).select(&[], Some(&params), false).unwrap();
        assert!(stmt.sql.contains(r#"WHERE "id" > ? ORDER BY "id" ASC"#));
        assert_eq!(stmt.params, vec![json!("b")]);
    }

    #[test]
    fn insert_drops_unknown_columns_and_null_id() {
        let table = table();
        let stmt = SqlBuilder::new(&table, Dialect::Sqlite)
            .insert(&record(json!({"id": null, "title": "Engineer", "bogus": 1})));
        assert_eq!(
            stmt.sql,
            format!(r#"INSERT INTO "job" ("title") VALUES (?) RETURNING {COLUMNS}"#)
        );
        assert_eq!(stmt.params, vec![json!("Engineer")]);
    }

    #[test]
    fn update_with_timestamp_guard() {
        let table = table();
        let since = Utc.with_ymd_and_hms(2024, 1, 31, 8, 15, 0).unwrap();
        let stmt = SqlBuilder::new(&table, Dialect::Postgres)
            .update(&record(json!({"id": "a", "title": "Lead"})), Some(since))
            .unwrap();
        assert_eq!(
            stmt.sql,
            format!(
                r#"UPDATE "job" SET "title" = $1 WHERE "id" = $2 AND "updated_at" = $3 RETURNING {COLUMNS}"#
            )
        );
        assert_eq!(
            stmt.params,
            vec![json!("Lead"), json!("a"), json!("2024-01-31T08:15:00.000000Z")]
        );
    }

    #[test]
    fn update_requires_id() {
        let table = table();
        let result = SqlBuilder::new(&table, Dialect::Sqlite).update(&record(json!({"title": "x"})), None);
        assert!(matches!(result, Err(DataError::Validation(_))));
    }

    #[test]
    fn tenant_constrains_reads_and_writes() {
        let table = table().multitenant();
        let builder = SqlBuilder::new(&table, Dialect::Sqlite).tenant("acme");

        let upsert = builder.upsert(&record(json!({"id": "a", "title": "x"})));
        assert!(upsert.sql.contains(r#"ON CONFLICT ("id", "tenant") DO UPDATE SET "title" = excluded."title""#));
        assert!(upsert.params.contains(&json!("acme")));

        let delete = builder.delete(&json!("a"));
        assert_eq!(
            delete.sql,
            r#"DELETE FROM "job" WHERE "id" = ? AND "tenant" = ? RETURNING "id""#
        );
        assert_eq!(delete.params, vec![json!("a"), json!("acme")]);
    }

    #[test]
    fn delete_where_keeps_tenant_scope() {
        let table = Table::new("experience", &["id", "resume_id"]).multitenant();
        let builder = SqlBuilder::new(&table, Dialect::Postgres).tenant("acme");
        let stmt = builder.delete_where(&[Filter::eq("resume_id", "r1")]);
        assert_eq!(
            stmt.sql,
            r#"DELETE FROM "experience" WHERE "resume_id" = $1 AND "tenant" = $2"#
        );
        assert_eq!(stmt.params, vec![json!("r1"), json!("acme")]);

        let ids = builder.delete_many(&[json!("a"), json!("b")]);
        assert_eq!(
            ids.sql,
            r#"DELETE FROM "experience" WHERE "id" IN ($1, $2) AND "tenant" = $3"#
        );
    }

    #[test]
    fn scoped_requires_tenant_for_multitenant_tables() {
        let table = table().multitenant();
        assert!(matches!(
            SqlBuilder::scoped(&table, Dialect::Sqlite),
            Err(DataError::MissingTenant(_))
        ));
    }

    #[test]
    fn exists_wraps_limit_one() {
        let table = table();
        let stmt = SqlBuilder::new(&table, Dialect::Sqlite).exists(&[Filter::eq("id", "a")]);
        assert_eq!(
            stmt.sql,
            r#"SELECT EXISTS(SELECT 1 FROM "job" WHERE "id" = ? LIMIT 1) AS present"#
        );
    }

    #[test]
    fn child_diff_replace_one() {
        let old = vec![record(json!({"id": 1, "v": "a"})), record(json!({"id": 2, "v": "b"}))];
        let new = vec![record(json!({"id": 1, "v": "a"})), record(json!({"id": 3, "v": "c"}))];
        let diff = ChildDiff::compute(&old, &new);
        assert!(diff.updates.is_empty());
        assert_eq!(diff.inserts, vec![record(json!({"id": 3, "v": "c"}))]);
        assert_eq!(diff.deletes, vec![json!(2)]);
    }

    #[test]
    fn child_diff_no_change_is_empty() {
        let old = vec![record(json!({"id": 1, "v": "a"}))];
        assert!(ChildDiff::compute(&old, &old).is_empty());
    }

    #[test]
    fn child_diff_pure_update_and_addition() {
        let old = vec![record(json!({"id": 1, "v": "a"}))];
        let new = vec![record(json!({"id": 1, "v": "z"})), record(json!({"v": "new"}))];
        let diff = ChildDiff::compute(&old, &new);
        assert_eq!(diff.updates, vec![record(json!({"id": 1, "v": "z"}))]);
        assert_eq!(diff.inserts, vec![record(json!({"v": "new"}))]);
        assert!(diff.deletes.is_empty());
    }
}
