//! Command search query builder.
//!
//! A search is always "fetch `(command, uuid, created)` for one user,
//! optionally restricted by equality on `path` and `system_name` and by a
//! regular expression over `command`, optionally collapsed to one row per
//! distinct command, newest first, limited". [`SearchParams`] describes
//! that request and [`build`] renders it for one engine. The only dialect
//! differences are the regex operator and how collapsing is expressed, and
//! both live in this module.
//!
//! Every filter value is a bound parameter on both engines: the embedded
//! engine's `regexp` function is registered on the connection and accepts
//! placeholders like any other scalar function.

use std::fmt::Write;

/// Rows returned when no `limit` (or an unusable one) is given.
pub const DEFAULT_LIMIT: i64 = 100;

/// SQL dialect of the backing engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
}

impl Dialect {
    const fn regex_operator(self) -> &'static str {
        match self {
            Self::Sqlite => "REGEXP",
            Self::Postgres => "~",
        }
    }
}

/// Parameters of a command search. Absent or empty filters do not restrict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub user_id: i64,
    pub limit: i64,
    pub path: Option<String>,
    pub system_name: Option<String>,
    pub query: Option<String>,
    pub unique: bool,
}

impl SearchParams {
    /// All commands of `user_id`, newest first, at most [`DEFAULT_LIMIT`].
    pub const fn new(user_id: i64) -> Self {
        Self {
            user_id,
            limit: DEFAULT_LIMIT,
            path: None,
            system_name: None,
            query: None,
            unique: false,
        }
    }

    /// Non-positive limits fall back to [`DEFAULT_LIMIT`].
    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = if limit > 0 { limit } else { DEFAULT_LIMIT };
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = non_empty(path.into());
        self
    }

    #[must_use]
    pub fn system_name(mut self, system_name: impl Into<String>) -> Self {
        self.system_name = non_empty(system_name.into());
        self
    }

    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = non_empty(query.into());
        self
    }

    #[must_use]
    pub fn unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// A value bound to a rendered statement, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bind {
    Int(i64),
    Text(String),
}

/// A rendered search statement ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub sql: String,
    pub binds: Vec<Bind>,
}

enum Predicate<'a> {
    Equals(&'static str, &'a str),
    Matches(&'a str),
}

/// Renders statements with numbered placeholders, which both engines
/// accept.
struct Renderer {
    dialect: Dialect,
    binds: Vec<Bind>,
}

impl Renderer {
    fn placeholder(&mut self, bind: Bind) -> String {
        self.binds.push(bind);
        format!("${}", self.binds.len())
    }

    fn where_clause(&mut self, user_id: i64, predicates: &[Predicate<'_>]) -> String {
        let mut clause = format!("user_id = {}", self.placeholder(Bind::Int(user_id)));
        for predicate in predicates {
            let rendered = match predicate {
                Predicate::Equals(column, value) => {
                    let p = self.placeholder(Bind::Text((*value).to_string()));
                    format!("{column} = {p}")
                }
                Predicate::Matches(pattern) => {
                    let p = self.placeholder(Bind::Text((*pattern).to_string()));
                    format!("command {} {p}", self.dialect.regex_operator())
                }
            };
            let _ = write!(clause, " AND {rendered}");
        }
        clause
    }
}

/// Render `params` for `dialect`.
///
/// Collapsed (`unique`) searches keep, for every distinct command, the row
/// with the largest `created`: the embedded engine takes the bare columns
/// from the row that supplies `MAX(created)`, the remote engine sorts each
/// `DISTINCT ON` group newest first.
pub fn build(params: &SearchParams, dialect: Dialect) -> SearchQuery {
    let mut predicates = Vec::new();
    if let Some(path) = params.path.as_deref() {
        predicates.push(Predicate::Equals("path", path));
    }
    if let Some(system_name) = params.system_name.as_deref() {
        predicates.push(Predicate::Equals("system_name", system_name));
    }
    if let Some(query) = params.query.as_deref() {
        predicates.push(Predicate::Matches(query));
    }

    let mut renderer = Renderer {
        dialect,
        binds: Vec::new(),
    };
    let filter = renderer.where_clause(params.user_id, &predicates);
    let limit = renderer.placeholder(Bind::Int(params.limit));

    let sql = match (params.unique, dialect) {
        (false, _) => format!(
            "SELECT command, uuid, created FROM commands \
             WHERE {filter} ORDER BY created DESC LIMIT {limit}"
        ),
        (true, Dialect::Sqlite) => format!(
            "SELECT command, uuid, MAX(created) AS latest FROM commands \
             WHERE {filter} GROUP BY command ORDER BY latest DESC LIMIT {limit}"
        ),
        (true, Dialect::Postgres) => format!(
            "SELECT command, uuid, created FROM (\
             SELECT DISTINCT ON (command) command, uuid, created FROM commands \
             WHERE {filter} ORDER BY command, created DESC) AS latest \
             ORDER BY created DESC LIMIT {limit}"
        ),
    };

    SearchQuery {
        sql,
        binds: renderer.binds,
    }
}

/// Reject filter values the server never stores: control characters in a
/// path, system name or pattern are a client bug, not a search.
pub fn has_control_chars(value: &str) -> bool {
    value.chars().any(char::is_control)
}
