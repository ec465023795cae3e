// ─────────────────────────────────────────────────────────────────────────────
// Trait
// ─────────────────────────────────────────────────────────────────────────────

/// SQL dialect: identifier quoting and the casts needed so that every driver
/// hands the identity column back as a 64-bit integer and the value column
/// as text through `sqlx::AnyRow`.
///
/// Pure string manipulation, no sqlx dependency.
pub trait Dialect: Send + Sync {
    /// Return the driver name as a lowercase string ("postgres", "mysql", …).
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column, schema) per dialect.
    /// - MySQL / MariaDB → backtick: `` `col` ``
    /// - PostgreSQL / SQLite → double-quote: `"col"`
    fn quote_ident(&self, s: &str) -> String;

    /// Return the `schema.` prefix for a qualified table reference.
    /// Empty when no schema is configured. SQLite has no schema namespace,
    /// so it always returns `""`.
    fn schema_prefix(&self, schema: &str) -> String {
        if schema.is_empty() {
            String::new()
        } else {
            format!("{}.", self.quote_ident(schema))
        }
    }

    /// Cast an expression to a text value.
    /// - PostgreSQL  : `expr::TEXT`
    /// - MySQL/MariaDB : `CONVERT(expr USING utf8mb4)`
    /// - SQLite      : `CAST(expr AS TEXT)`
    fn cast_to_text(&self, expr: &str) -> String;

    /// Cast an expression to a signed 64-bit integer.
    /// - PostgreSQL  : `CAST(expr AS BIGINT)`
    /// - MySQL/MariaDB : `CAST(expr AS SIGNED)`
    /// - SQLite      : `CAST(expr AS INTEGER)`
    fn cast_to_bigint(&self, expr: &str) -> String;
}

// ─────────────────────────────────────────────────────────────────────────────
// PostgreSQL
// ─────────────────────────────────────────────────────────────────────────────

pub struct PostgresDialect;

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_ident(&self, s: &str) -> String {
        format!("\"{}\"", s.replace('"', "\"\""))
    }

    fn cast_to_text(&self, expr: &str) -> String {
        format!("{}::TEXT", expr)
    }

    fn cast_to_bigint(&self, expr: &str) -> String {
        format!("CAST({} AS BIGINT)", expr)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MySQL / MariaDB
// ─────────────────────────────────────────────────────────────────────────────

pub struct MysqlDialect;

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_ident(&self, s: &str) -> String {
        format!("`{}`", s.replace('`', "``"))
    }

    fn cast_to_text(&self, expr: &str) -> String {
        format!("CONVERT({} USING utf8mb4)", expr)
    }

    fn cast_to_bigint(&self, expr: &str) -> String {
        format!("CAST({} AS SIGNED)", expr)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SQLite
// ─────────────────────────────────────────────────────────────────────────────

pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_ident(&self, s: &str) -> String {
        format!("\"{}\"", s.replace('"', "\"\""))
    }

    fn schema_prefix(&self, _schema: &str) -> String {
        String::new()
    }

    fn cast_to_text(&self, expr: &str) -> String {
        format!("CAST({} AS TEXT)", expr)
    }

    fn cast_to_bigint(&self, expr: &str) -> String {
        format!("CAST({} AS INTEGER)", expr)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Factory
// ─────────────────────────────────────────────────────────────────────────────

/// Return the dialect for a driver name. Unknown drivers fall back to
/// PostgreSQL; config validation rejects them before this is reached.
pub fn from_driver(driver: &str) -> Box<dyn Dialect> {
    match driver {
        "mysql" | "mariadb" => Box::new(MysqlDialect),
        "sqlite" => Box::new(SqliteDialect),
        _ => Box::new(PostgresDialect),
    }
}
