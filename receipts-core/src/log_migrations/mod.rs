//! SQL for `logs.duckdb`, embedded at build time
//!
//! Applied in order and recorded by name in `sys_migrations`. The first
//! entry creates that table and is safe to run on every open.

pub const BOOTSTRAP: &str = include_str!("000_migrations.sql");

pub const LOG_MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial_schema.sql",
    include_str!("001_initial_schema.sql"),
)];
