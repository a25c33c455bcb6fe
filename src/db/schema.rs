//! Database schema and migrations for usergate.
//!
//! Migrations are applied in order when the database is opened; the
//! `schema_version` table records which ones have run.

/// Database migrations.
///
/// Each migration is a SQL script that will be executed in order.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users table
    r#"
CREATE TABLE users (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at      TEXT NOT NULL,
    username        TEXT NOT NULL UNIQUE,
    email           TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash   TEXT NOT NULL,           -- Argon2id PHC string
    activated       INTEGER NOT NULL DEFAULT 0,
    version         INTEGER NOT NULL DEFAULT 1
);
"#,
    // v2: Scoped tokens, at most one per (user, scope)
    r#"
CREATE TABLE tokens (
    hash        BLOB PRIMARY KEY,            -- SHA-256 of the plaintext
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    expiry      INTEGER NOT NULL,            -- unix milliseconds
    scope       TEXT NOT NULL,
    UNIQUE (user_id, scope)
);

CREATE INDEX idx_tokens_expiry ON tokens(expiry);
"#,
    // v3: Permissions
    r#"
CREATE TABLE permissions (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    code    TEXT NOT NULL UNIQUE
);

INSERT INTO permissions (code) VALUES ('user:read'), ('user:write');

CREATE TABLE user_permissions (
    user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    permission_id   INTEGER NOT NULL REFERENCES permissions(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, permission_id)
);
"#,
];
