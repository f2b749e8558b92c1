//! SQL schema for the ballot SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS voters (
    voter_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT    NOT NULL UNIQUE,   -- normalized: trimmed, lowercase
    password_hash TEXT    NOT NULL,          -- argon2 PHC string
    full_name     TEXT,
    has_voted     INTEGER NOT NULL DEFAULT 0,
    is_admin      INTEGER NOT NULL DEFAULT 0,
    created_at    TEXT    NOT NULL,          -- RFC 3339 UTC
    voted_at      TEXT,
    CHECK ((has_voted = 0) = (voted_at IS NULL))
);

-- Audit entries are strictly append-only.
CREATE TABLE IF NOT EXISTS audit_log (
    audit_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    voter_id    INTEGER REFERENCES voters(voter_id),
    action      TEXT    NOT NULL,   -- AuditAction, SCREAMING_SNAKE_CASE
    detail      TEXT,
    origin      TEXT,
    recorded_at TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS audit_voter_idx    ON audit_log(voter_id);
CREATE INDEX IF NOT EXISTS audit_recorded_idx ON audit_log(recorded_at);

CREATE TRIGGER IF NOT EXISTS voters_vote_is_final
BEFORE UPDATE OF has_voted ON voters
WHEN OLD.has_voted = 1 AND NEW.has_voted = 0
BEGIN
    SELECT RAISE(ABORT, 'has_voted cannot be reverted');
END;

CREATE TRIGGER IF NOT EXISTS voters_no_delete
BEFORE DELETE ON voters
BEGIN
    SELECT RAISE(ABORT, 'voters are never deleted');
END;

CREATE TRIGGER IF NOT EXISTS audit_log_no_update
BEFORE UPDATE ON audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit_log is append-only');
END;

CREATE TRIGGER IF NOT EXISTS audit_log_no_delete
BEFORE DELETE ON audit_log
BEGIN
    SELECT RAISE(ABORT, 'audit_log is append-only');
END;

PRAGMA user_version = 1;
";
