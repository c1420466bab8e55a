//! SQL schema for the Polis SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision for future migrations.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id        TEXT PRIMARY KEY,
    email          TEXT NOT NULL UNIQUE COLLATE NOCASE,
    role           TEXT NOT NULL,   -- 'individual' | 'corporate_employee' | 'corporate_admin' | 'admin'
    company_name   TEXT,
    password_hash  TEXT NOT NULL,   -- argon2 PHC string
    created_at     TEXT NOT NULL
);

-- All six product lines share one table so that a policy number is unique per
-- customer across lines, enforced by the database rather than a pre-check.
-- Status is never stored; it is derived from end_date at read time.
CREATE TABLE IF NOT EXISTS policies (
    policy_id              TEXT PRIMARY KEY,
    user_id                TEXT NOT NULL,
    policy_type            TEXT NOT NULL,   -- discriminant of PolicyDetails
    policy_number          TEXT NOT NULL,
    insurer                TEXT NOT NULL,
    premium_amount         TEXT NOT NULL,   -- exact decimal string
    start_date             TEXT,            -- YYYY-MM-DD
    end_date               TEXT,            -- YYYY-MM-DD
    company_name           TEXT,
    documents              TEXT NOT NULL DEFAULT '[]',
    renewed_from_policy_id TEXT,
    previous_policy_number TEXT,
    details_json           TEXT NOT NULL,   -- JSON payload (inner data only)
    created_at             TEXT NOT NULL,
    updated_at             TEXT NOT NULL,
    UNIQUE (user_id, policy_number)
);

CREATE TABLE IF NOT EXISTS claims (
    claim_id      TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL,
    policy_id     TEXT NOT NULL REFERENCES policies(policy_id) ON DELETE CASCADE,
    status        TEXT NOT NULL,
    incident_date TEXT NOT NULL,
    description   TEXT NOT NULL,
    claim_amount  TEXT,
    documents     TEXT NOT NULL DEFAULT '[]',
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS quotes (
    quote_id     TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL,
    lob          TEXT NOT NULL,
    status       TEXT NOT NULL,
    details_json TEXT NOT NULL DEFAULT 'null',
    documents    TEXT NOT NULL DEFAULT '[]',
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    notification_id TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    kind            TEXT NOT NULL,
    title           TEXT NOT NULL,
    message         TEXT NOT NULL,
    is_read         INTEGER NOT NULL DEFAULT 0,
    metadata        TEXT,
    created_at      TEXT NOT NULL
);

-- Single-row table; absent row means defaults.
CREATE TABLE IF NOT EXISTS settings (
    settings_id INTEGER PRIMARY KEY CHECK (settings_id = 1),
    value_json  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS policies_user_idx     ON policies(user_id);
CREATE INDEX IF NOT EXISTS policies_company_idx  ON policies(company_name);
CREATE INDEX IF NOT EXISTS policies_renewal_idx  ON policies(renewed_from_policy_id);
CREATE INDEX IF NOT EXISTS claims_user_idx       ON claims(user_id);
CREATE INDEX IF NOT EXISTS notifications_user_idx ON notifications(user_id);

PRAGMA user_version = 1;
";
