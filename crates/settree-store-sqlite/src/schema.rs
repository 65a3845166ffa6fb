//! SQL schema for the settree SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per document. `data_json` is a flat JSON object and never
-- contains the document id.
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT NOT NULL,   -- 'settings' | 'settings_history'
    doc_id      TEXT NOT NULL,   -- hyphenated lowercase UUID
    data_json   TEXT NOT NULL,
    PRIMARY KEY (collection, doc_id)
);

-- Sibling listing and per-setting history lookups.
CREATE INDEX IF NOT EXISTS documents_parent_idx
    ON documents(collection, json_extract(data_json, '$.parentId'));
CREATE INDEX IF NOT EXISTS documents_setting_idx
    ON documents(collection, json_extract(data_json, '$.settingId'));

PRAGMA user_version = 1;
";
