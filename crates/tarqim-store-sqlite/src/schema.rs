//! SQL schema for the Tarqim SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! the `PRAGMA user_version` number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- ── Taxonomy ────────────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS subjects (
    subject_id  INTEGER PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS years (
    year_id  INTEGER PRIMARY KEY,
    display  TEXT NOT NULL UNIQUE    -- e.g. '1446'
);

CREATE TABLE IF NOT EXISTS lecturers (
    lecturer_id  INTEGER PRIMARY KEY,
    name         TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS terms (
    term_id  INTEGER PRIMARY KEY,
    name     TEXT NOT NULL UNIQUE
);

-- Registered source chats. Each belongs to exactly one academic term.
CREATE TABLE IF NOT EXISTS groups (
    chat_id  INTEGER PRIMARY KEY,
    term_id  INTEGER NOT NULL REFERENCES terms(term_id)
);

-- What a forum topic inside a chat is bound to.
CREATE TABLE IF NOT EXISTS topic_bindings (
    chat_id     INTEGER NOT NULL,
    topic_id    INTEGER NOT NULL,
    subject_id  INTEGER NOT NULL REFERENCES subjects(subject_id),
    section     TEXT,               -- 'theory' | 'discussion' | 'lab' | NULL
    PRIMARY KEY (chat_id, topic_id)
);

-- In-text context tags. Exactly one of subject_id / section is set.
CREATE TABLE IF NOT EXISTS context_aliases (
    alias       TEXT PRIMARY KEY,   -- stored in normalized key form
    subject_id  INTEGER REFERENCES subjects(subject_id),
    section     TEXT,
    CHECK ((subject_id IS NULL) != (section IS NULL))
);

-- Term-level notices (e.g. attendance sheets), outside the material key.
CREATE TABLE IF NOT EXISTS term_resources (
    resource_id  INTEGER PRIMARY KEY,
    term_id      INTEGER NOT NULL REFERENCES terms(term_id),
    kind         TEXT NOT NULL,
    chat_id      INTEGER NOT NULL,
    topic_id     INTEGER,
    message_id   INTEGER NOT NULL,
    recorded_at  TEXT NOT NULL
);

-- ── Materials ───────────────────────────────────────────────────────────────

-- storage_* stays NULL while the initial submission is pending; approval
-- fills it in.
CREATE TABLE IF NOT EXISTS materials (
    material_id      INTEGER PRIMARY KEY,
    subject_id       INTEGER NOT NULL REFERENCES subjects(subject_id),
    section          TEXT,
    content_type     TEXT NOT NULL,
    title            TEXT NOT NULL,
    year_id          INTEGER REFERENCES years(year_id),
    lecturer_id      INTEGER REFERENCES lecturers(lecturer_id),
    storage_chat     INTEGER,
    storage_message  INTEGER,
    source_chat      INTEGER NOT NULL,
    source_topic     INTEGER,
    source_message   INTEGER NOT NULL,
    file_uid         TEXT,
    submitted_by     INTEGER NOT NULL,
    created_at       TEXT NOT NULL
);

-- The identity key. SQLite treats NULL as unequal to NULL in a plain UNIQUE
-- constraint, so the optional components are folded to sentinels: two rows
-- that both omit the year (or lecturer, or section) do collide.
CREATE UNIQUE INDEX IF NOT EXISTS materials_identity_idx ON materials (
    subject_id,
    ifnull(section, ''),
    content_type,
    title,
    ifnull(year_id, -1),
    ifnull(lecturer_id, -1)
);

CREATE INDEX IF NOT EXISTS materials_subject_idx ON materials(subject_id);

-- ── Ingestions ──────────────────────────────────────────────────────────────

-- material_id is deliberately not a foreign key: rejecting an `add` request
-- deletes its provisional material but keeps this row terminal, so a repeat
-- reviewer decision can be recognized as stale.
CREATE TABLE IF NOT EXISTS ingestions (
    ingestion_id    INTEGER PRIMARY KEY,
    material_id     INTEGER NOT NULL,
    action          TEXT NOT NULL CHECK (action IN ('add', 'replace')),
    status          TEXT NOT NULL DEFAULT 'pending'
                    CHECK (status IN ('pending', 'approved', 'rejected')),
    origin_chat     INTEGER NOT NULL,
    origin_topic    INTEGER,
    origin_message  INTEGER NOT NULL,
    submitted_by    INTEGER NOT NULL,
    chain_id        TEXT,
    parent_id       INTEGER,
    created_at      TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS ingestions_status_idx   ON ingestions(status);
CREATE INDEX IF NOT EXISTS ingestions_material_idx ON ingestions(material_id);

PRAGMA user_version = 1;
";
