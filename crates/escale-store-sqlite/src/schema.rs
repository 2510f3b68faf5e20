//! SQL schema for the Escale SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Timestamps are fixed-width RFC 3339 UTC strings, so text order is
/// chronological order.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    email         TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password_hash TEXT NOT NULL,
    first_name    TEXT NOT NULL,
    last_name     TEXT NOT NULL,
    phone         TEXT,
    role          TEXT NOT NULL CHECK (role IN ('traveler', 'agency', 'admin')),
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agencies (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id         INTEGER NOT NULL REFERENCES users(id),
    name            TEXT NOT NULL,
    description     TEXT,
    location        TEXT NOT NULL,
    logo_url        TEXT,
    cover_image_url TEXT,
    rating          REAL NOT NULL DEFAULT 0,
    reviews_count   INTEGER NOT NULL DEFAULT 0,
    is_verified     INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS destinations (
    id                   INTEGER PRIMARY KEY AUTOINCREMENT,
    name                 TEXT NOT NULL,
    slug                 TEXT NOT NULL UNIQUE,
    description          TEXT,
    long_description     TEXT,
    continent            TEXT NOT NULL,
    country              TEXT NOT NULL,
    image_url            TEXT,
    climate              TEXT,
    best_time_to_visit   TEXT,
    languages            TEXT,
    currency             TEXT,
    recommended_duration TEXT,
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS destination_highlights (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    destination_id INTEGER NOT NULL REFERENCES destinations(id),
    highlight      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS themes (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT NOT NULL,
    slug        TEXT NOT NULL UNIQUE,
    description TEXT,
    image_url   TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS agency_destinations (
    agency_id      INTEGER NOT NULL REFERENCES agencies(id),
    destination_id INTEGER NOT NULL REFERENCES destinations(id),
    PRIMARY KEY (agency_id, destination_id)
);

-- duration is free text such as '12 jours'; CAST(duration AS INTEGER)
-- yields the leading day count.
CREATE TABLE IF NOT EXISTS itineraries (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    agency_id      INTEGER NOT NULL REFERENCES agencies(id),
    destination_id INTEGER NOT NULL REFERENCES destinations(id),
    title          TEXT NOT NULL,
    description    TEXT,
    duration       TEXT NOT NULL,
    price_from     REAL NOT NULL,
    image_url      TEXT,
    is_featured    INTEGER NOT NULL DEFAULT 0,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS itinerary_themes (
    itinerary_id INTEGER NOT NULL REFERENCES itineraries(id),
    theme_id     INTEGER NOT NULL REFERENCES themes(id),
    PRIMARY KEY (itinerary_id, theme_id)
);

CREATE TABLE IF NOT EXISTS quote_requests (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id            INTEGER NOT NULL REFERENCES users(id),
    destination_id     INTEGER NOT NULL REFERENCES destinations(id),
    departure_date     TEXT,            -- YYYY-MM-DD
    duration           TEXT,
    travelers_count    INTEGER NOT NULL,
    budget             REAL,
    accommodation_type TEXT,
    message            TEXT,
    status             TEXT NOT NULL DEFAULT 'pending'
                       CHECK (status IN ('pending', 'processing', 'completed', 'cancelled')),
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS quotes (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    quote_request_id INTEGER NOT NULL REFERENCES quote_requests(id),
    agency_id        INTEGER NOT NULL REFERENCES agencies(id),
    price            REAL NOT NULL,
    description      TEXT,
    validity_period  INTEGER NOT NULL,  -- days
    status           TEXT NOT NULL DEFAULT 'pending'
                     CHECK (status IN ('pending', 'accepted', 'rejected', 'expired')),
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bookings (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        INTEGER NOT NULL REFERENCES users(id),
    quote_id       INTEGER NOT NULL REFERENCES quotes(id),
    total_price    REAL NOT NULL,
    status         TEXT NOT NULL DEFAULT 'pending'
                   CHECK (status IN ('pending', 'confirmed', 'cancelled', 'completed')),
    payment_status TEXT NOT NULL DEFAULT 'pending'
                   CHECK (payment_status IN ('pending', 'partial', 'completed', 'refunded')),
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS payments (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    booking_id     INTEGER NOT NULL REFERENCES bookings(id),
    amount         REAL NOT NULL,
    payment_method TEXT NOT NULL,
    transaction_id TEXT,
    status         TEXT NOT NULL DEFAULT 'pending'
                   CHECK (status IN ('pending', 'completed', 'failed', 'refunded')),
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS conversations (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    traveler_id      INTEGER NOT NULL REFERENCES users(id),
    agency_id        INTEGER NOT NULL REFERENCES agencies(id),
    quote_request_id INTEGER REFERENCES quote_requests(id),
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS messages (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    conversation_id INTEGER NOT NULL REFERENCES conversations(id),
    sender_id       INTEGER NOT NULL REFERENCES users(id),
    content         TEXT NOT NULL,
    is_read         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS reviews (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id),
    agency_id   INTEGER NOT NULL REFERENCES agencies(id),
    booking_id  INTEGER REFERENCES bookings(id),
    rating      INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    title       TEXT,
    content     TEXT,
    is_verified INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS search_preferences (
    id                            INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id                       INTEGER NOT NULL UNIQUE REFERENCES users(id),
    preferred_destinations        TEXT,
    preferred_themes              TEXT,
    preferred_duration            TEXT,
    preferred_budget_min          REAL,
    preferred_budget_max          REAL,
    preferred_accommodation_types TEXT,
    created_at                    TEXT NOT NULL,
    updated_at                    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS search_history (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id      INTEGER REFERENCES users(id),
    search_query TEXT NOT NULL,
    filters      TEXT,                  -- JSON or NULL
    created_at   TEXT NOT NULL
);

-- Only the SHA-256 of a bearer token is stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id),
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS itineraries_destination_idx ON itineraries(destination_id);
CREATE INDEX IF NOT EXISTS quote_requests_user_idx     ON quote_requests(user_id);
CREATE INDEX IF NOT EXISTS quotes_request_idx          ON quotes(quote_request_id);
CREATE INDEX IF NOT EXISTS bookings_user_idx           ON bookings(user_id);
CREATE INDEX IF NOT EXISTS messages_conversation_idx   ON messages(conversation_id);
CREATE INDEX IF NOT EXISTS reviews_agency_idx          ON reviews(agency_id);
CREATE INDEX IF NOT EXISTS search_history_user_idx     ON search_history(user_id);
CREATE INDEX IF NOT EXISTS sessions_expiry_idx         ON sessions(expires_at);

PRAGMA user_version = 1;
";
