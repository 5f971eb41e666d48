//! Test fixture schema - a SQLite rendition of the DSW tables the registry
//! describes, with foreign keys so replayed scripts are checked for order.

use super::SqliteStore;

pub const CREATE_TABLES: &str = r#"
CREATE TABLE user_entity (
    uuid UUID PRIMARY KEY,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    affiliation TEXT,
    role TEXT NOT NULL,
    permissions TEXT[],
    active BOOLEAN NOT NULL,
    created_at TIMESTAMPTZ
);

CREATE TABLE questionnaire_importer (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    enabled BOOLEAN
);

CREATE TABLE package (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    km_id TEXT NOT NULL,
    version TEXT NOT NULL,
    description TEXT,
    previous_package_id TEXT REFERENCES package (id),
    created_at TIMESTAMPTZ
);

CREATE TABLE locale (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    code TEXT NOT NULL,
    description TEXT,
    enabled BOOLEAN
);

CREATE TABLE document_template (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    template_id TEXT NOT NULL,
    formats JSON
);

CREATE TABLE document_template_asset (
    uuid UUID PRIMARY KEY,
    document_template_id TEXT NOT NULL REFERENCES document_template (id),
    file_name TEXT NOT NULL,
    content_type TEXT
);

CREATE TABLE document_template_file (
    uuid UUID PRIMARY KEY,
    document_template_id TEXT NOT NULL REFERENCES document_template (id),
    file_name TEXT NOT NULL,
    content TEXT
);

CREATE TABLE questionnaire (
    uuid UUID PRIMARY KEY,
    name TEXT NOT NULL,
    package_id TEXT REFERENCES package (id),
    document_template_id TEXT REFERENCES document_template (id),
    creator_uuid UUID REFERENCES user_entity (uuid),
    created_at TIMESTAMPTZ
);

CREATE TABLE document (
    uuid UUID PRIMARY KEY,
    name TEXT NOT NULL,
    questionnaire_uuid UUID REFERENCES questionnaire (uuid),
    document_template_id TEXT REFERENCES document_template (id),
    created_by UUID REFERENCES user_entity (uuid),
    created_at TIMESTAMPTZ
);
"#;

/// Scenario rows: document D1 -> project P1 -> km K1, template T1 (with one
/// asset and one file); D1 also references T1 directly. K1 has no
/// predecessor; K3 -> K2 -> K1 form a predecessor chain. Locales include the
/// built-in default.
pub const SCENARIO_ROWS: &str = r#"
INSERT INTO user_entity (uuid, first_name, last_name, email, affiliation, role, permissions, active, created_at)
VALUES ('ec6f8e90-2a91-49ec-aa3f-9eab2267fc66', 'Albert', 'Einstein', 'albert.einstein@example.com', NULL,
        'admin', '["UM_PERM", "KM_PERM"]', 1, '2024-01-10 09:00:00+01:00');

INSERT INTO questionnaire_importer (id, name, description, enabled)
VALUES ('dsw:replies-importer:0.1.0', 'DSW Replies (JSON)', 'Import from replies in JSON exported from DSW', 1);

INSERT INTO package (id, name, km_id, version, description, previous_package_id, created_at) VALUES
    ('myorg:km-for-seeding:0.0.1', 'KM for seeding', 'km-for-seeding', '0.0.1', 'it''s the first', NULL, '2024-01-01 10:00:00'),
    ('myorg:km-for-seeding:0.0.2', 'KM for seeding', 'km-for-seeding', '0.0.2', '', 'myorg:km-for-seeding:0.0.1', '2024-02-01 10:00:00'),
    ('myorg:km-for-seeding:0.0.3', 'KM for seeding', 'km-for-seeding', '0.0.3', '', 'myorg:km-for-seeding:0.0.2', '2024-03-01 10:00:00');

INSERT INTO locale (id, name, code, description, enabled) VALUES
    ('wizard:default:1.0.0', 'English', 'en', 'Default English locale for Wizard UI', 1),
    ('myorg:czech:1.0.0', 'Czech', 'cs', 'Czech locale', 1);

INSERT INTO document_template (id, name, template_id, formats)
VALUES ('myorg:dsw-seeding:0.0.1', 'DSW seeding', 'dsw-seeding', '[{"name": "PDF"}]');

INSERT INTO document_template_asset (uuid, document_template_id, file_name, content_type)
VALUES ('5a5e0a0e-1b1b-4c4c-8d8d-000000000001', 'myorg:dsw-seeding:0.0.1', 'logo.png', 'image/png');

INSERT INTO document_template_file (uuid, document_template_id, file_name, content)
VALUES ('5a5e0a0e-1b1b-4c4c-8d8d-000000000002', 'myorg:dsw-seeding:0.0.1', 'default.html.j2', '{{ ctx }}');

INSERT INTO questionnaire (uuid, name, package_id, document_template_id, creator_uuid, created_at)
VALUES ('7ec5c86a-946a-4386-ba3c-b27481288a62', 'Jana Martinkova', 'myorg:km-for-seeding:0.0.1',
        'myorg:dsw-seeding:0.0.1', NULL, '2024-04-01 12:00:00');

INSERT INTO document (uuid, name, questionnaire_uuid, document_template_id, created_by, created_at)
VALUES ('1034a4b0-d867-4b4b-b2a0-a3956b43cf95', 'Jana Martinkova', '7ec5c86a-946a-4386-ba3c-b27481288a62',
        'myorg:dsw-seeding:0.0.1', NULL, '2024-04-02 12:00:00');
"#;

pub const USER: &str = "ec6f8e90-2a91-49ec-aa3f-9eab2267fc66";
pub const K1: &str = "myorg:km-for-seeding:0.0.1";
pub const K2: &str = "myorg:km-for-seeding:0.0.2";
pub const K3: &str = "myorg:km-for-seeding:0.0.3";
pub const T1: &str = "myorg:dsw-seeding:0.0.1";
pub const ASSET: &str = "5a5e0a0e-1b1b-4c4c-8d8d-000000000001";
pub const FILE: &str = "5a5e0a0e-1b1b-4c4c-8d8d-000000000002";
pub const P1: &str = "7ec5c86a-946a-4386-ba3c-b27481288a62";
pub const D1: &str = "1034a4b0-d867-4b4b-b2a0-a3956b43cf95";
pub const CZECH: &str = "myorg:czech:1.0.0";

/// Empty in-memory store with the fixture schema and foreign keys enforced
pub fn store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
    store.execute_batch(CREATE_TABLES).unwrap();
    store
}

/// In-memory store holding the scenario rows
pub fn scenario_store() -> SqliteStore {
    let store = store();
    store.execute_batch(SCENARIO_ROWS).unwrap();
    store
}
