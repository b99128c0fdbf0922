pub const SCHEMA: &str = r#"
-- Entities are the top-level tenants
CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Departments form a forest per entity
CREATE TABLE IF NOT EXISTS departments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    parent_id INTEGER REFERENCES departments(id) ON DELETE SET NULL,
    entity_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Users carry their scope and a role bitmask (1 = department, 2 = entity, 4 = system)
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,       -- argon2id hash with embedded salt
    banned INTEGER NOT NULL DEFAULT 0,
    entity_id INTEGER REFERENCES entities(id) ON DELETE SET NULL,
    department_id INTEGER REFERENCES departments(id) ON DELETE SET NULL,
    roles INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Tokens are bearer credentials for users
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- lookup segment of the token for fast lookup
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                   -- NULL = never
    last_used_at TEXT
);

-- Asset classes form a forest per department
CREATE TABLE IF NOT EXISTS asset_classes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    parent_id INTEGER REFERENCES asset_classes(id),
    department_id INTEGER NOT NULL REFERENCES departments(id) ON DELETE CASCADE,
    class_type TEXT NOT NULL CHECK (class_type IN ('item', 'quantity')),
    created_at TEXT DEFAULT (datetime('now'))
);

-- Assets form a forest per department
CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    class_id INTEGER NOT NULL REFERENCES asset_classes(id),
    parent_id INTEGER REFERENCES assets(id),
    department_id INTEGER NOT NULL REFERENCES departments(id) ON DELETE CASCADE,
    owner_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    maintainer_id INTEGER REFERENCES users(id) ON DELETE SET NULL,
    state TEXT NOT NULL DEFAULT 'idle'
        CHECK (state IN ('idle', 'acquired', 'maintained', 'expired')),
    price REAL NOT NULL DEFAULT 0,
    number INTEGER NOT NULL DEFAULT 1,
    position TEXT,
    description TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),

    CHECK (owner_id IS NULL OR state IN ('acquired', 'maintained'))
);

-- Deferred bulk operations
CREATE TABLE IF NOT EXISTS async_tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_type TEXT NOT NULL,
    issuer_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    department_id INTEGER NOT NULL REFERENCES departments(id) ON DELETE CASCADE,
    entity_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
    state TEXT NOT NULL DEFAULT 'pending',
    download_link TEXT,
    object_key TEXT,
    message TEXT NOT NULL DEFAULT '',
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Periodic snapshots of total asset value per department
CREATE TABLE IF NOT EXISTS asset_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    department_id INTEGER NOT NULL REFERENCES departments(id) ON DELETE CASCADE,
    total REAL NOT NULL,
    recorded_at TEXT DEFAULT (datetime('now'))
);

-- Create indexes
CREATE INDEX IF NOT EXISTS idx_departments_entity ON departments(entity_id);
CREATE INDEX IF NOT EXISTS idx_departments_parent ON departments(parent_id);
CREATE INDEX IF NOT EXISTS idx_users_entity ON users(entity_id);
CREATE INDEX IF NOT EXISTS idx_users_department ON users(department_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_asset_classes_department ON asset_classes(department_id);
CREATE INDEX IF NOT EXISTS idx_asset_classes_parent ON asset_classes(parent_id);
CREATE INDEX IF NOT EXISTS idx_assets_department ON assets(department_id);
CREATE INDEX IF NOT EXISTS idx_assets_parent ON assets(parent_id);
CREATE INDEX IF NOT EXISTS idx_assets_class ON assets(class_id);
CREATE INDEX IF NOT EXISTS idx_assets_owner ON assets(owner_id);
CREATE INDEX IF NOT EXISTS idx_assets_maintainer ON assets(maintainer_id);
CREATE INDEX IF NOT EXISTS idx_tasks_department ON async_tasks(department_id);
CREATE INDEX IF NOT EXISTS idx_tasks_entity ON async_tasks(entity_id);
CREATE INDEX IF NOT EXISTS idx_tasks_issuer ON async_tasks(issuer_id);
CREATE INDEX IF NOT EXISTS idx_asset_stats_department ON asset_stats(department_id);
"#;
