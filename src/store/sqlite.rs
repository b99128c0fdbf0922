use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};

use super::schema::SCHEMA;
use super::{AssetFilter, AssetTransition, Store, TaskFilter, TaskTransition, UserFilter};
use crate::error::{Error, Result};
use crate::hierarchy::{self, NodeSource};
use crate::types::*;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ENTITY_COLUMNS: &str = "id, name, created_at";
const DEPARTMENT_COLUMNS: &str = "id, name, parent_id, entity_id, created_at";
const USER_COLUMNS: &str =
    "id, username, password_hash, banned, entity_id, department_id, roles, created_at, updated_at";
const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, user_id, created_at, expires_at, last_used_at";
const CLASS_COLUMNS: &str = "id, name, parent_id, department_id, class_type, created_at";
const ASSET_COLUMNS: &str = "id, name, class_id, parent_id, department_id, owner_id, maintainer_id, \
     state, price, number, position, description, created_at, updated_at";
const TASK_COLUMNS: &str = "id, task_type, issuer_id, department_id, entity_id, state, \
     download_link, object_key, message, created_at, updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns a guard to the underlying database connection.
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn()
    }

    /// Runs `f` inside an IMMEDIATE transaction. The write lock is taken
    /// before `f` reads anything; any error rolls the whole transaction back.
    fn immediate<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn parse_optional_datetime(s: Option<String>) -> Option<DateTime<Utc>> {
    s.as_deref().map(parse_datetime)
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn now() -> String {
    format_datetime(&Utc::now())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

/// Reads a TEXT column holding one of a fixed set of enum names.
fn text_enum<T>(row: &Row<'_>, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unexpected value '{raw}'").into(),
        )
    })
}

fn entity_from_row(row: &Row<'_>) -> rusqlite::Result<Entity> {
    Ok(Entity {
        id: row.get(0)?,
        name: row.get(1)?,
        created_at: parse_datetime(&row.get::<_, String>(2)?),
    })
}

fn department_from_row(row: &Row<'_>) -> rusqlite::Result<Department> {
    Ok(Department {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        entity_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        banned: row.get(3)?,
        entity_id: row.get(4)?,
        department_id: row.get(5)?,
        roles: RoleFlags::from(row.get::<_, i64>(6)?),
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        expires_at: parse_optional_datetime(row.get(5)?),
        last_used_at: parse_optional_datetime(row.get(6)?),
    })
}

fn class_from_row(row: &Row<'_>) -> rusqlite::Result<AssetClass> {
    Ok(AssetClass {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        department_id: row.get(3)?,
        class_type: text_enum(row, 4, ClassType::parse)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn asset_from_row(row: &Row<'_>) -> rusqlite::Result<Asset> {
    Ok(Asset {
        id: row.get(0)?,
        name: row.get(1)?,
        class_id: row.get(2)?,
        parent_id: row.get(3)?,
        department_id: row.get(4)?,
        owner_id: row.get(5)?,
        maintainer_id: row.get(6)?,
        state: text_enum(row, 7, AssetState::parse)?,
        price: row.get(8)?,
        number: row.get(9)?,
        position: row.get(10)?,
        description: row.get(11)?,
        created_at: parse_datetime(&row.get::<_, String>(12)?),
        updated_at: parse_datetime(&row.get::<_, String>(13)?),
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<AsyncTask> {
    Ok(AsyncTask {
        id: row.get(0)?,
        task_type: text_enum(row, 1, TaskType::parse)?,
        issuer_id: row.get(2)?,
        department_id: row.get(3)?,
        entity_id: row.get(4)?,
        state: text_enum(row, 5, TaskState::parse)?,
        download_link: row.get(6)?,
        object_key: row.get(7)?,
        message: row.get(8)?,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

fn node_from_row(row: &Row<'_>) -> rusqlite::Result<TreeNode> {
    Ok(TreeNode {
        id: row.get(0)?,
        name: row.get(1)?,
        parent_id: row.get(2)?,
        scope_id: row.get(3)?,
        active: row.get(4)?,
    })
}

fn query_one<T>(
    conn: &Connection,
    sql: &str,
    id: i64,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Option<T>> {
    conn.query_row(sql, params![id], map)
        .optional()
        .map_err(Error::from)
}

fn query_all<T, P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, map)?;

    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::from)
}

fn count(conn: &Connection, sql: &str, id: i64) -> Result<u64> {
    let n: i64 = conn.query_row(sql, params![id], |row| row.get(0))?;
    Ok(n.max(0) as u64)
}

fn fetch_entity(conn: &Connection, id: i64) -> Result<Option<Entity>> {
    let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1");
    query_one(conn, &sql, id, entity_from_row)
}

fn fetch_department(conn: &Connection, id: i64) -> Result<Option<Department>> {
    let sql = format!("SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE id = ?1");
    query_one(conn, &sql, id, department_from_row)
}

fn fetch_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    query_one(conn, &sql, id, user_from_row)
}

fn fetch_class(conn: &Connection, id: i64) -> Result<Option<AssetClass>> {
    let sql = format!("SELECT {CLASS_COLUMNS} FROM asset_classes WHERE id = ?1");
    query_one(conn, &sql, id, class_from_row)
}

fn fetch_asset(conn: &Connection, id: i64) -> Result<Option<Asset>> {
    let sql = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = ?1");
    query_one(conn, &sql, id, asset_from_row)
}

fn fetch_task(conn: &Connection, id: i64) -> Result<Option<AsyncTask>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM async_tasks WHERE id = ?1");
    query_one(conn, &sql, id, task_from_row)
}

/// Builds the node projection of a tree table. Expired assets are inactive.
fn node_select(kind: TreeKind) -> String {
    let active = match kind {
        TreeKind::Asset => "state != 'expired'",
        TreeKind::Department | TreeKind::AssetClass => "1",
    };
    format!(
        "SELECT id, name, parent_id, {}, {} FROM {}",
        kind.scope_column(),
        active,
        kind.table()
    )
}

impl NodeSource for Connection {
    fn node(&self, kind: TreeKind, id: i64) -> Result<Option<TreeNode>> {
        let sql = format!("{} WHERE id = ?1", node_select(kind));
        query_one(self, &sql, id, node_from_row)
    }

    fn children(&self, kind: TreeKind, id: i64) -> Result<Vec<TreeNode>> {
        let sql = format!("{} WHERE parent_id = ?1 ORDER BY id", node_select(kind));
        query_all(self, &sql, params![id], node_from_row)
    }

    fn roots(&self, kind: TreeKind, scope_id: i64) -> Result<Vec<TreeNode>> {
        let sql = format!(
            "{} WHERE parent_id IS NULL AND {} = ?1 ORDER BY id",
            node_select(kind),
            kind.scope_column()
        );
        query_all(self, &sql, params![scope_id], node_from_row)
    }
}

/// Inserts one asset and, recursively, its children under it.
fn insert_asset_tree(
    conn: &Connection,
    department_id: i64,
    parent_id: Option<i64>,
    asset: &NewAsset,
    now: &str,
) -> Result<i64> {
    let class = fetch_class(conn, asset.class_id)?
        .filter(|c| c.department_id == department_id)
        .ok_or(Error::AssetClassNotFound)?;
    if class.class_type == ClassType::Item && asset.number != 1 {
        return Err(Error::InvalidTypeOfClass);
    }

    conn.execute(
        "INSERT INTO assets (name, class_id, parent_id, department_id, state, price, number,
                             position, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'idle', ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            asset.name,
            asset.class_id,
            parent_id,
            department_id,
            asset.price,
            asset.number,
            asset.position,
            asset.description,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();

    for child in &asset.children {
        insert_asset_tree(conn, department_id, Some(id), child, now)?;
    }
    Ok(id)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Entity operations

    fn create_entity(&self, name: &str) -> Result<Entity> {
        let conn = self.conn();
        let result = conn.execute(
            "INSERT INTO entities (name, created_at) VALUES (?1, ?2)",
            params![name, now()],
        );

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(Error::DuplicatedName),
            Err(e) => return Err(Error::from(e)),
        }

        fetch_entity(&conn, conn.last_insert_rowid())?
            .ok_or_else(|| Error::Internal("inserted entity vanished".to_string()))
    }

    fn get_entity(&self, id: i64) -> Result<Option<Entity>> {
        fetch_entity(&self.conn(), id)
    }

    fn get_entity_by_name(&self, name: &str) -> Result<Option<Entity>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE name = ?1"),
            params![name],
            entity_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_entities(&self) -> Result<Vec<Entity>> {
        let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities ORDER BY id");
        query_all(&self.conn(), &sql, [], entity_from_row)
    }

    fn delete_entity(&self, id: i64) -> Result<()> {
        self.immediate(|conn| {
            fetch_entity(conn, id)?.ok_or(Error::EntityNotFound)?;
            if count(conn, "SELECT COUNT(*) FROM users WHERE entity_id = ?1", id)? > 0 {
                return Err(Error::EntityHasUsers);
            }
            // Departments cascade, taking their classes, assets, tasks and
            // stats with them.
            let departments =
                count(conn, "SELECT COUNT(*) FROM departments WHERE entity_id = ?1", id)?;
            conn.execute("DELETE FROM entities WHERE id = ?1", params![id])?;
            tracing::info!(entity_id = id, departments, "entity deleted with its departments");
            Ok(())
        })
    }

    // Department operations

    fn create_department(
        &self,
        name: &str,
        entity_id: i64,
        parent_id: Option<i64>,
    ) -> Result<Department> {
        self.immediate(|conn| {
            fetch_entity(conn, entity_id)?.ok_or(Error::EntityNotFound)?;

            if let Some(parent_id) = parent_id {
                let parent = fetch_department(conn, parent_id)?.ok_or(Error::DepartmentNotFound)?;
                if parent.entity_id != entity_id {
                    return Err(Error::CrossScope(TreeKind::Department));
                }
            }

            let siblings: i64 = conn.query_row(
                "SELECT COUNT(*) FROM departments
                 WHERE entity_id = ?1 AND parent_id IS ?2 AND name = ?3",
                params![entity_id, parent_id, name],
                |row| row.get(0),
            )?;
            if siblings > 0 {
                return Err(Error::DuplicatedName);
            }

            conn.execute(
                "INSERT INTO departments (name, parent_id, entity_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![name, parent_id, entity_id, now()],
            )?;

            fetch_department(conn, conn.last_insert_rowid())?
                .ok_or_else(|| Error::Internal("inserted department vanished".to_string()))
        })
    }

    fn get_department(&self, id: i64) -> Result<Option<Department>> {
        fetch_department(&self.conn(), id)
    }

    fn list_departments(&self, entity_id: i64) -> Result<Vec<Department>> {
        let sql =
            format!("SELECT {DEPARTMENT_COLUMNS} FROM departments WHERE entity_id = ?1 ORDER BY id");
        query_all(&self.conn(), &sql, params![entity_id], department_from_row)
    }

    fn delete_department(&self, id: i64) -> Result<()> {
        self.immediate(|conn| {
            hierarchy::get_node(conn, TreeKind::Department, id)?;
            if count(conn, "SELECT COUNT(*) FROM users WHERE department_id = ?1", id)? > 0 {
                return Err(Error::DepartmentHasUsers);
            }

            let references = count(
                conn,
                "SELECT (SELECT COUNT(*) FROM assets WHERE department_id = ?1)
                      + (SELECT COUNT(*) FROM asset_classes WHERE department_id = ?1)",
                id,
            )?;
            hierarchy::delete_guard(conn, TreeKind::Department, id, references)?;

            conn.execute("DELETE FROM departments WHERE id = ?1", params![id])?;
            tracing::info!(department_id = id, "department deleted");
            Ok(())
        })
    }

    fn rescope_department(&self, id: i64, entity_id: i64) -> Result<Vec<i64>> {
        self.immediate(|conn| {
            let node = hierarchy::get_node(conn, TreeKind::Department, id)?;
            fetch_entity(conn, entity_id)?.ok_or(Error::EntityNotFound)?;
            if node.scope_id == entity_id {
                return Ok(Vec::new());
            }

            let mut moved = vec![id];
            moved.extend(
                hierarchy::descendants(conn, TreeKind::Department, id)?
                    .into_iter()
                    .map(|n| n.id),
            );

            let now = now();
            conn.execute(
                "UPDATE departments SET parent_id = NULL WHERE id = ?1",
                params![id],
            )?;
            for department_id in &moved {
                conn.execute(
                    "UPDATE departments SET entity_id = ?1 WHERE id = ?2",
                    params![entity_id, department_id],
                )?;
                conn.execute(
                    "UPDATE users SET entity_id = ?1, updated_at = ?2 WHERE department_id = ?3",
                    params![entity_id, now, department_id],
                )?;
                conn.execute(
                    "UPDATE async_tasks SET entity_id = ?1 WHERE department_id = ?2",
                    params![entity_id, department_id],
                )?;
            }

            tracing::info!(
                department_id = id,
                from_entity = node.scope_id,
                to_entity = entity_id,
                moved = moved.len(),
                "department subtree rescoped"
            );
            Ok(moved)
        })
    }

    // User operations

    fn create_user(&self, user: &NewUser) -> Result<User> {
        let conn = self.conn();
        let now = now();
        let result = conn.execute(
            "INSERT INTO users (username, password_hash, banned, entity_id, department_id, roles,
                                created_at, updated_at)
             VALUES (?1, ?2, 0, ?3, ?4, ?5, ?6, ?6)",
            params![
                user.username,
                user.password_hash,
                user.entity_id,
                user.department_id,
                i64::from(user.roles),
                now,
            ],
        );

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => return Err(Error::UserHasExisted),
            Err(e) => return Err(Error::from(e)),
        }

        fetch_user(&conn, conn.last_insert_rowid())?
            .ok_or_else(|| Error::Internal("inserted user vanished".to_string()))
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        fetch_user(&self.conn(), id)
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            user_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn get_user_with_department_and_entity(&self, id: i64) -> Result<Option<UserWithScope>> {
        let conn = self.conn();
        let Some(user) = fetch_user(&conn, id)? else {
            return Ok(None);
        };

        let department = match user.department_id {
            Some(department_id) => fetch_department(&conn, department_id)?,
            None => None,
        };
        let entity = match user.entity_id {
            Some(entity_id) => fetch_entity(&conn, entity_id)?,
            None => None,
        };

        Ok(Some(UserWithScope {
            user,
            department,
            entity,
        }))
    }

    fn list_users(&self, filter: UserFilter, cursor: i64, limit: i64) -> Result<Vec<User>> {
        let (column, scope) = user_filter(filter);
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE id > ?1 AND (?3 IS NULL OR {column} = ?3)
             ORDER BY id LIMIT ?2"
        );
        query_all(
            &self.conn(),
            &sql,
            params![cursor, limit, scope],
            user_from_row,
        )
    }

    fn count_users(&self, filter: UserFilter) -> Result<u64> {
        let (column, scope) = user_filter(filter);
        let conn = self.conn();
        let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM users WHERE ?1 IS NULL OR {column} = ?1"),
            params![scope],
            |row| row.get(0),
        )?;
        Ok(n.max(0) as u64)
    }

    fn set_user_password(&self, id: i64, password_hash: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3",
            params![password_hash, now(), id],
        )?;

        if rows == 0 {
            return Err(Error::UserNotFound);
        }
        Ok(())
    }

    fn set_user_banned(&self, id: i64, banned: bool) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET banned = ?1, updated_at = ?2 WHERE id = ?3",
            params![banned, now(), id],
        )?;

        if rows == 0 {
            return Err(Error::UserNotFound);
        }
        Ok(())
    }

    fn set_user_roles(&self, id: i64, roles: RoleFlags) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE users SET roles = ?1, updated_at = ?2 WHERE id = ?3",
            params![i64::from(roles), now(), id],
        )?;

        if rows == 0 {
            return Err(Error::UserNotFound);
        }
        Ok(())
    }

    fn set_user_scope(
        &self,
        id: i64,
        entity_id: Option<i64>,
        department_id: Option<i64>,
    ) -> Result<()> {
        self.immediate(|conn| {
            if let Some(department_id) = department_id {
                let department =
                    fetch_department(conn, department_id)?.ok_or(Error::DepartmentNotFound)?;
                if Some(department.entity_id) != entity_id {
                    return Err(Error::DepartmentNotInEntity);
                }
            }

            let rows = conn.execute(
                "UPDATE users SET entity_id = ?1, department_id = ?2, updated_at = ?3 WHERE id = ?4",
                params![entity_id, department_id, now(), id],
            )?;
            if rows == 0 {
                return Err(Error::UserNotFound);
            }
            Ok(())
        })
    }

    fn delete_user(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn delete_token(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM tokens WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![now(), id],
        )?;
        Ok(())
    }

    // Hierarchy operations

    fn get_node(&self, kind: TreeKind, id: i64) -> Result<TreeNode> {
        hierarchy::get_node(&*self.conn(), kind, id)
    }

    fn list_children(&self, kind: TreeKind, id: i64) -> Result<Vec<TreeNode>> {
        let conn = self.conn();
        hierarchy::get_node(&*conn, kind, id)?;
        conn.children(kind, id)
    }

    fn ancestor_chain(&self, kind: TreeKind, id: i64) -> Result<Vec<TreeNode>> {
        hierarchy::ancestor_chain(&*self.conn(), kind, id)
    }

    fn reparent(&self, kind: TreeKind, id: i64, parent_id: Option<i64>) -> Result<()> {
        self.immediate(|conn| {
            hierarchy::check_reparent(conn, kind, id, parent_id)?;

            if let (TreeKind::AssetClass, Some(parent_id)) = (kind, parent_id) {
                let class = fetch_class(conn, id)?.ok_or(Error::AssetClassNotFound)?;
                let parent = fetch_class(conn, parent_id)?.ok_or(Error::ParentAssetClassNotFound)?;
                if class.class_type != parent.class_type {
                    tracing::debug!(id, parent_id, "reparent rejected: class type mismatch");
                    return Err(Error::InvalidTypeOfClass);
                }
            }

            conn.execute(
                &format!("UPDATE {} SET parent_id = ?1 WHERE id = ?2", kind.table()),
                params![parent_id, id],
            )?;
            tracing::info!(%kind, id, ?parent_id, "node reparented");
            Ok(())
        })
    }

    fn build_tree(&self, kind: TreeKind, root: i64) -> Result<TreeView> {
        hierarchy::build_tree(&*self.conn(), kind, root)
    }

    fn build_forest(&self, kind: TreeKind, scope_id: i64) -> Result<Vec<TreeView>> {
        hierarchy::build_forest(&*self.conn(), kind, scope_id)
    }

    // Asset class operations

    fn create_asset_class(
        &self,
        name: &str,
        department_id: i64,
        parent_id: Option<i64>,
        class_type: ClassType,
    ) -> Result<AssetClass> {
        self.immediate(|conn| {
            fetch_department(conn, department_id)?.ok_or(Error::DepartmentNotFound)?;

            if let Some(parent_id) = parent_id {
                let parent = fetch_class(conn, parent_id)?.ok_or(Error::ParentAssetClassNotFound)?;
                if parent.department_id != department_id {
                    return Err(Error::CrossScope(TreeKind::AssetClass));
                }
                if parent.class_type != class_type {
                    return Err(Error::InvalidTypeOfClass);
                }
            }

            conn.execute(
                "INSERT INTO asset_classes (name, parent_id, department_id, class_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![name, parent_id, department_id, class_type.as_str(), now()],
            )?;

            fetch_class(conn, conn.last_insert_rowid())?
                .ok_or_else(|| Error::Internal("inserted asset class vanished".to_string()))
        })
    }

    fn get_asset_class(&self, id: i64) -> Result<Option<AssetClass>> {
        fetch_class(&self.conn(), id)
    }

    fn rename_asset_class(&self, id: i64, name: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE asset_classes SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;

        if rows == 0 {
            return Err(Error::AssetClassNotFound);
        }
        Ok(())
    }

    fn delete_asset_class(&self, id: i64) -> Result<()> {
        self.immediate(|conn| {
            let references = count(conn, "SELECT COUNT(*) FROM assets WHERE class_id = ?1", id)?;
            hierarchy::delete_guard(conn, TreeKind::AssetClass, id, references)?;
            conn.execute("DELETE FROM asset_classes WHERE id = ?1", params![id])?;
            Ok(())
        })
    }

    // Asset operations

    fn create_assets(
        &self,
        department_id: i64,
        parent_id: Option<i64>,
        assets: &[NewAsset],
    ) -> Result<Vec<i64>> {
        self.immediate(|conn| {
            fetch_department(conn, department_id)?.ok_or(Error::DepartmentNotFound)?;

            if let Some(parent_id) = parent_id {
                let parent = fetch_asset(conn, parent_id)?
                    .filter(|a| a.state != AssetState::Expired)
                    .ok_or(Error::ParentAssetNotFound)?;
                if parent.department_id != department_id {
                    return Err(Error::CrossScope(TreeKind::Asset));
                }
            }

            let now = now();
            let ids = assets
                .iter()
                .map(|asset| insert_asset_tree(conn, department_id, parent_id, asset, &now))
                .collect::<Result<Vec<_>>>()?;

            tracing::info!(department_id, created = ids.len(), "assets created");
            Ok(ids)
        })
    }

    fn get_asset(&self, id: i64) -> Result<Option<Asset>> {
        fetch_asset(&self.conn(), id)
    }

    fn list_assets(&self, filter: AssetFilter) -> Result<Vec<Asset>> {
        let (clause, id) = match filter {
            AssetFilter::ActiveInDepartment(id) => ("department_id = ?1 AND state != 'expired'", id),
            AssetFilter::Owner(id) => ("owner_id = ?1", id),
            AssetFilter::Maintainer(id) => ("maintainer_id = ?1 AND state = 'maintained'", id),
        };
        let sql = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE {clause} ORDER BY id");
        query_all(&self.conn(), &sql, params![id], asset_from_row)
    }

    fn update_asset(&self, id: i64, update: &AssetUpdate) -> Result<Asset> {
        self.immediate(|conn| {
            let mut asset = fetch_asset(conn, id)?.ok_or(Error::AssetNotFound)?;

            if let Some(name) = &update.name {
                asset.name = name.clone();
            }
            if let Some(class_id) = update.class_id {
                asset.class_id = class_id;
            }
            if let Some(price) = update.price {
                asset.price = price;
            }
            if let Some(number) = update.number {
                asset.number = number;
            }
            if let Some(position) = &update.position {
                asset.position = Some(position.clone());
            }
            if let Some(description) = &update.description {
                asset.description = Some(description.clone());
            }

            let class = fetch_class(conn, asset.class_id)?
                .filter(|c| c.department_id == asset.department_id)
                .ok_or(Error::AssetClassNotFound)?;
            if class.class_type == ClassType::Item && asset.number != 1 {
                return Err(Error::InvalidTypeOfClass);
            }

            asset.updated_at = Utc::now();
            conn.execute(
                "UPDATE assets SET name = ?1, class_id = ?2, price = ?3, number = ?4,
                                   position = ?5, description = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    asset.name,
                    asset.class_id,
                    asset.price,
                    asset.number,
                    asset.position,
                    asset.description,
                    format_datetime(&asset.updated_at),
                    id,
                ],
            )?;
            Ok(asset)
        })
    }

    fn delete_asset(&self, id: i64, guard: &dyn Fn(&Asset) -> Result<()>) -> Result<()> {
        self.immediate(|conn| {
            let asset = fetch_asset(conn, id)?.ok_or(Error::AssetNotFound)?;
            guard(&asset)?;
            hierarchy::delete_guard(conn, TreeKind::Asset, id, 0)?;
            conn.execute("DELETE FROM assets WHERE id = ?1", params![id])?;
            tracing::info!(asset_id = id, "asset deleted");
            Ok(())
        })
    }

    fn transition_assets(
        &self,
        ids: &[i64],
        detach_descendants: bool,
        apply: &mut AssetTransition<'_>,
    ) -> Result<Vec<Asset>> {
        if ids.is_empty() {
            return Err(Error::AssetListInvalid);
        }
        let listed: HashSet<i64> = ids.iter().copied().collect();
        if listed.len() != ids.len() {
            return Err(Error::AssetListInvalid);
        }

        self.immediate(|conn| {
            let mut assets = ids
                .iter()
                .map(|&id| fetch_asset(conn, id)?.ok_or(Error::AssetNotFound))
                .collect::<Result<Vec<_>>>()?;

            let now = Utc::now();
            let stamp = format_datetime(&now);

            if detach_descendants {
                let mut detached = 0usize;
                for &id in ids {
                    for node in hierarchy::descendants(conn, TreeKind::Asset, id)? {
                        if listed.contains(&node.id) {
                            continue;
                        }
                        conn.execute(
                            "UPDATE assets SET parent_id = NULL, updated_at = ?1 WHERE id = ?2",
                            params![stamp, node.id],
                        )?;
                        detached += 1;
                    }
                }
                if detached > 0 {
                    tracing::debug!(detached, "descendant assets detached");
                }
            }

            for asset in &mut assets {
                apply(asset)?;
                asset.updated_at = now;
                conn.execute(
                    "UPDATE assets SET parent_id = ?1, department_id = ?2, owner_id = ?3,
                                       maintainer_id = ?4, state = ?5, updated_at = ?6
                     WHERE id = ?7",
                    params![
                        asset.parent_id,
                        asset.department_id,
                        asset.owner_id,
                        asset.maintainer_id,
                        asset.state.as_str(),
                        stamp,
                        asset.id,
                    ],
                )?;
            }

            Ok(assets)
        })
    }

    // Statistics

    fn record_asset_stats(&self) -> Result<usize> {
        self.immediate(|conn| {
            let totals = query_all(
                conn,
                "SELECT d.id, COALESCE(SUM(a.price * a.number), 0.0)
                 FROM departments d
                 LEFT JOIN assets a ON a.department_id = d.id AND a.state != 'expired'
                 GROUP BY d.id ORDER BY d.id",
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)),
            )?;

            let now = now();
            for (department_id, total) in &totals {
                conn.execute(
                    "INSERT INTO asset_stats (department_id, total, recorded_at) VALUES (?1, ?2, ?3)",
                    params![department_id, total, now],
                )?;
            }
            Ok(totals.len())
        })
    }

    fn list_asset_stats(&self, department_id: i64) -> Result<Vec<AssetStat>> {
        query_all(
            &self.conn(),
            "SELECT department_id, total, recorded_at FROM asset_stats
             WHERE department_id = ?1 ORDER BY id",
            params![department_id],
            |row| {
                Ok(AssetStat {
                    department_id: row.get(0)?,
                    total: row.get(1)?,
                    recorded_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
    }

    // Async task operations

    fn create_task(&self, task: &NewTask) -> Result<AsyncTask> {
        let conn = self.conn();
        let now = now();
        conn.execute(
            "INSERT INTO async_tasks (task_type, issuer_id, department_id, entity_id, state,
                                      download_link, object_key, message, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, '', ?7, ?7)",
            params![
                task.task_type.as_str(),
                task.issuer_id,
                task.department_id,
                task.entity_id,
                task.download_link,
                task.object_key,
                now,
            ],
        )?;

        fetch_task(&conn, conn.last_insert_rowid())?
            .ok_or_else(|| Error::Internal("inserted task vanished".to_string()))
    }

    fn get_task(&self, id: i64) -> Result<Option<AsyncTask>> {
        fetch_task(&self.conn(), id)
    }

    fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<AsyncTask>> {
        let (column, id) = match filter {
            TaskFilter::Issuer(id) => ("issuer_id", id),
            TaskFilter::Department(id) => ("department_id", id),
            TaskFilter::Entity(id) => ("entity_id", id),
        };
        let sql = format!("SELECT {TASK_COLUMNS} FROM async_tasks WHERE {column} = ?1 ORDER BY id");
        query_all(&self.conn(), &sql, params![id], task_from_row)
    }

    fn update_task(&self, id: i64, apply: &mut TaskTransition<'_>) -> Result<AsyncTask> {
        self.immediate(|conn| {
            let mut task = fetch_task(conn, id)?.ok_or(Error::TaskNotFound)?;
            apply(&mut task)?;
            task.updated_at = Utc::now();

            conn.execute(
                "UPDATE async_tasks SET state = ?1, message = ?2, download_link = ?3,
                                        object_key = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    task.state.as_str(),
                    task.message,
                    task.download_link,
                    task.object_key,
                    format_datetime(&task.updated_at),
                    id,
                ],
            )?;
            Ok(task)
        })
    }

    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Column and value narrowing a user query; `None` selects every user.
fn user_filter(filter: UserFilter) -> (&'static str, Option<i64>) {
    match filter {
        UserFilter::All => ("id", None),
        UserFilter::Entity(id) => ("entity_id", Some(id)),
        UserFilter::Department(id) => ("department_id", Some(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open() -> (TempDir, SqliteStore) {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        (temp, store)
    }

    fn user(store: &SqliteStore, name: &str, entity: Option<i64>, dept: Option<i64>) -> User {
        store
            .create_user(&NewUser {
                username: name.to_string(),
                password_hash: "hash".to_string(),
                entity_id: entity,
                department_id: dept,
                roles: RoleFlags::NONE,
            })
            .unwrap()
    }

    fn leaf(name: &str, class_id: i64) -> NewAsset {
        NewAsset {
            name: name.to_string(),
            class_id,
            price: 10.0,
            number: 1,
            position: None,
            description: None,
            children: Vec::new(),
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let (_temp, store) = open();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        for table in [
            "entities",
            "departments",
            "users",
            "tokens",
            "asset_classes",
            "assets",
            "async_tasks",
            "asset_stats",
        ] {
            assert!(tables.contains(&table.to_string()), "missing {table}");
        }
    }

    #[test]
    fn test_entity_crud() {
        let (_temp, store) = open();

        let entity = store.create_entity("acme").unwrap();
        assert_eq!(store.get_entity(entity.id).unwrap().unwrap().name, "acme");
        assert_eq!(
            store.get_entity_by_name("acme").unwrap().unwrap().id,
            entity.id
        );
        assert!(matches!(
            store.create_entity("acme"),
            Err(Error::DuplicatedName)
        ));

        user(&store, "alice", Some(entity.id), None);
        assert!(matches!(
            store.delete_entity(entity.id),
            Err(Error::EntityHasUsers)
        ));
    }

    #[test]
    fn test_entity_delete_removes_its_departments() {
        let (_temp, store) = open();
        let entity = store.create_entity("acme").unwrap();
        let dept = store.create_department("lab", entity.id, None).unwrap();
        let class = store
            .create_asset_class("scopes", dept.id, None, ClassType::Item)
            .unwrap();
        let ids = store
            .create_assets(dept.id, None, &[leaf("scope", class.id)])
            .unwrap();

        store.delete_entity(entity.id).unwrap();
        assert!(store.get_entity(entity.id).unwrap().is_none());
        assert!(store.get_department(dept.id).unwrap().is_none());
        assert!(store.get_asset(ids[0]).unwrap().is_none());
    }

    #[test]
    fn test_department_parent_must_share_entity() {
        let (_temp, store) = open();
        let e1 = store.create_entity("e1").unwrap();
        let e2 = store.create_entity("e2").unwrap();

        let a = store.create_department("a", e1.id, None).unwrap();
        let err = store.create_department("b", e2.id, Some(a.id)).unwrap_err();
        assert!(matches!(err, Error::CrossScope(TreeKind::Department)));

        store.create_department("b", e1.id, Some(a.id)).unwrap();
        assert!(matches!(
            store.create_department("b", e1.id, Some(a.id)),
            Err(Error::DuplicatedName)
        ));
        assert!(matches!(
            store.create_department("a", e1.id, None),
            Err(Error::DuplicatedName)
        ));
    }

    #[test]
    fn test_reparent_cycle_leaves_tree_unchanged() {
        let (_temp, store) = open();
        let e = store.create_entity("e").unwrap();
        let x = store.create_department("x", e.id, None).unwrap();
        let y = store.create_department("y", e.id, Some(x.id)).unwrap();
        let z = store.create_department("z", e.id, Some(y.id)).unwrap();

        let err = store
            .reparent(TreeKind::Department, x.id, Some(z.id))
            .unwrap_err();
        assert!(matches!(err, Error::ParentCannotBeSuccessor));

        let chain: Vec<i64> = store
            .ancestor_chain(TreeKind::Department, z.id)
            .unwrap()
            .iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(chain, vec![z.id, y.id, x.id]);
        assert!(store.get_department(x.id).unwrap().unwrap().parent_id.is_none());

        store.reparent(TreeKind::Department, z.id, Some(x.id)).unwrap();
        assert_eq!(store.list_children(TreeKind::Department, x.id).unwrap().len(), 2);
    }

    #[test]
    fn test_rescope_moves_subtree_and_users() {
        let (_temp, store) = open();
        let e1 = store.create_entity("e1").unwrap();
        let e2 = store.create_entity("e2").unwrap();
        let root = store.create_department("root", e1.id, None).unwrap();
        let mid = store.create_department("mid", e1.id, Some(root.id)).unwrap();
        let low = store.create_department("low", e1.id, Some(mid.id)).unwrap();
        let u = user(&store, "bob", Some(e1.id), Some(low.id));

        let moved = store.rescope_department(mid.id, e2.id).unwrap();
        assert_eq!(moved, vec![mid.id, low.id]);

        let mid = store.get_department(mid.id).unwrap().unwrap();
        assert_eq!(mid.entity_id, e2.id);
        assert!(mid.parent_id.is_none());
        assert_eq!(store.get_department(low.id).unwrap().unwrap().entity_id, e2.id);
        assert_eq!(store.get_user(u.id).unwrap().unwrap().entity_id, Some(e2.id));
        assert_eq!(store.get_department(root.id).unwrap().unwrap().entity_id, e1.id);
    }

    #[test]
    fn test_user_with_department_and_entity() {
        let (_temp, store) = open();
        let e = store.create_entity("e").unwrap();
        let d = store.create_department("d", e.id, None).unwrap();
        let u = user(&store, "carol", Some(e.id), Some(d.id));

        let scoped = store
            .get_user_with_department_and_entity(u.id)
            .unwrap()
            .unwrap();
        assert_eq!(scoped.department.unwrap().id, d.id);
        assert_eq!(scoped.entity.unwrap().id, e.id);

        assert!(matches!(
            store.create_user(&NewUser {
                username: "carol".to_string(),
                password_hash: "x".to_string(),
                entity_id: None,
                department_id: None,
                roles: RoleFlags::NONE,
            }),
            Err(Error::UserHasExisted)
        ));
    }

    #[test]
    fn test_list_users_by_scope() {
        let (_temp, store) = open();
        let e = store.create_entity("e").unwrap();
        let d = store.create_department("d", e.id, None).unwrap();
        user(&store, "u1", Some(e.id), Some(d.id));
        user(&store, "u2", Some(e.id), None);
        user(&store, "u3", None, None);

        assert_eq!(store.list_users(UserFilter::All, 0, 100).unwrap().len(), 3);
        assert_eq!(store.count_users(UserFilter::Entity(e.id)).unwrap(), 2);
        assert_eq!(
            store
                .list_users(UserFilter::Department(d.id), 0, 100)
                .unwrap()
                .len(),
            1
        );
        assert_eq!(store.list_users(UserFilter::All, 0, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_class_type_and_delete_guards() {
        let (_temp, store) = open();
        let e = store.create_entity("e").unwrap();
        let d = store.create_department("d", e.id, None).unwrap();

        let root = store
            .create_asset_class("tools", d.id, None, ClassType::Item)
            .unwrap();
        assert!(matches!(
            store.create_asset_class("bolts", d.id, Some(root.id), ClassType::Quantity),
            Err(Error::InvalidTypeOfClass)
        ));
        let child = store
            .create_asset_class("drills", d.id, Some(root.id), ClassType::Item)
            .unwrap();

        assert!(matches!(
            store.delete_asset_class(root.id),
            Err(Error::HasChildren(TreeKind::AssetClass))
        ));
        store.create_assets(d.id, None, &[leaf("drill", child.id)]).unwrap();
        assert!(matches!(
            store.delete_asset_class(child.id),
            Err(Error::HasReferences(TreeKind::AssetClass))
        ));
    }

    #[test]
    fn test_create_nested_assets_and_item_number() {
        let (_temp, store) = open();
        let e = store.create_entity("e").unwrap();
        let d = store.create_department("d", e.id, None).unwrap();
        let item = store
            .create_asset_class("pc", d.id, None, ClassType::Item)
            .unwrap();

        let mut pc = leaf("pc", item.id);
        pc.children.push(leaf("monitor", item.id));
        pc.children.push(leaf("keyboard", item.id));
        let ids = store.create_assets(d.id, None, &[pc]).unwrap();
        assert_eq!(ids.len(), 1);

        let tree = store.build_tree(TreeKind::Asset, ids[0]).unwrap();
        assert_eq!(tree.node_count(), 3);

        let mut bad = leaf("bulk", item.id);
        bad.number = 5;
        assert!(matches!(
            store.create_assets(d.id, None, &[bad]),
            Err(Error::InvalidTypeOfClass)
        ));
        assert_eq!(
            store
                .list_assets(AssetFilter::ActiveInDepartment(d.id))
                .unwrap()
                .len(),
            3
        );
    }

    #[test]
    fn test_transition_detaches_descendants() {
        let (_temp, store) = open();
        let e = store.create_entity("e").unwrap();
        let d1 = store.create_department("d1", e.id, None).unwrap();
        let d2 = store.create_department("d2", e.id, None).unwrap();
        let class = store
            .create_asset_class("c", d1.id, None, ClassType::Item)
            .unwrap();

        let mut top = leaf("top", class.id);
        let mut mid = leaf("mid", class.id);
        mid.children.push(leaf("low", class.id));
        top.children.push(mid);
        let top_id = store.create_assets(d1.id, None, &[top]).unwrap()[0];

        store
            .transition_assets(&[top_id], true, &mut |asset| {
                asset.department_id = d2.id;
                asset.parent_id = None;
                Ok(())
            })
            .unwrap();

        for asset in store
            .list_assets(AssetFilter::ActiveInDepartment(d1.id))
            .unwrap()
        {
            assert!(asset.parent_id.is_none(), "{} still attached", asset.name);
        }
        assert_eq!(
            store.get_asset(top_id).unwrap().unwrap().department_id,
            d2.id
        );
    }

    #[test]
    fn test_transition_is_all_or_nothing() {
        let (_temp, store) = open();
        let e = store.create_entity("e").unwrap();
        let d = store.create_department("d", e.id, None).unwrap();
        let class = store
            .create_asset_class("c", d.id, None, ClassType::Item)
            .unwrap();
        let ids = store
            .create_assets(d.id, None, &[leaf("a", class.id), leaf("b", class.id)])
            .unwrap();

        let err = store
            .transition_assets(&ids, false, &mut |asset| {
                if asset.id == ids[1] {
                    return Err(Error::AssetListInvalid);
                }
                asset.state = AssetState::Expired;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, Error::AssetListInvalid));
        assert_eq!(
            store.get_asset(ids[0]).unwrap().unwrap().state,
            AssetState::Idle
        );

        assert!(matches!(
            store.transition_assets(&[], false, &mut |_| Ok(())),
            Err(Error::AssetListInvalid)
        ));
        assert!(matches!(
            store.transition_assets(&[ids[0], ids[0]], false, &mut |_| Ok(())),
            Err(Error::AssetListInvalid)
        ));
    }

    #[test]
    fn test_token_lookup_collision() {
        let (_temp, store) = open();
        let u = user(&store, "dave", None, None);

        let token = |id: &str| Token {
            id: id.to_string(),
            token_hash: "hash".to_string(),
            token_lookup: "lookup12".to_string(),
            user_id: u.id,
            created_at: Utc::now(),
            expires_at: None,
            last_used_at: None,
        };
        store.create_token(&token("token-1")).unwrap();

        let result = store.create_token(&token("token-2"));
        assert!(matches!(result, Err(Error::TokenLookupCollision)));
    }

    #[test]
    fn test_task_update_and_listing() {
        let (_temp, store) = open();
        let e = store.create_entity("e").unwrap();
        let d = store.create_department("d", e.id, None).unwrap();
        let u = user(&store, "erin", Some(e.id), Some(d.id));

        let task = store
            .create_task(&NewTask {
                task_type: TaskType::Import,
                issuer_id: u.id,
                department_id: d.id,
                entity_id: e.id,
                download_link: None,
                object_key: Some("imports/1.xlsx".to_string()),
            })
            .unwrap();
        assert_eq!(task.state, TaskState::Pending);

        let done = store
            .update_task(task.id, &mut |t| {
                t.state = TaskState::Success;
                t.message = "ok".to_string();
                Ok(())
            })
            .unwrap();
        assert_eq!(done.state, TaskState::Success);
        assert_eq!(
            store.get_task(task.id).unwrap().unwrap().state,
            TaskState::Success
        );
        assert_eq!(store.list_tasks(TaskFilter::Department(d.id)).unwrap().len(), 1);
        assert!(store.list_tasks(TaskFilter::Issuer(u.id + 1)).unwrap().is_empty());
    }

    #[test]
    fn test_record_asset_stats() {
        let (_temp, store) = open();
        let e = store.create_entity("e").unwrap();
        let d = store.create_department("d", e.id, None).unwrap();
        let class = store
            .create_asset_class("screws", d.id, None, ClassType::Quantity)
            .unwrap();
        let mut screws = leaf("screws", class.id);
        screws.number = 4;
        screws.price = 2.5;
        store.create_assets(d.id, None, &[screws]).unwrap();

        assert_eq!(store.record_asset_stats().unwrap(), 1);
        let stats = store.list_asset_stats(d.id).unwrap();
        assert_eq!(stats.len(), 1);
        assert!((stats[0].total - 10.0).abs() < f64::EPSILON);
    }
}
