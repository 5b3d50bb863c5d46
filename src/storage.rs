use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use std::collections::HashMap;

use crate::camera::{Camera, CameraStatus, Credentials, DiscoveryEntry, PathSetting};

/// Persistent dashboard state: the camera table and the discovery cache.
pub trait DashboardStore {
    fn load_cameras(&mut self) -> Result<Vec<Camera>>;

    /// Insert or replace rows by id.
    fn save_cameras<'a>(&mut self, cameras: &mut dyn Iterator<Item = &'a Camera>) -> Result<()>;

    fn load_cache(&mut self) -> Result<HashMap<String, DiscoveryEntry>>;

    fn put_cache_entry(&mut self, ip: &str, entry: &DiscoveryEntry) -> Result<()>;
}

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .map_err(|e| anyhow!("failed to open database {}: {}", db_path, e))?;
        let mut store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cameras (
              id INTEGER PRIMARY KEY,
              ip TEXT NOT NULL,
              port INTEGER NOT NULL,
              user TEXT,
              password TEXT,
              vendor TEXT NOT NULL,
              path TEXT,
              status TEXT NOT NULL,
              latency_ms REAL,
              url TEXT NOT NULL,
              note TEXT
            );

            CREATE TABLE IF NOT EXISTS discovery_cache (
              ip TEXT PRIMARY KEY,
              vendor TEXT NOT NULL,
              path TEXT NOT NULL,
              user TEXT,
              password TEXT,
              port INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cameras_ip ON cameras(ip);
            "#,
        )?;
        Ok(())
    }
}

fn port_from_sql(raw: i64) -> Result<u16> {
    u16::try_from(raw).map_err(|_| anyhow!("corrupt store: port {} out of range", raw))
}

impl DashboardStore for SqliteStore {
    fn load_cameras(&mut self) -> Result<Vec<Camera>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, ip, port, user, password, vendor, path, status, latency_ms, url, note
            FROM cameras ORDER BY id ASC
            "#,
        )?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let path: Option<String> = row.get(6)?;
            let status: String = row.get(7)?;
            out.push(Camera {
                id: u32::try_from(id).map_err(|_| anyhow!("corrupt store: camera id {}", id))?,
                ip: row.get(1)?,
                port: port_from_sql(row.get(2)?)?,
                credentials: Credentials {
                    user: row.get(3)?,
                    password: row.get(4)?,
                },
                vendor: row.get(5)?,
                path: path.map(PathSetting::Fixed).unwrap_or(PathSetting::Auto),
                status: status.parse::<CameraStatus>()?,
                latency_ms: row.get(8)?,
                url: row.get(9)?,
                note: row.get(10)?,
            });
        }
        Ok(out)
    }

    fn save_cameras<'a>(&mut self, cameras: &mut dyn Iterator<Item = &'a Camera>) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR REPLACE INTO cameras(
                  id, ip, port, user, password, vendor, path, status, latency_ms, url, note
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )?;
            for camera in cameras {
                stmt.execute(params![
                    camera.id as i64,
                    camera.ip,
                    camera.port as i64,
                    camera.credentials.user,
                    camera.credentials.password,
                    camera.vendor,
                    camera.path.fixed(),
                    camera.status.as_str(),
                    camera.latency_ms,
                    camera.url,
                    camera.note,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_cache(&mut self) -> Result<HashMap<String, DiscoveryEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT ip, vendor, path, user, password, port FROM discovery_cache")?;
        let mut rows = stmt.query([])?;
        let mut out = HashMap::new();
        while let Some(row) = rows.next()? {
            let ip: String = row.get(0)?;
            out.insert(
                ip,
                DiscoveryEntry {
                    vendor: row.get(1)?,
                    path: row.get(2)?,
                    credentials: Credentials {
                        user: row.get(3)?,
                        password: row.get(4)?,
                    },
                    port: port_from_sql(row.get(5)?)?,
                },
            );
        }
        Ok(out)
    }

    fn put_cache_entry(&mut self, ip: &str, entry: &DiscoveryEntry) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO discovery_cache(ip, vendor, path, user, password, port)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                ip,
                entry.vendor,
                entry.path,
                entry.credentials.user,
                entry.credentials.password,
                entry.port as i64
            ],
        )?;
        Ok(())
    }
}
