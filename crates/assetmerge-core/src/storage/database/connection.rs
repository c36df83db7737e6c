use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rusqlite::Connection;

use super::schema::apply_pragmas;
use crate::error::Result;

/// Single SQLite connection shared by the repositories of one store.
pub struct ConnectionPool {
    connection: Mutex<Connection>,
}

impl ConnectionPool {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        apply_pragmas(&conn)?;
        Ok(Self {
            connection: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_pragmas(&conn)?;
        Ok(Self {
            connection: Mutex::new(conn),
        })
    }

    pub fn get_connection(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the guard leaves SQLite itself consistent.
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
