//! SQLite Favorites Store
//!
//! Favorites live in a single table with a UNIQUE constraint on the Pokémon
//! id and a secondary index on the name.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection, ErrorCode, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use pokedex_core::{Favorite, NewFavorite};

use crate::{FavoritesStore, StoreError};

const FAVORITE_COLUMNS: &str = "pokemon_id, pokemon_name, pokemon_sprite, added_at";

/// SQLite-backed favorites store
pub struct SQLiteFavoritesStore {
    /// Database connection
    connection: Arc<Mutex<Connection>>,
    /// Database path, or `:memory:`
    db_path: String,
}

impl SQLiteFavoritesStore {
    /// Open (or create) the database file
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let path = db_path.as_ref().to_string_lossy().to_string();

        info!("Creating SQLite favorites store with database path: {path}");

        let conn = Connection::open(&path)?;
        conn.busy_timeout(std::time::Duration::from_secs(30))?;

        Ok(Self {
            connection: Arc::new(Mutex::new(conn)),
            db_path: path,
        })
    }

    /// Private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            connection: Arc::new(Mutex::new(conn)),
            db_path: ":memory:".to_string(),
        })
    }

    /// Open the database file and make sure the schema exists
    pub async fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        let store = Self::new(db_path)?;
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Initialize database schema
    pub async fn initialize_schema(&self) -> Result<(), StoreError> {
        info!("Initializing favorites schema");

        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS favorites (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pokemon_id INTEGER NOT NULL UNIQUE,
                pokemon_name TEXT NOT NULL,
                pokemon_sprite TEXT,
                added_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_favorites_name ON favorites(pokemon_name);",
        )?;

        Ok(())
    }

    pub fn database_path(&self) -> &str {
        &self.db_path
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    fn row_to_favorite(row: &Row<'_>) -> rusqlite::Result<Favorite> {
        let added_at: String = row.get(3)?;
        let added_at = DateTime::parse_from_rfc3339(&added_at)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?
            .with_timezone(&Utc);

        Ok(Favorite {
            pokemon_id: row.get(0)?,
            pokemon_name: row.get(1)?,
            pokemon_sprite: row.get(2)?,
            added_at,
        })
    }
}

/// Fixed-width timestamps so that text ordering matches time ordering
fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl FavoritesStore for SQLiteFavoritesStore {
    async fn list(&self) -> Result<Vec<Favorite>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {FAVORITE_COLUMNS} FROM favorites ORDER BY added_at DESC, id DESC;"
        ))?;
        let favorites = stmt
            .query_map([], Self::row_to_favorite)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Listed {} favorites", favorites.len());
        Ok(favorites)
    }

    async fn find_by_pokemon_id(&self, pokemon_id: u32) -> Result<Option<Favorite>, StoreError> {
        let conn = self.lock()?;
        let favorite = conn
            .query_row(
                &format!("SELECT {FAVORITE_COLUMNS} FROM favorites WHERE pokemon_id = ?1;"),
                params![pokemon_id],
                Self::row_to_favorite,
            )
            .optional()?;
        Ok(favorite)
    }

    async fn insert(&self, favorite: NewFavorite) -> Result<Favorite, StoreError> {
        let stored = Favorite {
            pokemon_id: favorite.pokemon_id,
            pokemon_name: favorite.pokemon_name.to_lowercase(),
            pokemon_sprite: favorite.pokemon_sprite,
            added_at: Utc::now(),
        };

        let conn = self.lock()?;
        let result = conn.execute(
            "INSERT INTO favorites (pokemon_id, pokemon_name, pokemon_sprite, added_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                stored.pokemon_id,
                stored.pokemon_name,
                stored.pokemon_sprite,
                format_timestamp(&stored.added_at)
            ],
        );

        match result {
            Ok(_) => {
                debug!("Favorite stored: {} ({})", stored.pokemon_name, stored.pokemon_id);
                Ok(stored)
            }
            Err(e) if is_unique_violation(&e) => {
                warn!("Duplicate favorite rejected: {}", stored.pokemon_id);
                Err(StoreError::Conflict(stored.pokemon_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_by_pokemon_id(&self, pokemon_id: u32) -> Result<Favorite, StoreError> {
        let conn = self.lock()?;
        let deleted = conn
            .query_row(
                &format!("DELETE FROM favorites WHERE pokemon_id = ?1 RETURNING {FAVORITE_COLUMNS};"),
                params![pokemon_id],
                Self::row_to_favorite,
            )
            .optional()?;

        match deleted {
            Some(favorite) => {
                debug!("Favorite removed: {pokemon_id}");
                Ok(favorite)
            }
            None => Err(StoreError::NotFound(pokemon_id)),
        }
    }

    async fn delete_all(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM favorites;", [])?;
        info!("Cleared {removed} favorites");
        Ok(removed)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM favorites;", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
