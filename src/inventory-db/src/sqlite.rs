//! SQLite implementation using rusqlite (synchronous).
//!
//! Every write is its own statement; nothing here opens a transaction that
//! spans more than one record.

use crate::repository::*;
use crate::shared::{self, queries, schema};
use crate::types::*;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

/// Default database location
pub const DEFAULT_DB_PATH: &str = "share/inventory.db";

/// SQLite-backed inventory database
pub struct SqliteDb {
    conn: Connection,
}

fn db_err(e: rusqlite::Error) -> RepoError {
    RepoError::Database(e.to_string())
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn attributes_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<BTreeMap<String, String>> {
    let text: Option<String> = row.get(idx)?;
    match text {
        None => Ok(BTreeMap::new()),
        Some(text) => serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
    }
}

fn row_to_room(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn row_to_storage(row: &Row<'_>) -> rusqlite::Result<Storage> {
    Ok(Storage {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        room_id: row.get(4)?,
        parent_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn row_to_category(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn row_to_template(row: &Row<'_>) -> rusqlite::Result<CategoryAttributeTemplate> {
    Ok(CategoryAttributeTemplate {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        category_id: row.get(2)?,
        attribute_name: row.get(3)?,
        attribute_type: row.get(4)?,
        default_value: row.get(5)?,
        required: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn row_to_tag(row: &Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        name: row.get(2)?,
        color: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn row_to_image(row: &Row<'_>) -> rusqlite::Result<Image> {
    let item: Option<i64> = row.get(6)?;
    let receipt: Option<i64> = row.get(7)?;
    let storage: Option<i64> = row.get(8)?;
    let room: Option<i64> = row.get(9)?;
    let owner = item
        .map(ImageOwner::Item)
        .or(receipt.map(ImageOwner::Receipt))
        .or(storage.map(ImageOwner::Storage))
        .or(room.map(ImageOwner::Room));
    Ok(Image {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        file_name: row.get(2)?,
        content_type: row.get(3)?,
        size: row.get(4)?,
        sha256: row.get(5)?,
        owner,
        created_at: row.get(10)?,
    })
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    Ok(Item {
        id: row.get(0)?,
        uuid: uuid_at(row, 1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        purchase_date: row.get(4)?,
        price: row.get(5)?,
        quantity: row.get(6)?,
        custom_attributes: attributes_at(row, 7)?,
        category_id: row.get(8)?,
        storage_id: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

impl SqliteDb {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        Ok(Self { conn })
    }

    /// Initialize the database schema
    pub fn init(&self) -> RepoResult<()> {
        self.conn
            .execute_batch(schema::MIGRATIONS_TABLE)
            .map_err(db_err)?;
        self.run_migrations()
    }

    /// Check if a migration has been applied
    fn is_migration_applied(&self, version: &str) -> RepoResult<bool> {
        let result: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM schema_migrations WHERE version = ?1",
                params![version],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_err)?;
        Ok(result.is_some())
    }

    /// Mark a migration as applied
    fn mark_migration_applied(&self, version: &str) -> RepoResult<()> {
        self.conn
            .execute(
                "INSERT INTO schema_migrations (version) VALUES (?1)",
                params![version],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Run pending migrations
    fn run_migrations(&self) -> RepoResult<()> {
        if !self.is_migration_applied("0001_base_schema")? {
            for table in schema::TABLES {
                self.conn.execute_batch(table).map_err(db_err)?;
            }
            self.mark_migration_applied("0001_base_schema")?;
            tracing::info!("SQLite: Applied migration 0001_base_schema");
        }

        // Create indexes AFTER all migrations
        for index in schema::INDEXES {
            self.conn.execute_batch(index).map_err(db_err)?;
        }

        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> RepoResult<DbStats> {
        let count = |sql: &str| -> RepoResult<i64> {
            self.conn.query_row(sql, [], |row| row.get(0)).map_err(db_err)
        };
        Ok(DbStats {
            room_count: count(queries::COUNT_ROOMS)?,
            storage_count: count(queries::COUNT_STORAGES)?,
            category_count: count(queries::COUNT_CATEGORIES)?,
            template_count: count(queries::COUNT_TEMPLATES)?,
            tag_count: count(queries::COUNT_TAGS)?,
            image_count: count(queries::COUNT_IMAGES)?,
            item_count: count(queries::COUNT_ITEMS)?,
        })
    }

    fn query_all<T, P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> RepoResult<Vec<T>> {
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let rows = stmt
            .query_map(params, map)
            .map_err(db_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(db_err)?;
        Ok(rows)
    }

    fn query_one<T, P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> RepoResult<Option<T>> {
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        stmt.query_row(params, map).optional().map_err(db_err)
    }

    /// Run an UPDATE for a record that must exist
    fn update_existing<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
        what: &str,
        id: i64,
    ) -> RepoResult<()> {
        let rows = self.conn.execute(sql, params).map_err(db_err)?;
        if rows == 0 {
            return Err(RepoError::NotFound(format!("{} #{}", what, id)));
        }
        Ok(())
    }

    fn delete_row(&self, table: &str, id: i64) -> RepoResult<bool> {
        let rows = self
            .conn
            .execute(&format!("DELETE FROM {} WHERE id = ?1", table), params![id])
            .map_err(db_err)?;
        Ok(rows > 0)
    }

    /// Delete the images an owner holds. Runs before the owner row goes away.
    fn delete_owned_images(&self, owner: ImageOwner) -> RepoResult<usize> {
        let id = match owner {
            ImageOwner::Item(id)
            | ImageOwner::Receipt(id)
            | ImageOwner::Storage(id)
            | ImageOwner::Room(id) => id,
        };
        let sql = format!(
            "DELETE FROM images WHERE {} = ?1",
            shared::owner_column(&owner)
        );
        self.conn.execute(&sql, params![id]).map_err(db_err)
    }
}

impl Repository<Room> for SqliteDb {
    fn find_all(&self) -> RepoResult<Vec<Room>> {
        let sql = format!("SELECT {} FROM rooms ORDER BY id", shared::ROOM_COLUMNS);
        self.query_all(&sql, [], row_to_room)
    }

    fn find_by_id(&self, id: i64) -> RepoResult<Option<Room>> {
        let sql = format!("SELECT {} FROM rooms WHERE id = ?1", shared::ROOM_COLUMNS);
        self.query_one(&sql, params![id], row_to_room)
    }

    fn find_by_uuid(&self, uuid: &Uuid) -> RepoResult<Option<Room>> {
        let sql = format!("SELECT {} FROM rooms WHERE uuid = ?1", shared::ROOM_COLUMNS);
        self.query_one(&sql, params![uuid.to_string()], row_to_room)
    }

    fn save(&self, room: &mut Room) -> RepoResult<()> {
        match room.id {
            Some(id) => self.update_existing(
                queries::UPDATE_ROOM,
                params![id, room.name, room.description, room.created_at, room.updated_at],
                "room",
                id,
            ),
            None => {
                self.conn
                    .execute(
                        queries::INSERT_ROOM,
                        params![
                            room.uuid.to_string(),
                            room.name,
                            room.description,
                            room.created_at,
                            room.updated_at
                        ],
                    )
                    .map_err(db_err)?;
                room.id = Some(self.conn.last_insert_rowid());
                Ok(())
            }
        }
    }

    fn delete(&self, id: i64) -> RepoResult<bool> {
        self.delete_owned_images(ImageOwner::Room(id))?;
        self.delete_row("rooms", id)
    }
}

impl Repository<Storage> for SqliteDb {
    fn find_all(&self) -> RepoResult<Vec<Storage>> {
        let sql = format!("SELECT {} FROM storages ORDER BY id", shared::STORAGE_COLUMNS);
        self.query_all(&sql, [], row_to_storage)
    }

    fn find_by_id(&self, id: i64) -> RepoResult<Option<Storage>> {
        let sql = format!("SELECT {} FROM storages WHERE id = ?1", shared::STORAGE_COLUMNS);
        self.query_one(&sql, params![id], row_to_storage)
    }

    fn find_by_uuid(&self, uuid: &Uuid) -> RepoResult<Option<Storage>> {
        let sql = format!("SELECT {} FROM storages WHERE uuid = ?1", shared::STORAGE_COLUMNS);
        self.query_one(&sql, params![uuid.to_string()], row_to_storage)
    }

    fn save(&self, storage: &mut Storage) -> RepoResult<()> {
        match storage.id {
            Some(id) => self.update_existing(
                queries::UPDATE_STORAGE,
                params![
                    id,
                    storage.name,
                    storage.description,
                    storage.room_id,
                    storage.parent_id,
                    storage.created_at,
                    storage.updated_at
                ],
                "storage",
                id,
            ),
            None => {
                self.conn
                    .execute(
                        queries::INSERT_STORAGE,
                        params![
                            storage.uuid.to_string(),
                            storage.name,
                            storage.description,
                            storage.room_id,
                            storage.parent_id,
                            storage.created_at,
                            storage.updated_at
                        ],
                    )
                    .map_err(db_err)?;
                storage.id = Some(self.conn.last_insert_rowid());
                Ok(())
            }
        }
    }

    fn delete(&self, id: i64) -> RepoResult<bool> {
        self.delete_owned_images(ImageOwner::Storage(id))?;
        self.delete_row("storages", id)
    }
}

impl Repository<Category> for SqliteDb {
    fn find_all(&self) -> RepoResult<Vec<Category>> {
        let sql = format!("SELECT {} FROM categories ORDER BY id", shared::CATEGORY_COLUMNS);
        self.query_all(&sql, [], row_to_category)
    }

    fn find_by_id(&self, id: i64) -> RepoResult<Option<Category>> {
        let sql = format!("SELECT {} FROM categories WHERE id = ?1", shared::CATEGORY_COLUMNS);
        self.query_one(&sql, params![id], row_to_category)
    }

    fn find_by_uuid(&self, uuid: &Uuid) -> RepoResult<Option<Category>> {
        let sql = format!(
            "SELECT {} FROM categories WHERE uuid = ?1",
            shared::CATEGORY_COLUMNS
        );
        self.query_one(&sql, params![uuid.to_string()], row_to_category)
    }

    fn save(&self, category: &mut Category) -> RepoResult<()> {
        match category.id {
            Some(id) => self.update_existing(
                queries::UPDATE_CATEGORY,
                params![
                    id,
                    category.name,
                    category.description,
                    category.created_at,
                    category.updated_at
                ],
                "category",
                id,
            ),
            None => {
                self.conn
                    .execute(
                        queries::INSERT_CATEGORY,
                        params![
                            category.uuid.to_string(),
                            category.name,
                            category.description,
                            category.created_at,
                            category.updated_at
                        ],
                    )
                    .map_err(db_err)?;
                category.id = Some(self.conn.last_insert_rowid());
                Ok(())
            }
        }
    }

    /// Attribute templates go with the category (ON DELETE CASCADE)
    fn delete(&self, id: i64) -> RepoResult<bool> {
        self.delete_row("categories", id)
    }
}

impl Repository<CategoryAttributeTemplate> for SqliteDb {
    fn find_all(&self) -> RepoResult<Vec<CategoryAttributeTemplate>> {
        let sql = format!(
            "SELECT {} FROM category_attribute_templates ORDER BY id",
            shared::TEMPLATE_COLUMNS
        );
        self.query_all(&sql, [], row_to_template)
    }

    fn find_by_id(&self, id: i64) -> RepoResult<Option<CategoryAttributeTemplate>> {
        let sql = format!(
            "SELECT {} FROM category_attribute_templates WHERE id = ?1",
            shared::TEMPLATE_COLUMNS
        );
        self.query_one(&sql, params![id], row_to_template)
    }

    fn find_by_uuid(&self, uuid: &Uuid) -> RepoResult<Option<CategoryAttributeTemplate>> {
        let sql = format!(
            "SELECT {} FROM category_attribute_templates WHERE uuid = ?1",
            shared::TEMPLATE_COLUMNS
        );
        self.query_one(&sql, params![uuid.to_string()], row_to_template)
    }

    fn save(&self, template: &mut CategoryAttributeTemplate) -> RepoResult<()> {
        match template.id {
            Some(id) => self.update_existing(
                queries::UPDATE_TEMPLATE,
                params![
                    id,
                    template.category_id,
                    template.attribute_name,
                    template.attribute_type,
                    template.default_value,
                    template.required,
                    template.created_at,
                    template.updated_at
                ],
                "category attribute template",
                id,
            ),
            None => {
                self.conn
                    .execute(
                        queries::INSERT_TEMPLATE,
                        params![
                            template.uuid.to_string(),
                            template.category_id,
                            template.attribute_name,
                            template.attribute_type,
                            template.default_value,
                            template.required,
                            template.created_at,
                            template.updated_at
                        ],
                    )
                    .map_err(db_err)?;
                template.id = Some(self.conn.last_insert_rowid());
                Ok(())
            }
        }
    }

    fn delete(&self, id: i64) -> RepoResult<bool> {
        self.delete_row("category_attribute_templates", id)
    }
}

impl Repository<Tag> for SqliteDb {
    fn find_all(&self) -> RepoResult<Vec<Tag>> {
        let sql = format!("SELECT {} FROM tags ORDER BY id", shared::TAG_COLUMNS);
        self.query_all(&sql, [], row_to_tag)
    }

    fn find_by_id(&self, id: i64) -> RepoResult<Option<Tag>> {
        let sql = format!("SELECT {} FROM tags WHERE id = ?1", shared::TAG_COLUMNS);
        self.query_one(&sql, params![id], row_to_tag)
    }

    fn find_by_uuid(&self, uuid: &Uuid) -> RepoResult<Option<Tag>> {
        let sql = format!("SELECT {} FROM tags WHERE uuid = ?1", shared::TAG_COLUMNS);
        self.query_one(&sql, params![uuid.to_string()], row_to_tag)
    }

    fn save(&self, tag: &mut Tag) -> RepoResult<()> {
        match tag.id {
            Some(id) => self.update_existing(
                queries::UPDATE_TAG,
                params![id, tag.name, tag.color, tag.created_at, tag.updated_at],
                "tag",
                id,
            ),
            None => {
                self.conn
                    .execute(
                        queries::INSERT_TAG,
                        params![
                            tag.uuid.to_string(),
                            tag.name,
                            tag.color,
                            tag.created_at,
                            tag.updated_at
                        ],
                    )
                    .map_err(db_err)?;
                tag.id = Some(self.conn.last_insert_rowid());
                Ok(())
            }
        }
    }

    fn delete(&self, id: i64) -> RepoResult<bool> {
        self.delete_row("tags", id)
    }
}

impl Repository<Image> for SqliteDb {
    fn find_all(&self) -> RepoResult<Vec<Image>> {
        let sql = format!("SELECT {} FROM images ORDER BY id", shared::IMAGE_COLUMNS);
        self.query_all(&sql, [], row_to_image)
    }

    fn find_by_id(&self, id: i64) -> RepoResult<Option<Image>> {
        let sql = format!("SELECT {} FROM images WHERE id = ?1", shared::IMAGE_COLUMNS);
        self.query_one(&sql, params![id], row_to_image)
    }

    fn find_by_uuid(&self, uuid: &Uuid) -> RepoResult<Option<Image>> {
        let sql = format!("SELECT {} FROM images WHERE uuid = ?1", shared::IMAGE_COLUMNS);
        self.query_one(&sql, params![uuid.to_string()], row_to_image)
    }

    /// Writes metadata only; `owner` is ignored here
    fn save(&self, image: &mut Image) -> RepoResult<()> {
        match image.id {
            Some(id) => self.update_existing(
                queries::UPDATE_IMAGE,
                params![
                    id,
                    image.file_name,
                    image.content_type,
                    image.size,
                    image.sha256,
                    image.created_at
                ],
                "image",
                id,
            ),
            None => {
                self.conn
                    .execute(
                        queries::INSERT_IMAGE,
                        params![
                            image.uuid.to_string(),
                            image.file_name,
                            image.content_type,
                            image.size,
                            image.sha256,
                            image.created_at
                        ],
                    )
                    .map_err(db_err)?;
                image.id = Some(self.conn.last_insert_rowid());
                Ok(())
            }
        }
    }

    fn delete(&self, id: i64) -> RepoResult<bool> {
        self.delete_row("images", id)
    }
}

impl Repository<Item> for SqliteDb {
    fn find_all(&self) -> RepoResult<Vec<Item>> {
        let sql = format!("SELECT {} FROM items ORDER BY id", shared::ITEM_COLUMNS);
        self.query_all(&sql, [], row_to_item)
    }

    fn find_by_id(&self, id: i64) -> RepoResult<Option<Item>> {
        let sql = format!("SELECT {} FROM items WHERE id = ?1", shared::ITEM_COLUMNS);
        self.query_one(&sql, params![id], row_to_item)
    }

    fn find_by_uuid(&self, uuid: &Uuid) -> RepoResult<Option<Item>> {
        let sql = format!("SELECT {} FROM items WHERE uuid = ?1", shared::ITEM_COLUMNS);
        self.query_one(&sql, params![uuid.to_string()], row_to_item)
    }

    fn save(&self, item: &mut Item) -> RepoResult<()> {
        let attributes = serde_json::to_string(&item.custom_attributes)
            .map_err(|e| RepoError::Database(e.to_string()))?;
        match item.id {
            Some(id) => self.update_existing(
                queries::UPDATE_ITEM,
                params![
                    id,
                    item.name,
                    item.description,
                    item.purchase_date,
                    item.price,
                    item.quantity,
                    attributes,
                    item.category_id,
                    item.storage_id,
                    item.created_at,
                    item.updated_at
                ],
                "item",
                id,
            ),
            None => {
                self.conn
                    .execute(
                        queries::INSERT_ITEM,
                        params![
                            item.uuid.to_string(),
                            item.name,
                            item.description,
                            item.purchase_date,
                            item.price,
                            item.quantity,
                            attributes,
                            item.category_id,
                            item.storage_id,
                            item.created_at,
                            item.updated_at
                        ],
                    )
                    .map_err(db_err)?;
                item.id = Some(self.conn.last_insert_rowid());
                Ok(())
            }
        }
    }

    fn delete(&self, id: i64) -> RepoResult<bool> {
        self.delete_owned_images(ImageOwner::Item(id))?;
        self.delete_owned_images(ImageOwner::Receipt(id))?;
        self.delete_row("items", id)
    }
}

impl LinkRepository for SqliteDb {
    fn tags_of_item(&self, item_id: i64) -> RepoResult<Vec<i64>> {
        self.query_all(queries::GET_ITEM_TAGS, params![item_id], |row| row.get(0))
    }

    fn set_item_tags(&self, item_id: i64, tag_ids: &[i64]) -> RepoResult<()> {
        self.conn
            .execute(queries::CLEAR_ITEM_TAGS, params![item_id])
            .map_err(db_err)?;
        for tag_id in tag_ids {
            self.conn
                .execute(queries::INSERT_ITEM_TAG, params![item_id, tag_id])
                .map_err(db_err)?;
        }
        Ok(())
    }

    fn related_items_of(&self, item_id: i64) -> RepoResult<Vec<i64>> {
        self.query_all(queries::GET_RELATED, params![item_id], |row| row.get(0))
    }

    fn link_related_items(&self, a: i64, b: i64) -> RepoResult<()> {
        self.conn
            .execute(queries::INSERT_RELATION, params![a, b])
            .map_err(db_err)?;
        self.conn
            .execute(queries::INSERT_RELATION, params![b, a])
            .map_err(db_err)?;
        Ok(())
    }

    fn set_storage_parent(&self, storage_id: i64, parent_id: Option<i64>) -> RepoResult<()> {
        self.update_existing(
            queries::SET_STORAGE_PARENT,
            params![storage_id, parent_id],
            "storage",
            storage_id,
        )
    }

    fn set_image_owner(&self, image_id: i64, owner: Option<ImageOwner>) -> RepoResult<()> {
        let mut columns: [Option<i64>; 4] = [None; 4];
        match owner {
            Some(ImageOwner::Item(id)) => columns[0] = Some(id),
            Some(ImageOwner::Receipt(id)) => columns[1] = Some(id),
            Some(ImageOwner::Storage(id)) => columns[2] = Some(id),
            Some(ImageOwner::Room(id)) => columns[3] = Some(id),
            None => {}
        }
        self.update_existing(
            queries::SET_IMAGE_OWNER,
            params![image_id, columns[0], columns[1], columns[2], columns[3]],
            "image",
            image_id,
        )
    }

    fn images_owned_by(&self, owner: ImageOwner) -> RepoResult<Vec<i64>> {
        let id = match owner {
            ImageOwner::Item(id)
            | ImageOwner::Receipt(id)
            | ImageOwner::Storage(id)
            | ImageOwner::Room(id) => id,
        };
        let sql = format!(
            "SELECT id FROM images WHERE {} = ?1 ORDER BY id",
            shared::owner_column(&owner)
        );
        self.query_all(&sql, params![id], |row| row.get(0))
    }

    fn image_data(&self, image_id: i64) -> RepoResult<Option<Vec<u8>>> {
        self.query_one(queries::GET_IMAGE_DATA, params![image_id], |row| row.get(0))
    }

    fn set_image_data(&self, image_id: i64, data: &[u8]) -> RepoResult<()> {
        self.update_existing(
            queries::SET_IMAGE_DATA,
            params![image_id, data],
            "image",
            image_id,
        )
    }
}
