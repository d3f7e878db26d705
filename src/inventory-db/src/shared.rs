//! Shared constants for database implementations.
//!
//! SQL schema definitions and column lists. Column order must match the
//! positional indices used in the row mapping functions.

/// Comma-separated column list for room SELECT queries
pub const ROOM_COLUMNS: &str = "id, uuid, name, description, created_at, updated_at";

/// Comma-separated column list for storage SELECT queries
pub const STORAGE_COLUMNS: &str =
    "id, uuid, name, description, room_id, parent_id, created_at, updated_at";

/// Comma-separated column list for category SELECT queries
pub const CATEGORY_COLUMNS: &str = "id, uuid, name, description, created_at, updated_at";

/// Comma-separated column list for category attribute template SELECT queries
pub const TEMPLATE_COLUMNS: &str = "id, uuid, category_id, attribute_name, attribute_type,
                    default_value, required, created_at, updated_at";

/// Comma-separated column list for tag SELECT queries
pub const TAG_COLUMNS: &str = "id, uuid, name, color, created_at, updated_at";

/// Comma-separated column list for image SELECT queries (never includes the bytes)
pub const IMAGE_COLUMNS: &str = "id, uuid, file_name, content_type, size, sha256,
                    item_id, receipt_item_id, storage_id, room_id, created_at";

/// Comma-separated column list for item SELECT queries
pub const ITEM_COLUMNS: &str = "id, uuid, name, description, purchase_date, price, quantity,
                    custom_attributes, category_id, storage_id, created_at, updated_at";

/// Owner columns of the images table, at most one of which is non-null
pub const IMAGE_OWNER_COLUMNS: &[&str] = &["item_id", "receipt_item_id", "storage_id", "room_id"];

/// SQLite schema definitions
pub mod schema {
    pub const ROOMS_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS rooms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL CHECK (length(name) > 0),
            description TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
    "#;

    pub const STORAGES_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS storages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL CHECK (length(name) > 0),
            description TEXT,
            room_id INTEGER REFERENCES rooms(id) ON DELETE SET NULL,
            parent_id INTEGER REFERENCES storages(id) ON DELETE SET NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL,
            CHECK (parent_id IS NULL OR parent_id <> id)
        )
    "#;

    pub const CATEGORIES_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL CHECK (length(name) > 0),
            description TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
    "#;

    pub const TEMPLATES_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS category_attribute_templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            category_id INTEGER REFERENCES categories(id) ON DELETE CASCADE,
            attribute_name TEXT NOT NULL CHECK (length(attribute_name) > 0),
            attribute_type TEXT NOT NULL DEFAULT 'text',
            default_value TEXT,
            required BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
    "#;

    pub const TAGS_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL CHECK (length(name) > 0),
            color TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
    "#;

    pub const ITEMS_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL CHECK (length(name) > 0),
            description TEXT,
            purchase_date DATE,
            price REAL CHECK (price IS NULL OR price >= 0),
            quantity INTEGER NOT NULL DEFAULT 1 CHECK (quantity >= 0),
            custom_attributes TEXT NOT NULL DEFAULT '{}',
            category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
            storage_id INTEGER REFERENCES storages(id) ON DELETE SET NULL,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        )
    "#;

    pub const ITEM_TAGS_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS item_tags (
            item_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
            PRIMARY KEY (item_id, tag_id)
        )
    "#;

    /// Both directions of every relation are stored
    pub const ITEM_RELATIONS_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS item_relations (
            item_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            related_id INTEGER NOT NULL REFERENCES items(id) ON DELETE CASCADE,
            PRIMARY KEY (item_id, related_id),
            CHECK (item_id <> related_id)
        )
    "#;

    /// Owned images are deleted explicitly before their owner; the owner
    /// columns only null themselves out as a fallback.
    pub const IMAGES_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS images (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT NOT NULL UNIQUE,
            file_name TEXT NOT NULL,
            content_type TEXT NOT NULL DEFAULT 'application/octet-stream',
            size INTEGER NOT NULL DEFAULT 0,
            sha256 TEXT,
            data BLOB NOT NULL DEFAULT x'',
            item_id INTEGER REFERENCES items(id) ON DELETE SET NULL,
            receipt_item_id INTEGER REFERENCES items(id) ON DELETE SET NULL,
            storage_id INTEGER REFERENCES storages(id) ON DELETE SET NULL,
            room_id INTEGER REFERENCES rooms(id) ON DELETE SET NULL,
            created_at TIMESTAMP NOT NULL,
            CHECK ((item_id IS NOT NULL) + (receipt_item_id IS NOT NULL)
                 + (storage_id IS NOT NULL) + (room_id IS NOT NULL) <= 1)
        )
    "#;

    /// Schema migrations tracking table
    pub const MIGRATIONS_TABLE: &str = r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY NOT NULL,
            applied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )
    "#;

    /// Tables in creation order (referenced tables first)
    pub const TABLES: &[&str] = &[
        ROOMS_TABLE,
        STORAGES_TABLE,
        CATEGORIES_TABLE,
        TEMPLATES_TABLE,
        TAGS_TABLE,
        ITEMS_TABLE,
        ITEM_TAGS_TABLE,
        ITEM_RELATIONS_TABLE,
        IMAGES_TABLE,
    ];

    /// Index definitions (use after table creation)
    pub const INDEXES: &[&str] = &[
        "CREATE INDEX IF NOT EXISTS idx_storages_room ON storages(room_id)",
        "CREATE INDEX IF NOT EXISTS idx_storages_parent ON storages(parent_id)",
        "CREATE INDEX IF NOT EXISTS idx_templates_category ON category_attribute_templates(category_id)",
        "CREATE INDEX IF NOT EXISTS idx_items_category ON items(category_id)",
        "CREATE INDEX IF NOT EXISTS idx_items_storage ON items(storage_id)",
        "CREATE INDEX IF NOT EXISTS idx_item_tags_tag ON item_tags(tag_id)",
        "CREATE INDEX IF NOT EXISTS idx_images_item ON images(item_id)",
        // An item has at most one receipt image
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_images_receipt ON images(receipt_item_id)",
        "CREATE INDEX IF NOT EXISTS idx_images_storage ON images(storage_id)",
        "CREATE INDEX IF NOT EXISTS idx_images_room ON images(room_id)",
    ];
}

/// Common SQL queries used across implementations
pub mod queries {
    pub const INSERT_ROOM: &str = "INSERT INTO rooms (uuid, name, description, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)";
    pub const UPDATE_ROOM: &str =
        "UPDATE rooms SET name = ?2, description = ?3, created_at = ?4, updated_at = ?5 WHERE id = ?1";

    pub const INSERT_STORAGE: &str = "INSERT INTO storages
        (uuid, name, description, room_id, parent_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
    pub const UPDATE_STORAGE: &str = r#"UPDATE storages SET
        name = ?2, description = ?3, room_id = ?4, parent_id = ?5, created_at = ?6, updated_at = ?7
    WHERE id = ?1"#;

    pub const INSERT_CATEGORY: &str = "INSERT INTO categories (uuid, name, description, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)";
    pub const UPDATE_CATEGORY: &str =
        "UPDATE categories SET name = ?2, description = ?3, created_at = ?4, updated_at = ?5 WHERE id = ?1";

    pub const INSERT_TEMPLATE: &str = "INSERT INTO category_attribute_templates
        (uuid, category_id, attribute_name, attribute_type, default_value, required, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)";
    pub const UPDATE_TEMPLATE: &str = r#"UPDATE category_attribute_templates SET
        category_id = ?2, attribute_name = ?3, attribute_type = ?4, default_value = ?5,
        required = ?6, created_at = ?7, updated_at = ?8
    WHERE id = ?1"#;

    pub const INSERT_TAG: &str = "INSERT INTO tags (uuid, name, color, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5)";
    pub const UPDATE_TAG: &str =
        "UPDATE tags SET name = ?2, color = ?3, created_at = ?4, updated_at = ?5 WHERE id = ?1";

    pub const INSERT_IMAGE: &str = "INSERT INTO images
        (uuid, file_name, content_type, size, sha256, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)";
    pub const UPDATE_IMAGE: &str = r#"UPDATE images SET
        file_name = ?2, content_type = ?3, size = ?4, sha256 = ?5, created_at = ?6
    WHERE id = ?1"#;

    pub const INSERT_ITEM: &str = "INSERT INTO items
        (uuid, name, description, purchase_date, price, quantity, custom_attributes,
         category_id, storage_id, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)";
    pub const UPDATE_ITEM: &str = r#"UPDATE items SET
        name = ?2, description = ?3, purchase_date = ?4, price = ?5, quantity = ?6,
        custom_attributes = ?7, category_id = ?8, storage_id = ?9, created_at = ?10, updated_at = ?11
    WHERE id = ?1"#;

    pub const SET_IMAGE_OWNER: &str = r#"UPDATE images SET
        item_id = ?2, receipt_item_id = ?3, storage_id = ?4, room_id = ?5
    WHERE id = ?1"#;

    pub const SET_IMAGE_DATA: &str = "UPDATE images SET data = ?2 WHERE id = ?1";
    pub const GET_IMAGE_DATA: &str = "SELECT data FROM images WHERE id = ?1";

    pub const SET_STORAGE_PARENT: &str = "UPDATE storages SET parent_id = ?2 WHERE id = ?1";

    pub const GET_ITEM_TAGS: &str = "SELECT tag_id FROM item_tags WHERE item_id = ?1 ORDER BY tag_id";
    pub const CLEAR_ITEM_TAGS: &str = "DELETE FROM item_tags WHERE item_id = ?1";
    pub const INSERT_ITEM_TAG: &str = "INSERT OR IGNORE INTO item_tags (item_id, tag_id) VALUES (?1, ?2)";

    pub const GET_RELATED: &str =
        "SELECT related_id FROM item_relations WHERE item_id = ?1 ORDER BY related_id";
    pub const INSERT_RELATION: &str =
        "INSERT OR IGNORE INTO item_relations (item_id, related_id) VALUES (?1, ?2)";

    /// Stats queries
    pub const COUNT_ROOMS: &str = "SELECT COUNT(*) FROM rooms";
    pub const COUNT_STORAGES: &str = "SELECT COUNT(*) FROM storages";
    pub const COUNT_CATEGORIES: &str = "SELECT COUNT(*) FROM categories";
    pub const COUNT_TEMPLATES: &str = "SELECT COUNT(*) FROM category_attribute_templates";
    pub const COUNT_TAGS: &str = "SELECT COUNT(*) FROM tags";
    pub const COUNT_IMAGES: &str = "SELECT COUNT(*) FROM images";
    pub const COUNT_ITEMS: &str = "SELECT COUNT(*) FROM items";
}

/// Column of the images table that holds the given owner
pub fn owner_column(owner: &crate::types::ImageOwner) -> &'static str {
    use crate::types::ImageOwner;
    match owner {
        ImageOwner::Item(_) => "item_id",
        ImageOwner::Receipt(_) => "receipt_item_id",
        ImageOwner::Storage(_) => "storage_id",
        ImageOwner::Room(_) => "room_id",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageOwner;

    #[test]
    fn test_owner_column_matches_owner_columns() {
        let owners = [
            ImageOwner::Item(1),
            ImageOwner::Receipt(1),
            ImageOwner::Storage(1),
            ImageOwner::Room(1),
        ];
        for (owner, column) in owners.iter().zip(IMAGE_OWNER_COLUMNS) {
            assert_eq!(owner_column(owner), *column);
        }
    }

    #[test]
    fn test_tables_reference_earlier_tables_only() {
        let position = |name: &str| {
            schema::TABLES
                .iter()
                .position(|sql| sql.contains(&format!("CREATE TABLE IF NOT EXISTS {} ", name)))
                .unwrap()
        };
        assert!(position("rooms") < position("storages"));
        assert!(position("categories") < position("category_attribute_templates"));
        assert!(position("items") < position("item_tags"));
        assert!(position("items") < position("images"));
    }

    #[test]
    fn test_item_columns_count() {
        assert_eq!(ITEM_COLUMNS.split(',').count(), 12);
        assert_eq!(IMAGE_COLUMNS.split(',').count(), 11);
    }
}
