//! Database setup and inspection

use anyhow::{Context, Result};
use std::path::Path;

/// Open a database, creating its directory and schema if needed
pub fn open(db: &Path) -> Result<inventory_db::SqliteDb> {
    if let Some(parent) = db.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    let store = inventory_db::SqliteDb::open(db)
        .with_context(|| format!("Failed to open database {}", db.display()))?;
    store.init()?;
    Ok(store)
}

/// Handle `inventory init`
pub fn init(db: &Path) -> Result<()> {
    open(db)?;
    println!("Your database is ready at {}", db.display());
    Ok(())
}

/// Handle `inventory stats`
pub fn stats(db: &Path) -> Result<()> {
    let store = open(db)?;
    let stats = store.stats()?;
    println!("Inventory Database Statistics");
    println!("  Rooms:      {}", stats.room_count);
    println!("  Storages:   {}", stats.storage_count);
    println!("  Categories: {}", stats.category_count);
    println!("  Templates:  {}", stats.template_count);
    println!("  Tags:       {}", stats.tag_count);
    println!("  Images:     {}", stats.image_count);
    println!("  Items:      {}", stats.item_count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("share").join("inventory.db");
        init(&db).unwrap();
        assert!(db.exists());
        stats(&db).unwrap();
    }
}
