//! End-to-end export and import against in-memory SQLite stores.

#![cfg(feature = "sqlite-sync")]

use inventory_db::portable::{ItemRecord, StorageRecord};
use inventory_db::*;
use std::io::{Cursor, Write};
use uuid::Uuid;

fn setup_db() -> SqliteDb {
    let db = SqliteDb::open_in_memory().unwrap();
    db.init().unwrap();
    db
}

struct Fixture {
    nested: Uuid,
    middle: Uuid,
    hub: Uuid,
    spokes: [Uuid; 2],
    photos: [Uuid; 2],
}

/// 3 rooms, 4 storages (one two levels deep), 2 tags, 1 category with 2
/// templates and 10 items, one of them with 2 related items and 2 images.
fn populate(db: &SqliteDb) -> Fixture {
    let mut rooms = Vec::new();
    for name in ["Kitchen", "Garage", "Office"] {
        let mut room = Room::new(name);
        db.save(&mut room).unwrap();
        rooms.push(room);
    }

    let mut cabinet = Storage::new("Cabinet");
    cabinet.room_id = rooms[0].id;
    db.save(&mut cabinet).unwrap();
    let mut shelf = Storage::new("Shelf");
    shelf.parent_id = cabinet.id;
    db.save(&mut shelf).unwrap();
    let mut jar = Storage::new("Jar");
    jar.parent_id = shelf.id;
    db.save(&mut jar).unwrap();
    let mut rack = Storage::new("Rack");
    rack.room_id = rooms[1].id;
    db.save(&mut rack).unwrap();

    let mut tags = Vec::new();
    for name in ["fragile", "borrowed"] {
        let mut tag = Tag::new(name);
        db.save(&mut tag).unwrap();
        tags.push(tag);
    }

    let mut category = Category::new("Electronics");
    db.save(&mut category).unwrap();
    for (name, kind) in [("Voltage", "number"), ("Warranty", "date")] {
        let mut template = CategoryAttributeTemplate::new(name, kind);
        template.category_id = category.id;
        db.save(&mut template).unwrap();
    }

    let mut items = Vec::new();
    for n in 0..10 {
        let mut item = Item::new(format!("Item {}", n));
        item.quantity = n + 1;
        item.category_id = category.id;
        item.storage_id = if n % 2 == 0 { jar.id } else { rack.id };
        item.custom_attributes
            .insert("Voltage".to_string(), format!("{}", n * 10));
        db.save(&mut item).unwrap();
        items.push(item);
    }
    let hub_id = items[0].id.unwrap();
    db.set_item_tags(hub_id, &[tags[0].id.unwrap(), tags[1].id.unwrap()])
        .unwrap();
    db.link_related_items(hub_id, items[1].id.unwrap()).unwrap();
    db.link_related_items(hub_id, items[2].id.unwrap()).unwrap();

    let mut photos = Vec::new();
    for (name, bytes) in [("front.jpg", b"front".as_slice()), ("back.jpg", b"back".as_slice())] {
        let mut image = Image::new(name, "image/jpeg");
        image.size = bytes.len() as i64;
        image.sha256 = Some(archive::sha256_hex(bytes));
        db.save(&mut image).unwrap();
        let id = image.id.unwrap();
        db.set_image_data(id, bytes).unwrap();
        db.set_image_owner(id, Some(ImageOwner::Item(hub_id))).unwrap();
        photos.push(image.uuid);
    }

    Fixture {
        nested: jar.uuid,
        middle: shelf.uuid,
        hub: items[0].uuid,
        spokes: [items[1].uuid, items[2].uuid],
        photos: [photos[0], photos[1]],
    }
}

fn delete_all<E: Entity, S: Repository<E>>(store: &S) {
    for record in store.find_all().unwrap() {
        store.delete(record.id().unwrap()).unwrap();
    }
}

fn delete_everything(db: &SqliteDb) {
    delete_all::<Item, _>(db);
    delete_all::<CategoryAttributeTemplate, _>(db);
    delete_all::<Category, _>(db);
    delete_all::<Tag, _>(db);
    delete_all::<Storage, _>(db);
    delete_all::<Room, _>(db);
    delete_all::<Image, _>(db);
}

fn counts(db: &SqliteDb) -> [i64; 7] {
    let stats = db.stats().unwrap();
    [
        stats.room_count,
        stats.storage_count,
        stats.tag_count,
        stats.category_count,
        stats.template_count,
        stats.item_count,
        stats.image_count,
    ]
}

fn id_of<E: Entity, S: Repository<E>>(store: &S, uuid: &Uuid) -> i64 {
    store.find_by_uuid(uuid).unwrap().unwrap().id().unwrap()
}

#[test]
fn test_round_trip_restores_graph() {
    let db = setup_db();
    let fixture = populate(&db);
    let archive = export_archive(&db, &ExportScope::all()).unwrap();

    delete_everything(&db);
    assert_eq!(counts(&db), [0; 7]);

    let result = import_archive(&db, &archive, &ImportOptions::default());
    assert!(result.success, "{}", result);
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    assert_eq!(result.imported(RecordKind::Rooms), 3);
    assert_eq!(result.imported(RecordKind::Storages), 4);
    assert_eq!(result.imported(RecordKind::Tags), 2);
    assert_eq!(result.imported(RecordKind::Categories), 1);
    assert_eq!(result.imported(RecordKind::CategoryAttributeTemplates), 2);
    assert_eq!(result.imported(RecordKind::Items), 10);
    assert_eq!(result.imported(RecordKind::Images), 2);
    assert_eq!(counts(&db), [3, 4, 2, 1, 2, 10, 2]);

    let jar: Storage = db.find_by_uuid(&fixture.nested).unwrap().unwrap();
    let shelf: Storage = db.find_by_uuid(&fixture.middle).unwrap().unwrap();
    assert_eq!(jar.parent_id, shelf.id);
    let cabinet: Storage = db.find_by_id(shelf.parent_id.unwrap()).unwrap().unwrap();
    assert_eq!(cabinet.name, "Cabinet");
    assert!(cabinet.room_id.is_some());

    let hub = id_of::<Item, _>(&db, &fixture.hub);
    let mut related = db.related_items_of(hub).unwrap();
    related.sort_unstable();
    let mut expected = vec![
        id_of::<Item, _>(&db, &fixture.spokes[0]),
        id_of::<Item, _>(&db, &fixture.spokes[1]),
    ];
    expected.sort_unstable();
    assert_eq!(related, expected);
    assert_eq!(db.related_items_of(expected[0]).unwrap(), vec![hub]);
    assert_eq!(db.tags_of_item(hub).unwrap().len(), 2);

    let owned = db.images_owned_by(ImageOwner::Item(hub)).unwrap();
    assert_eq!(owned.len(), 2);
    let front = id_of::<Image, _>(&db, &fixture.photos[0]);
    assert_eq!(db.image_data(front).unwrap().unwrap(), b"front");

    let item: Item = db.find_by_uuid(&fixture.spokes[1]).unwrap().unwrap();
    assert_eq!(item.quantity, 3);
    assert_eq!(item.custom_attributes.get("Voltage").unwrap(), "20");
}

#[test]
fn test_import_into_empty_store_matches_source() {
    let source = setup_db();
    populate(&source);
    let archive = export_archive(&source, &ExportScope::all()).unwrap();

    let target = setup_db();
    let result = import_archive(&target, &archive, &ImportOptions::default());
    assert!(result.success, "{}", result);
    assert_eq!(counts(&target), counts(&source));

    let exported = export_snapshot(&source, &ExportScope::all()).unwrap();
    let reexported = export_snapshot(&target, &ExportScope::all()).unwrap();
    assert_eq!(exported.snapshot.items, reexported.snapshot.items);
    assert_eq!(exported.snapshot.storages, reexported.snapshot.storages);
    assert_eq!(exported.images, reexported.images);
}

#[test]
fn test_reimport_without_overwrite_skips_everything() {
    let db = setup_db();
    populate(&db);
    let archive = export_archive(&db, &ExportScope::all()).unwrap();
    let before = export_snapshot(&db, &ExportScope::all()).unwrap();

    let result = import_archive(&db, &archive, &ImportOptions::default());
    assert!(result.success);
    assert_eq!(result.total_imported, 0);
    assert_eq!(result.total_updated, 0);
    assert_eq!(result.skipped, 24);
    assert_eq!(counts(&db), [3, 4, 2, 1, 2, 10, 2]);

    let after = export_snapshot(&db, &ExportScope::all()).unwrap();
    assert_eq!(before.snapshot.items, after.snapshot.items);
    assert_eq!(before.snapshot.rooms, after.snapshot.rooms);
}

#[test]
fn test_overwrite_restores_exported_values() {
    let db = setup_db();
    let fixture = populate(&db);
    let archive = export_archive(&db, &ExportScope::all()).unwrap();

    let mut hub: Item = db.find_by_uuid(&fixture.hub).unwrap().unwrap();
    hub.name = "Renamed".to_string();
    hub.quantity = 99;
    db.save(&mut hub).unwrap();

    let keep = import_archive(&db, &archive, &ImportOptions::default());
    assert!(keep.success);
    let unchanged: Item = db.find_by_uuid(&fixture.hub).unwrap().unwrap();
    assert_eq!(unchanged.name, "Renamed");

    let options = ImportOptions {
        overwrite: true,
        ..Default::default()
    };
    let restore = import_archive(&db, &archive, &options);
    assert!(restore.success, "{}", restore);
    assert!(restore.overwrite);
    assert_eq!(restore.updated(RecordKind::Items), 10);
    assert_eq!(restore.total_imported, 0);

    let restored: Item = db.find_by_uuid(&fixture.hub).unwrap().unwrap();
    assert_eq!(restored.name, "Item 0");
    assert_eq!(restored.quantity, 1);
    assert_eq!(restored.uuid, fixture.hub);
    assert_eq!(restored.id, hub.id);

    // Links survive an overwrite
    let jar: Storage = db.find_by_uuid(&fixture.nested).unwrap().unwrap();
    assert!(jar.parent_id.is_some());
    assert_eq!(db.related_items_of(hub.id.unwrap()).unwrap().len(), 2);
}

/// Uuids of the images a room or storage owns, in id order
fn owned_uuids(db: &SqliteDb, owner: ImageOwner) -> Vec<Uuid> {
    db.images_owned_by(owner)
        .unwrap()
        .into_iter()
        .map(|id| {
            let image: Image = db.find_by_id(id).unwrap().unwrap();
            image.uuid
        })
        .collect()
}

#[test]
fn test_room_and_storage_images_survive() {
    let source = setup_db();
    let mut room = Room::new("Workshop");
    source.save(&mut room).unwrap();
    let mut bench = Storage::new("Bench");
    bench.room_id = room.id;
    source.save(&mut bench).unwrap();

    let owners = [
        ImageOwner::Room(room.id.unwrap()),
        ImageOwner::Room(room.id.unwrap()),
        ImageOwner::Storage(bench.id.unwrap()),
        ImageOwner::Storage(bench.id.unwrap()),
    ];
    for (n, owner) in owners.into_iter().enumerate() {
        let mut image = Image::new(format!("view-{}.png", n), "image/png");
        source.save(&mut image).unwrap();
        source.set_image_owner(image.id.unwrap(), Some(owner)).unwrap();
    }
    let room_images = owned_uuids(&source, ImageOwner::Room(room.id.unwrap()));
    let bench_images = owned_uuids(&source, ImageOwner::Storage(bench.id.unwrap()));
    assert_eq!(room_images.len(), 2);
    assert_eq!(bench_images.len(), 2);

    let archive = export_archive(&source, &ExportScope::all()).unwrap();

    let target = setup_db();
    let result = import_archive(&target, &archive, &ImportOptions::default());
    assert!(result.success, "{}", result);
    assert!(result.warnings.is_empty());
    let target_room = id_of::<Room, _>(&target, &room.uuid);
    let target_bench = id_of::<Storage, _>(&target, &bench.uuid);
    assert_eq!(owned_uuids(&target, ImageOwner::Room(target_room)), room_images);
    assert_eq!(owned_uuids(&target, ImageOwner::Storage(target_bench)), bench_images);

    let options = ImportOptions {
        overwrite: true,
        ..Default::default()
    };
    let restore = import_archive(&source, &archive, &options);
    assert!(restore.success, "{}", restore);
    assert_eq!(owned_uuids(&source, ImageOwner::Room(room.id.unwrap())), room_images);
    assert_eq!(
        owned_uuids(&source, ImageOwner::Storage(bench.id.unwrap())),
        bench_images
    );
}

#[test]
fn test_storage_order_independence() {
    let source = setup_db();
    let fixture = populate(&source);
    let mut bundle = export_snapshot(&source, &ExportScope::all()).unwrap();
    bundle.snapshot.storages.reverse();
    let position = |uuid: &Uuid| {
        bundle
            .snapshot
            .storages
            .iter()
            .position(|s: &StorageRecord| s.uuid == *uuid)
            .unwrap()
    };
    assert!(position(&fixture.nested) < position(&fixture.middle));

    let archive = archive::encode(&bundle.snapshot, &bundle.images).unwrap();
    let target = setup_db();
    let result = import_archive(&target, &archive, &ImportOptions::default());
    assert!(result.success, "{}", result);
    assert!(result.warnings.is_empty());

    let jar: Storage = target.find_by_uuid(&fixture.nested).unwrap().unwrap();
    let shelf: Storage = target.find_by_uuid(&fixture.middle).unwrap().unwrap();
    assert_eq!(jar.parent_id, shelf.id);
}

#[test]
fn test_missing_data_entry() {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("images/stray", zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"bytes").unwrap();
    let bytes = zip.finish().unwrap().into_inner();

    let db = setup_db();
    let result = import_archive(&db, &bytes, &ImportOptions::default());
    assert!(!result.success);
    assert_eq!(result.errors, vec!["data.json missing in archive"]);
    assert_eq!(result.total_imported, 0);
    assert_eq!(result.skipped, 0);
    assert_eq!(result.failed, 0);
    assert_eq!(counts(&db), [0; 7]);
}

fn snapshot_with_bad_item() -> (Snapshot, Uuid) {
    let source = setup_db();
    populate(&source);
    let mut bundle = export_snapshot(&source, &ExportScope::all()).unwrap();
    let bad: &mut ItemRecord = &mut bundle.snapshot.items[4];
    bad.quantity = -1;
    let bad_uuid = bad.uuid;
    (bundle.snapshot, bad_uuid)
}

#[test]
fn test_fail_fast_aborts_after_earlier_types() {
    let (snapshot, bad) = snapshot_with_bad_item();
    let archive = archive::encode(&snapshot, &Default::default()).unwrap();

    let db = setup_db();
    let result = import_archive(&db, &archive, &ImportOptions::default());
    assert!(!result.success);
    assert_eq!(result.failed, 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains(&bad.to_string()));

    // Earlier types and the items before the bad one stay persisted
    let [rooms, storages, tags, categories, templates, items, _] = counts(&db);
    assert_eq!([rooms, storages, tags, categories, templates], [3, 4, 2, 1, 2]);
    assert_eq!(items, 4);
    assert_eq!(result.imported(RecordKind::Items), 4);
    // The related pass never ran
    let imported: Vec<Item> = db.find_all().unwrap();
    let hub = imported[0].id.unwrap();
    assert!(db.related_items_of(hub).unwrap().is_empty());
}

#[test]
fn test_continue_on_error_imports_the_rest() {
    let (snapshot, bad) = snapshot_with_bad_item();
    let archive = archive::encode(&snapshot, &Default::default()).unwrap();

    let db = setup_db();
    let options = ImportOptions {
        fail_on_error: false,
        ..Default::default()
    };
    let result = import_archive(&db, &archive, &options);
    assert!(!result.success);
    assert_eq!(result.failed, 1);
    assert_eq!(result.imported(RecordKind::Items), 9);
    assert_eq!(counts(&db)[5], 9);
    let missing: Option<Item> = db.find_by_uuid(&bad).unwrap();
    assert!(missing.is_none());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["failed"], 1);
    assert_eq!(json["counts"]["items"]["imported"], 9);
}
