//! Export assembler.
//!
//! Walks the store and builds a [`Snapshot`] for a requested scope. Store-local
//! references are rewritten as stable identifiers using indexes built from
//! full reads of every referenced type, so a scoped export still carries
//! correct references to records it does not include.

use crate::archive::{self, ArchiveError};
use crate::portable::*;
use crate::repository::{Entity, InventoryStore, RepoResult, Repository};
use crate::types::*;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use uuid::Uuid;

/// Error type for a full archive export
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error(transparent)]
    Repo(#[from] crate::repository::RepoError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// The set of record kinds an export includes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportScope(BTreeSet<RecordKind>);

impl ExportScope {
    pub fn all() -> Self {
        Self(RecordKind::ALL.iter().copied().collect())
    }

    pub fn only(kinds: impl IntoIterator<Item = RecordKind>) -> Self {
        Self(kinds.into_iter().collect())
    }

    /// Parse a list of kind names. An empty list, or any `all` entry, selects
    /// every kind.
    pub fn parse<T: AsRef<str>>(names: &[T]) -> Result<Self, ParseError> {
        if names.is_empty() || names.iter().any(|n| n.as_ref().trim().eq_ignore_ascii_case("all")) {
            return Ok(Self::all());
        }
        let kinds = names
            .iter()
            .map(|n| n.as_ref().parse::<RecordKind>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self(kinds))
    }

    pub fn includes(&self, kind: RecordKind) -> bool {
        self.0.contains(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = RecordKind> + '_ {
        self.0.iter().copied()
    }
}

impl Default for ExportScope {
    fn default() -> Self {
        Self::all()
    }
}

/// A snapshot plus the bytes of every exported image that has any
#[derive(Debug, Clone)]
pub struct ExportBundle {
    pub snapshot: Snapshot,
    pub images: BTreeMap<Uuid, Vec<u8>>,
}

fn all<E: Entity, S: Repository<E> + ?Sized>(store: &S) -> RepoResult<Vec<E>> {
    store.find_all()
}

/// id -> uuid index over a full read of one type
fn index<E: Entity>(records: &[E]) -> HashMap<i64, Uuid> {
    records
        .iter()
        .filter_map(|r| r.id().map(|id| (id, r.uuid())))
        .collect()
}

fn lookup(index: &HashMap<i64, Uuid>, id: Option<i64>) -> Option<Uuid> {
    id.and_then(|id| index.get(&id).copied())
}

/// Image uuids grouped by owner, in image id order
fn images_by_owner(images: &[Image]) -> HashMap<ImageOwner, Vec<Uuid>> {
    let mut owned: HashMap<ImageOwner, Vec<Uuid>> = HashMap::new();
    for image in images {
        if let Some(owner) = image.owner {
            owned.entry(owner).or_default().push(image.uuid);
        }
    }
    owned
}

/// Build a snapshot of the store. Performs reads only.
pub fn export_snapshot<S: InventoryStore + ?Sized>(
    store: &S,
    scope: &ExportScope,
) -> RepoResult<ExportBundle> {
    tracing::info!(kinds = scope.kinds().count(), "Starting export");
    let rooms: Vec<Room> = all(store)?;
    let storages: Vec<Storage> = all(store)?;
    let categories: Vec<Category> = all(store)?;
    let tags: Vec<Tag> = all(store)?;
    let images: Vec<Image> = all(store)?;
    let items: Vec<Item> = all(store)?;

    let room_uuids = index(&rooms);
    let storage_uuids = index(&storages);
    let category_uuids = index(&categories);
    let tag_uuids = index(&tags);
    let item_uuids = index(&items);
    let owned = images_by_owner(&images);
    let first_owned =
        |owner: ImageOwner| owned.get(&owner).and_then(|uuids| uuids.first().copied());

    let mut snapshot = Snapshot::new();
    let mut image_bytes = BTreeMap::new();

    if scope.includes(RecordKind::Images) {
        for image in &images {
            snapshot.images.push(ImageRecord::from_entity(image));
            if let Some(id) = image.id {
                match store.image_data(id)? {
                    Some(bytes) if !bytes.is_empty() => {
                        image_bytes.insert(image.uuid, bytes);
                    }
                    _ => {}
                }
            }
        }
    }

    if scope.includes(RecordKind::Rooms) {
        snapshot.rooms = rooms
            .iter()
            .map(|room| {
                let images = room
                    .id
                    .and_then(|id| owned.get(&ImageOwner::Room(id)).cloned())
                    .unwrap_or_default();
                RoomRecord::from_entity(room, images)
            })
            .collect();
    }

    if scope.includes(RecordKind::Storages) {
        snapshot.storages = storages
            .iter()
            .map(|storage| StorageRecord {
                uuid: storage.uuid,
                name: storage.name.clone(),
                description: storage.description.clone(),
                room_uuid: lookup(&room_uuids, storage.room_id),
                parent_storage_uuid: lookup(&storage_uuids, storage.parent_id),
                image_uuids: storage
                    .id
                    .and_then(|id| owned.get(&ImageOwner::Storage(id)).cloned())
                    .unwrap_or_default(),
                created_at: storage.created_at,
                updated_at: storage.updated_at,
            })
            .collect();
    }

    if scope.includes(RecordKind::Categories) {
        snapshot.categories = categories.iter().map(CategoryRecord::from_entity).collect();
    }

    if scope.includes(RecordKind::Tags) {
        snapshot.tags = tags.iter().map(TagRecord::from_entity).collect();
    }

    if scope.includes(RecordKind::CategoryAttributeTemplates) {
        let templates: Vec<CategoryAttributeTemplate> = all(store)?;
        snapshot.category_attribute_templates = templates
            .iter()
            .map(|template| CategoryAttributeTemplateRecord {
                uuid: template.uuid,
                category_uuid: lookup(&category_uuids, template.category_id),
                attribute_name: template.attribute_name.clone(),
                attribute_type: template.attribute_type.clone(),
                default_value: template.default_value.clone(),
                required: template.required,
                created_at: template.created_at,
                updated_at: template.updated_at,
            })
            .collect();
    }

    if scope.includes(RecordKind::Items) {
        for item in &items {
            let Some(id) = item.id else { continue };

            let tag_refs: BTreeSet<Uuid> = store
                .tags_of_item(id)?
                .into_iter()
                .filter_map(|tag_id| tag_uuids.get(&tag_id).copied())
                .collect();
            let related: BTreeSet<Uuid> = store
                .related_items_of(id)?
                .into_iter()
                .filter(|other| *other != id)
                .filter_map(|other| item_uuids.get(&other).copied())
                .collect();

            snapshot.items.push(ItemRecord {
                uuid: item.uuid,
                name: item.name.clone(),
                description: item.description.clone(),
                purchase_date: item.purchase_date,
                price: item.price,
                quantity: item.quantity,
                custom_attributes: item.custom_attributes.clone(),
                category_uuid: lookup(&category_uuids, item.category_id),
                storage_uuid: lookup(&storage_uuids, item.storage_id),
                tag_uuids: tag_refs.into_iter().collect(),
                related_item_uuids: related.into_iter().collect(),
                image_uuids: owned.get(&ImageOwner::Item(id)).cloned().unwrap_or_default(),
                receipt_image_uuid: first_owned(ImageOwner::Receipt(id)),
                created_at: item.created_at,
                updated_at: item.updated_at,
            });
        }
    }

    tracing::info!(
        records = snapshot.len(),
        images = image_bytes.len(),
        "Assembled export snapshot"
    );
    Ok(ExportBundle {
        snapshot,
        images: image_bytes,
    })
}

/// Build a snapshot and encode it as an archive
pub fn export_archive<S: InventoryStore + ?Sized>(
    store: &S,
    scope: &ExportScope,
) -> Result<Vec<u8>, ExportError> {
    let bundle = export_snapshot(store, scope)?;
    Ok(archive::encode(&bundle.snapshot, &bundle.images)?)
}

#[cfg(all(test, feature = "sqlite-sync"))]
mod tests {
    use super::*;
    use crate::repository::LinkRepository;
    use crate::sqlite::SqliteDb;

    fn setup_db() -> SqliteDb {
        let db = SqliteDb::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!(ExportScope::parse::<&str>(&[]).unwrap(), ExportScope::all());
        assert_eq!(ExportScope::parse(&["items", "ALL"]).unwrap(), ExportScope::all());

        let scope = ExportScope::parse(&["items", "tags"]).unwrap();
        assert!(scope.includes(RecordKind::Items));
        assert!(scope.includes(RecordKind::Tags));
        assert!(!scope.includes(RecordKind::Rooms));

        assert!(ExportScope::parse(&["widgets"]).is_err());
    }

    #[test]
    fn test_references_become_uuids() {
        let db = setup_db();
        let mut room = Room::new("Garage");
        db.save(&mut room).unwrap();
        let mut shelf = Storage::new("Shelf");
        shelf.room_id = room.id;
        db.save(&mut shelf).unwrap();
        let mut bin = Storage::new("Bin");
        bin.parent_id = shelf.id;
        db.save(&mut bin).unwrap();

        let bundle = export_snapshot(&db, &ExportScope::all()).unwrap();
        let exported_bin = bundle
            .snapshot
            .storages
            .iter()
            .find(|s| s.uuid == bin.uuid)
            .unwrap();
        assert_eq!(exported_bin.parent_storage_uuid, Some(shelf.uuid));
        let exported_shelf = bundle
            .snapshot
            .storages
            .iter()
            .find(|s| s.uuid == shelf.uuid)
            .unwrap();
        assert_eq!(exported_shelf.room_uuid, Some(room.uuid));
    }

    #[test]
    fn test_item_links_and_images() {
        let db = setup_db();
        let mut tag = Tag::new("fragile");
        db.save(&mut tag).unwrap();
        let mut lamp = Item::new("Lamp");
        db.save(&mut lamp).unwrap();
        let mut bulb = Item::new("Bulb");
        db.save(&mut bulb).unwrap();
        let lamp_id = lamp.id.unwrap();

        db.set_item_tags(lamp_id, &[tag.id.unwrap()]).unwrap();
        db.link_related_items(lamp_id, bulb.id.unwrap()).unwrap();

        let mut photo = Image::new("lamp.jpg", "image/jpeg");
        db.save(&mut photo).unwrap();
        db.set_image_data(photo.id.unwrap(), b"jpeg").unwrap();
        db.set_image_owner(photo.id.unwrap(), Some(ImageOwner::Item(lamp_id)))
            .unwrap();
        let mut receipt = Image::new("receipt.pdf", "application/pdf");
        db.save(&mut receipt).unwrap();
        db.set_image_owner(receipt.id.unwrap(), Some(ImageOwner::Receipt(lamp_id)))
            .unwrap();

        let bundle = export_snapshot(&db, &ExportScope::all()).unwrap();
        let record = bundle
            .snapshot
            .items
            .iter()
            .find(|i| i.uuid == lamp.uuid)
            .unwrap();
        assert_eq!(record.tag_uuids, vec![tag.uuid]);
        assert_eq!(record.related_item_uuids, vec![bulb.uuid]);
        assert_eq!(record.image_uuids, vec![photo.uuid]);
        assert_eq!(record.receipt_image_uuid, Some(receipt.uuid));

        // The relation is visible from both sides
        let other = bundle
            .snapshot
            .items
            .iter()
            .find(|i| i.uuid == bulb.uuid)
            .unwrap();
        assert_eq!(other.related_item_uuids, vec![lamp.uuid]);

        assert_eq!(bundle.images.get(&photo.uuid).unwrap(), b"jpeg");
        assert!(!bundle.images.contains_key(&receipt.uuid));
    }

    #[test]
    fn test_room_and_storage_keep_every_image() {
        let db = setup_db();
        let mut room = Room::new("Workshop");
        db.save(&mut room).unwrap();
        let mut shelf = Storage::new("Shelf");
        db.save(&mut shelf).unwrap();

        let owned = |owner: ImageOwner, name: &str| {
            let mut image = Image::new(name, "image/png");
            db.save(&mut image).unwrap();
            db.set_image_owner(image.id.unwrap(), Some(owner)).unwrap();
            image.uuid
        };
        let room_images = vec![
            owned(ImageOwner::Room(room.id.unwrap()), "east.png"),
            owned(ImageOwner::Room(room.id.unwrap()), "west.png"),
        ];
        let shelf_images = vec![
            owned(ImageOwner::Storage(shelf.id.unwrap()), "top.png"),
            owned(ImageOwner::Storage(shelf.id.unwrap()), "bottom.png"),
        ];

        let bundle = export_snapshot(&db, &ExportScope::all()).unwrap();
        assert_eq!(bundle.snapshot.rooms[0].image_uuids, room_images);
        assert_eq!(bundle.snapshot.storages[0].image_uuids, shelf_images);
    }

    #[test]
    fn test_scoped_export_keeps_references() {
        let db = setup_db();
        let mut category = Category::new("Tools");
        db.save(&mut category).unwrap();
        let mut drill = Item::new("Drill");
        drill.category_id = category.id;
        db.save(&mut drill).unwrap();

        let scope = ExportScope::only([RecordKind::Items]);
        let bundle = export_snapshot(&db, &scope).unwrap();
        assert!(bundle.snapshot.categories.is_empty());
        assert_eq!(bundle.snapshot.items.len(), 1);
        assert_eq!(bundle.snapshot.items[0].category_uuid, Some(category.uuid));
    }

    #[test]
    fn test_export_does_not_mutate() {
        let db = setup_db();
        let mut room = Room::new("Attic");
        db.save(&mut room).unwrap();
        let before = db.stats().unwrap();

        let bytes = export_archive(&db, &ExportScope::all()).unwrap();
        assert!(!bytes.is_empty());
        let after = db.stats().unwrap();
        assert_eq!(before.room_count, after.room_count);
    }
}
