//! Import reconciler.
//!
//! Merges a [`Snapshot`] into a live store one record type at a time, in
//! dependency order: images, rooms, storages, categories, tags, category
//! attribute templates, items, then related-item links.
//!
//! Each incoming record is joined to the store by uuid and is either created,
//! updated (overwrite mode) or skipped. A skipped record still maps its uuid
//! to the existing row so later references resolve to it. References are
//! resolved against records seen earlier in this import first, then against
//! the store; unresolvable ones are left unset with a warning.
//!
//! Writes are not wrapped in a transaction. When `fail_on_error` aborts an
//! import, everything persisted before the failing record stays persisted.

use crate::archive;
use crate::portable::*;
use crate::report::{ImportResult, Outcome};
use crate::repository::{Entity, InventoryStore, RepoError, RepoResult, Repository};
use crate::types::*;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Reconciliation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    /// Replace existing records that share an incoming uuid
    pub overwrite: bool,
    /// Abort the whole import on the first per-record error
    pub fail_on_error: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            fail_on_error: true,
        }
    }
}

/// Decode an archive and import it. Never fails: an unreadable archive is
/// reported as a failed result with a single error and no store changes.
pub fn import_archive<S: InventoryStore + ?Sized>(
    store: &S,
    bytes: &[u8],
    options: &ImportOptions,
) -> ImportResult {
    match archive::decode(bytes) {
        Ok(contents) => import_snapshot(store, &contents.snapshot, &contents.images, options),
        Err(err) => ImportResult::fatal(options.overwrite, err.to_string()),
    }
}

/// Import an already-decoded snapshot. `images` holds the bytes of image
/// records, keyed by uuid; records without bytes get an empty payload.
pub fn import_snapshot<S: InventoryStore + ?Sized>(
    store: &S,
    snapshot: &Snapshot,
    images: &HashMap<Uuid, Vec<u8>>,
    options: &ImportOptions,
) -> ImportResult {
    tracing::info!(
        records = snapshot.len(),
        overwrite = options.overwrite,
        fail_on_error = options.fail_on_error,
        "Importing snapshot version {}",
        snapshot.version
    );

    let mut importer = Importer {
        store,
        images,
        options,
        ids: HashMap::new(),
        result: ImportResult::new(options.overwrite),
    };
    if importer.run(snapshot).is_err() {
        tracing::warn!("Import aborted on first error");
    }

    let result = importer.result.finish();
    tracing::info!(
        success = result.success,
        imported = result.total_imported,
        updated = result.total_updated,
        skipped = result.skipped,
        failed = result.failed,
        "Import finished"
    );
    result
}

/// Fail-fast signal
struct Abort;

type Step<T = ()> = Result<T, Abort>;

struct Importer<'a, S: ?Sized> {
    store: &'a S,
    images: &'a HashMap<Uuid, Vec<u8>>,
    options: &'a ImportOptions,
    /// Store ids of every record processed so far, by kind and uuid
    ids: HashMap<(RecordKind, Uuid), i64>,
    result: ImportResult,
}

fn stored_id<E: Entity>(entity: &E) -> RepoResult<i64> {
    entity.id().ok_or_else(|| {
        RepoError::NotFound(format!("{} {} has no id", E::KIND.singular(), entity.uuid()))
    })
}

impl<'a, S: InventoryStore + ?Sized> Importer<'a, S> {
    fn run<'s>(&mut self, snapshot: &'s Snapshot) -> Step {
        for record in &snapshot.images {
            let res = self.import_image(record);
            self.settle(RecordKind::Images, &record.uuid, res)?;
        }
        for record in &snapshot.rooms {
            let res = self.import_room(record);
            self.settle(RecordKind::Rooms, &record.uuid, res)?;
        }
        self.import_storages(&snapshot.storages)?;
        for record in &snapshot.categories {
            let res = self.import_category(record);
            self.settle(RecordKind::Categories, &record.uuid, res)?;
        }
        for record in &snapshot.tags {
            let res = self.import_tag(record);
            self.settle(RecordKind::Tags, &record.uuid, res)?;
        }
        for record in &snapshot.category_attribute_templates {
            let res = self.import_template(record);
            self.settle(RecordKind::CategoryAttributeTemplates, &record.uuid, res)?;
        }

        let mut linked: Vec<(i64, &'s ItemRecord)> = Vec::new();
        for record in &snapshot.items {
            let res = self.import_item(record);
            if let Some(id) = self.settle(RecordKind::Items, &record.uuid, res)? {
                linked.push((id, record));
            }
        }
        self.link_related(&linked)
    }

    /// Count a record's outcome, or its failure. Returns the store id of a
    /// created or updated record.
    fn settle(
        &mut self,
        kind: RecordKind,
        uuid: &Uuid,
        res: RepoResult<(Outcome, i64)>,
    ) -> Step<Option<i64>> {
        match res {
            Ok((outcome, id)) => {
                tracing::debug!("{} {}: {:?}", kind.singular(), uuid, outcome);
                self.result.record(kind, outcome);
                Ok((outcome != Outcome::Skipped).then_some(id))
            }
            Err(err) => {
                self.fail(kind, uuid, err)?;
                Ok(None)
            }
        }
    }

    fn fail(&mut self, kind: RecordKind, uuid: &Uuid, err: RepoError) -> Step {
        self.result
            .fail(format!("Failed to import {} {}: {}", kind.singular(), uuid, err));
        if self.options.fail_on_error {
            Err(Abort)
        } else {
            Ok(())
        }
    }

    /// Map a uuid to a store id: this import first, then the store
    fn resolve<E: Entity>(&self, uuid: &Uuid) -> RepoResult<Option<i64>>
    where
        S: Repository<E>,
    {
        if let Some(id) = self.ids.get(&(E::KIND, *uuid)) {
            return Ok(Some(*id));
        }
        Ok(<S as Repository<E>>::find_by_uuid(self.store, uuid)?.and_then(|e| e.id()))
    }

    /// Resolve an optional reference, warning when it cannot be found
    fn reference<E: Entity>(
        &mut self,
        owner: RecordKind,
        owner_uuid: &Uuid,
        role: &str,
        target: Option<&Uuid>,
    ) -> RepoResult<Option<i64>>
    where
        S: Repository<E>,
    {
        let Some(target) = target else {
            return Ok(None);
        };
        let found = self.resolve::<E>(target)?;
        if found.is_none() {
            self.result.warn(format!(
                "{} {}: {} {} not found, leaving unset",
                owner.singular(),
                owner_uuid,
                role,
                target
            ));
        }
        Ok(found)
    }

    /// Apply the create/update/skip policy to one record.
    ///
    /// `fresh` builds the entity for a create, `apply` copies incoming
    /// scalars onto an existing entity, and `prepare` resolves references
    /// on either before the save. Skipped records are never written.
    fn upsert<E: Entity>(
        &mut self,
        uuid: &Uuid,
        fresh: impl FnOnce() -> E,
        apply: impl FnOnce(&mut E),
        prepare: impl FnOnce(&mut Self, &mut E) -> RepoResult<()>,
    ) -> RepoResult<(Outcome, i64)>
    where
        S: Repository<E>,
    {
        let (outcome, mut entity) = match <S as Repository<E>>::find_by_uuid(self.store, uuid)? {
            Some(existing) if !self.options.overwrite => {
                let id = stored_id(&existing)?;
                self.ids.insert((E::KIND, *uuid), id);
                return Ok((Outcome::Skipped, id));
            }
            Some(mut existing) => {
                apply(&mut existing);
                (Outcome::Updated, existing)
            }
            None => (Outcome::Created, fresh()),
        };

        prepare(self, &mut entity)?;
        <S as Repository<E>>::save(self.store, &mut entity)?;
        let id = stored_id(&entity)?;
        self.ids.insert((E::KIND, *uuid), id);
        Ok((outcome, id))
    }

    /// Resolve an owner's image list, warning for each one not found
    fn images_of(
        &mut self,
        owner: RecordKind,
        owner_uuid: &Uuid,
        uuids: &[Uuid],
    ) -> RepoResult<Vec<i64>> {
        let mut images = Vec::new();
        for uuid in uuids {
            if let Some(image) = self.reference::<Image>(owner, owner_uuid, "image", Some(uuid))? {
                if !images.contains(&image) {
                    images.push(image);
                }
            }
        }
        Ok(images)
    }

    /// Make `wanted` exactly the set of images held by `owner`
    fn assign_images(&self, owner: ImageOwner, wanted: &[i64]) -> RepoResult<()> {
        for current in self.store.images_owned_by(owner)? {
            if !wanted.contains(&current) {
                self.store.set_image_owner(current, None)?;
            }
        }
        for image in wanted {
            self.store.set_image_owner(*image, Some(owner))?;
        }
        Ok(())
    }

    fn import_image(&mut self, record: &ImageRecord) -> RepoResult<(Outcome, i64)> {
        let (outcome, id) = self.upsert(
            &record.uuid,
            || record.to_entity(),
            |image: &mut Image| record.apply_to(image),
            |_, _| Ok(()),
        )?;
        if outcome == Outcome::Skipped {
            return Ok((outcome, id));
        }

        let bytes = archive::image_bytes(self.images, &record.uuid);
        if let Some(expected) = &record.sha256 {
            if !bytes.is_empty() && !archive::sha256_hex(bytes).eq_ignore_ascii_case(expected) {
                self.result.warn(format!(
                    "image {}: sha256 does not match archive bytes",
                    record.uuid
                ));
            }
        }
        self.store.set_image_data(id, bytes)?;
        Ok((outcome, id))
    }

    fn import_room(&mut self, record: &RoomRecord) -> RepoResult<(Outcome, i64)> {
        let (outcome, id) = self.upsert(
            &record.uuid,
            || record.to_entity(),
            |room: &mut Room| record.apply_to(room),
            |_, _| Ok(()),
        )?;
        if outcome != Outcome::Skipped {
            let images = self.images_of(RecordKind::Rooms, &record.uuid, &record.image_uuids)?;
            self.assign_images(ImageOwner::Room(id), &images)?;
        }
        Ok((outcome, id))
    }

    /// Storages go in two passes so that a child may precede its parent.
    /// The first pass writes every storage without a parent; the second links
    /// parents for every created or updated storage.
    fn import_storages(&mut self, records: &[StorageRecord]) -> Step {
        let mut written = Vec::new();
        for record in records {
            let res = self.import_storage(record);
            if let Some(id) = self.settle(RecordKind::Storages, &record.uuid, res)? {
                written.push((id, record));
            }
        }

        for (id, record) in written {
            let Some(parent_uuid) = record.parent_storage_uuid.as_ref() else {
                continue;
            };
            if let Err(err) = self.link_parent(id, record, parent_uuid) {
                self.fail(RecordKind::Storages, &record.uuid, err)?;
            }
        }
        Ok(())
    }

    fn import_storage(&mut self, record: &StorageRecord) -> RepoResult<(Outcome, i64)> {
        let (outcome, id) = self.upsert(
            &record.uuid,
            || record.to_entity(),
            |storage: &mut Storage| {
                record.apply_to(storage);
                storage.parent_id = None;
            },
            |this, storage| {
                storage.room_id = this.reference::<Room>(
                    RecordKind::Storages,
                    &record.uuid,
                    "room",
                    record.room_uuid.as_ref(),
                )?;
                Ok(())
            },
        )?;
        if outcome != Outcome::Skipped {
            let images = self.images_of(RecordKind::Storages, &record.uuid, &record.image_uuids)?;
            self.assign_images(ImageOwner::Storage(id), &images)?;
        }
        Ok((outcome, id))
    }

    fn link_parent(&mut self, id: i64, record: &StorageRecord, parent_uuid: &Uuid) -> RepoResult<()> {
        let Some(parent_id) = self.reference::<Storage>(
            RecordKind::Storages,
            &record.uuid,
            "parent storage",
            Some(parent_uuid),
        )?
        else {
            return Ok(());
        };

        if self.is_ancestor(id, parent_id)? {
            self.result.warn(format!(
                "storage {}: parent storage {} would create a cycle, leaving unset",
                record.uuid, parent_uuid
            ));
            return Ok(());
        }
        self.store.set_storage_parent(id, Some(parent_id))
    }

    /// True if `storage_id` is `start` or one of its ancestors
    fn is_ancestor(&self, storage_id: i64, start: i64) -> RepoResult<bool> {
        let mut seen = HashSet::new();
        let mut current = Some(start);
        while let Some(id) = current {
            if id == storage_id {
                return Ok(true);
            }
            if !seen.insert(id) {
                break;
            }
            current = <S as Repository<Storage>>::find_by_id(self.store, id)?
                .and_then(|s| s.parent_id);
        }
        Ok(false)
    }

    fn import_category(&mut self, record: &CategoryRecord) -> RepoResult<(Outcome, i64)> {
        self.upsert(
            &record.uuid,
            || record.to_entity(),
            |category: &mut Category| record.apply_to(category),
            |_, _| Ok(()),
        )
    }

    fn import_tag(&mut self, record: &TagRecord) -> RepoResult<(Outcome, i64)> {
        self.upsert(
            &record.uuid,
            || record.to_entity(),
            |tag: &mut Tag| record.apply_to(tag),
            |_, _| Ok(()),
        )
    }

    fn import_template(
        &mut self,
        record: &CategoryAttributeTemplateRecord,
    ) -> RepoResult<(Outcome, i64)> {
        self.upsert(
            &record.uuid,
            || record.to_entity(),
            |template: &mut CategoryAttributeTemplate| record.apply_to(template),
            |this, template| {
                template.category_id = this.reference::<Category>(
                    RecordKind::CategoryAttributeTemplates,
                    &record.uuid,
                    "category",
                    record.category_uuid.as_ref(),
                )?;
                Ok(())
            },
        )
    }

    fn import_item(&mut self, record: &ItemRecord) -> RepoResult<(Outcome, i64)> {
        let (outcome, id) = self.upsert(
            &record.uuid,
            || record.to_entity(),
            |item: &mut Item| record.apply_to(item),
            |this, item| {
                item.category_id = this.reference::<Category>(
                    RecordKind::Items,
                    &record.uuid,
                    "category",
                    record.category_uuid.as_ref(),
                )?;
                item.storage_id = this.reference::<Storage>(
                    RecordKind::Items,
                    &record.uuid,
                    "storage",
                    record.storage_uuid.as_ref(),
                )?;
                Ok(())
            },
        )?;
        if outcome == Outcome::Skipped {
            return Ok((outcome, id));
        }

        let mut tags = Vec::new();
        for tag_uuid in &record.tag_uuids {
            if let Some(tag) =
                self.reference::<Tag>(RecordKind::Items, &record.uuid, "tag", Some(tag_uuid))?
            {
                tags.push(tag);
            }
        }
        tags.sort_unstable();
        tags.dedup();
        self.store.set_item_tags(id, &tags)?;

        let mut images = self.images_of(RecordKind::Items, &record.uuid, &record.image_uuids)?;
        let receipt = self.reference::<Image>(
            RecordKind::Items,
            &record.uuid,
            "receipt image",
            record.receipt_image_uuid.as_ref(),
        )?;
        // An image listed both ways ends up as the receipt
        images.retain(|image| Some(*image) != receipt);
        self.assign_images(ImageOwner::Item(id), &images)?;
        self.assign_images(ImageOwner::Receipt(id), &receipt.into_iter().collect::<Vec<_>>())?;

        Ok((outcome, id))
    }

    /// Final pass: relate every created or updated item to the items it
    /// lists. Unresolvable and self references are dropped without a warning.
    fn link_related(&mut self, linked: &[(i64, &ItemRecord)]) -> Step {
        for (id, record) in linked {
            if let Err(err) = self.link_item(*id, record) {
                self.fail(RecordKind::Items, &record.uuid, err)?;
            }
        }
        Ok(())
    }

    fn link_item(&self, id: i64, record: &ItemRecord) -> RepoResult<()> {
        for related_uuid in &record.related_item_uuids {
            match self.resolve::<Item>(related_uuid)? {
                Some(other) if other != id => self.store.link_related_items(id, other)?,
                Some(_) => {}
                None => tracing::debug!(
                    "item {}: dropping related item {} not found",
                    record.uuid,
                    related_uuid
                ),
            }
        }
        Ok(())
    }
}
