//! Repository traits for inventory database operations.
//!
//! These traits are the only view the export and import engines have of the
//! store. Records are addressed either by their store-local `id` or by their
//! stable `uuid`; only the latter is meaningful across stores.

use crate::types::*;
use uuid::Uuid;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Common accessors for every persisted entity type
pub trait Entity {
    const KIND: RecordKind;

    /// Store-local key, `None` until first saved
    fn id(&self) -> Option<i64>;

    /// Stable identifier
    fn uuid(&self) -> Uuid;
}

macro_rules! impl_entity {
    ($($ty:ty => $kind:expr),* $(,)?) => {
        $(
            impl Entity for $ty {
                const KIND: RecordKind = $kind;

                fn id(&self) -> Option<i64> {
                    self.id
                }

                fn uuid(&self) -> Uuid {
                    self.uuid
                }
            }
        )*
    };
}

impl_entity! {
    Room => RecordKind::Rooms,
    Storage => RecordKind::Storages,
    Category => RecordKind::Categories,
    CategoryAttributeTemplate => RecordKind::CategoryAttributeTemplates,
    Tag => RecordKind::Tags,
    Image => RecordKind::Images,
    Item => RecordKind::Items,
}

/// Basic persistence for one entity type
pub trait Repository<E: Entity> {
    /// All records of this type, ordered by id
    fn find_all(&self) -> RepoResult<Vec<E>>;

    fn find_by_id(&self, id: i64) -> RepoResult<Option<E>>;

    fn find_by_uuid(&self, uuid: &Uuid) -> RepoResult<Option<E>>;

    /// Insert when `entity.id` is `None` (assigning the new id), otherwise
    /// update every mutable column. The uuid column is only written on insert.
    fn save(&self, entity: &mut E) -> RepoResult<()>;

    /// Delete a record and whatever it owns. Returns false if nothing matched.
    fn delete(&self, id: i64) -> RepoResult<bool>;
}

/// Relations that live outside the entity rows
pub trait LinkRepository {
    /// Tag ids attached to an item
    fn tags_of_item(&self, item_id: i64) -> RepoResult<Vec<i64>>;

    /// Replace the tag set of an item
    fn set_item_tags(&self, item_id: i64, tag_ids: &[i64]) -> RepoResult<()>;

    /// Items related to an item (the relation is symmetric)
    fn related_items_of(&self, item_id: i64) -> RepoResult<Vec<i64>>;

    /// Relate two items in both directions. Linking an existing pair is a no-op.
    fn link_related_items(&self, a: i64, b: i64) -> RepoResult<()>;

    fn set_storage_parent(&self, storage_id: i64, parent_id: Option<i64>) -> RepoResult<()>;

    /// Set or clear the single owner of an image
    fn set_image_owner(&self, image_id: i64, owner: Option<ImageOwner>) -> RepoResult<()>;

    /// Ids of the images owned by the given owner
    fn images_owned_by(&self, owner: ImageOwner) -> RepoResult<Vec<i64>>;

    /// Raw bytes of an image, `None` if the image does not exist
    fn image_data(&self, image_id: i64) -> RepoResult<Option<Vec<u8>>>;

    fn set_image_data(&self, image_id: i64, data: &[u8]) -> RepoResult<()>;
}

/// Everything the export and import engines need from a store
pub trait InventoryStore:
    Repository<Room>
    + Repository<Storage>
    + Repository<Category>
    + Repository<CategoryAttributeTemplate>
    + Repository<Tag>
    + Repository<Image>
    + Repository<Item>
    + LinkRepository
{
}

impl<T> InventoryStore for T where
    T: Repository<Room>
        + Repository<Storage>
        + Repository<Category>
        + Repository<CategoryAttributeTemplate>
        + Repository<Tag>
        + Repository<Image>
        + Repository<Item>
        + LinkRepository
{
}
