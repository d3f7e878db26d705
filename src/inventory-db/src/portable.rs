//! Portable record model.
//!
//! The archive representation of every entity type. Records reference each
//! other only by stable identifier, never by store-local id, so a snapshot can
//! be applied to any store.

use crate::types::*;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Format version written by this library
pub const FORMAT_VERSION: &str = "1.0";

/// True if a snapshot of `version` can be imported by this library
pub fn is_supported_version(version: &str) -> bool {
    let current_major = FORMAT_VERSION.split('.').next();
    version.split('.').next() == current_major
}

/// A complete, self-contained export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub rooms: Vec<RoomRecord>,
    #[serde(default)]
    pub storages: Vec<StorageRecord>,
    #[serde(default)]
    pub categories: Vec<CategoryRecord>,
    #[serde(default)]
    pub category_attribute_templates: Vec<CategoryAttributeTemplateRecord>,
    #[serde(default)]
    pub tags: Vec<TagRecord>,
    #[serde(default)]
    pub images: Vec<ImageRecord>,
    #[serde(default)]
    pub items: Vec<ItemRecord>,
}

impl Snapshot {
    /// An empty snapshot stamped with the current time
    pub fn new() -> Self {
        Self {
            version: FORMAT_VERSION.to_string(),
            exported_at: Utc::now(),
            rooms: Vec::new(),
            storages: Vec::new(),
            categories: Vec::new(),
            category_attribute_templates: Vec::new(),
            tags: Vec::new(),
            images: Vec::new(),
            items: Vec::new(),
        }
    }

    /// Number of records of one kind
    pub fn count(&self, kind: RecordKind) -> usize {
        match kind {
            RecordKind::Images => self.images.len(),
            RecordKind::Rooms => self.rooms.len(),
            RecordKind::Storages => self.storages.len(),
            RecordKind::Categories => self.categories.len(),
            RecordKind::Tags => self.tags.len(),
            RecordKind::CategoryAttributeTemplates => self.category_attribute_templates.len(),
            RecordKind::Items => self.items.len(),
        }
    }

    /// Total number of records
    pub fn len(&self) -> usize {
        RecordKind::ALL.iter().map(|k| self.count(*k)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub image_uuids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomRecord {
    pub fn from_entity(room: &Room, image_uuids: Vec<Uuid>) -> Self {
        Self {
            uuid: room.uuid,
            name: room.name.clone(),
            description: room.description.clone(),
            image_uuids,
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }

    /// A fresh, unsaved entity carrying this record's uuid and scalars
    pub fn to_entity(&self) -> Room {
        let mut room = Room::new(self.name.clone());
        room.uuid = self.uuid;
        self.apply_to(&mut room);
        room
    }

    /// Overwrite the scalar fields of an entity (never its uuid)
    pub fn apply_to(&self, room: &mut Room) {
        room.name = self.name.clone();
        room.description = self.description.clone();
        room.created_at = self.created_at;
        room.updated_at = self.updated_at;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageRecord {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_uuid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_storage_uuid: Option<Uuid>,
    #[serde(default)]
    pub image_uuids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StorageRecord {
    pub fn to_entity(&self) -> Storage {
        let mut storage = Storage::new(self.name.clone());
        storage.uuid = self.uuid;
        self.apply_to(&mut storage);
        storage
    }

    /// Scalars only: room and parent are resolved by the importer
    pub fn apply_to(&self, storage: &mut Storage) {
        storage.name = self.name.clone();
        storage.description = self.description.clone();
        storage.created_at = self.created_at;
        storage.updated_at = self.updated_at;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryRecord {
    pub fn from_entity(category: &Category) -> Self {
        Self {
            uuid: category.uuid,
            name: category.name.clone(),
            description: category.description.clone(),
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }

    pub fn to_entity(&self) -> Category {
        let mut category = Category::new(self.name.clone());
        category.uuid = self.uuid;
        self.apply_to(&mut category);
        category
    }

    pub fn apply_to(&self, category: &mut Category) {
        category.name = self.name.clone();
        category.description = self.description.clone();
        category.created_at = self.created_at;
        category.updated_at = self.updated_at;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAttributeTemplateRecord {
    pub uuid: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_uuid: Option<Uuid>,
    pub attribute_name: String,
    pub attribute_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub required: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryAttributeTemplateRecord {
    pub fn to_entity(&self) -> CategoryAttributeTemplate {
        let mut template =
            CategoryAttributeTemplate::new(self.attribute_name.clone(), self.attribute_type.clone());
        template.uuid = self.uuid;
        self.apply_to(&mut template);
        template
    }

    pub fn apply_to(&self, template: &mut CategoryAttributeTemplate) {
        template.attribute_name = self.attribute_name.clone();
        template.attribute_type = self.attribute_type.clone();
        template.default_value = self.default_value.clone();
        template.required = self.required;
        template.created_at = self.created_at;
        template.updated_at = self.updated_at;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TagRecord {
    pub fn from_entity(tag: &Tag) -> Self {
        Self {
            uuid: tag.uuid,
            name: tag.name.clone(),
            color: tag.color.clone(),
            created_at: tag.created_at,
            updated_at: tag.updated_at,
        }
    }

    pub fn to_entity(&self) -> Tag {
        let mut tag = Tag::new(self.name.clone());
        tag.uuid = self.uuid;
        self.apply_to(&mut tag);
        tag
    }

    pub fn apply_to(&self, tag: &mut Tag) {
        tag.name = self.name.clone();
        tag.color = self.color.clone();
        tag.created_at = self.created_at;
        tag.updated_at = self.updated_at;
    }
}

/// Image metadata. The bytes travel as a separate archive entry named after
/// the image uuid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub uuid: Uuid,
    pub file_name: String,
    pub content_type: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    pub fn from_entity(image: &Image) -> Self {
        Self {
            uuid: image.uuid,
            file_name: image.file_name.clone(),
            content_type: image.content_type.clone(),
            size: image.size,
            sha256: image.sha256.clone(),
            created_at: image.created_at,
        }
    }

    pub fn to_entity(&self) -> Image {
        let mut image = Image::new(self.file_name.clone(), self.content_type.clone());
        image.uuid = self.uuid;
        self.apply_to(&mut image);
        image
    }

    pub fn apply_to(&self, image: &mut Image) {
        image.file_name = self.file_name.clone();
        image.content_type = self.content_type.clone();
        image.size = self.size;
        image.sha256 = self.sha256.clone();
        image.created_at = self.created_at;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub custom_attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_uuid: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_uuid: Option<Uuid>,
    #[serde(default)]
    pub tag_uuids: Vec<Uuid>,
    #[serde(default)]
    pub related_item_uuids: Vec<Uuid>,
    #[serde(default)]
    pub image_uuids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_image_uuid: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_quantity() -> i64 {
    1
}

impl ItemRecord {
    pub fn to_entity(&self) -> Item {
        let mut item = Item::new(self.name.clone());
        item.uuid = self.uuid;
        self.apply_to(&mut item);
        item
    }

    /// Scalars only: category, storage, tags, images and related items are
    /// resolved by the importer
    pub fn apply_to(&self, item: &mut Item) {
        item.name = self.name.clone();
        item.description = self.description.clone();
        item.purchase_date = self.purchase_date;
        item.price = self.price;
        item.quantity = self.quantity;
        item.custom_attributes = self.custom_attributes.clone();
        item.created_at = self.created_at;
        item.updated_at = self.updated_at;
    }
}
