//! Shared types for the inventory database.
//!
//! These types are database-agnostic and used by all implementations. Every
//! entity carries two identifiers: `id`, the store-local key (`None` until the
//! first save), and `uuid`, the stable identifier assigned once by `new` and
//! never regenerated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The entity types that take part in export and import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Images,
    Rooms,
    Storages,
    Categories,
    Tags,
    CategoryAttributeTemplates,
    Items,
}

impl RecordKind {
    /// All kinds, in import dependency order
    pub const ALL: &'static [RecordKind] = &[
        RecordKind::Images,
        RecordKind::Rooms,
        RecordKind::Storages,
        RecordKind::Categories,
        RecordKind::Tags,
        RecordKind::CategoryAttributeTemplates,
        RecordKind::Items,
    ];

    /// Singular noun used in report messages
    pub fn singular(&self) -> &'static str {
        match self {
            Self::Images => "image",
            Self::Rooms => "room",
            Self::Storages => "storage",
            Self::Categories => "category",
            Self::Tags => "tag",
            Self::CategoryAttributeTemplates => "category attribute template",
            Self::Items => "item",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Images => write!(f, "images"),
            Self::Rooms => write!(f, "rooms"),
            Self::Storages => write!(f, "storages"),
            Self::Categories => write!(f, "categories"),
            Self::Tags => write!(f, "tags"),
            Self::CategoryAttributeTemplates => write!(f, "category_attribute_templates"),
            Self::Items => write!(f, "items"),
        }
    }
}

impl std::str::FromStr for RecordKind {
    type Err = ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "images" | "image" => Ok(Self::Images),
            "rooms" | "room" => Ok(Self::Rooms),
            "storages" | "storage" => Ok(Self::Storages),
            "categories" | "category" => Ok(Self::Categories),
            "tags" | "tag" => Ok(Self::Tags),
            "category_attribute_templates" | "category_attribute_template" | "templates" => {
                Ok(Self::CategoryAttributeTemplates)
            }
            "items" | "item" => Ok(Self::Items),
            _ => Err(ParseError::InvalidRecordKind(s.to_string())),
        }
    }
}

/// Which entity an image belongs to. An image has at most one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "id")]
pub enum ImageOwner {
    Item(i64),
    /// The image is the purchase receipt of an item
    Receipt(i64),
    Storage(i64),
    Room(i64),
}

/// A room in the home or office
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A storage location (shelf, box, drawer). Storages nest via `parent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub room_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Storage {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            name: name.into(),
            description: None,
            room_id: None,
            parent_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An attribute that items of a category are expected to carry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAttributeTemplate {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub category_id: Option<i64>,
    pub attribute_name: String,
    /// Free-form value type hint, e.g. "text", "number", "date"
    pub attribute_type: String,
    pub default_value: Option<String>,
    pub required: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryAttributeTemplate {
    pub fn new(attribute_name: impl Into<String>, attribute_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            category_id: None,
            attribute_name: attribute_name.into(),
            attribute_type: attribute_type.into(),
            default_value: None,
            required: false,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            name: name.into(),
            color: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Image metadata. The bytes live alongside the row but are read and
/// written separately (see `LinkRepository::image_data`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub size: i64,
    /// Hex SHA-256 of the bytes, if known
    pub sha256: Option<String>,
    /// Read-only on `save`; changed through `LinkRepository::set_image_owner`
    pub owner: Option<ImageOwner>,
    pub created_at: DateTime<Utc>,
}

impl Image {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            size: 0,
            sha256: None,
            owner: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Option<i64>,
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub price: Option<f64>,
    pub quantity: i64,
    pub custom_attributes: BTreeMap<String, String>,
    pub category_id: Option<i64>,
    pub storage_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            uuid: Uuid::new_v4(),
            name: name.into(),
            description: None,
            purchase_date: None,
            price: None,
            quantity: 1,
            custom_attributes: BTreeMap::new(),
            category_id: None,
            storage_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Database statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbStats {
    pub room_count: i64,
    pub storage_count: i64,
    pub category_count: i64,
    pub template_count: i64,
    pub tag_count: i64,
    pub image_count: i64,
    pub item_count: i64,
}

/// Parse errors for string conversions
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid record kind: {0}")]
    InvalidRecordKind(String),
}
