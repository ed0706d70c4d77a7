//! Gallery image model and the closed category/orientation vocabularies
//!
//! Category and orientation are explicit enums validated at the request
//! boundary; the database stores their canonical strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Fixed set of gallery categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "FEATURED")]
    Featured,
    #[serde(rename = "WEDDING")]
    Wedding,
    #[serde(rename = "PRE-WEDDING")]
    PreWedding,
    #[serde(rename = "CANDID")]
    Candid,
    #[serde(rename = "BABY")]
    Baby,
    #[serde(rename = "BABYSHOWER")]
    Babyshower,
    #[serde(rename = "HALDI")]
    Haldi,
    #[serde(rename = "HALFSAREE")]
    Halfsaree,
    #[serde(rename = "BLACK & WHITE")]
    BlackAndWhite,
    #[serde(rename = "COUPLE")]
    Couple,
    #[serde(rename = "PORTRAIT")]
    Portrait,
    #[serde(rename = "EVENT")]
    Event,
}

impl Category {
    /// Canonical string as stored and served
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Featured => "FEATURED",
            Category::Wedding => "WEDDING",
            Category::PreWedding => "PRE-WEDDING",
            Category::Candid => "CANDID",
            Category::Baby => "BABY",
            Category::Babyshower => "BABYSHOWER",
            Category::Haldi => "HALDI",
            Category::Halfsaree => "HALFSAREE",
            Category::BlackAndWhite => "BLACK & WHITE",
            Category::Couple => "COUPLE",
            Category::Portrait => "PORTRAIT",
            Category::Event => "EVENT",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "FEATURED" => Ok(Category::Featured),
            "WEDDING" => Ok(Category::Wedding),
            "PRE-WEDDING" => Ok(Category::PreWedding),
            "CANDID" => Ok(Category::Candid),
            "BABY" => Ok(Category::Baby),
            "BABYSHOWER" => Ok(Category::Babyshower),
            "HALDI" => Ok(Category::Haldi),
            "HALFSAREE" => Ok(Category::Halfsaree),
            "BLACK & WHITE" => Ok(Category::BlackAndWhite),
            "COUPLE" => Ok(Category::Couple),
            "PORTRAIT" => Ok(Category::Portrait),
            "EVENT" => Ok(Category::Event),
            other => Err(format!("unknown category: {}", other)),
        }
    }
}

/// Image orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
            Orientation::Square => "square",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            "square" => Ok(Orientation::Square),
            other => Err(format!("unknown orientation: {}", other)),
        }
    }
}

/// How an image entered the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMethod {
    File,
    Url,
}

impl UploadMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadMethod::File => "file",
            UploadMethod::Url => "url",
        }
    }
}

impl FromStr for UploadMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(UploadMethod::File),
            "url" => Ok(UploadMethod::Url),
            other => Err(format!("unknown upload method: {}", other)),
        }
    }
}

/// Persisted gallery image
///
/// `media_id` and `image_url` always describe the same remote object; a
/// record only exists after the remote upload succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub media_id: String,
    pub category: Category,
    pub orientation: Orientation,
    pub upload_method: UploadMethod,
    pub uploaded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for inserting a new gallery image
#[derive(Debug, Clone)]
pub struct NewImage {
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub media_id: String,
    pub category: Category,
    pub orientation: Orientation,
    pub upload_method: UploadMethod,
}

/// Caller-supplied metadata accompanying an upload
#[derive(Debug, Clone)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub orientation: Orientation,
}

/// Gallery listing constraints; `None` means no constraint on that axis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GalleryFilter {
    pub category: Option<Category>,
    pub orientation: Option<Orientation>,
}

impl GalleryFilter {
    /// Build a filter from raw query parameters
    ///
    /// An absent parameter or the literal wildcard `all` leaves the axis
    /// unconstrained; anything else must parse as a known value.
    pub fn from_params(
        category: Option<&str>,
        orientation: Option<&str>,
    ) -> Result<Self, String> {
        let category = match category {
            None => None,
            Some(raw) if raw.trim() == "all" => None,
            Some(raw) => Some(raw.parse::<Category>()?),
        };

        let orientation = match orientation {
            None => None,
            Some(raw) if raw.trim() == "all" => None,
            Some(raw) => Some(raw.parse::<Orientation>()?),
        };

        Ok(GalleryFilter {
            category,
            orientation,
        })
    }
}
