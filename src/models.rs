use crate::error::StoreError;
use chrono::{DateTime, Duration, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;
use uuid::Uuid;

/// Days a time-limited document is kept before the sweep removes it.
pub const TIME_LIMITED_RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(alias = "public")]
    Public,
    #[serde(rename = "Eulogy", alias = "TimeLimited", alias = "eulogy")]
    TimeLimited,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Public, Category::TimeLimited];

    /// Subdirectory of the uploads root holding this category's payloads.
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Public => "public",
            Category::TimeLimited => "eulogy",
        }
    }

    pub fn retention(self) -> Option<Duration> {
        match self {
            Category::Public => None,
            Category::TimeLimited => Some(Duration::days(TIME_LIMITED_RETENTION_DAYS)),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Public => f.write_str("Public"),
            Category::TimeLimited => f.write_str("Eulogy"),
        }
    }
}

impl FromStr for Category {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(Category::Public),
            "eulogy" | "timelimited" | "time-limited" | "time_limited" => Ok(Category::TimeLimited),
            _ => Err(StoreError::InvalidCategory(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: String,
    pub original_name: String,
    #[serde(deserialize_with = "deserialize_stored_name")]
    pub stored_name: String,
    pub category: Category,
    #[serde(alias = "uploadDate")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(alias = "expiryDate", default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl DocumentRecord {
    pub fn new(original_name: String, category: Category, uploaded_at: DateTime<Utc>) -> Self {
        let stored_name = stored_name_for(&original_name);
        Self {
            id: Uuid::new_v4().to_string(),
            original_name,
            stored_name,
            category,
            uploaded_at,
            expires_at: category.retention().map(|keep| uploaded_at + keep),
        }
    }

    /// Only time-limited records expire, whatever `expires_at` says.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.category == Category::TimeLimited
            && self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Random payload name that keeps the uploader's extension when it is plain
/// ASCII alphanumeric. Anything else is dropped so the name stays path-safe.
pub fn stored_name_for(original_name: &str) -> String {
    let token = Uuid::new_v4();
    let extension = Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 16)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{}.{}", token, ext),
        None => token.to_string(),
    }
}

/// True when `name` is exactly one normal path component, so joining it onto
/// a category directory cannot leave that directory.
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

fn deserialize_stored_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    if is_plain_file_name(&name) {
        Ok(name)
    } else {
        Err(de::Error::custom(format!(
            "stored name {:?} is not a plain file name",
            name
        )))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub must_change_password: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentRecord>,
}

/// Listing entry for the public downloads page.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicDocument {
    pub id: String,
    pub original_name: String,
    pub url: String,
    pub upload_date: DateTime<Utc>,
}

impl From<DocumentRecord> for PublicDocument {
    fn from(record: DocumentRecord) -> Self {
        Self {
            url: format!("/api/documents/{}/download", record.id),
            id: record.id,
            original_name: record.original_name,
            upload_date: record.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub expired_removed: usize,
    pub orphans_removed: usize,
}
