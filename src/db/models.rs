use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    Regular,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Regular => "REGULAR",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "REGULAR" => Some(Role::Regular),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// A registered account. The password digest is never serialized, so API
/// responses and session snapshots both come out redacted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub role: Role,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub profile_photo: Option<String>,
    pub header_image: Option<String>,
    pub created_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn redacted(mut self) -> Self {
        self.password_hash = None;
        self
    }
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for User {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachments {
    pub images: Vec<String>,
    pub video: Vec<String>,
}

impl Attachments {
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.video.is_empty()
    }

    pub fn urls(&self) -> impl Iterator<Item = &String> {
        self.images.iter().chain(self.video.iter())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tuit {
    pub id: String,
    pub author_id: String,
    pub body: String,
    pub attachments: Attachments,
    pub like_count: i64,
    pub created_at: String,
    pub updated_at: String,
}
