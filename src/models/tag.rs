use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::LazyLock;
use uuid::Uuid;

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[A-Fa-f0-9]{6}$").expect("valid color regex"));

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl Tag {
    /// Builds a tag, picking a random color when none is given.
    pub fn new(name: String, slug: String, color: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            color: color.unwrap_or_else(random_color),
            slug: slug.trim().to_lowercase(),
        }
    }
}

pub fn is_hex_color(value: &str) -> bool {
    HEX_COLOR.is_match(value)
}

pub fn random_color() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..=0xFF_FFFF);
    format!("#{value:06X}")
}
