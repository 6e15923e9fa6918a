use serde::{Deserialize, Serialize};

use super::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }
}

/// Location facets a device can be filtered by, reached through its post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonomyKind {
    City,
    Workspace,
    Dormitory,
}

impl TaxonomyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxonomyKind::City => "city",
            TaxonomyKind::Workspace => "workspace",
            TaxonomyKind::Dormitory => "dormitory",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i32,
    pub business_id: i32,
    pub title: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Taxonomy {
    pub id: i32,
    pub kind: String,
    pub title: String,
}

#[derive(Clone)]
pub struct PostTable;

impl Table for PostTable {
    fn name(&self) -> &'static str {
        "posts"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                business_id INTEGER NOT NULL,
                title VARCHAR(255) NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft',
                FOREIGN KEY (business_id) REFERENCES businesses (id) ON DELETE CASCADE
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS posts;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["businesses"]
    }
}

#[derive(Clone)]
pub struct TaxonomyTable;

impl Table for TaxonomyTable {
    fn name(&self) -> &'static str {
        "taxonomies"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS taxonomies (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                title VARCHAR(255) NOT NULL
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS taxonomies;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}

#[derive(Clone)]
pub struct PostTaxonomyTable;

impl Table for PostTaxonomyTable {
    fn name(&self) -> &'static str {
        "post_taxonomies"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS post_taxonomies (
                post_id INTEGER NOT NULL,
                taxonomy_id INTEGER NOT NULL,
                PRIMARY KEY (post_id, taxonomy_id),
                FOREIGN KEY (post_id) REFERENCES posts (id) ON DELETE CASCADE,
                FOREIGN KEY (taxonomy_id) REFERENCES taxonomies (id) ON DELETE CASCADE
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS post_taxonomies;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["posts", "taxonomies"]
    }
}
