use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusinessRole {
    Owner,
    Admin,
    Operator,
}

impl BusinessRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessRole::Owner => "owner",
            BusinessRole::Admin => "admin",
            BusinessRole::Operator => "operator",
        }
    }
}

impl FromStr for BusinessRole {
    type Err = ();

    fn from_str(input: &str) -> Result<BusinessRole, Self::Err> {
        match input {
            "owner" => Ok(BusinessRole::Owner),
            "admin" => Ok(BusinessRole::Admin),
            "operator" => Ok(BusinessRole::Operator),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Business {
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
}

#[derive(Clone)]
pub struct BusinessTable;

impl Table for BusinessTable {
    fn name(&self) -> &'static str {
        "businesses"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS businesses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id INTEGER NOT NULL,
                name VARCHAR(255) NOT NULL,
                FOREIGN KEY (owner_id) REFERENCES users (id)
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS businesses;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["users"]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BusinessMember {
    pub user_id: i32,
    pub business_id: i32,
    pub role: String,
}

#[derive(Clone)]
pub struct BusinessMemberTable;

impl Table for BusinessMemberTable {
    fn name(&self) -> &'static str {
        "business_members"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS business_members (
                user_id INTEGER NOT NULL,
                business_id INTEGER NOT NULL,
                role TEXT NOT NULL,
                PRIMARY KEY (user_id, business_id),
                FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE,
                FOREIGN KEY (business_id) REFERENCES businesses (id) ON DELETE CASCADE
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS business_members;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["users", "businesses"]
    }
}
