use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    EditArchive,
    ManageFavorites,
    ManageSettings,
    ManagePermissions,
    ServerAdmin,
}

impl Permission {
    pub fn as_int(self) -> i32 {
        match self {
            Permission::EditArchive => 1,
            Permission::ManageFavorites => 2,
            Permission::ManageSettings => 3,
            Permission::ManagePermissions => 4,
            Permission::ServerAdmin => 5,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            1 => Some(Permission::EditArchive),
            2 => Some(Permission::ManageFavorites),
            3 => Some(Permission::ManageSettings),
            4 => Some(Permission::ManagePermissions),
            5 => Some(Permission::ServerAdmin),
            _ => None,
        }
    }
}

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::EditArchive,
    Permission::ManageFavorites,
    Permission::ManageSettings,
    Permission::ManagePermissions,
    Permission::ServerAdmin,
];
const REGULAR_PERMISSIONS: &[Permission] = &[
    Permission::EditArchive,
    Permission::ManageFavorites,
    Permission::ManageSettings,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    Admin,
    Regular,
}

impl UserRole {
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            UserRole::Admin => ADMIN_PERMISSIONS,
            UserRole::Regular => REGULAR_PERMISSIONS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Regular => "Regular",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "regular" => Some(UserRole::Regular),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
