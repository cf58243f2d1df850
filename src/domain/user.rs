use serde::{Deserialize, Serialize};

/// Platform account. Owned by the auth subsystem; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub roles: Vec<Role>,
}

impl User {
    /// "First Last", falling back to the username when both are blank.
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string();
        if name.is_empty() {
            self.username.clone()
        } else {
            name
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Students,
    Tutors,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Students => "students",
            Role::Tutors => "tutors",
        }
    }

    pub fn from_str(s: &str) -> Option<Role> {
        match s {
            "students" => Some(Role::Students),
            "tutors" => Some(Role::Tutors),
            _ => None,
        }
    }
}
