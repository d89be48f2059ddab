//! Project and repo administration DTOs

use serde::{Deserialize, Serialize};

/// Request to create a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Request to create a repo under a project
///
/// `path` names a hosted bare repository under the server's data directory;
/// `remote_url` references an external clone source instead. One of the two
/// identifies where runs clone from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRepo {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default = "default_branch")]
    pub default_branch: String,
}

fn default_branch() -> String {
    "main".to_string()
}
