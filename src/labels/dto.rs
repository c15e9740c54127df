use serde::{Deserialize, Serialize};

use crate::labels::repo::Label;

#[derive(Debug, Serialize)]
pub struct LabelResponse {
    pub id: i64,
    pub name: String,
}

impl From<Label> for LabelResponse {
    fn from(label: Label) -> Self {
        Self {
            id: label.id,
            name: label.name,
        }
    }
}

/// Request body for renaming a tag or ingredient.
#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

/// `assigned_only=1` narrows the listing to labels linked to a recipe.
#[derive(Debug, Deserialize)]
pub struct ListFilter {
    #[serde(default)]
    pub assigned_only: i32,
}
