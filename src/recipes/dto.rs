use serde::{Deserialize, Serialize};
use sqlx::types::Decimal;

use crate::labels::dto::LabelResponse;

/// Nested label reference in recipe payloads: `{"name": "Thai"}`.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelName {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub tags: Vec<LabelName>,
    #[serde(default)]
    pub ingredients: Vec<LabelName>,
}

/// Partial update; omitted fields stay as they are. A supplied label list
/// replaces the recipe's linked set.
#[derive(Debug, Deserialize)]
pub struct PatchRecipeRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Option<Vec<LabelName>>,
    pub ingredients: Option<Vec<LabelName>>,
}

/// Query params on the recipe listing: comma-separated label IDs.
#[derive(Debug, Deserialize)]
pub struct ListRecipesQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecipeListItem {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tags: Vec<LabelResponse>,
    pub ingredients: Vec<LabelResponse>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageUploadResponse {
    pub id: i64,
    pub image: String,
}

/// Parse `"1,2,3"` into IDs; whitespace around entries is tolerated.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>, String> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| format!("invalid id: {:?}", part.trim()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_ids() {
        assert_eq!(parse_id_list("1,2,3").unwrap(), vec![1, 2, 3]);
        assert_eq!(parse_id_list(" 7 , 8 ").unwrap(), vec![7, 8]);
        assert_eq!(parse_id_list("42").unwrap(), vec![42]);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(parse_id_list("a,b").is_err());
        assert!(parse_id_list("1,,2").is_err());
        assert!(parse_id_list("").is_err());
        assert!(parse_id_list("1.5").is_err());
    }

    #[test]
    fn create_request_defaults_to_empty_label_lists() {
        let body: CreateRecipeRequest = serde_json::from_str(
            r#"{"title": "Sample recipe", "time_minutes": 22, "price": "5.25"}"#,
        )
        .unwrap();
        assert!(body.tags.is_empty());
        assert!(body.ingredients.is_empty());
        assert_eq!(body.price.to_string(), "5.25");
    }

    #[test]
    fn patch_request_distinguishes_omitted_lists() {
        let body: PatchRecipeRequest =
            serde_json::from_str(r#"{"tags": [{"name": "Dinner"}]}"#).unwrap();
        assert!(body.title.is_none());
        assert_eq!(body.tags.as_ref().unwrap()[0].name, "Dinner");
        assert!(body.ingredients.is_none());
    }

    #[test]
    fn price_serializes_as_decimal_string() {
        let item = RecipeListItem {
            id: 1,
            title: "Sample".into(),
            time_minutes: 10,
            price: "2.50".parse().unwrap(),
            link: None,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"2.50\""));
    }
}
