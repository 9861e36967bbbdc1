//! Choice option values and their paged listing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::RestClient;
use crate::error::{CbError, Result};
use crate::models::identified_by_id;
use crate::pagination::{Page, PageParams};
use crate::traits::List;

/// Type tag sent with option references.
pub const CHOICE_OPTION_REFERENCE: &str = "ChoiceOptionReference";

fn default_reference_type() -> String {
    CHOICE_OPTION_REFERENCE.to_string()
}

/// An option of a choice field, used both as an available choice and as a
/// selected value.
///
/// User-reference options carry the user's email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceValue {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Reference type tag (`ChoiceOptionReference`, `UserReference`, ...).
    #[serde(rename = "type", default = "default_reference_type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

identified_by_id!(ChoiceValue);

impl ChoiceValue {
    /// A plain option reference.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: default_reference_type(),
            email: None,
        }
    }

    /// A user-reference option.
    pub fn user(id: i64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: "UserReference".to_string(),
            email: Some(email.into()),
        }
    }
}

impl std::fmt::Display for ChoiceValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Which field's options to list: the options are scoped to one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChoiceOptionsQuery {
    pub item_id: i64,
    pub field_id: i64,
}

#[derive(Debug, Deserialize)]
struct OptionsResponse {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    references: Vec<ChoiceValue>,
}

#[async_trait]
impl List for ChoiceValue {
    type Query = ChoiceOptionsQuery;

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &RestClient,
        query: &Self::Query,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Self>> {
        let path = format!("items/{}/fields/{}/options", query.item_id, query.field_id);
        let response = client
            .get_with_query(&path, &PageParams::new(page, page_size))
            .await?;
        let data: OptionsResponse = response.json().await.map_err(CbError::HttpError)?;

        Ok(Page::new(data.references, page, page_size, data.total))
    }
}
