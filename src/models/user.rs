//! User model and trait implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::RestClient;
use crate::error::{CbError, Result};
use crate::lazy::Lazy;
use crate::models::{identified_by_id, lenient_string, payload_id, payload_name, EntityView};
use crate::pagination::{Page, PageParams};
use crate::timestamp::Timestamp;
use crate::traits::{Get, List};

/// A codeBeamer user.
///
/// References embedded in other payloads (creators, assignees, owners)
/// carry only id, name and usually the email; the profile is fetched from
/// `users/{id}` on first access to [`detail`](Self::detail).
#[derive(Debug, Clone)]
pub struct User {
    client: RestClient,
    id: i64,
    name: String,
    email: Option<String>,
    detail: Lazy<UserDetail>,
}

identified_by_id!(User);

/// Profile attributes of a [`User`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetail {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub zip: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub skills: Option<String>,
    #[serde(default, with = "crate::timestamp::option")]
    pub registry_date: Option<Timestamp>,
    #[serde(default, with = "crate::timestamp::option")]
    pub last_login_date: Option<Timestamp>,
    #[serde(default)]
    pub status: Option<String>,
    /// Read from the profile for references that came without one.
    #[serde(default, skip_serializing)]
    email: Option<String>,
}

impl User {
    /// Build a user from any user payload.
    ///
    /// A payload with a `type` key is a reference and yields a partial user.
    pub fn from_payload(client: &RestClient, payload: Value) -> Result<Self> {
        let id = payload_id(&payload, "user")?;
        let name = payload_name(&payload);
        let email = payload
            .get("email")
            .and_then(Value::as_str)
            .map(str::to_string);

        let detail = if payload.get("type").is_some() {
            Lazy::partial()
        } else {
            Lazy::full(serde_json::from_value(payload)?)
        };

        Ok(Self {
            client: client.clone(),
            id,
            name,
            email,
            detail,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The email address; absent for system users.
    ///
    /// Taken from the reference when it carried one, otherwise from the
    /// loaded profile.
    pub fn email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .or_else(|| self.detail.get().and_then(|detail| detail.email.as_deref()))
    }

    pub fn is_loaded(&self) -> bool {
        self.detail.is_loaded()
    }

    /// The detail if it is already loaded; never fetches.
    pub fn cached_detail(&self) -> Option<&UserDetail> {
        self.detail.get()
    }

    /// The profile, fetched on first access.
    pub async fn detail(&self) -> Result<&UserDetail> {
        self.detail
            .get_or_load(|| Self::fetch_detail(&self.client, self.id))
            .await
    }

    /// Make sure the profile is loaded.
    pub async fn load(&self) -> Result<()> {
        self.detail().await.map(|_| ())
    }

    /// Re-fetch the profile even if it is already loaded.
    pub async fn refresh(&mut self) -> Result<()> {
        let detail = Self::fetch_detail(&self.client, self.id).await?;
        self.detail.replace(detail);
        Ok(())
    }

    /// A partial copy carrying only id, name and email.
    pub fn reference(&self) -> Self {
        Self {
            client: self.client.clone(),
            id: self.id,
            name: self.name.clone(),
            email: self.email().map(str::to_string),
            detail: Lazy::partial(),
        }
    }

    #[tracing::instrument(skip(client))]
    async fn fetch_detail(client: &RestClient, id: i64) -> Result<UserDetail> {
        tracing::debug!("loading user detail");
        let payload = client
            .get_json(&format!("users/{id}"))
            .await
            .map_err(|e| e.for_entity("user", id))?;
        Ok(serde_json::from_value(payload)?)
    }
}

impl Serialize for User {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct UserView<'a> {
            #[serde(flatten)]
            entity: EntityView<'a, UserDetail>,
            #[serde(skip_serializing_if = "Option::is_none")]
            email: Option<&'a str>,
        }

        UserView {
            entity: EntityView {
                id: self.id,
                name: &self.name,
                detail: self.detail.get(),
            },
            email: self.email(),
        }
        .serialize(serializer)
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[async_trait]
impl Get for User {
    type Id = i64;

    #[tracing::instrument(skip(client))]
    async fn get(client: &RestClient, id: i64) -> Result<Self> {
        let payload = client
            .get_json(&format!("users/{id}"))
            .await
            .map_err(|e| e.for_entity("user", id))?;
        Self::from_payload(client, payload)
    }
}

#[derive(Debug, Deserialize)]
struct UserListResponse {
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    users: Vec<Value>,
}

#[async_trait]
impl List for User {
    type Query = ();

    #[tracing::instrument(skip(client))]
    async fn list_page(
        client: &RestClient,
        _query: &Self::Query,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Self>> {
        let response = client
            .get_with_query("users", &PageParams::new(page, page_size))
            .await?;
        let data: UserListResponse = response.json().await.map_err(CbError::HttpError)?;

        Page::new(data.users, page, page_size, data.total)
            .try_map(|user| Self::from_payload(client, user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> RestClient {
        RestClient::new("https://cb.example.com", "u", "p").unwrap()
    }

    #[test]
    fn test_reference_payload_is_partial() {
        let user = User::from_payload(
            &client(),
            json!({"id": 3, "name": "bond", "type": "UserReference", "email": "bond@mi6.example"}),
        )
        .unwrap();
        assert!(!user.is_loaded());
        assert_eq!(user.email(), Some("bond@mi6.example"));
        assert_eq!(
            serde_json::to_value(&user).unwrap(),
            json!({"id": 3, "name": "bond", "email": "bond@mi6.example"})
        );
    }

    #[test]
    fn test_detail_payload_is_full() {
        let user = User::from_payload(
            &client(),
            json!({
                "id": 3,
                "name": "bond",
                "email": "bond@mi6.example",
                "firstName": "James",
                "zip": 7007,
                "registryDate": "2020-01-01T00:00:00.000000"
            }),
        )
        .unwrap();
        assert!(user.is_loaded());

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["firstName"], "James");
        assert_eq!(json["zip"], "7007");
        assert_eq!(json["registryDate"], "2020-01-01T00:00:00.000000");
    }

    #[test]
    fn test_bad_timestamp_rejects_payload() {
        let result = User::from_payload(
            &client(),
            json!({"id": 3, "name": "bond", "registryDate": "2020-01-01T00:00:00"}),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_reference_drops_detail() {
        let user = User::from_payload(&client(), json!({"id": 3, "name": "bond"})).unwrap();
        assert!(user.is_loaded());
        let reference = user.reference();
        assert!(!reference.is_loaded());
        assert_eq!(reference, user);
    }
}
