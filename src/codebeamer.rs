//! Top-level entry point composing the entity graph.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::RestClient;
use crate::error::{CbError, NotFoundExt, Result};
use crate::models::{into_array, ItemQuery, Lookup, Project, Tracker, TrackerItem, User};
use crate::pagination::PageRequest;
use crate::traits::{Get, List};

/// The codeBeamer API client.
///
/// Every finder returns `Ok(None)` when the entity does not exist; errors
/// are reserved for failed requests.
///
/// # Example
///
/// ```no_run
/// use cbapi::Codebeamer;
///
/// # async fn example() -> cbapi::Result<()> {
/// let cb = Codebeamer::new("https://codebeamer.example.com", "bond", "007")?;
/// if let Some(project) = cb.get_project("Apollo").await? {
///     for tracker in project.get_trackers().await? {
///         println!("{}", tracker.name());
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Codebeamer {
    client: RestClient,
}

impl Codebeamer {
    /// Connect to the server at `url` with basic authentication.
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self> {
        Ok(Self::with_client(RestClient::new(url, username, password)?))
    }

    /// Connect using `CODEBEAMER_URL`, `CODEBEAMER_USERNAME` and
    /// `CODEBEAMER_PASSWORD`.
    pub fn from_env() -> Result<Self> {
        Ok(Self::with_client(RestClient::from_env()?))
    }

    /// Use an already configured client.
    pub fn with_client(client: RestClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RestClient {
        &self.client
    }

    /// Every project visible to the user (as references).
    #[tracing::instrument(skip(self))]
    pub async fn get_projects(&self) -> Result<Vec<Project>> {
        let payload = self.client.get_json("projects").await?;
        into_array(payload, "projects")?
            .into_iter()
            .map(|project| Project::from_payload(&self.client, project))
            .collect()
    }

    /// A project by id or by name.
    ///
    /// There is no name search on the server: a name lookup lists every
    /// project and loads the match.
    pub async fn get_project(&self, lookup: impl Into<Lookup>) -> Result<Option<Project>> {
        match lookup.into() {
            Lookup::Id(id) => Project::get(&self.client, id).await.found(),
            lookup @ Lookup::Name(_) => {
                let project = self
                    .get_projects()
                    .await?
                    .into_iter()
                    .find(|project| lookup.matches(project.id(), project.name()));
                match project {
                    Some(project) => {
                        project.load().await?;
                        Ok(Some(project))
                    }
                    None => Ok(None),
                }
            }
        }
    }

    /// A project by its key (e.g. `APO`).
    #[tracing::instrument(skip(self))]
    pub async fn get_project_by_key(&self, key: &str) -> Result<Option<Project>> {
        #[derive(Deserialize)]
        struct SearchResponse {
            #[serde(default)]
            projects: Vec<Value>,
        }

        let response = self
            .client
            .post("projects/search", &json!({ "keyName": key }))
            .await?;
        let data: SearchResponse = response.json().await.map_err(CbError::HttpError)?;

        data.projects
            .into_iter()
            .next()
            .map(|project| Project::from_payload(&self.client, project))
            .transpose()
    }

    /// Users, one page or all (`page == 0`).
    pub async fn get_users(&self, page: u32, page_size: u32) -> Result<Vec<User>> {
        User::list(&self.client, &(), PageRequest::new(page, page_size)).await
    }

    /// A user by id or by name (server-side search).
    pub async fn get_user(&self, lookup: impl Into<Lookup>) -> Result<Option<User>> {
        match lookup.into() {
            Lookup::Id(id) => User::get(&self.client, id).await.found(),
            Lookup::Name(name) => self.find_user("users/findByName", "name", &name).await,
        }
    }

    /// A user by email address (server-side search).
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user("users/findByEmail", "email", email).await
    }

    /// A tracker by id or by name.
    ///
    /// A name lookup walks the trackers of every project: one request per
    /// project. Prefer ids where possible.
    pub async fn get_tracker(&self, lookup: impl Into<Lookup>) -> Result<Option<Tracker>> {
        match lookup.into() {
            Lookup::Id(id) => Tracker::get(&self.client, id).await.found(),
            lookup @ Lookup::Name(_) => {
                for project in self.get_projects().await? {
                    let found = project.get_tracker(lookup.clone()).await?;
                    if found.is_some() {
                        return Ok(found);
                    }
                }
                Ok(None)
            }
        }
    }

    /// A tracker item by id.
    pub async fn get_item(&self, id: i64) -> Result<Option<TrackerItem>> {
        TrackerItem::get(&self.client, id).await.found()
    }

    /// Items matching a cbQL query, one page or all (`page == 0`).
    pub async fn query_items(&self, cbql: &str, page: u32, page_size: u32) -> Result<Vec<TrackerItem>> {
        TrackerItem::list(
            &self.client,
            &ItemQuery::Cbql(cbql.to_string()),
            PageRequest::new(page, page_size),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn find_user(&self, path: &str, key: &str, value: &str) -> Result<Option<User>> {
        let response = match self.client.get_with_query(path, &[(key, value)]).await.found()? {
            Some(response) => response,
            None => return Ok(None),
        };
        let payload: Value = response.json().await.map_err(CbError::HttpError)?;
        if payload.is_null() {
            return Ok(None);
        }
        User::from_payload(&self.client, payload).map(Some)
    }
}
