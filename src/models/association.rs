//! Associations between tracker items ("depends on", "related to", ...).

use serde::{Deserialize, Serialize};

use crate::client::RestClient;
use crate::error::{CbError, Result};

/// Association types known to codeBeamer, with their fixed ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    Depends,
    Parent,
    Child,
    Related,
    Derived,
    Violates,
    Excludes,
    Invalidates,
    CopyOf,
}

impl AssociationKind {
    pub const ALL: [AssociationKind; 9] = [
        AssociationKind::Depends,
        AssociationKind::Parent,
        AssociationKind::Child,
        AssociationKind::Related,
        AssociationKind::Derived,
        AssociationKind::Violates,
        AssociationKind::Excludes,
        AssociationKind::Invalidates,
        AssociationKind::CopyOf,
    ];

    /// The server-side id of the association type.
    pub fn id(self) -> i64 {
        match self {
            AssociationKind::Depends => 1,
            AssociationKind::Parent => 2,
            AssociationKind::Child => 3,
            AssociationKind::Related => 4,
            AssociationKind::Derived => 5,
            AssociationKind::Violates => 6,
            AssociationKind::Excludes => 7,
            AssociationKind::Invalidates => 8,
            AssociationKind::CopyOf => 9,
        }
    }

    /// The server-side name of the association type.
    pub fn name(self) -> &'static str {
        match self {
            AssociationKind::Depends => "depends",
            AssociationKind::Parent => "parent",
            AssociationKind::Child => "child",
            AssociationKind::Related => "related",
            AssociationKind::Derived => "derived",
            AssociationKind::Violates => "violates",
            AssociationKind::Excludes => "excludes",
            AssociationKind::Invalidates => "invalidates",
            AssociationKind::CopyOf => "copy of",
        }
    }

    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    fn reference(self) -> Reference {
        Reference {
            id: self.id(),
            name: Some(self.name().to_string()),
            kind: Some("AssociationTypeReference".to_string()),
        }
    }
}

/// A typed reference `{id, name?, type?}` as used by association payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Reference {
    fn item(id: i64) -> Self {
        Self {
            id,
            name: None,
            kind: Some("TrackerItemReference".to_string()),
        }
    }
}

/// An association between two tracker items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Association {
    pub id: i64,
    pub from: Reference,
    pub to: Reference,
    #[serde(rename = "type")]
    pub association_type: Reference,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize)]
struct NewAssociation<'a> {
    from: Reference,
    to: Reference,
    #[serde(rename = "type")]
    association_type: Reference,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
}

impl Association {
    /// The association type, `None` for types this client does not know.
    pub fn kind(&self) -> Option<AssociationKind> {
        AssociationKind::from_id(self.association_type.id)
    }

    #[tracing::instrument(skip(client))]
    pub(crate) async fn create(
        client: &RestClient,
        from: i64,
        to: i64,
        kind: AssociationKind,
        description: Option<&str>,
    ) -> Result<Self> {
        let body = NewAssociation {
            from: Reference::item(from),
            to: Reference::item(to),
            association_type: kind.reference(),
            description,
        };
        let response = client.post("associations", &body).await?;
        response.json().await.map_err(CbError::HttpError)
    }

    #[tracing::instrument(skip(client))]
    pub(crate) async fn remove(client: &RestClient, id: i64) -> Result<()> {
        client
            .delete(&format!("associations/{id}"))
            .await
            .map_err(|e| e.for_entity("association", id))?;
        Ok(())
    }
}
