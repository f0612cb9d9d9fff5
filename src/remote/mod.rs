//! The remote workspace API as seen by the client.

pub mod credentials;
#[cfg(test)]
pub mod fake;
pub mod generate;
pub mod http;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use crate::error::Result;
use crate::tree::node::EntryId;

/// Name (and for directories, summary) of a listed entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EntrySummary {
    pub name: String,
    #[serde(default)]
    pub summary: Option<String>,
}

/// A root or directory listing: `{ dirs: {id: {...}}, files: {id: {...}} }`.
///
/// Entries iterate in ascending id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Listing {
    #[serde(default, deserialize_with = "entries")]
    pub dirs: BTreeMap<EntryId, EntrySummary>,
    #[serde(default, deserialize_with = "entries")]
    pub files: BTreeMap<EntryId, EntrySummary>,
}

#[derive(Deserialize)]
struct ListedEntry {
    id: EntryId,
    name: String,
    #[serde(default)]
    summary: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntriesRepr {
    // Keys stay strings here: integer keys do not survive untagged buffering.
    Map(BTreeMap<String, EntrySummary>),
    List(Vec<ListedEntry>),
}

/// Accepts an id-keyed object, a list of `{id, name}` objects, `[]` (what an
/// empty PHP array encodes to) or `null`.
fn entries<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<EntryId, EntrySummary>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<EntriesRepr>::deserialize(deserializer)? {
        None => BTreeMap::new(),
        Some(EntriesRepr::Map(map)) => map
            .into_iter()
            .map(|(key, entry)| {
                key.trim()
                    .parse::<EntryId>()
                    .map(|id| (id, entry))
                    .map_err(|_| D::Error::custom(format!("invalid entry id {key:?}")))
            })
            .collect::<std::result::Result<_, _>>()?,
        Some(EntriesRepr::List(list)) => list
            .into_iter()
            .map(|e| {
                (
                    e.id,
                    EntrySummary {
                        name: e.name,
                        summary: e.summary,
                    },
                )
            })
            .collect(),
    })
}

/// Descriptor returned by create, edit and info calls. Only the fields the
/// client reads are decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EntryDescriptor {
    #[serde(default)]
    pub id: Option<EntryId>,
    #[serde(default)]
    pub name: Option<String>,
}

/// A generation model offered by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModelInfo {
    pub name: String,
}

/// Directory/file CRUD and content operations of the workspace API.
///
/// Every call takes the bearer credential explicitly; the gateway holds no
/// session state of its own.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Root-level directories and files.
    async fn fetch_root(&self, token: &str) -> Result<Listing>;

    /// Content of one directory.
    async fn fetch_directory(&self, token: &str, id: EntryId) -> Result<Listing>;

    async fn create_file(
        &self,
        token: &str,
        name: &str,
        parent: Option<EntryId>,
    ) -> Result<EntryDescriptor>;

    async fn create_directory(
        &self,
        token: &str,
        name: &str,
        summary: &str,
        parent: Option<EntryId>,
    ) -> Result<EntryDescriptor>;

    async fn edit_file(&self, token: &str, id: EntryId, name: &str) -> Result<EntryDescriptor>;

    async fn edit_directory(
        &self,
        token: &str,
        id: EntryId,
        name: &str,
        summary: &str,
    ) -> Result<EntryDescriptor>;

    async fn delete_file(&self, token: &str, id: EntryId) -> Result<()>;

    async fn delete_directory(&self, token: &str, id: EntryId) -> Result<()>;

    async fn file_info(&self, token: &str, id: EntryId) -> Result<EntryDescriptor>;

    /// Raw text content of a file.
    async fn file_content(&self, token: &str, id: EntryId) -> Result<String>;

    async fn save_file_content(&self, token: &str, id: EntryId, content: &str) -> Result<()>;

    /// Generation models the server can run, in the server's order.
    async fn list_models(&self, token: &str) -> Result<Vec<ModelInfo>>;
}
