//! In-memory [`Gateway`] for tests: a small server model that records every
//! call and can be told to fail specific operations.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{AppError, Result};
use crate::remote::{EntryDescriptor, EntrySummary, Gateway, Listing, ModelInfo};
use crate::tree::node::EntryId;

/// A recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchRoot,
    FetchDirectory(EntryId),
    CreateFile {
        name: String,
        dir: Option<EntryId>,
    },
    CreateDirectory {
        name: String,
        summary: String,
        dir: Option<EntryId>,
    },
    EditFile {
        id: EntryId,
        name: String,
    },
    EditDirectory {
        id: EntryId,
        name: String,
        summary: String,
    },
    DeleteFile(EntryId),
    DeleteDirectory(EntryId),
    FileInfo(EntryId),
    FileContent(EntryId),
    SaveContent {
        id: EntryId,
        content: String,
    },
    ListModels,
}

fn named(name: &str) -> EntrySummary {
    EntrySummary {
        name: name.to_string(),
        summary: None,
    }
}

#[derive(Default)]
struct Model {
    root: Listing,
    dirs: HashMap<EntryId, Listing>,
    contents: HashMap<EntryId, String>,
    next_id: EntryId,
}

impl Model {
    fn listing_mut(&mut self, parent: Option<EntryId>) -> Result<&mut Listing> {
        match parent {
            None => Ok(&mut self.root),
            Some(id) => self.dirs.get_mut(&id).ok_or_else(|| not_found("dir", id)),
        }
    }

    fn all_listings_mut(&mut self) -> impl Iterator<Item = &mut Listing> {
        std::iter::once(&mut self.root).chain(self.dirs.values_mut())
    }

    fn file_name(&self, id: EntryId) -> Option<String> {
        std::iter::once(&self.root)
            .chain(self.dirs.values())
            .find_map(|l| l.files.get(&id).map(|e| e.name.clone()))
    }
}

fn not_found(kind: &str, id: EntryId) -> AppError {
    AppError::Api {
        status: 404,
        url: format!("fake://{}/{}", kind, id),
    }
}

fn server_error(what: &str) -> AppError {
    AppError::Api {
        status: 500,
        url: format!("fake://{}", what),
    }
}

/// Scripted in-memory workspace server.
#[derive(Default)]
pub struct FakeGateway {
    model: Mutex<Model>,
    calls: Mutex<Vec<Call>>,
    fail_root: Mutex<bool>,
    fail_dirs: Mutex<HashSet<EntryId>>,
    fail_mutations: Mutex<bool>,
    fail_content: Mutex<bool>,
    dir_delays: Mutex<HashMap<EntryId, Duration>>,
    models: Mutex<Vec<String>>,
    fail_models: Mutex<bool>,
}

impl FakeGateway {
    pub fn new() -> Self {
        let gw = Self::default();
        gw.model.lock().next_id = 1000;
        gw
    }

    /// Add a directory (at the root, or inside `parent`).
    pub fn with_dir(self, id: EntryId, name: &str, parent: Option<EntryId>) -> Self {
        {
            let mut model = self.model.lock();
            model
                .listing_mut(parent)
                .expect("parent directory exists")
                .dirs
                .insert(id, named(name));
            model.dirs.insert(id, Listing::default());
        }
        self
    }

    /// Add a file (at the root, or inside `parent`).
    pub fn with_file(self, id: EntryId, name: &str, parent: Option<EntryId>) -> Self {
        {
            let mut model = self.model.lock();
            model
                .listing_mut(parent)
                .expect("parent directory exists")
                .files
                .insert(id, named(name));
            model.contents.insert(id, String::new());
        }
        self
    }

    pub fn with_content(self, id: EntryId, content: &str) -> Self {
        self.model.lock().contents.insert(id, content.to_string());
        self
    }

    pub fn with_models(self, names: &[&str]) -> Self {
        *self.models.lock() = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn fail_models(&self, fail: bool) {
        *self.fail_models.lock() = fail;
    }

    pub fn fail_root(&self, fail: bool) {
        *self.fail_root.lock() = fail;
    }

    pub fn fail_directory(&self, id: EntryId) {
        self.fail_dirs.lock().insert(id);
    }

    pub fn fail_mutations(&self, fail: bool) {
        *self.fail_mutations.lock() = fail;
    }

    pub fn fail_content(&self, fail: bool) {
        *self.fail_content.lock() = fail;
    }

    pub fn delay_directory(&self, id: EntryId, delay: Duration) {
        self.dir_delays.lock().insert(id, delay);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    pub fn root_fetches(&self) -> usize {
        self.count(|c| matches!(c, Call::FetchRoot))
    }

    pub fn content_of(&self, id: EntryId) -> Option<String> {
        self.model.lock().contents.get(&id).cloned()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn check_mutation(&self, what: &str) -> Result<()> {
        if *self.fail_mutations.lock() {
            return Err(server_error(what));
        }
        Ok(())
    }

    fn allocate(&self) -> EntryId {
        let mut model = self.model.lock();
        model.next_id += 1;
        model.next_id
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn fetch_root(&self, _token: &str) -> Result<Listing> {
        self.record(Call::FetchRoot);
        if *self.fail_root.lock() {
            return Err(server_error("tree"));
        }
        Ok(self.model.lock().root.clone())
    }

    async fn fetch_directory(&self, _token: &str, id: EntryId) -> Result<Listing> {
        self.record(Call::FetchDirectory(id));
        let delay = self.dir_delays.lock().get(&id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_dirs.lock().contains(&id) {
            return Err(server_error(&format!("dir/{}", id)));
        }
        self.model
            .lock()
            .dirs
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("dir", id))
    }

    async fn create_file(
        &self,
        _token: &str,
        name: &str,
        parent: Option<EntryId>,
    ) -> Result<EntryDescriptor> {
        self.record(Call::CreateFile {
            name: name.to_string(),
            dir: parent,
        });
        self.check_mutation("file")?;
        let id = self.allocate();
        let mut model = self.model.lock();
        model
            .listing_mut(parent)?
            .files
            .insert(id, named(name));
        model.contents.insert(id, String::new());
        Ok(EntryDescriptor {
            id: Some(id),
            name: Some(name.to_string()),
        })
    }

    async fn create_directory(
        &self,
        _token: &str,
        name: &str,
        summary: &str,
        parent: Option<EntryId>,
    ) -> Result<EntryDescriptor> {
        self.record(Call::CreateDirectory {
            name: name.to_string(),
            summary: summary.to_string(),
            dir: parent,
        });
        self.check_mutation("dir")?;
        let id = self.allocate();
        let mut model = self.model.lock();
        model.listing_mut(parent)?.dirs.insert(
            id,
            EntrySummary {
                name: name.to_string(),
                summary: Some(summary.to_string()),
            },
        );
        model.dirs.insert(id, Listing::default());
        Ok(EntryDescriptor {
            id: Some(id),
            name: Some(name.to_string()),
        })
    }

    async fn edit_file(&self, _token: &str, id: EntryId, name: &str) -> Result<EntryDescriptor> {
        self.record(Call::EditFile {
            id,
            name: name.to_string(),
        });
        self.check_mutation("file")?;
        let mut model = self.model.lock();
        let mut found = false;
        for listing in model.all_listings_mut() {
            if let Some(entry) = listing.files.get_mut(&id) {
                entry.name = name.to_string();
                found = true;
            }
        }
        if !found {
            return Err(not_found("file", id));
        }
        Ok(EntryDescriptor {
            id: Some(id),
            name: Some(name.to_string()),
        })
    }

    async fn edit_directory(
        &self,
        _token: &str,
        id: EntryId,
        name: &str,
        summary: &str,
    ) -> Result<EntryDescriptor> {
        self.record(Call::EditDirectory {
            id,
            name: name.to_string(),
            summary: summary.to_string(),
        });
        self.check_mutation("dir")?;
        let mut model = self.model.lock();
        let mut found = false;
        for listing in model.all_listings_mut() {
            if let Some(entry) = listing.dirs.get_mut(&id) {
                entry.name = name.to_string();
                entry.summary = Some(summary.to_string());
                found = true;
            }
        }
        if !found {
            return Err(not_found("dir", id));
        }
        Ok(EntryDescriptor {
            id: Some(id),
            name: Some(name.to_string()),
        })
    }

    async fn delete_file(&self, _token: &str, id: EntryId) -> Result<()> {
        self.record(Call::DeleteFile(id));
        self.check_mutation("file")?;
        let mut model = self.model.lock();
        let removed = model
            .all_listings_mut()
            .fold(false, |acc, l| l.files.remove(&id).is_some() || acc);
        if !removed {
            return Err(not_found("file", id));
        }
        model.contents.remove(&id);
        Ok(())
    }

    async fn delete_directory(&self, _token: &str, id: EntryId) -> Result<()> {
        self.record(Call::DeleteDirectory(id));
        self.check_mutation("dir")?;
        let mut model = self.model.lock();
        let removed = model
            .all_listings_mut()
            .fold(false, |acc, l| l.dirs.remove(&id).is_some() || acc);
        if !removed {
            return Err(not_found("dir", id));
        }
        model.dirs.remove(&id);
        Ok(())
    }

    async fn file_info(&self, _token: &str, id: EntryId) -> Result<EntryDescriptor> {
        self.record(Call::FileInfo(id));
        let name = self
            .model
            .lock()
            .file_name(id)
            .ok_or_else(|| not_found("file", id))?;
        Ok(EntryDescriptor {
            id: Some(id),
            name: Some(name),
        })
    }

    async fn file_content(&self, _token: &str, id: EntryId) -> Result<String> {
        self.record(Call::FileContent(id));
        if *self.fail_content.lock() {
            return Err(server_error(&format!("file/{}/contents", id)));
        }
        self.model
            .lock()
            .contents
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found("file", id))
    }

    async fn save_file_content(&self, _token: &str, id: EntryId, content: &str) -> Result<()> {
        self.record(Call::SaveContent {
            id,
            content: content.to_string(),
        });
        if *self.fail_content.lock() {
            return Err(server_error(&format!("file/{}/contents", id)));
        }
        self.model.lock().contents.insert(id, content.to_string());
        Ok(())
    }

    async fn list_models(&self, _token: &str) -> Result<Vec<ModelInfo>> {
        self.record(Call::ListModels);
        if *self.fail_models.lock() {
            return Err(server_error("ollama/models"));
        }
        Ok(self
            .models
            .lock()
            .iter()
            .map(|name| ModelInfo { name: name.clone() })
            .collect())
    }
}
