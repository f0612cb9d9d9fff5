use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

/// Environment variable holding a session token.
pub const TOKEN_ENV: &str = "DOCWS_TOKEN";

/// Holds the current session token. No token means "not authenticated".
///
/// Read-only from the tree engine's point of view; clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    token: Arc<RwLock<Option<String>>>,
    token_file: Option<PathBuf>,
}

impl CredentialStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(normalize(token))),
            token_file: None,
        }
    }

    /// Resolve the token: explicit value, then `$DOCWS_TOKEN`, then the
    /// token file. Blank values are treated as absent.
    pub fn resolve(cli_token: Option<String>, token_file: Option<&Path>) -> Self {
        let env_token = std::env::var(TOKEN_ENV).ok();
        Self::resolve_from(cli_token, env_token, token_file)
    }

    fn resolve_from(
        cli_token: Option<String>,
        env_token: Option<String>,
        token_file: Option<&Path>,
    ) -> Self {
        let token = normalize(cli_token)
            .or_else(|| normalize(env_token))
            .or_else(|| token_file.and_then(read_token_file));
        Self {
            token_file: token_file.map(Path::to_path_buf),
            ..Self::new(token)
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    /// Re-read the token file, picking up a sign-in made after startup.
    ///
    /// Returns true when the token changed. A missing or blank file leaves
    /// the current token alone.
    pub fn reload(&self) -> bool {
        let Some(token) = self.token_file.as_deref().and_then(read_token_file) else {
            return false;
        };
        let mut slot = self.token.write();
        if slot.as_deref() == Some(token.as_str()) {
            return false;
        }
        *slot = Some(token);
        true
    }
}

fn normalize(token: Option<String>) -> Option<String> {
    token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn read_token_file(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => normalize(Some(content)),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "no token file");
            None
        }
    }
}

/// Default token file location: `<config_dir>/docws/token`.
pub fn default_token_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("docws").join("token"))
}
