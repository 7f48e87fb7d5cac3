//! Agent list persisted under the `"agents"` key
//!
//! The list is kept sorted by agent id and holds at most one agent per id.

use super::store::KeyValueStore;
use crate::agent::{Agent, AgentOptions, StoredAgent};
use crate::error::{Error, Result};
use tokio::sync::Mutex;

/// Storage key of the agent list
pub const AGENTS_KEY: &str = "agents";

/// Registry of configured agents
pub struct AgentRepository<S> {
    store: S,
    options: AgentOptions,
    /// Serializes read-modify-write cycles on the list
    write_lock: Mutex<()>,
}

impl<S: KeyValueStore> AgentRepository<S> {
    /// Create a repository; `options` are applied to every agent it loads
    pub fn new(store: S, options: AgentOptions) -> Self {
        Self {
            store,
            options,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All configured agents, initializing an empty list on first use
    pub async fn find_all(&self) -> Result<Vec<Agent>> {
        self.load()
            .await?
            .into_iter()
            .map(|stored| Agent::from_stored(stored, self.options.clone()))
            .collect()
    }

    pub async fn find_by_id(&self, agent_id: &str) -> Result<Option<Agent>> {
        self.load()
            .await?
            .into_iter()
            .find(|stored| stored.manifest.id == agent_id)
            .map(|stored| Agent::from_stored(stored, self.options.clone()))
            .transpose()
    }

    /// Register an agent.
    ///
    /// Fails with `Error::Conflict`, leaving the list untouched, when an agent
    /// with the same id is already configured.
    pub async fn add_agent(&self, agent: &Agent) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut agents = self.load().await?;

        if agents.iter().any(|a| a.manifest.id == agent.id()) {
            return Err(Error::Conflict(format!(
                "An agent with id '{}' is already configured. \
                 Remove it first, or change the id in the new agent's manifest.json",
                agent.id()
            )));
        }

        agents.push(agent.to_stored());
        agents.sort_by(|a, b| a.manifest.id.cmp(&b.manifest.id));
        self.save(&agents).await?;

        tracing::info!("Added agent {} ({})", agent.id(), agent.url());
        Ok(())
    }

    /// Remove the agent with `agent_id`, keeping all others.
    ///
    /// Returns whether an agent was removed.
    pub async fn remove_agent(&self, agent_id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut agents = self.load().await?;

        let before = agents.len();
        agents.retain(|a| a.manifest.id != agent_id);
        if agents.len() == before {
            tracing::warn!("No agent with id {} to remove", agent_id);
            return Ok(false);
        }

        self.save(&agents).await?;
        tracing::info!("Removed agent {}", agent_id);
        Ok(true)
    }

    async fn load(&self) -> Result<Vec<StoredAgent>> {
        match self.store.get(AGENTS_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => {
                let agents = Vec::new();
                self.save(&agents).await?;
                Ok(agents)
            }
        }
    }

    async fn save(&self, agents: &[StoredAgent]) -> Result<()> {
        self.store
            .set(AGENTS_KEY, serde_json::to_value(agents)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::AgentManifest;
    use crate::repository::{FileStore, MemoryStore};
    use serde_json::json;
    use tempfile::TempDir;

    fn agent(id: &str) -> Agent {
        let manifest = AgentManifest::from_value(json!({
            "id": id,
            "name": format!("Agent {}", id),
            "welcomeMessage": "Hi",
            "contactEmail": "ops@example.com",
            "onHttpRequest": [{"condition": {"urlRegex": ".*"}, "actions": [{"activate": {}}]}]
        }))
        .unwrap();
        Agent::new(
            &format!("https://agents.example/{}", id),
            manifest,
            AgentOptions::default(),
        )
        .unwrap()
    }

    fn repo() -> AgentRepository<MemoryStore> {
        AgentRepository::new(MemoryStore::new(), AgentOptions::default())
    }

    async fn ids(repo: &AgentRepository<impl KeyValueStore>) -> Vec<String> {
        repo.find_all()
            .await
            .unwrap()
            .iter()
            .map(|a| a.id().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_find_all_initializes_empty_list() {
        let repo = repo();
        assert!(repo.find_all().await.unwrap().is_empty());
        assert_eq!(repo.store().get(AGENTS_KEY).await.unwrap(), Some(json!([])));
    }

    #[tokio::test]
    async fn test_add_agent_keeps_sorted() {
        let repo = repo();
        repo.add_agent(&agent("charlie")).await.unwrap();
        repo.add_agent(&agent("alpha")).await.unwrap();
        repo.add_agent(&agent("bravo")).await.unwrap();
        assert_eq!(ids(&repo).await, vec!["alpha", "bravo", "charlie"]);
    }

    #[tokio::test]
    async fn test_duplicate_id_is_conflict() {
        let repo = repo();
        repo.add_agent(&agent("dup")).await.unwrap();

        let err = repo.add_agent(&agent("dup")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert!(err.is_conflict());
        assert_eq!(ids(&repo).await, vec!["dup"]);
    }

    #[tokio::test]
    async fn test_remove_agent_keeps_others() {
        let repo = repo();
        for id in ["a", "b", "c"] {
            repo.add_agent(&agent(id)).await.unwrap();
        }

        assert!(repo.remove_agent("b").await.unwrap());
        assert_eq!(ids(&repo).await, vec!["a", "c"]);
        assert!(!repo.remove_agent("missing").await.unwrap());
        assert_eq!(ids(&repo).await, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_find_by_id() {
        let repo = repo();
        repo.add_agent(&agent("a")).await.unwrap();

        let found = repo.find_by_id("a").await.unwrap().unwrap();
        assert_eq!(found.url(), "https://agents.example/a");
        assert!(repo.find_by_id("zzz").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_backed_repository() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");

        let store = FileStore::open(&path).await.unwrap();
        let repo = AgentRepository::new(store, AgentOptions::default());
        repo.add_agent(&agent("persisted")).await.unwrap();

        let reopened =
            AgentRepository::new(FileStore::open(&path).await.unwrap(), AgentOptions::default());
        let agents = reopened.find_all().await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].id(), "persisted");
        assert!(agents[0].activation_action().is_some());
    }

    #[tokio::test]
    async fn test_failed_persist_does_not_register_agent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.json");

        let store = FileStore::open(&path).await.unwrap();
        let repo = AgentRepository::new(store, AgentOptions::default());
        assert!(repo.find_all().await.unwrap().is_empty());

        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let err = repo.add_agent(&agent("dup")).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(repo.find_all().await.unwrap().is_empty());

        // Once storage is writable again the retry succeeds instead of conflicting
        std::fs::remove_dir(&path).unwrap();
        repo.add_agent(&agent("dup")).await.unwrap();
        assert_eq!(ids(&repo).await, vec!["dup"]);
    }
}
