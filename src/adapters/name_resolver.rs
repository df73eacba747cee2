//! Explicit lineup/roster lookup capability.
//!
//! Grounded on `event_detector.py`'s name-enrichment step, which in the
//! original reaches across layers to import a repository directly.
//! Here it's an injected port: callers that want names pass a
//! `&dyn NameResolver`, callers that don't, don't.

/// Resolves actor/team ids to display names for event annotation.
/// Implementations may be backed by a roster cache, a database lookup,
/// or (in tests) a fixed map — the inferencer and report composer
/// don't know or care which.
pub trait NameResolver: Send + Sync {
    fn resolve_player_name(&self, player_id: &str) -> Option<String>;
    fn resolve_team_name(&self, team_id: &str) -> Option<String>;
}

/// A resolver backed by an in-memory map, for tests and small rosters.
#[derive(Debug, Clone, Default)]
pub struct StaticNameResolver {
    players: std::collections::HashMap<String, String>,
    teams: std::collections::HashMap<String, String>,
}

impl StaticNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_player(mut self, player_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.players.insert(player_id.into(), name.into());
        self
    }

    pub fn with_team(mut self, team_id: impl Into<String>, name: impl Into<String>) -> Self {
        self.teams.insert(team_id.into(), name.into());
        self
    }
}

impl NameResolver for StaticNameResolver {
    fn resolve_player_name(&self, player_id: &str) -> Option<String> {
        self.players.get(player_id).cloned()
    }

    fn resolve_team_name(&self, team_id: &str) -> Option<String> {
        self.teams.get(team_id).cloned()
    }
}
