use crate::error::LobbyError;
use crate::game_manager::AppState;
use rand::Rng;
use shared::{
    CoreEvent, LobbyStatus, LobbyView, MatchFormed, MatchId, Origin, PlayerId, ServerMessage,
};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

/// No 0/O or 1/I.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Shortest code length accepted from config; 32^4 codes.
pub const MIN_CODE_LENGTH: usize = 4;

/// Colliding draws tolerated before `create` gives up.
const CODE_ATTEMPTS: usize = 16;

pub fn lobby_topic(code: &str) -> String {
    format!("private/{code}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lobby {
    pub code: String,
    pub host_id: PlayerId,
    pub guest_id: Option<PlayerId>,
    pub status: LobbyStatus,
    pub created_at: Instant,
    pub match_id: Option<MatchId>,
}

impl Lobby {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }

    fn view(&self, ttl: Duration, now: Instant) -> LobbyView {
        LobbyView {
            code: self.code.clone(),
            host_id: self.host_id,
            guest_id: self.guest_id,
            status: self.status,
            match_id: self.match_id,
            expires_in_secs: ttl
                .saturating_sub(now.saturating_duration_since(self.created_at))
                .as_secs(),
        }
    }
}

#[derive(Default)]
struct LobbyTable {
    by_code: HashMap<String, Lobby>,
    by_host: HashMap<PlayerId, String>,
}

impl LobbyTable {
    fn remove(&mut self, code: &str) -> Option<Lobby> {
        let lobby = self.by_code.remove(code)?;
        if self.by_host.get(&lobby.host_id).is_some_and(|c| c == code) {
            self.by_host.remove(&lobby.host_id);
        }
        Some(lobby)
    }

    /// Live lobby for `code`; an expired one is dropped on the way.
    fn live_mut(&mut self, code: &str, ttl: Duration, now: Instant) -> Result<&mut Lobby, LobbyError> {
        if self
            .by_code
            .get(code)
            .is_some_and(|lobby| lobby.is_expired(ttl, now))
        {
            self.remove(code);
        }
        self.by_code.get_mut(code).ok_or(LobbyError::NotFound)
    }
}

pub struct LobbyManager {
    table: Mutex<LobbyTable>,
    code_length: usize,
    ttl: Duration,
}

impl LobbyManager {
    pub fn new(code_length: usize, ttl: Duration) -> Self {
        if code_length < MIN_CODE_LENGTH {
            tracing::warn!(code_length, min = MIN_CODE_LENGTH, "Lobby code length too short, raising it");
        }
        Self {
            table: Mutex::new(LobbyTable::default()),
            code_length: code_length.max(MIN_CODE_LENGTH),
            ttl,
        }
    }

    /// Trims and upper-cases user input, rejecting anything that could not
    /// have been generated.
    pub fn normalize_code(&self, input: &str) -> Result<String, LobbyError> {
        let code = input.trim().to_ascii_uppercase();
        if code.len() != self.code_length || !code.bytes().all(|b| CODE_ALPHABET.contains(&b)) {
            return Err(LobbyError::InvalidCode);
        }
        Ok(code)
    }

    fn generate_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.code_length)
            .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
            .collect()
    }

    pub async fn create(&self, host_id: PlayerId, now: Instant) -> Result<LobbyView, LobbyError> {
        let mut table = self.table.lock().await;
        if let Some(old_code) = table.by_host.get(&host_id).cloned() {
            tracing::info!(host_id = %host_id, code = %old_code, "Replacing host's previous lobby");
            table.remove(&old_code);
        }

        let mut attempts = 0;
        let code = loop {
            let candidate = self.generate_code();
            let taken = table
                .by_code
                .get(&candidate)
                .is_some_and(|existing| !existing.is_expired(self.ttl, now));
            if !taken {
                // Clears an expired holder of the same code, if any.
                table.remove(&candidate);
                break candidate;
            }
            attempts += 1;
            if attempts >= CODE_ATTEMPTS {
                return Err(LobbyError::NoCodeAvailable);
            }
        };

        let lobby = Lobby {
            code: code.clone(),
            host_id,
            guest_id: None,
            status: LobbyStatus::Lobby,
            created_at: now,
            match_id: None,
        };
        let view = lobby.view(self.ttl, now);
        table.by_host.insert(host_id, code.clone());
        table.by_code.insert(code, lobby);
        Ok(view)
    }

    pub async fn join(
        &self,
        guest_id: PlayerId,
        code: &str,
        now: Instant,
    ) -> Result<LobbyView, LobbyError> {
        let code = self.normalize_code(code)?;
        let mut table = self.table.lock().await;
        let lobby = table.live_mut(&code, self.ttl, now)?;

        if lobby.status != LobbyStatus::Lobby {
            return Err(LobbyError::NotJoinable);
        }
        if lobby.host_id == guest_id {
            return Err(LobbyError::OwnLobby);
        }
        if lobby.guest_id.is_some_and(|existing| existing != guest_id) {
            return Err(LobbyError::GuestAlreadyPresent);
        }
        lobby.guest_id = Some(guest_id);
        Ok(lobby.view(self.ttl, now))
    }

    /// Moves the lobby to STARTED and hands back the new match id and guest.
    pub async fn start(
        &self,
        host_id: PlayerId,
        code: &str,
        now: Instant,
    ) -> Result<(MatchId, PlayerId), LobbyError> {
        let code = self.normalize_code(code)?;
        let mut table = self.table.lock().await;
        let lobby = table.live_mut(&code, self.ttl, now)?;

        if lobby.host_id != host_id {
            return Err(LobbyError::NotHost);
        }
        if lobby.status != LobbyStatus::Lobby {
            return Err(LobbyError::AlreadyStarted);
        }
        let guest_id = lobby.guest_id.ok_or(LobbyError::NoGuest)?;

        let match_id = Uuid::new_v4();
        lobby.status = LobbyStatus::Started;
        lobby.match_id = Some(match_id);
        Ok((match_id, guest_id))
    }

    async fn reopen(&self, code: &str) {
        if let Some(lobby) = self.table.lock().await.by_code.get_mut(code) {
            lobby.status = LobbyStatus::Lobby;
            lobby.match_id = None;
        }
    }

    pub async fn get(
        &self,
        requester: PlayerId,
        code: &str,
        now: Instant,
    ) -> Result<LobbyView, LobbyError> {
        let code = self.normalize_code(code)?;
        let mut table = self.table.lock().await;
        let lobby = table.live_mut(&code, self.ttl, now)?;
        if lobby.host_id != requester && lobby.guest_id != Some(requester) {
            return Err(LobbyError::Forbidden);
        }
        Ok(lobby.view(self.ttl, now))
    }

    pub async fn sweep_expired(&self, now: Instant) -> Vec<String> {
        let mut table = self.table.lock().await;
        let expired: Vec<String> = table
            .by_code
            .values()
            .filter(|lobby| lobby.is_expired(self.ttl, now))
            .map(|lobby| lobby.code.clone())
            .collect();
        for code in &expired {
            table.remove(code);
        }
        expired
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.table.lock().await.by_code.len()
    }
}

impl AppState {
    pub async fn create_lobby(&self, host_id: PlayerId) -> Result<LobbyView, LobbyError> {
        let view = self.lobbies.create(host_id, Instant::now()).await?;
        tracing::info!(host_id = %host_id, code = %view.code, "Private lobby created");
        Ok(view)
    }

    pub async fn join_lobby(&self, guest_id: PlayerId, code: &str) -> Result<LobbyView, LobbyError> {
        let view = self.lobbies.join(guest_id, code, Instant::now()).await?;
        tracing::info!(guest_id = %guest_id, code = %view.code, "Guest joined private lobby");
        self.hub
            .publish(&lobby_topic(&view.code), ServerMessage::LobbyUpdate(view.clone()));
        Ok(view)
    }

    pub async fn start_lobby(&self, host_id: PlayerId, code: &str) -> Result<MatchId, LobbyError> {
        let code = self.lobbies.normalize_code(code)?;
        let (match_id, guest_id) = self.lobbies.start(host_id, &code, Instant::now()).await?;

        let event = CoreEvent::MatchFormed(MatchFormed {
            match_id,
            player_one: host_id,
            player_two: guest_id,
            ranked: false,
            origin: Origin::Private1v1,
        });
        if let Err(e) = self.events.publish(event) {
            tracing::error!(code = %code, match_id = %match_id, error = %e, "Failed to publish private match, reopening lobby");
            self.lobbies.reopen(&code).await;
            return Err(e.into());
        }

        tracing::info!(code = %code, match_id = %match_id, host_id = %host_id, guest_id = %guest_id, "Private match started");
        self.hub.publish(
            &lobby_topic(&code),
            ServerMessage::PrivateMatchStarted { game_id: match_id },
        );
        Ok(match_id)
    }

    pub async fn get_lobby(&self, requester: PlayerId, code: &str) -> Result<LobbyView, LobbyError> {
        self.lobbies.get(requester, code, Instant::now()).await
    }

    pub async fn sweep_expired_lobbies(&self) -> usize {
        let expired = self.lobbies.sweep_expired(Instant::now()).await;
        for code in &expired {
            tracing::info!(code = %code, "Expired private lobby removed");
            self.hub.close(&lobby_topic(code));
        }
        expired.len()
    }
}
