use crate::types::{LobbySlotView, LobbyState, StartPlayer};

/// Fixed-size slot table filled while no match is live.
#[derive(Clone, Debug)]
pub struct Lobby {
    slots: Vec<Option<String>>,
    colors: Vec<String>,
}

impl Lobby {
    pub fn new(colors: &[String]) -> Self {
        Self {
            slots: vec![None; colors.len()],
            colors: colors.to_vec(),
        }
    }

    pub fn slot_of(&self, client_id: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_deref() == Some(client_id))
    }

    /// Binds a connection to an open slot. Taken slots, unknown slots and
    /// already-seated connections are refused.
    pub fn join(&mut self, slot: usize, client_id: &str) -> bool {
        if self.slot_of(client_id).is_some() {
            return false;
        }
        match self.slots.get_mut(slot) {
            Some(entry) if entry.is_none() => {
                *entry = Some(client_id.to_string());
                true
            }
            _ => false,
        }
    }

    pub fn leave(&mut self, client_id: &str) -> Option<usize> {
        let slot = self.slot_of(client_id)?;
        self.slots[slot] = None;
        Some(slot)
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Occupied slots in slot order.
    pub fn start_players(&self) -> Vec<StartPlayer> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, client_id)| {
                client_id.as_ref().map(|client_id| StartPlayer {
                    slot,
                    client_id: client_id.clone(),
                    color: self.colors[slot].clone(),
                })
            })
            .collect()
    }

    pub fn state(&self, message: Option<String>) -> LobbyState {
        LobbyState {
            slots: self
                .slots
                .iter()
                .enumerate()
                .map(|(id, client_id)| LobbySlotView {
                    id,
                    joined: client_id.is_some(),
                    client_id: client_id.clone(),
                    color: self.colors[id].clone(),
                })
                .collect(),
            message,
        }
    }
}
