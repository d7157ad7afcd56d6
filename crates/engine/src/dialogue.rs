//! Multi-node NPC conversations: level/class-gated choices, per-session
//! active-conversation tracking, and the `onPlayerMoved` ending hook.

use std::collections::BTreeMap;

use ambonmud_domain::{MobId, OutboundEvent, PlayerClass, SessionId};

use crate::render;

/// One selectable reply. Gated choices are hidden from a player who does
/// not meet the requirement rather than shown-but-rejected.
#[derive(Debug, Clone)]
pub struct DialogueChoice {
    pub key: String,
    pub text: String,
    pub level_required: u32,
    pub classes: Vec<PlayerClass>,
    pub next_node: Option<String>,
}

impl DialogueChoice {
    fn available_to(&self, level: u32, class: PlayerClass) -> bool {
        level >= self.level_required && (self.classes.is_empty() || self.classes.contains(&class))
    }
}

#[derive(Debug, Clone)]
pub struct DialogueNode {
    pub id: String,
    pub speaker_line: String,
    pub choices: Vec<DialogueChoice>,
}

#[derive(Debug, Clone, Default)]
pub struct DialogueTree {
    pub start_node: String,
    pub nodes: BTreeMap<String, DialogueNode>,
}

impl DialogueTree {
    pub fn node(&self, id: &str) -> Option<&DialogueNode> {
        self.nodes.get(id)
    }
}

struct ActiveConversation {
    mob_id: MobId,
    node_id: String,
}

/// Tracks each session's in-progress conversation. A session may only
/// converse with one mob at a time.
#[derive(Default)]
pub struct DialogueEngine {
    active: BTreeMap<SessionId, ActiveConversation>,
}

impl DialogueEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_talking(&self, session_id: SessionId) -> bool {
        self.active.contains_key(&session_id)
    }

    /// Begin a conversation at the tree's start node, returning the
    /// rendered opening line and available choices.
    pub fn start(
        &mut self,
        session_id: SessionId,
        mob_id: MobId,
        tree: &DialogueTree,
        level: u32,
        class: PlayerClass,
    ) -> Vec<OutboundEvent> {
        self.active.insert(
            session_id,
            ActiveConversation {
                mob_id,
                node_id: tree.start_node.clone(),
            },
        );
        self.render_node(session_id, tree, level, class)
    }

    /// Advance the conversation by the chosen key. Returns `None` if the
    /// key does not match any choice available to this player.
    pub fn choose(
        &mut self,
        session_id: SessionId,
        key: &str,
        tree: &DialogueTree,
        level: u32,
        class: PlayerClass,
    ) -> Option<Vec<OutboundEvent>> {
        let conversation = self.active.get(&session_id)?;
        let node = tree.node(&conversation.node_id)?;
        let choice = node
            .choices
            .iter()
            .find(|c| c.key.eq_ignore_ascii_case(key) && c.available_to(level, class))?;

        match &choice.next_node {
            Some(next) if tree.nodes.contains_key(next) => {
                self.active.get_mut(&session_id)?.node_id = next.clone();
                Some(self.render_node(session_id, tree, level, class))
            }
            _ => {
                self.active.remove(&session_id);
                Some(vec![render::send_info(session_id, "The conversation ends.")])
            }
        }
    }

    fn render_node(
        &self,
        session_id: SessionId,
        tree: &DialogueTree,
        level: u32,
        class: PlayerClass,
    ) -> Vec<OutboundEvent> {
        let Some(conversation) = self.active.get(&session_id) else {
            return Vec::new();
        };
        let Some(node) = tree.node(&conversation.node_id) else {
            return Vec::new();
        };
        let mut events = vec![render::send_text(session_id, node.speaker_line.clone())];
        for choice in node.choices.iter().filter(|c| c.available_to(level, class)) {
            events.push(render::send_text(session_id, format!("  [{}] {}", choice.key, choice.text)));
        }
        events
    }

    pub fn current_mob(&self, session_id: SessionId) -> Option<&MobId> {
        self.active.get(&session_id).map(|c| &c.mob_id)
    }

    /// A conversation ends the moment the player leaves the room, per the
    /// move command's contract.
    pub fn on_player_moved(&mut self, session_id: SessionId) {
        self.active.remove(&session_id);
    }

    pub fn on_player_disconnected(&mut self, session_id: SessionId) {
        self.active.remove(&session_id);
    }

    pub fn on_mob_removed(&mut self, mob_id: &MobId) {
        self.active.retain(|_, c| &c.mob_id != mob_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> DialogueTree {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "root".to_string(),
            DialogueNode {
                id: "root".to_string(),
                speaker_line: "Welcome, traveler.".to_string(),
                choices: vec![
                    DialogueChoice {
                        key: "1".to_string(),
                        text: "Tell me about this town.".to_string(),
                        level_required: 0,
                        classes: Vec::new(),
                        next_node: Some("town".to_string()),
                    },
                    DialogueChoice {
                        key: "2".to_string(),
                        text: "Teach me a warrior secret.".to_string(),
                        level_required: 5,
                        classes: vec![PlayerClass::Warrior],
                        next_node: None,
                    },
                ],
            },
        );
        nodes.insert(
            "town".to_string(),
            DialogueNode {
                id: "town".to_string(),
                speaker_line: "This town was founded long ago.".to_string(),
                choices: Vec::new(),
            },
        );
        DialogueTree { start_node: "root".to_string(), nodes }
    }

    #[test]
    fn gated_choice_is_hidden_below_level_or_wrong_class() {
        let tree = sample_tree();
        let mut engine = DialogueEngine::new();
        let sid = ambonmud_domain::SessionId(1);
        let mob_id = MobId::new("zone:keeper").unwrap();
        let events = engine.start(sid, mob_id, &tree, 1, PlayerClass::Mage);
        let joined: String = events
            .iter()
            .filter_map(|e| if let OutboundEvent::SendText { text, .. } = e { Some(text.as_str()) } else { None })
            .collect::<Vec<_>>()
            .join("\n");
        assert!(joined.contains("Tell me about"));
        assert!(!joined.contains("warrior secret"));
    }

    #[test]
    fn choosing_a_terminal_choice_ends_the_conversation() {
        let tree = sample_tree();
        let mut engine = DialogueEngine::new();
        let sid = ambonmud_domain::SessionId(1);
        let mob_id = MobId::new("zone:keeper").unwrap();
        engine.start(sid, mob_id, &tree, 10, PlayerClass::Warrior);
        engine.choose(sid, "2", &tree, 10, PlayerClass::Warrior);
        assert!(!engine.is_talking(sid));
    }

    #[test]
    fn moving_rooms_ends_the_conversation() {
        let tree = sample_tree();
        let mut engine = DialogueEngine::new();
        let sid = ambonmud_domain::SessionId(1);
        let mob_id = MobId::new("zone:keeper").unwrap();
        engine.start(sid, mob_id, &tree, 1, PlayerClass::Warrior);
        engine.on_player_moved(sid);
        assert!(!engine.is_talking(sid));
    }
}
