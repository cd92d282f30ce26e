//! Conversation assembly: system prompt + history + new user message.

use serde::{Deserialize, Serialize};

/// Default system prompt used when none is configured or supplied.
pub const BASE_SYSTEM_PROMPT: &str = "You are a helpful AI assistant with long-term memory. \
You can remember past conversations and use that context to provide \
personalized responses. Be concise, helpful, and friendly.";

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One role-tagged message unit in a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    role: Role,
    content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A persisted history entry as read from storage: free-form role string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

impl HistoryEntry {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Builds prompts, falling back to a default system prompt.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    default_system_prompt: String,
}

impl PromptAssembler {
    pub fn new(default_system_prompt: impl Into<String>) -> Self {
        Self {
            default_system_prompt: default_system_prompt.into(),
        }
    }

    pub fn default_system_prompt(&self) -> &str {
        &self.default_system_prompt
    }

    /// Assemble the ordered turn sequence sent to the provider.
    ///
    /// The result is `[system, history..., user(new_user_message)]`. History
    /// entries whose role is neither `user` nor `assistant` are skipped.
    /// Nothing is truncated and message content is not inspected.
    pub fn assemble(
        &self,
        system_prompt: Option<&str>,
        history: &[HistoryEntry],
        new_user_message: &str,
    ) -> Vec<ConversationTurn> {
        let system = match system_prompt {
            Some(prompt) if !prompt.trim().is_empty() => prompt,
            _ => self.default_system_prompt.as_str(),
        };

        let mut turns = Vec::with_capacity(history.len() + 2);
        turns.push(ConversationTurn::system(system));
        turns.extend(history.iter().filter_map(|entry| match entry.role.as_str() {
            "user" => Some(ConversationTurn::user(entry.content.clone())),
            "assistant" => Some(ConversationTurn::assistant(entry.content.clone())),
            _ => None,
        }));
        turns.push(ConversationTurn::user(new_user_message));
        turns
    }
}

impl Default for PromptAssembler {
    fn default() -> Self {
        Self::new(BASE_SYSTEM_PROMPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_orders_turns() {
        let history = vec![
            HistoryEntry::new("user", "a"),
            HistoryEntry::new("assistant", "b"),
        ];
        let turns = PromptAssembler::default().assemble(Some("S"), &history, "c");

        assert_eq!(
            turns,
            vec![
                ConversationTurn::system("S"),
                ConversationTurn::user("a"),
                ConversationTurn::assistant("b"),
                ConversationTurn::user("c"),
            ]
        );
    }

    #[test]
    fn test_assemble_without_history() {
        let turns = PromptAssembler::default().assemble(Some("S"), &[], "hi");
        assert_eq!(
            turns,
            vec![ConversationTurn::system("S"), ConversationTurn::user("hi")]
        );
    }

    #[test]
    fn test_missing_system_prompt_uses_default() {
        let assembler = PromptAssembler::new("default prompt");
        let turns = assembler.assemble(None, &[], "hi");
        assert_eq!(turns[0], ConversationTurn::system("default prompt"));

        let turns = assembler.assemble(Some("   "), &[], "hi");
        assert_eq!(turns[0], ConversationTurn::system("default prompt"));
    }

    #[test]
    fn test_unknown_roles_are_skipped() {
        let history = vec![
            HistoryEntry::new("user", "a"),
            HistoryEntry::new("tool", "ignored"),
            HistoryEntry::new("system", "also ignored"),
            HistoryEntry::new("Assistant", "case matters"),
            HistoryEntry::new("assistant", "b"),
        ];
        let turns = PromptAssembler::default().assemble(Some("S"), &history, "c");

        let contents: Vec<_> = turns.iter().map(ConversationTurn::content).collect();
        assert_eq!(contents, vec!["S", "a", "b", "c"]);
    }

    #[test]
    fn test_blank_user_message_passes_through() {
        let turns = PromptAssembler::default().assemble(Some("S"), &[], "");
        assert_eq!(turns.last(), Some(&ConversationTurn::user("")));
    }

    #[test]
    fn test_history_is_not_truncated() {
        let history: Vec<_> = (0..500)
            .map(|i| HistoryEntry::new(if i % 2 == 0 { "user" } else { "assistant" }, i.to_string()))
            .collect();
        let turns = PromptAssembler::default().assemble(None, &history, "next");
        assert_eq!(turns.len(), 502);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ConversationTurn::assistant("x")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"x"}"#);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn role_strategy() -> impl Strategy<Value = String> {
            prop_oneof![
                Just("user".to_string()),
                Just("assistant".to_string()),
                "[a-z]{1,8}",
            ]
        }

        proptest! {
            /// Output is always system first, user last, with recognised history in order.
            #[test]
            fn prop_prompt_shape(
                history in proptest::collection::vec((role_strategy(), ".{0,20}"), 0..30),
                message in ".{0,40}",
            ) {
                let history: Vec<_> = history
                    .into_iter()
                    .map(|(role, content)| HistoryEntry::new(role, content))
                    .collect();
                let turns = PromptAssembler::default().assemble(Some("S"), &history, &message);

                prop_assert_eq!(turns[0].role(), Role::System);
                prop_assert_eq!(turns.last().unwrap(), &ConversationTurn::user(message.clone()));

                let kept: Vec<_> = history
                    .iter()
                    .filter(|e| e.role == "user" || e.role == "assistant")
                    .map(|e| e.content.as_str())
                    .collect();
                let middle: Vec<_> = turns[1..turns.len() - 1]
                    .iter()
                    .map(ConversationTurn::content)
                    .collect();
                prop_assert_eq!(middle, kept);
                prop_assert_eq!(
                    turns.iter().filter(|t| t.role() == Role::System).count(),
                    1
                );
            }
        }
    }
}
