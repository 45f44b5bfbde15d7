//! Conversation-related types.

use agent_experts_model::{AssistantMessage, ModelMessage, ToolCallResult};

/// Represents a conversation.
///
/// Every [`Agent::run`](crate::Agent::run) owns a fresh conversation, so
/// concurrent runs of the same agent never see each other's messages.
#[derive(Clone, Default, Debug)]
pub struct Conversation {
    pub(crate) items: Vec<Item>,
}

impl Conversation {
    /// Creates a conversation starting with the given system instruction.
    ///
    /// An empty instruction produces an empty conversation.
    pub fn with_instruction(instruction: &str) -> Self {
        let mut conversation = Self::default();
        if !instruction.trim().is_empty() {
            conversation.items.push(Item {
                msg: ModelMessage::System(instruction.to_owned()),
                transcript: String::new(),
            });
        }
        conversation
    }

    /// Returns the items of this conversation in order.
    #[inline]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub(crate) fn push_user_input(&mut self, input: String) {
        self.items.push(Item {
            msg: ModelMessage::User(input.clone()),
            transcript: input,
        });
    }

    pub(crate) fn push_assistant_message(&mut self, msg: AssistantMessage) {
        let transcript = msg.content.clone();
        self.items.push(Item {
            msg: ModelMessage::Assistant(msg),
            transcript,
        });
    }

    pub(crate) fn push_tool_result(&mut self, result: ToolCallResult) {
        self.items.push(Item {
            msg: ModelMessage::Tool(result),
            transcript: String::new(),
        });
    }

    pub(crate) fn messages(&self) -> Vec<ModelMessage> {
        self.items.iter().map(|i| i.msg.clone()).collect()
    }
}

/// An item in the conversation.
#[derive(Clone, Debug)]
pub struct Item {
    pub(crate) msg: ModelMessage,
    pub(crate) transcript: String,
}

impl Item {
    /// Returns the message of this item.
    #[inline]
    pub fn message(&self) -> &ModelMessage {
        &self.msg
    }

    /// Returns the transcript of this item.
    ///
    /// The transcript is a string representation of the message item,
    /// which can be exported later. But transcript alone is not enough
    /// to reconstruct the message item.
    #[inline]
    pub fn transcript(&self) -> &str {
        &self.transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_instruction_is_skipped() {
        assert!(Conversation::with_instruction("  ").items().is_empty());

        let mut conversation = Conversation::with_instruction("Be helpful.");
        conversation.push_user_input("Hi".to_owned());
        assert_eq!(
            conversation.messages(),
            vec![
                ModelMessage::System("Be helpful.".to_owned()),
                ModelMessage::User("Hi".to_owned()),
            ]
        );
        assert_eq!(conversation.items()[1].transcript(), "Hi");
    }
}
