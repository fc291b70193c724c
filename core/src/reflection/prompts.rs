//! Prompt assembly for the reflection engine.
//!
//! Prompts stay in character: the agent analyzes its own conversation to
//! populate its memory, it is not a neutral annotator.

use crate::generation::ChatMessage;
use crate::memory::{MemoryItem, MemoryKind};
use std::fmt::Write as _;

fn render_recalled(recalled: &[MemoryItem]) -> String {
    if recalled.is_empty() {
        return "(no earlier memories yet)".to_string();
    }
    let mut out = String::new();
    for item in recalled {
        let _ = writeln!(out, "- {}", item.text);
    }
    out
}

/// System + user messages for one tier derivation.
#[allow(clippy::too_many_arguments)]
pub(super) fn tier_messages(
    speaker: &str,
    counterpart: &str,
    subject: &str,
    target: MemoryKind,
    seed: &str,
    recalled: &[MemoryItem],
    count: usize,
) -> Vec<ChatMessage> {
    let system = ChatMessage::system(format!(
        "You are {speaker}, looking back over your most recent phone call with \
         {counterpart}. You are distilling what you noticed into your own memory, \
         which later conversations will draw on. Observe carefully and answer \
         only in the requested JSON."
    ));

    let user = match target {
        MemoryKind::Fact => ChatMessage::user(format!(
            "From the transcript below, state {count} objective, atomic factual \
             observations about {subject}. Each should stand on its own and record \
             something that was actually said or happened.\n\n\
             Transcript:\n{seed}\n\n\
             Respond with JSON only, in the form {{\"items\": [\"...\"]}}."
        )),
        MemoryKind::Reflection => ChatMessage::user(format!(
            "You just noted these new facts about {subject}:\n{seed}\n\n\
             Earlier facts you remember about {subject}:\n{}\n\n\
             What patterns or insights emerge? State {count} interpretive \
             reflections about {subject} - readings of mood, motive, or change, \
             not restatements of the facts.\n\n\
             Respond with JSON only, in the form {{\"items\": [\"...\"]}}.",
            render_recalled(recalled)
        )),
        MemoryKind::DeepReflection => ChatMessage::user(format!(
            "You just formed these new reflections about {subject}:\n{seed}\n\n\
             Earlier reflections you remember about {subject}:\n{}\n\n\
             Step back further. State {count} deep reflections about {subject}: \
             what these say about who they are becoming, what they value, and how \
             your relationship is evolving. One or two sentences each.\n\n\
             Respond with JSON only, in the form {{\"items\": [\"...\"]}}.",
            render_recalled(recalled)
        )),
    };

    vec![system, user]
}

/// Messages for the conservative description refresh.
pub(super) fn description_messages(
    speaker: &str,
    subject: &str,
    is_self: bool,
    current: &str,
    summary: &str,
    recalled: &[MemoryItem],
) -> Vec<ChatMessage> {
    let whose = if is_self {
        "your own".to_string()
    } else {
        format!("your picture of {subject}")
    };

    let system = ChatMessage::system(format!(
        "You are {speaker}, maintaining {whose} description. Be extremely \
         conservative: change the text only where something directly conflicts \
         or something genuinely important is new. Keep roughly the same length. \
         Whatever you return replaces the description verbatim, so return the \
         description text and nothing else."
    ));

    let user = ChatMessage::user(format!(
        "Current description of {subject}:\n{current}\n\n\
         What the latest conversation surfaced:\n{summary}\n\
         Deep reflections about {subject} worth weighing:\n{}\n\
         Return the updated description. If nothing needs to change, return the \
         current description exactly as it is.",
        render_recalled(recalled)
    ));

    vec![system, user]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fact_tier_prompt_carries_transcript() {
        let messages = tier_messages(
            "Margot",
            "Theo",
            "Theo",
            MemoryKind::Fact,
            "Theo: I bought a trumpet.",
            &[],
            3,
        );
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("I bought a trumpet"));
        assert!(messages[1].content.contains("\"items\""));
    }

    #[test]
    fn test_reflection_prompt_mentions_empty_recall() {
        let messages = tier_messages(
            "Margot",
            "Theo",
            "Margot",
            MemoryKind::Reflection,
            "- new fact",
            &[],
            3,
        );
        assert!(messages[1].content.contains("no earlier memories yet"));
    }
}
