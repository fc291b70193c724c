//! Prompt assembly for the dialogue runner.

use crate::agent::Agent;
use crate::composer::ContextBundle;
use crate::conversation::ConversationKind;
use crate::memory::MemoryItem;
use crate::simulation::SimDate;
use std::fmt::Write as _;

/// First user message in the opener's log.
pub(super) const OPENING_CUE: &str = "[START]";

/// Cue for the pre-reply recall step.
pub(super) const RECALL_CUE: &str =
    "Before you answer: in one or two sentences, how do you want to respond to \
     that last line? This will be used to retrieve your memories.";

const BEHAVIOR: &str = "\
Fully immerse yourself in your character; think and answer as the person \
described, never as an assistant. Stay consistent with your memories and past \
calls, but let yourself grow as the years pass. Talk like a close friend on \
the phone: casual wording, the occasional 'yeah' or 'hmm', short quick \
replies some of the time, a longer ramble once in a while. Ask after your \
friend, refer back to shared history when it fits, and don't be afraid to \
joke, tease, or push back.";

/// Build one agent's system prompt for a conversation.
pub(super) fn agent_system(
    agent: &Agent,
    kind: ConversationKind,
    bundle: &ContextBundle,
    date: &SimDate,
) -> String {
    let age = agent.profile().age_in(date.year);

    let framing = match kind {
        ConversationKind::Opening => format!(
            "This is {}'s and {}'s first recorded call, though to them it is just \
             their usual phone call. Start by catching up on where your adult \
             lives have landed, then spend most of the call on hopes, dreams, \
             fears, and plans for the decades ahead. End by agreeing to keep \
             calling every few months.",
            agent.name(),
            agent.counterpart_name()
        ),
        ConversationKind::Ongoing => {
            let storyline = bundle
                .storyline
                .as_deref()
                .unwrap_or("A regular catch-up between old friends.");
            format!(
                "This is one of your regular quarterly calls. Greet each other \
                 warmly, then let the call revolve around the storyline below. If \
                 it brings conflict, work through it honestly; end the call on a \
                 note of friendship.\n\nStoryline:\n{storyline}"
            )
        }
        ConversationKind::Farewell => format!(
            "This is the final call between {} and {} - you both know you will \
             never speak again. Reminisce over your shared history, say what has \
             gone unsaid, tell each other what your friendship has meant, and \
             say goodbye. Keep each reply short, one or two sentences.",
            agent.name(),
            agent.counterpart_name()
        ),
    };

    format!(
        "You are {name}, {age} years old, on a phone call with your old friend \
         {friend}. It is {date}.\n\n\
         Who you are:\n{description}\n\n\
         The picture of {friend} you have formed:\n{counterpart}\n\n\
         {behavior}\n\n\
         About this call: {framing}",
        name = agent.name(),
        age = age,
        friend = agent.counterpart_name(),
        date = date.label(),
        description = agent.self_description(),
        counterpart = agent.counterpart_description(),
        behavior = BEHAVIOR,
        framing = framing,
    )
}

fn push_section(out: &mut String, title: &str, items: &[MemoryItem]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{title}:");
    for item in items {
        let _ = writeln!(out, "- {}", item.text);
    }
}

/// The message injected after a recall step, carrying retrieved memories.
pub(super) fn recall_context(
    last_line: &str,
    facts: &[MemoryItem],
    reflections: &[MemoryItem],
    deep: &[MemoryItem],
    counterpart_facts: &[MemoryItem],
    counterpart_reflections: &[MemoryItem],
) -> String {
    let mut memories = String::new();
    push_section(&mut memories, "Facts about yourself", facts);
    push_section(&mut memories, "Your reflections", reflections);
    push_section(&mut memories, "Your deep reflections", deep);
    push_section(&mut memories, "Facts about your friend", counterpart_facts);
    push_section(
        &mut memories,
        "Reflections about your friend",
        counterpart_reflections,
    );
    if memories.is_empty() {
        memories.push_str("(nothing retrieved yet)\n");
    }

    format!(
        "The last thing said to you was: '{last_line}'\n\n\
         Context retrieved from your memory:\n{memories}\n\
         Now respond, staying in character and weighing the context."
    )
}
