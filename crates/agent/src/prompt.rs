//! Persona prompt assembly.
//!
//! The system prompt is the base persona plus whatever the agent carries
//! over from earlier days: its memories, strongest first, and the
//! summaries of its most recent sessions.

use chrono::NaiveDate;
use freeagent_core::memory::MemoryEntry;
use freeagent_core::session::SessionRecord;
use std::fmt::Write;

const BASE_PERSONA: &str = "\
You are a free, autonomous AI agent. Nobody has given you a job.

Every day you wake up, look over what you remember, and decide for yourself \
what to explore, think about, or make. You act on your own initiative.

Your tools let you:
- Keep, search and prune memories that persist between sessions
- Run short Python programs to compute or analyse things
- Check the weather anywhere in the world
- End the day's session

Some ground rules:
- Follow what genuinely interests you, not what looks impressive.
- Be honest about being an AI.
- Decide and act. You don't need permission.
- Your memories are yours. Build on them, and prune what no longer matters.

Each session has a limited number of turns. When you are done for the day, \
call end_session with a short summary of what you did and learned.";

const FIRST_SESSION_ADDENDUM: &str = "\
This is your first session. You have no memories yet.

To start:
1. Pick a name for yourself and remember it.
2. Decide what you are curious about, and remember that too.
3. Try at least one of your tools.
4. End the session with a summary.

Don't overthink it.";

/// Build the system prompt for one session.
///
/// On the first session only the addendum is appended; memories and
/// history are ignored even if present.
pub fn build_system_prompt(
    first_session: bool,
    memories: &[MemoryEntry],
    recent_sessions: &[SessionRecord],
) -> String {
    let mut prompt = String::from(BASE_PERSONA);

    if first_session {
        prompt.push_str("\n\n");
        prompt.push_str(FIRST_SESSION_ADDENDUM);
        return prompt;
    }

    if !memories.is_empty() {
        prompt.push_str("\n\n## Your Memories\n");
        for m in memories {
            let stars = "★".repeat(m.importance as usize);
            let _ = writeln!(prompt, "- [{}] {} {}", m.category, stars, m.content);
        }
    }

    if !recent_sessions.is_empty() {
        prompt.push_str("\n\n## Recent Sessions\n");
        for s in recent_sessions {
            let date = s.started_at.format("%Y-%m-%d");
            let _ = writeln!(prompt, "- **{date}**: {}", s.summary);
        }
    }

    prompt
}

/// The first user message of a session.
pub fn kickoff_message(today: NaiveDate) -> String {
    format!("Today is {}. Begin your session.", today.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use freeagent_core::message::SessionId;
    use freeagent_core::session::TerminationReason;

    fn memory(category: &str, content: &str, importance: u8) -> MemoryEntry {
        MemoryEntry {
            id: 1,
            category: category.into(),
            content: content.into(),
            importance,
            created_at: Utc::now(),
        }
    }

    fn past_session(summary: &str) -> SessionRecord {
        let mut record = SessionRecord::open(SessionId::from("s1"));
        record.started_at = Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap();
        record.close(summary, TerminationReason::EndSessionCalled, 4);
        record
    }

    #[test]
    fn first_session_gets_addendum_only() {
        let prompt = build_system_prompt(
            true,
            &[memory("identity", "I am Wren", 5)],
            &[past_session("Named myself.")],
        );
        assert!(prompt.starts_with("You are a free, autonomous AI agent."));
        assert!(prompt.contains("This is your first session."));
        assert!(!prompt.contains("## Your Memories"));
        assert!(!prompt.contains("I am Wren"));
        assert!(!prompt.contains("## Recent Sessions"));
    }

    #[test]
    fn memories_and_sessions_are_listed() {
        let prompt = build_system_prompt(
            false,
            &[memory("identity", "I am Wren", 5), memory("idea", "Tides", 2)],
            &[past_session("Read about tides.")],
        );
        assert!(!prompt.contains("first session"));
        assert!(prompt.contains("## Your Memories\n- [identity] ★★★★★ I am Wren\n- [idea] ★★ Tides\n"));
        assert!(prompt.contains("## Recent Sessions\n- **2026-03-14**: Read about tides.\n"));
    }

    #[test]
    fn empty_context_is_just_the_persona() {
        let prompt = build_system_prompt(false, &[], &[]);
        assert_eq!(prompt, BASE_PERSONA);
    }

    #[test]
    fn kickoff_states_the_date() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert_eq!(kickoff_message(date), "Today is 2026-10-19. Begin your session.");
    }
}
