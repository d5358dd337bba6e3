use crate::state::ContextEntry;

/// Number of most recent exchanges replayed to the model.
pub const CONTEXT_WINDOW: usize = 5;

pub const SYSTEM_INSTRUCTION: &str = "You are a helpful finance assistant. Focus on personal finance, investing, budgeting, savings, and financial planning. Provide practical, actionable advice. Keep responses concise and helpful.";

/// Build the prompt for `question` from the tail of the conversation context.
pub fn build_prompt(context: &[ContextEntry], question: &str) -> String {
    let mut prompt = String::new();

    let recent = &context[context.len().saturating_sub(CONTEXT_WINDOW)..];
    if !recent.is_empty() {
        let turns: Vec<String> = recent
            .iter()
            .map(|entry| format!("User: {} | Assistant: {}", entry.question, entry.answer))
            .collect();
        prompt.push_str("Previous conversation context: ");
        prompt.push_str(&turns.join(" | "));
        prompt.push_str("\n\n");
    }

    prompt.push_str(SYSTEM_INSTRUCTION);
    prompt.push_str("\n\nUser question: ");
    prompt.push_str(question);

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(i: usize) -> ContextEntry {
        ContextEntry {
            question: format!("q{i}"),
            answer: format!("a{i}"),
        }
    }

    #[test]
    fn no_context_means_no_prefix() {
        let prompt = build_prompt(&[], "What is an index fund?");
        assert!(prompt.starts_with(SYSTEM_INSTRUCTION));
        assert!(prompt.ends_with("\n\nUser question: What is an index fund?"));
        assert!(!prompt.contains("Previous conversation context"));
    }

    #[test]
    fn single_entry_is_rendered() {
        let prompt = build_prompt(&[entry(1)], "next");
        assert!(prompt.starts_with("Previous conversation context: User: q1 | Assistant: a1\n\n"));
    }

    #[test]
    fn only_last_five_entries_are_used() {
        let context: Vec<ContextEntry> = (0..8).map(entry).collect();
        let prompt = build_prompt(&context, "next");

        let expected = "Previous conversation context: \
            User: q3 | Assistant: a3 | User: q4 | Assistant: a4 | \
            User: q5 | Assistant: a5 | User: q6 | Assistant: a6 | \
            User: q7 | Assistant: a7\n\n";
        assert!(prompt.starts_with(expected));
        assert!(!prompt.contains("q2"));
        assert!(!prompt.contains("q0"));
    }
}
