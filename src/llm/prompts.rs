//! Prompt templates for the router decision and synthesis calls.

use crate::taxonomy::Intent;
use once_cell::sync::Lazy;

/// System prompt for router decision calls.
pub const ROUTER_SYSTEM_PROMPT: &str = "You are a routing component inside a tabletop-RPG \
assistant. You decide whether one specific knowledge source is needed to answer a player's \
question. Always respond with valid JSON only, no other text.";

/// System prompt for the final synthesis call.
pub const SYNTHESIS_SYSTEM_PROMPT: &str = "You are a helpful tabletop-RPG assistant. Answer the \
player's question using only the provided excerpts. Be concrete about numbers, rules, and names. \
If the excerpts do not contain the answer, say so.";

/// Comma-separated list of valid intent names, built once.
static INTENT_LIST: Lazy<String> = Lazy::new(|| {
    Intent::all()
        .iter()
        .map(|i| i.as_str())
        .collect::<Vec<_>>()
        .join(", ")
});

/// Builds the user prompt for one source's router decision.
#[must_use]
pub fn build_decision_prompt(
    source_name: &str,
    source_description: &str,
    user_query: &str,
    subject_id: &str,
) -> String {
    format!(
        r#"A player is asking a question about the character "{subject_id}".

Question:
{user_query}

Knowledge source under consideration: "{source_name}" — {source_description}

Decide whether this source is needed to answer the question. Respond in JSON with these fields:
- is_needed: boolean
- intent: one of [{intents}] (required when is_needed is true)
- entities: array of named things from the question relevant to this source (spells, items, NPCs)
- context_hints: array of short phrases describing what to look for in this source

Only output the JSON, nothing else."#,
        intents = &*INTENT_LIST,
    )
}

/// Builds the user prompt for the synthesis call.
///
/// `sections` pairs each contributing source name with its retrieved content;
/// empty sections should be filtered out by the caller.
#[must_use]
pub fn build_synthesis_prompt(user_query: &str, subject_id: &str, sections: &[(String, String)]) -> String {
    let mut prompt = format!(
        "Answer the following question about the character \"{subject_id}\".\n\nQuestion:\n{user_query}\n"
    );
    for (source, content) in sections {
        prompt.push_str("\n--- excerpts from ");
        prompt.push_str(source);
        prompt.push_str(" ---\n");
        prompt.push_str(content);
        prompt.push('\n');
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_prompt_lists_intents() {
        let prompt = build_decision_prompt("rulebook", "the game rules", "what does fireball do?", "yara");
        assert!(prompt.contains("spell_details"));
        assert!(prompt.contains("rulebook"));
        assert!(prompt.contains("yara"));
        assert!(prompt.contains("is_needed"));
    }

    #[test]
    fn test_synthesis_prompt_sections() {
        let sections = vec![
            ("rulebook".to_string(), "Fireball deals 8d6 fire damage.".to_string()),
            ("sheet".to_string(), "Yara is a level 5 wizard.".to_string()),
        ];
        let prompt = build_synthesis_prompt("can Yara cast fireball?", "yara", &sections);
        assert!(prompt.contains("8d6"));
        assert!(prompt.contains("level 5 wizard"));
        assert!(prompt.contains("excerpts from rulebook"));
    }

    #[test]
    fn test_synthesis_prompt_no_sections() {
        let prompt = build_synthesis_prompt("hello?", "yara", &[]);
        assert!(prompt.contains("hello?"));
        assert!(!prompt.contains("excerpts from"));
    }
}
