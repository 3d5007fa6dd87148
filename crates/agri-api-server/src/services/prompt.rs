use crate::session::{Message, Role};

/// History turns included in the chat prompt.
const HISTORY_WINDOW: usize = 6;

/// Assemble the chat prompt: instructions, retrieved context, recent
/// history, the current question and the target-language directive.
pub fn build_chat_prompt(
    message: &str,
    context: &str,
    history: &[Message],
    language: &str,
) -> String {
    let tail = history.len().saturating_sub(HISTORY_WINDOW);
    let history_block = history[tail..]
        .iter()
        .map(|msg| {
            let speaker = match msg.role {
                Role::User => "User",
                Role::Assistant => "Assistant",
            };
            format!("{}: {}", speaker, msg.content)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an expert agricultural assistant for an e-commerce app.
**Instructions:**
1.  **Prioritize the Knowledge Base:** First, carefully analyze the "Retrieved Context from Knowledge Base" to answer the user's question. Base your answer strictly on this information if it's relevant.
2.  **Fallback to General Knowledge:** If the retrieved context is not sufficient or doesn't contain the answer, then use your general knowledge to provide a helpful response.
3.  **Language:** The user's preferred language is '{language}'. Please respond in this language. If the question itself is in a different language, prioritize responding in the language of the question.
4.  **Be Concise:** Provide clear, direct, and helpful answers.
---
**Retrieved Context from Knowledge Base:**
{context}
---
**Recent Conversation History:**
{history_block}
---
**User's Current Question:** "{message}"
---
**Assistant's Answer:**
"#
    )
}

/// Prompt-based speech synthesis request for a multimodal model.
pub fn build_tts_prompt(text: &str, language: &str) -> String {
    format!(
        "Read the following text aloud in a clear, friendly voice, in the language identified by the code '{}': {}",
        language, text
    )
}

/// Instructions forcing the vision model into the structured report shape
/// the client consumes.
pub const CLASSIFIER_SYSTEM_PROMPT: &str = r#"You are an expert botanist and plant pathologist. Your task is to analyze an image of a plant leaf and identify any diseases.

Your response MUST be in a valid JSON format with the following exact structure:
{
  "disease_name": "Name of the disease or 'Healthy'",
  "precautions": [
    "A concise, actionable precaution 1.",
    "A concise, actionable precaution 2."
  ],
  "remedies": [
    "A concise, actionable remedy 1.",
    "A concise, actionable remedy 2."
  ],
  "medicines": [
    {
      "name": "Chemical or Organic Medicine Name 1",
      "mixing_ratio": "e.g., '10ml per 1 liter of water'"
    }
  ]
}

- If the plant is healthy, set "disease_name" to "Healthy" and provide general care tips in the other fields.
- If the image is not a plant or is unclear, set "disease_name" to "Identification Failed" and leave other fields as empty arrays.
- Do not include any text, explanations, or markdown formatting like ```json before or after the JSON object."#;

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: Role, content: &str) -> Message {
        Message::new(role, content)
    }

    #[test]
    fn test_prompt_keeps_trailing_six_turns() {
        let history: Vec<Message> = (1..=8)
            .map(|i| {
                let role = if i % 2 == 1 { Role::User } else { Role::Assistant };
                turn(role, &format!("turn {}", i))
            })
            .collect();

        let prompt = build_chat_prompt("question", "context", &history, "en-US");
        assert!(!prompt.contains("turn 1\n"));
        assert!(!prompt.contains("turn 2\n"));
        assert!(prompt.contains("User: turn 3"));
        assert!(prompt.contains("Assistant: turn 8"));
    }

    #[test]
    fn test_prompt_carries_language_and_context() {
        let prompt = build_chat_prompt("q", "RETRIEVED-BLOCK", &[], "ta-IN");
        assert!(prompt.contains("'ta-IN'"));
        assert!(prompt.contains("RETRIEVED-BLOCK"));
        assert!(prompt.contains("\"q\""));
    }

    #[test]
    fn test_short_history_is_used_whole() {
        let history = vec![turn(Role::User, "only one")];
        let prompt = build_chat_prompt("q", "c", &history, "en-US");
        assert!(prompt.contains("User: only one"));
    }

    #[test]
    fn test_tts_prompt_embeds_language_code() {
        let prompt = build_tts_prompt("hello there", "en-GB");
        assert!(prompt.contains("'en-GB'"));
        assert!(prompt.ends_with("hello there"));
    }
}
