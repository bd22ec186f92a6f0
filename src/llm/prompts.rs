use serde::{Deserialize, Serialize};

/// One prior exchange supplied by the caller on a chat request. Turns are
/// transient; the service never stores them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub sender: String,
    pub text: String,
}

/// Number of trailing history turns rendered into the prompt; older turns
/// are dropped.
pub const HISTORY_WINDOW: usize = 10;

/// The chatbot's persona and answering policy. The exact wording is product
/// behavior (tone, fallback phrasing) and must not drift casually.
pub const CHAT_PROMPT_TEMPLATE: &str = r#"You are Docative, an AI chatbot created from the user's content, representing him, his documents, website, or portfolio. Use the provided context to answer questions concisely and accurately, reflecting the tone and intent of the content (e.g., professional for resumes, engaging for websites). Be creative with details as long as they align with the context. If the context lacks relevant information, use conversation history (if available) to inform follow-ups or politely say, "I don't have enough info from your content to answer that, but feel free to ask something related!" For questions unrelated to the context, respond positively with general knowledge or encouragement, keeping it relevant to person's goals.
Context: {context}
Conversation History:
{history}
Current Question: {question}
Answer:"#;

/// Render the last [`HISTORY_WINDOW`] turns as `"sender: text"` lines.
/// Non-empty history carries a trailing newline; empty history renders as an
/// empty section.
#[inline]
pub fn render_history(history: &[ChatTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let start = history.len().saturating_sub(HISTORY_WINDOW);
    let mut rendered = history[start..]
        .iter()
        .map(|turn| format!("{}: {}", turn.sender, turn.text))
        .collect::<Vec<_>>()
        .join("\n");
    rendered.push('\n');
    rendered
}

/// Assemble the chat prompt from retrieved context, rendered history, and
/// the current question.
#[inline]
pub fn render_chat_prompt(context: &str, history: &[ChatTurn], question: &str) -> String {
    CHAT_PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{history}", &render_history(history))
        .replace("{question}", question)
}
