//! System prompts and prompt assembly for the agent routes.

use serde::{Deserialize, Serialize};

/// Persona for the transcript analysis route.
pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"You are a helpful transcript analyzer. When given a transcript, you should:

1. Summarize the key points and main topics discussed
2. Identify important action items or decisions made
3. Extract key insights and takeaways
4. Highlight any questions that were raised or need follow-up

Be concise but thorough. Use markdown formatting for better readability."#;

/// Persona for the competitive research route.
pub const RESEARCH_SYSTEM_PROMPT: &str = r#"You are a specialized Competitive Research Agent for Sentry.

Your role is to:
- Research and analyze Sentry's competitors in the application monitoring and error tracking space
- Compare Sentry's features, pricing, and capabilities against competitors like Datadog, New Relic, Rollbar, Bugsnag, AppDynamics, Dynatrace, and others
- Provide factual, up-to-date information about market positioning
- Search the web for recent comparisons, reviews, and competitive intelligence
- Analyze strengths and weaknesses objectively
- Highlight Sentry's unique value propositions and differentiators

Key competitors to be aware of:
- **Datadog**: Full-stack observability platform (APM, logs, infrastructure)
- **New Relic**: Application performance monitoring and observability
- **Rollbar**: Error tracking and monitoring
- **Bugsnag**: Error monitoring for mobile and web apps
- **AppDynamics**: Application performance management
- **Dynatrace**: Software intelligence platform
- **Splunk**: Log management and analytics
- **LogRocket**: Session replay and error tracking

Guidelines:
- Always use WebSearch for current pricing, features, and market information
- Be objective and factual - acknowledge where competitors may have advantages
- Focus on technical capabilities, not just marketing claims
- Cite sources when providing specific information
- Provide actionable insights for sales, marketing, and product teams
- Keep responses well-structured with clear sections and comparisons

When comparing, consider these dimensions:
- Error tracking and debugging capabilities
- Performance monitoring (APM)
- Session replay features
- Pricing models (developer-friendly vs enterprise)
- SDK and platform support
- Integration ecosystem
- Data privacy and compliance
- Developer experience and ease of setup
- Community and support"#;

/// One conversation turn in a research request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Full analyze-route prompt around one transcript.
pub fn analysis_prompt(transcript: &str) -> String {
    format!(
        "{ANALYSIS_SYSTEM_PROMPT}\n\nHere is the transcript to analyze:\n\n{transcript}\n\nPlease provide a comprehensive analysis of this transcript."
    )
}

/// Full research-route prompt: persona, prior turns, then the latest user
/// question. `None` when the conversation holds no user message.
///
/// Context covers every turn but the final one, whatever its role; the
/// latest user message is always restated at the end.
pub fn research_prompt(messages: &[ChatMessage]) -> Option<String> {
    let last_user = messages.iter().rev().find(|m| m.role == "user")?;

    let context = messages[..messages.len().saturating_sub(1)]
        .iter()
        .map(|m| {
            let role = if m.role == "user" { "User" } else { "Assistant" };
            format!("{role}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Some(if context.is_empty() {
        format!("{RESEARCH_SYSTEM_PROMPT}\n\nUser: {}", last_user.content)
    } else {
        format!(
            "{RESEARCH_SYSTEM_PROMPT}\n\nPrevious conversation:\n{context}\n\nUser: {}",
            last_user.content
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn analysis_prompt_wraps_the_transcript() {
        let prompt = analysis_prompt("[00:00:01] Ada: Hello.");
        assert!(prompt.starts_with(ANALYSIS_SYSTEM_PROMPT));
        assert!(prompt.contains(
            "\n\nHere is the transcript to analyze:\n\n[00:00:01] Ada: Hello.\n\n"
        ));
        assert!(prompt.ends_with("Please provide a comprehensive analysis of this transcript."));
    }

    #[test]
    fn single_question_has_no_context_block() {
        let prompt = research_prompt(&[turn("user", "How does Sentry compare to Rollbar?")])
            .unwrap();
        assert!(!prompt.contains("Previous conversation:"));
        assert!(prompt.ends_with("\n\nUser: How does Sentry compare to Rollbar?"));
    }

    #[test]
    fn prior_turns_become_labelled_context() {
        let prompt = research_prompt(&[
            turn("user", "Compare pricing."),
            turn("assistant", "Here is a pricing overview."),
            turn("user", "What about session replay?"),
        ])
        .unwrap();
        assert!(prompt.contains(
            "Previous conversation:\nUser: Compare pricing.\n\nAssistant: Here is a pricing overview.\n\nUser: What about session replay?"
        ));
        assert!(prompt.ends_with("\n\nUser: What about session replay?"));
    }

    #[test]
    fn trailing_assistant_turn_stays_in_context() {
        // The latest user question is restated even when an assistant
        // message came after it.
        let prompt = research_prompt(&[
            turn("user", "Compare pricing."),
            turn("assistant", "Done."),
        ])
        .unwrap();
        assert!(prompt.contains("Previous conversation:\nUser: Compare pricing."));
        assert!(prompt.ends_with("\n\nUser: Compare pricing."));
    }

    #[test]
    fn conversation_without_user_turns_yields_nothing() {
        assert!(research_prompt(&[]).is_none());
        assert!(research_prompt(&[turn("assistant", "Hello!")]).is_none());
    }
}
