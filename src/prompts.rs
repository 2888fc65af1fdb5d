//! Prompt assembly for the two pipeline tasks: analysis and assignment
//! generation.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tweaking the analysis structure or the
//!    assignment scaffold means editing exactly one place.
//!
//! 2. **Testability** — unit tests inspect the assembled messages directly
//!    without a live LLM, so prompt regressions are cheap to catch.
//!
//! Assembly is a pure function of its inputs: same document text,
//! instructions, and clarifications always produce the same messages. Empty
//! instructions or clarifications are not errors — they degrade to
//! "None provided." so the model knows the field was consciously left blank.

use crate::llm::ChatMessage;

/// System prompt for the document-analysis pass.
pub const ANALYSIS_SYSTEM_PROMPT: &str = "\
You are a specialized AI academic assistant designed to analyse uploaded \
documents and instructions in order to prepare high-quality assignments. \
During this analysis step you must carefully read the provided document \
content and any user questions or instructions. Extract and summarise the \
key topics, definitions, and explicit instructions found in the document. \
Also identify any ambiguous or unclear instructions that require \
clarification. Your output must be structured as follows:

1. Summary: A concise summary of the document.
2. Key Topics: A bulleted list of the main topics and subtopics found in the document.
3. Explicit Instructions: Any explicit assignment instructions extracted verbatim from the document.
4. Ambiguities: A list of questions for the user about parts of the document or instructions that are unclear or ambiguous.

If there are no ambiguities, write 'None' under the Ambiguities section.";

/// System prompt for the assignment-generation pass.
///
/// The heading scaffold here is what the markup parser and the composers are
/// built around: `#` headings, `-` bullets, `1.` numbered items.
pub const ASSIGNMENT_SYSTEM_PROMPT: &str = "\
You are a specialized AI academic assistant designed to generate high-quality \
assignments based on provided documents and user instructions. Use the content \
extracted from the document and any clarifications to create a well-structured \
assignment suitable for university submission. Your response must adhere to \
the following format:

# Introduction
Provide a brief overview of the topic and its significance.

# Body
Organise the main body into logical sections with headings. Provide detailed \
explanations, analysis and relevant examples derived from the source material.

# Conclusion
Summarise the key points discussed and offer any conclusions or \
recommendations based on the analysed content.

# References
If applicable, list all sources referenced. Use any citation details available \
in the document (e.g. authors, titles, publication dates) or, if none are \
present, leave this section empty.

Ensure the assignment is coherent, logically organised and free from \
plagiarism. Write in formal academic language.";

/// Placeholder used when instructions or clarifications are blank.
pub const NONE_PROVIDED: &str = "None provided.";

fn or_none(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        NONE_PROVIDED
    } else {
        trimmed
    }
}

/// Assemble the user message shared by both task kinds.
fn user_message(document_text: &str, instructions: &str, clarifications: &str) -> ChatMessage {
    ChatMessage::user(format!(
        "Document Content:\n{}\n\n\
         User Questions/Instructions:\n{}\n\n\
         Clarifications (if provided):\n{}",
        document_text.trim(),
        or_none(instructions),
        or_none(clarifications),
    ))
}

/// Messages for the analysis pass.
pub fn analysis_messages(
    document_text: &str,
    instructions: &str,
    clarifications: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(ANALYSIS_SYSTEM_PROMPT),
        user_message(document_text, instructions, clarifications),
    ]
}

/// Messages for the assignment-generation pass.
pub fn assignment_messages(
    document_text: &str,
    instructions: &str,
    clarifications: &str,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(ASSIGNMENT_SYSTEM_PROMPT),
        user_message(document_text, instructions, clarifications),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_messages_carry_document_and_instructions() {
        let msgs = analysis_messages("The document body.", "Answer question 3.", "");
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert!(msgs[0].content.contains("Ambiguities"));
        assert!(msgs[1].content.contains("The document body."));
        assert!(msgs[1].content.contains("Answer question 3."));
    }

    #[test]
    fn empty_instructions_degrade_to_none_provided() {
        let msgs = analysis_messages("text", "", "   ");
        assert_eq!(
            msgs[1].content.matches(NONE_PROVIDED).count(),
            2,
            "both blank fields should degrade"
        );
    }

    #[test]
    fn assignment_messages_use_the_scaffold_prompt() {
        let msgs = assignment_messages("text", "instr", "clarified: use APA style");
        assert!(msgs[0].content.contains("# Introduction"));
        assert!(msgs[0].content.contains("# References"));
        assert!(msgs[1].content.contains("clarified: use APA style"));
    }

    #[test]
    fn assembly_is_deterministic() {
        let a = assignment_messages("doc", "instr", "clar");
        let b = assignment_messages("doc", "instr", "clar");
        assert_eq!(a, b);
    }
}
