//! Instruction contract sent to the summarization backend.
//!
//! Every prompt lives here so the contract can be reviewed (and tested) in
//! one place. The wording is part of the output format: downstream readers
//! rely on the `## Title (year)` / `**Authors: …**` / backticked-keyword
//! layout, so edits here are behaviour changes.
//!
//! The section schema always includes Conclusion, in both detail levels.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How much the backend is asked to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DetailLevel {
    /// ~5 lines per section, 3-line overall summary. (default)
    #[default]
    Concise,
    /// ~10 bulleted lines per section, 5-line overall summary.
    Detailed,
}

impl DetailLevel {
    /// System-role instruction for this level.
    pub fn system_prompt(self) -> &'static str {
        match self {
            DetailLevel::Concise => CONCISE_SYSTEM_PROMPT,
            DetailLevel::Detailed => DETAILED_SYSTEM_PROMPT,
        }
    }

    /// User-role instructions for this level, without the source text.
    pub fn instructions(self) -> &'static str {
        match self {
            DetailLevel::Concise => CONCISE_INSTRUCTIONS,
            DetailLevel::Detailed => DETAILED_INSTRUCTIONS,
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailLevel::Concise => f.write_str("concise"),
            DetailLevel::Detailed => f.write_str("detailed"),
        }
    }
}

/// Sections summarised individually, in output order.
pub const SECTIONS: [&str; 5] = ["Introduction", "Method", "Result", "Discussion", "Conclusion"];

pub const CONCISE_SYSTEM_PROMPT: &str = "You are an AI assistant tasked with summarizing a research paper in Korean. You have expertise in pathology, medicine, and the application of AI in pathology. Your audience is also a pathologist.";

pub const DETAILED_SYSTEM_PROMPT: &str = "You are an AI assistant tasked with creating detailed summaries of research papers in Korean. You have expertise in pathology, medicine, and the application of AI in pathology. Your summaries should be thorough and follow the given instructions precisely.";

pub const CONCISE_INSTRUCTIONS: &str = r#"Follow these instructions to create a concise and informative summary:

1. Use Korean for the summary, but keep the paper title, author names, medical terms, and proper nouns in their original English form.
2. Write in a concise style, using endings like '~함', '~임' for brevity.
3. Use markdown format for better readability. Do not write in paragraph form.
4. Structure your summary as follows:
   a. Title:
      - Format: ## [Original English Title] (published year)
   b. Authors:
      - List the authors' names in the original English form
      - Format: **Authors: [Author1], [Author2], ...**
   c. Keywords:
      - List approximately 5 key terms from the paper.
      - Format each keyword with backticks, like this: `keyword`
      - Example: "Keywords: `colon adenocarcinoma`, `object detection`, `neuropathology`"
   d. Overall Summary:
      - Provide a 3-line summary of the entire paper
   e. Detailed Section Summaries:
      - Summarize each of the following sections in about 5 lines each:
        - Introduction
        - Method
        - Result
        - Discussion
        - Conclusion
5. Do not summarize anything after the 'References' section.
6. Ensure all medical terms, proper nouns, and other specialized vocabulary remain in English.
7. 요약 내용 이외 불필요한 말은 아무것도 하지 말것.

Remember to use markdown formatting for headers and list items."#;

pub const DETAILED_INSTRUCTIONS: &str = r#"Follow these instructions to create a more detailed summary:

1. Use Korean for the summary, but keep the paper title, author names, medical terms, and proper nouns in their original English form.
2. Write in a concise style, using endings like '~함', '~임' for brevity.
3. Use markdown format for better readability. Do not write in paragraph form.
4. Structure your summary as follows:
   a. Title:
      - Format: ## [Original English Title] (published year)
   b. Authors:
      - List the authors' names in the original English form
      - Format: **Authors: [Author1], [Author2], ...**
   c. Keywords:
      - List approximately 5 key terms from the paper.
      - Format each keyword with backticks, like this: `keyword`
   d. Overall Summary:
      - Provide a 5-line summary of the entire paper
   e. Detailed Section Summaries:
      - IMPORTANT: Summarize each of the following sections in about 10 lines.
      - Use bullet points for each line per section.
      - Sections to summarize:
        - Introduction
        - Method
        - Result
        - Discussion
        - Conclusion
5. Do not summarize anything after the 'References' section.
6. Ensure all medical terms, proper nouns, and other specialized vocabulary remain in English.
7. REMINDER: Each section summary MUST be more than 5 lines long. This is crucial for the desired output format.
8. 요약 내용 이외 불필요한 말은 아무것도 하지 말것.

Remember to use markdown formatting for headers and list items."#;

/// Assemble the user-role message: instructions followed by the source text.
pub fn user_message(instructions: &str, source_text: &str) -> String {
    format!("{instructions}\n\nText to summarize:\n\n{source_text}")
}

/// Prompt used to verify a credential: tiny, cheap, deterministic.
pub const CREDENTIAL_PROBE: &str = "Hello, World!";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_section_is_requested_at_both_levels() {
        for level in [DetailLevel::Concise, DetailLevel::Detailed] {
            for section in SECTIONS {
                assert!(
                    level.instructions().contains(section),
                    "{level} prompt is missing {section}"
                );
            }
        }
    }

    #[test]
    fn references_cutoff_is_present() {
        assert!(CONCISE_INSTRUCTIONS.contains("after the 'References' section"));
        assert!(DETAILED_INSTRUCTIONS.contains("after the 'References' section"));
    }

    #[test]
    fn detailed_level_demands_bullets_and_length() {
        let p = DetailLevel::Detailed.instructions();
        assert!(p.contains("about 10 lines"));
        assert!(p.contains("bullet points"));
        assert!(p.contains("MUST be more than 5 lines"));
        assert!(!DetailLevel::Concise.instructions().contains("MUST be more than 5 lines"));
    }

    #[test]
    fn system_prompts_fix_language_and_persona() {
        for level in [DetailLevel::Concise, DetailLevel::Detailed] {
            let s = level.system_prompt();
            assert!(s.contains("Korean"));
            assert!(s.contains("pathology"));
        }
    }

    #[test]
    fn user_message_appends_source_last() {
        let msg = user_message(CONCISE_INSTRUCTIONS, "BODY");
        assert!(msg.starts_with("Follow these instructions"));
        assert!(msg.ends_with("Text to summarize:\n\nBODY"));
    }

    #[test]
    fn silence_rule_is_the_last_numbered_rule() {
        for level in [DetailLevel::Concise, DetailLevel::Detailed] {
            let p = level.instructions();
            let silence = p.find("요약 내용 이외").unwrap();
            let references = p.find("'References'").unwrap();
            assert!(silence > references);
        }
    }
}
