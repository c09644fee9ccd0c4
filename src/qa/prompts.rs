/// Opening instruction placed before the rendered files.
pub const ANSWER_PREAMBLE: &str = "Based on the following data, answer the question accurately. \
Use only the data below; if the answer is not in it, say that the files do not contain it.";

/// Build the single prompt sent to the backend for a question.
pub fn answer_prompt(context: &str, question: &str, word_limit: u32, line_breaks: bool) -> String {
    let mut style = format!("Answer in no more than {} words", word_limit);
    if line_breaks {
        style.push_str(" and use new lines where they help alignment and readability");
    }
    style.push('.');

    format!(
        "{}\n{}\n\n{}\n\nQuestion: {}",
        ANSWER_PREAMBLE, style, context, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_context_question_and_limits() {
        let prompt = answer_prompt("=== File: a.csv (0 records) ===\n[]", "What is total?", 100, true);
        assert!(prompt.starts_with(ANSWER_PREAMBLE));
        assert!(prompt.contains("no more than 100 words and use new lines"));
        assert!(prompt.contains("=== File: a.csv"));
        assert!(prompt.ends_with("Question: What is total?"));
    }

    #[test]
    fn line_break_hint_is_optional() {
        let prompt = answer_prompt("ctx", "q", 40, false);
        assert!(prompt.contains("no more than 40 words."));
        assert!(!prompt.contains("new lines"));
    }
}
