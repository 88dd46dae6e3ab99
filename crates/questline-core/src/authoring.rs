// Shape validation for organizer-authored game content.
//
// Only shape is checked, never meaning: checkpoints are non-empty lines,
// questions are blank-line-separated blocks of exactly four lines (prompt
// plus three answers, the first answer canonical-correct). The same checks
// gate both manually typed content and generator drafts.

use crate::domain::Question;
use crate::error::{QuestlineError, Result};

/// Parse checkpoint lines from organizer input: one checkpoint per line,
/// leading numbering stripped, blank lines ignored.
pub fn parse_checkpoints(text: &str) -> Result<Vec<String>> {
    let checkpoints: Vec<String> = text
        .lines()
        .map(|line| strip_numbering(line.trim()).to_string())
        .filter(|line| !line.is_empty())
        .collect();

    if checkpoints.is_empty() {
        return Err(QuestlineError::validation(
            "Enter at least one checkpoint, one per line.",
        ));
    }
    Ok(checkpoints)
}

/// Parse question blocks from organizer input: blocks separated by a blank
/// line, each block exactly four lines: the prompt and three answers, the
/// first answer being the correct one. Label prefixes ("Question 2:",
/// "Answer:") are stripped.
pub fn parse_questions(text: &str) -> Result<Vec<Question>> {
    let normalized = text.replace("\r\n", "\n");
    let mut questions = Vec::new();

    for block in normalized.split("\n\n").filter(|b| !b.trim().is_empty()) {
        let lines: Vec<&str> = block
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.len() != 4 {
            return Err(QuestlineError::validation(
                "Each question block needs exactly four lines: \
                 the question and three answers, the first answer correct.",
            ));
        }
        let mut cleaned = lines.iter().map(|l| strip_label(l));
        let prompt = cleaned.next().unwrap_or_default();
        let answers: Vec<String> = cleaned.collect();
        let answers: [String; 3] = answers
            .try_into()
            .map_err(|_| QuestlineError::validation("Each question needs three answers."))?;
        questions.push(Question { prompt, answers });
    }

    if questions.is_empty() {
        return Err(QuestlineError::validation(
            "Enter at least one question block.",
        ));
    }
    Ok(questions)
}

/// Drop a leading "1." / "2)" style numbering
fn strip_numbering(line: &str) -> &str {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() < line.len() {
        if let Some(rest) = rest.strip_prefix(['.', ')']) {
            return rest.trim_start();
        }
    }
    line
}

/// Drop a leading "Question 3:" / "Answer:" label, then any numbering
fn strip_label(line: &str) -> String {
    let lowered = line.to_lowercase();
    let stripped = if lowered.starts_with("question") || lowered.starts_with("answer") {
        match line.split_once(':') {
            Some((_, rest)) => rest.trim(),
            None => line,
        }
    } else {
        line
    };
    strip_numbering(stripped).to_string()
}
