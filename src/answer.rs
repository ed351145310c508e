// Prompt sent with every search, and the parser that turns the model's
// sectioned reply back into a `SearchResult`.

use crate::models::{RemoteFile, SearchResult, Snippet};
use chrono::Utc;

const ANSWER: &str = "ANSWER:";
const SNIPPETS: &str = "SNIPPETS:";
const SOURCES: &str = "SOURCES:";
const CONFIDENCE: &str = "CONFIDENCE:";

/// Build the instruction sent alongside the attached files.
pub fn build_prompt(query: &str, files: &[RemoteFile]) -> String {
    let names: Vec<&str> = files.iter().map(|f| f.display_name.as_str()).collect();
    format!(
        r#"Based on the attached files ({names}), answer the following query.

Query: {query}

Provide:
1. A direct answer to the query
2. Relevant excerpts from the files, one per line, each prefixed with its file name in square brackets, e.g. [report.pdf] excerpt
3. The file names where the information was found, one per line
4. A confidence score for the answer (Low, Medium or High)

Format your response exactly as follows:
ANSWER: [your answer]
SNIPPETS: [relevant excerpts]
SOURCES: [file names]
CONFIDENCE: [Low/Medium/High]"#,
        names = names.join(", ")
    )
}

/// Parse a model reply into a result. Text without an `ANSWER:` marker is
/// kept whole as the answer.
pub fn parse_reply(query: &str, files: &[RemoteFile], reply: &str) -> SearchResult {
    let answer = match section(reply, ANSWER, &[SNIPPETS, SOURCES, CONFIDENCE]) {
        Some(text) => text.trim().to_string(),
        None => reply.trim().to_string(),
    };

    let snippets = section(reply, SNIPPETS, &[SOURCES, CONFIDENCE])
        .map(lines)
        .unwrap_or_default()
        .into_iter()
        .map(|line| attribute(line, files))
        .collect();

    let sources = section(reply, SOURCES, &[CONFIDENCE])
        .map(lines)
        .unwrap_or_default();

    let confidence = section(reply, CONFIDENCE, &[])
        .and_then(|text| text.trim().lines().next())
        .and_then(parse_confidence);

    SearchResult {
        query: query.to_string(),
        answer,
        snippets,
        sources,
        confidence,
        timestamp: Utc::now(),
        raw_response: reply.to_string(),
    }
}

/// Text after `marker`, cut at the first of `ends` that follows it.
fn section<'a>(text: &'a str, marker: &str, ends: &[&str]) -> Option<&'a str> {
    let start = text.find(marker)? + marker.len();
    let rest = &text[start..];
    let end = ends
        .iter()
        .filter_map(|m| rest.find(m))
        .min()
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Credit a snippet to the file named in its `[name]` prefix. Snippets
/// without a recognisable prefix go to the first searched file.
fn attribute(line: String, files: &[RemoteFile]) -> Snippet {
    let tagged = line
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .and_then(|(name, text)| {
            let name = name.trim();
            files
                .iter()
                .find(|f| f.display_name == name || f.id == name)
                .map(|f| (f, text.trim()))
        });
    match tagged {
        Some((file, text)) => Snippet {
            text: text.to_string(),
            source_file_id: file.id.clone(),
        },
        None => Snippet {
            source_file_id: files.first().map(|f| f.id.clone()).unwrap_or_default(),
            text: line,
        },
    }
}

/// Non-empty lines with list bullets removed.
fn lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix("- ")
                .or_else(|| line.strip_prefix("* "))
                .unwrap_or(line)
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Accepts `Low`/`Medium`/`High`, a fraction in 0..=1 or a percentage.
pub fn parse_confidence(raw: &str) -> Option<f32> {
    let raw = raw.trim().trim_matches(|c: char| c == '[' || c == ']' || c == '*').trim();
    match raw.to_ascii_lowercase().as_str() {
        "low" => return Some(0.25),
        "medium" => return Some(0.5),
        "high" => return Some(0.9),
        _ => {}
    }
    if let Some(pct) = raw.strip_suffix('%') {
        return pct
            .trim()
            .parse::<f32>()
            .ok()
            .filter(|v| (0.0..=100.0).contains(v))
            .map(|v| v / 100.0);
    }
    raw.parse::<f32>().ok().filter(|v| (0.0..=1.0).contains(v))
}
