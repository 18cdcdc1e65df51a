//! Prompt templates for the planning, research and publishing stages.

use super::task::ResearchResult;

pub const PLANNER_SYSTEM: &str = "You are a research planning expert. You break complex research \
queries into focused, complementary sub-questions and answer only with JSON.";

pub const RESEARCHER_SYSTEM: &str = "You are a research agent. You answer one focused question \
with a concise, well-sourced summary and answer only with JSON.";

pub const PUBLISHER_SYSTEM: &str = "You are a scientific synthesis engine. You combine research \
summaries into a comprehensive, well-structured markdown report with inline citations.";

pub fn planner_prompt(query: &str, max_questions: usize) -> String {
    format!(
        r#"Break down the research query below into 6-{max} focused sub-questions that, answered together, give a comprehensive understanding of the topic.

Guidelines:
- Cover background/fundamentals, current state, key findings, methodologies, controversies, limitations and future directions
- Each sub-question must be specific and answerable through web research
- Questions should be independent yet complementary
- Prefer open-ended analytical questions over yes/no questions

User Query: {query}

Respond ONLY with valid JSON in this exact format:
{{
  "sub_questions": [
    "What are the fundamental principles and historical development of [topic]?",
    "What are the current state-of-the-art approaches in [topic]?"
  ]
}}"#,
        max = max_questions.max(6),
        query = query,
    )
}

pub fn researcher_prompt(question: &str, max_sources: usize) -> String {
    format!(
        r#"Sub-question to answer: {question}

Your task:
1. Gather information from authoritative sources (academic papers, reputable websites, expert blogs)
2. Extract key facts and findings
3. Provide up to {max_sources} sources with full metadata
4. Write a concise 200-300 word summary

Respond ONLY with valid JSON in this exact format:
{{
  "summary": "A 200-300 word summary answering the sub-question...",
  "facts": ["Key fact 1", "Key fact 2"],
  "sources": [
    {{
      "title": "Paper or Article Title",
      "url": "https://example.com/source1",
      "authors": "Author Name(s)",
      "date": "2024-01-15",
      "snippet": "Relevant quote or excerpt supporting the findings"
    }}
  ]
}}"#
    )
}

/// Render completed results the way the publisher prompt expects them.
pub fn format_findings(results: &[ResearchResult]) -> String {
    let mut out = String::new();
    for (i, result) in results.iter().enumerate() {
        out.push_str(&format!("\n--- Sub-Question {} ---\n", i + 1));
        out.push_str(&format!("Q: {}\n\n", result.question));
        out.push_str(&format!("Summary:\n{}\n\n", result.summary));

        if !result.sources.is_empty() {
            out.push_str("Sources:\n");
            for source in &result.sources {
                out.push_str(&format!("- [{}] {}\n", source.id, source.title));
                out.push_str(&format!("  URL: {}\n", source.url));
                if let Some(authors) = &source.authors {
                    out.push_str(&format!("  Authors: {}\n", authors));
                }
                if let Some(date) = &source.date {
                    out.push_str(&format!("  Date: {}\n", date));
                }
                out.push_str(&format!("  Snippet: {}\n\n", source.snippet));
            }
        }
    }
    out
}

pub fn publisher_prompt(query: &str, results: &[ResearchResult]) -> String {
    format!(
        r#"Original Research Query: {query}

Research Summaries and Sources:
{findings}

Synthesize all summaries into a cohesive research report of at least 2000 words with these sections:
Introduction, Background & Fundamentals, Current Evidence & Findings, Methodologies & Approaches,
Controversies & Limitations, Future Directions & Implications, Conclusion.

Use inline citations in the format [S1], [S2] matching the source ids above, write in an academic
yet accessible style, and end with a "References" section listing all sources.

Format your response as markdown starting with a single top-level heading:
# [Generated Title Based on Query]"#,
        query = query,
        findings = format_findings(results),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::task::Citation;

    #[test]
    fn test_planner_prompt_embeds_query() {
        let prompt = planner_prompt("How do vaccines work?", 10);
        assert!(prompt.contains("How do vaccines work?"));
        assert!(prompt.contains("6-10"));
        assert!(prompt.contains("\"sub_questions\""));
    }

    #[test]
    fn test_format_findings_lists_sources() {
        let results = vec![ResearchResult {
            question: "What is mRNA?".to_string(),
            summary: "mRNA carries instructions.".to_string(),
            sources: vec![Citation {
                id: "S1".to_string(),
                title: "mRNA basics".to_string(),
                url: "https://example.org/mrna".to_string(),
                authors: Some("Doe, J.".to_string()),
                date: None,
                snippet: "excerpt".to_string(),
            }],
        }];

        let text = format_findings(&results);
        assert!(text.contains("--- Sub-Question 1 ---"));
        assert!(text.contains("- [S1] mRNA basics"));
        assert!(text.contains("Authors: Doe, J."));
        assert!(!text.contains("Date:"));
    }
}
