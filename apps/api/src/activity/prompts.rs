pub const CODE_ANALYSIS_SYSTEM: &str = "You are a technical skill auditor. \
    You MUST respond with valid JSON only. Report only skills visible in the code.";

pub const CODE_ANALYSIS_PROMPT: &str = r#"Analyze a developer's recent GitHub commits.

From the code patches below identify programming languages, frameworks and libraries,
tools and practices (Docker, CI/CD, testing), and domain expertise.

CODE CONTEXT FROM RECENT COMMITS:
{code_context}

Return JSON:
{
  "detected_skills": [
    {"skill": "Rust", "level": "beginner | intermediate | advanced", "evidence": "what in the code shows it"}
  ],
  "tech_stack_summary": "one line listing the main stack",
  "narrative_message": "one or two sentences, addressed to the developer, about what they worked on"
}"#;
