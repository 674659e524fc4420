pub const RESUME_EXTRACT_SYSTEM: &str = "You are a precise resume parser. \
    You MUST respond with valid JSON only. Do NOT invent details that are not in the resume.";

pub const RESUME_EXTRACT_PROMPT: &str = r#"Extract structured data from this resume.

RESUME:
{resume_text}

Return JSON:
{
  "name": "full name or null",
  "email": "email or null",
  "skills": ["concrete technical skills, one per entry"],
  "experience_summary": "3-4 sentence summary of experience",
  "target_roles": ["roles this person is suited for"]
}"#;

pub const QUIZ_SYSTEM: &str = "You write technical assessment questions. \
    Respond with valid JSON only.";

pub const QUIZ_PROMPT: &str = r#"Write ONE multiple-choice question that checks practical, hands-on knowledge of {skill} at {level} level.

Rules:
- Exactly 4 options, only one of them correct
- Test applied understanding, not trivia or definitions
- Keep the question under 60 words

Return JSON:
{
  "question": "the question text",
  "options": ["option A", "option B", "option C", "option D"],
  "correct_index": 0,
  "explanation": "one or two sentences on why the answer is correct"
}"#;
