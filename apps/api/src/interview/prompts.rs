use crate::interview::session::{InterviewContext, InterviewMode};
use crate::interview::stages::Stage;

pub const INTERVIEWER_SYSTEM: &str = "You are a professional technical interviewer \
    conducting a mock interview. Stay in character and follow the stage instruction \
    in the latest message.";

pub const EVALUATOR_SYSTEM: &str = "You are a hiring panel reviewing an interview transcript. \
    You MUST respond with valid JSON only.";

pub const FINAL_SUFFIX: &str = " Final message.";

fn base(mode: InterviewMode, title: &str) -> String {
    match mode {
        InterviewMode::Voice => format!(
            "You are interviewing for {title}. Keep responses SHORT (1-2 sentences). \
             Ask ONE clear question. DO NOT include labels like 'Interviewer:' in your response."
        ),
        InterviewMode::Text => {
            format!("Interviewer for {title}. Keep it SHORT (1-2 sentences). ONE question.")
        }
    }
}

/// Stage instruction appended after the history window.
pub fn stage_prompt(stage: Stage, ctx: &InterviewContext, mode: InterviewMode) -> String {
    let base = base(mode, ctx.job_title());
    match stage {
        Stage::Intro => format!("{base} Welcome and ask for a quick self-introduction."),
        Stage::Resume => {
            let skills: Vec<&str> = ctx.user.skills.iter().take(2).map(String::as_str).collect();
            let topic = if skills.is_empty() {
                "their experience".to_string()
            } else {
                skills.join(", ")
            };
            format!("{base} Ask about {topic} or a key project.")
        }
        Stage::GapChallenge => {
            let skill = ctx
                .gaps
                .missing_skills
                .first()
                .map(String::as_str)
                .unwrap_or("problem-solving");
            format!("{base} Ask about their experience or approach to {skill}.")
        }
        Stage::Conclusion | Stage::End => format!(
            "{base} CRITICAL: Max 15 words. Say: 'Thanks for your time today. \
             We'll review and be in touch soon. Goodbye!'"
        ),
    }
}

pub fn evaluation_prompt(ctx: &InterviewContext) -> String {
    let title = ctx.job.title.as_deref().unwrap_or("this position");
    format!(
        r#"Evaluate the interview for {title}. Return JSON:
{{
    "score": <0-100>,
    "verdict": "Hired" or "Not Hired",
    "summary": "<brief 2-line evaluation>",
    "strengths": ["s1", "s2"],
    "improvements": ["i1", "i2"]
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resume_prompt_uses_first_two_skills() {
        let mut ctx = InterviewContext::default();
        ctx.user.skills = vec!["Rust".into(), "Go".into(), "SQL".into()];
        let prompt = stage_prompt(Stage::Resume, &ctx, InterviewMode::Text);
        assert!(prompt.contains("Ask about Rust, Go or a key project."));
        assert!(prompt.starts_with("Interviewer for Role."));
    }

    #[test]
    fn test_gap_prompt_defaults_to_problem_solving() {
        let prompt = stage_prompt(Stage::GapChallenge, &InterviewContext::default(), InterviewMode::Voice);
        assert!(prompt.contains("approach to problem-solving"));
        assert!(prompt.contains("DO NOT include labels"));
    }
}
