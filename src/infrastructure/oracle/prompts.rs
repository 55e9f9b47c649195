//! Prompt assembly for the synthesis oracle.
//!
//! Minimal context formatting for the four request kinds. The exact
//! wording is deliberately not part of any contract; the controller only
//! depends on the oracle returning runnable code that follows the region
//! marker and score sentinel conventions.

use crate::domain::models::MetricDirection;
use crate::domain::ports::{ProposalKind, ProposeRequest};
use crate::infrastructure::sandbox::SCORE_SENTINEL;

/// Conventions every generated solution is asked to follow.
fn conventions(direction: MetricDirection) -> String {
    format!(
        "Requirements:\n\
         - Write a single self-contained Python script.\n\
         - Structure the script with marker comments of the form `# [[region: name]]` \
         before each logical block (data loading, feature engineering, model, training, prediction).\n\
         - Compute a validation score ({} is better) and print it as a line \
         `{SCORE_SENTINEL} <value>`.\n\
         - Read input data from the current working directory's `input/` folder.\n\
         - Output only code, no explanations.",
        match direction {
            MetricDirection::Minimize => "lower",
            MetricDirection::Maximize => "higher",
        }
    )
}

/// Build the prompt for one variant of a request.
///
/// `variant` distinguishes parallel asks for independent strategies so the
/// oracle does not return the same idea n times.
pub fn build_prompt(request: &ProposeRequest, variant: usize) -> String {
    let header = format!(
        "Task: {}\nEvaluation metric: {} ({})\n",
        request.task_description,
        request.metric,
        request.direction.as_str()
    );
    let body = match &request.kind {
        ProposalKind::Seed => format!(
            "Write a complete machine-learning solution for this task. \
             Use approach #{} of {} distinct approaches you would rank highest.",
            variant + 1,
            request.n_variants.max(1)
        ),
        ProposalKind::Improve { base_code, region } => format!(
            "Below is the current best solution. Improve ONLY the `{region}` region; \
             keep every other region unchanged. Propose improvement strategy #{} of {}.\n\n\
             Current solution:\n```python\n{base_code}\n```",
            variant + 1,
            request.n_variants.max(1)
        ),
        ProposalKind::Repair { code, error_trace } => format!(
            "The following solution failed to execute. Fix the error and return the \
             corrected, complete script.\n\nError:\n{error_trace}\n\n\
             Failing solution:\n```python\n{code}\n```"
        ),
        ProposalKind::Ensemble {
            parent_sources,
            prior_attempts,
        } => {
            let mut text = String::from(
                "Combine the following solutions into one ensemble (blending, voting, \
                 or stacking) that outperforms each of them.\n",
            );
            if !prior_attempts.is_empty() {
                text.push_str("Previously tried combinations:\n");
                for attempt in prior_attempts {
                    text.push_str(&format!("- {attempt}\n"));
                }
                text.push_str("Propose a substantially different combination.\n");
            }
            for (i, source) in parent_sources.iter().enumerate() {
                text.push_str(&format!("\nSolution {}:\n```python\n{source}\n```\n", i + 1));
            }
            text
        }
    };
    format!("{header}\n{body}\n\n{}", conventions(request.direction))
}

/// Strip markdown code fences the oracle often wraps code in.
pub fn strip_code_fences(response: &str) -> String {
    let trimmed = response.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed.to_string();
    };
    // Opening fence: skip the fence line entirely (handles ```python).
    let after_fence = &trimmed[start + 3..];
    let code_start = after_fence.find('\n').map_or(0, |i| i + 1);
    let code = &after_fence[code_start..];
    let code = code.rfind("```").map_or(code, |end| &code[..end]);
    code.trim().to_string()
}
