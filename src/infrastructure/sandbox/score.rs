//! Score sentinel parsing.
//!
//! Generated code reports its validation score by printing a sentinel line
//! to stdout. The parser is tolerant of surrounding output: it scans every
//! line, matches the sentinel case-insensitively, and takes the last
//! occurrence so progress logs that repeat the metric don't confuse it.

/// The documented sentinel generated code must emit on stdout.
pub const SCORE_SENTINEL: &str = "Final Validation Performance:";

/// Extract the validation score from captured stdout.
///
/// Returns `None` when no line carries a parseable sentinel value.
pub fn extract_score(stdout: &str) -> Option<f64> {
    let mut score = None;
    for line in stdout.lines() {
        if let Some(value) = parse_line(line) {
            score = Some(value);
        }
    }
    score
}

fn parse_line(line: &str) -> Option<f64> {
    let lower = line.to_lowercase();
    let needle = SCORE_SENTINEL.to_lowercase();
    let start = lower.find(&needle)?;
    // Slice the lowered copy: lowering can shift byte offsets in the
    // original, and digits are unaffected by case.
    let rest = &lower[start + needle.len()..];
    let token = rest.split_whitespace().next()?;
    // Trim trailing punctuation the generated code sometimes appends.
    let token = token.trim_end_matches([',', ';', ')', ']']);
    // A diverged training run prints nan/inf; that is not a usable score.
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}
