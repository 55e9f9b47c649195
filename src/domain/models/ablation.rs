//! Ablation domain model: code regions and impact reports.
//!
//! Generated solutions carry structural marker comments that partition the
//! source into coarse logical regions (data loading, features, model,
//! training, prediction). The ablation analyzer disables one region at a
//! time and measures the score impact; the resulting report is derived
//! data, recomputed every outer round and never persisted across rounds.

use serde::{Deserialize, Serialize};

/// Marker prefix the oracle is asked to emit before each logical block,
/// e.g. `# [[region: training]]`.
pub const REGION_MARKER_PREFIX: &str = "# [[region:";
/// Closing delimiter of a region marker line.
pub const REGION_MARKER_SUFFIX: &str = "]]";

/// Name used when source code carries no region markers at all.
pub const UNPARTITIONED_REGION: &str = "solution";

/// One contiguous logical block of a solution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRegion {
    /// Region name from the marker line.
    pub name: String,
    /// Source lines belonging to the region (marker line excluded).
    pub body: String,
    /// Order of appearance in the source, 0-based.
    pub index: usize,
}

/// Split source code into regions on marker comment lines.
///
/// Lines before the first marker form an implicit `preamble` region so
/// imports survive perturbation. Unmarked code yields a single region
/// named [`UNPARTITIONED_REGION`].
pub fn split_regions(source: &str) -> Vec<CodeRegion> {
    let mut regions: Vec<CodeRegion> = Vec::new();
    let mut current_name: Option<String> = None;
    let mut current_body = String::new();

    let mut push = |name: Option<String>, body: &str, regions: &mut Vec<CodeRegion>| {
        if body.trim().is_empty() {
            return;
        }
        let index = regions.len();
        regions.push(CodeRegion {
            name: name.unwrap_or_else(|| "preamble".to_string()),
            body: body.to_string(),
            index,
        });
    };

    for line in source.lines() {
        if let Some(name) = parse_marker(line) {
            push(current_name.take(), &current_body, &mut regions);
            current_name = Some(name);
            current_body.clear();
        } else {
            current_body.push_str(line);
            current_body.push('\n');
        }
    }
    push(current_name.take(), &current_body, &mut regions);

    if regions.len() == 1 && regions[0].name == "preamble" {
        regions[0].name = UNPARTITIONED_REGION.to_string();
    }
    regions
}

/// Parse a region marker line, returning the region name.
fn parse_marker(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let rest = trimmed.strip_prefix(REGION_MARKER_PREFIX)?;
    let name = rest.strip_suffix(REGION_MARKER_SUFFIX)?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Rebuild the source with `region` disabled.
///
/// The region's body is dropped entirely; its marker line is kept with a
/// `disabled` annotation so the perturbed code remains self-describing.
/// If later regions depend on names defined here the perturbed run fails,
/// which the analyzer treats as maximal impact.
pub fn disable_region(source: &str, region: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut skipping = false;
    for line in source.lines() {
        if let Some(name) = parse_marker(line) {
            skipping = name == region;
            if skipping {
                out.push_str(&format!("# [[region: {name}]]  # disabled for ablation\n"));
                continue;
            }
        }
        if !skipping {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Estimated score impact of one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionImpact {
    /// Region name.
    pub region: String,
    /// Baseline score minus perturbed score, normalized so that higher
    /// always means more important to keep/improve.
    pub impact: f64,
    /// Score of the perturbed variant, if it ran successfully.
    pub perturbed_score: Option<f64>,
    /// Perturbation broke execution entirely; treated as maximal impact.
    pub critical: bool,
}

/// Ordered ranking of region impacts for one artifact, highest first.
///
/// Ties are broken by order of appearance in the source (earlier region
/// wins), so the ranking is deterministic and reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AblationReport {
    /// Score of the unperturbed baseline artifact.
    pub baseline_score: f64,
    /// Impacts, sorted highest impact first.
    pub impacts: Vec<RegionImpact>,
}

impl AblationReport {
    /// Build a report from unordered impacts, applying the deterministic
    /// ranking: critical regions first, then by impact descending, ties by
    /// appearance order. `impacts` must be given in appearance order.
    pub fn ranked(baseline_score: f64, impacts: Vec<RegionImpact>) -> Self {
        let mut impacts = impacts;
        // Stable sort keeps appearance order for equal keys.
        impacts.sort_by(|a, b| {
            b.critical
                .cmp(&a.critical)
                .then_with(|| b.impact.partial_cmp(&a.impact).unwrap_or(std::cmp::Ordering::Equal))
        });
        Self {
            baseline_score,
            impacts,
        }
    }

    /// Highest-impact region, the mutation target for the next round.
    pub fn top_region(&self) -> Option<&RegionImpact> {
        self.impacts.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKED: &str = "\
import pandas as pd

# [[region: load]]
df = pd.read_csv('train.csv')

# [[region: train]]
model.fit(df)

# [[region: predict]]
preds = model.predict(df)
";

    #[test]
    fn test_split_marked_source() {
        let regions = split_regions(MARKED);
        let names: Vec<&str> = regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["preamble", "load", "train", "predict"]);
        assert!(regions[1].body.contains("read_csv"));
        assert_eq!(regions[3].index, 3);
    }

    #[test]
    fn test_unmarked_source_is_single_region() {
        let regions = split_regions("x = 1\nprint(x)\n");
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].name, UNPARTITIONED_REGION);
    }

    #[test]
    fn test_disable_region_drops_body_keeps_others() {
        let perturbed = disable_region(MARKED, "train");
        assert!(!perturbed.contains("model.fit"));
        assert!(perturbed.contains("read_csv"));
        assert!(perturbed.contains("model.predict"));
        assert!(perturbed.contains("disabled for ablation"));
    }

    #[test]
    fn test_ranking_orders_by_impact_then_appearance() {
        let impacts = vec![
            RegionImpact {
                region: "a".into(),
                impact: 0.05,
                perturbed_score: Some(0.25),
                critical: false,
            },
            RegionImpact {
                region: "b".into(),
                impact: 0.05,
                perturbed_score: Some(0.25),
                critical: false,
            },
            RegionImpact {
                region: "c".into(),
                impact: 0.10,
                perturbed_score: Some(0.30),
                critical: false,
            },
        ];
        let report = AblationReport::ranked(0.20, impacts);
        let order: Vec<&str> = report.impacts.iter().map(|i| i.region.as_str()).collect();
        // c highest; a before b on tie (appearance order).
        assert_eq!(order, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_critical_regions_rank_first() {
        let impacts = vec![
            RegionImpact {
                region: "big".into(),
                impact: 99.0,
                perturbed_score: Some(100.0),
                critical: false,
            },
            RegionImpact {
                region: "broken".into(),
                impact: f64::INFINITY,
                perturbed_score: None,
                critical: true,
            },
        ];
        let report = AblationReport::ranked(1.0, impacts);
        assert_eq!(report.top_region().unwrap().region, "broken");
    }
}
