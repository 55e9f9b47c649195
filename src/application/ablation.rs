//! Ablation analyzer: ranks code regions by score impact.
//!
//! For each region of the best artifact, a perturbed variant (region
//! disabled) is executed once through the sandbox; the score delta against
//! the unperturbed baseline, normalized by metric direction, estimates how
//! much the region matters. Regions whose perturbation breaks execution
//! entirely are treated as critical. One execution per region, no nested
//! ablation.

use std::sync::Arc;

use tracing::{debug, info};

use crate::domain::models::{
    disable_region, split_regions, AblationReport, CodeArtifact, MetricDirection, RegionImpact,
};
use crate::domain::ports::ArtifactExecutor;

/// Runs the per-round ablation micro-search.
pub struct AblationAnalyzer {
    executor: Arc<dyn ArtifactExecutor>,
    direction: MetricDirection,
}

impl AblationAnalyzer {
    /// Create an analyzer running probes through `executor`.
    pub fn new(executor: Arc<dyn ArtifactExecutor>, direction: MetricDirection) -> Self {
        Self {
            executor,
            direction,
        }
    }

    /// Produce the impact ranking for `artifact`, whose unperturbed score
    /// is `baseline_score`. Probes are transient and never pooled.
    pub async fn analyze(&self, artifact: &CodeArtifact, baseline_score: f64) -> AblationReport {
        let regions = split_regions(&artifact.source);
        info!(
            artifact_id = %artifact.id,
            regions = regions.len(),
            baseline = baseline_score,
            "running ablation study"
        );

        let mut impacts = Vec::with_capacity(regions.len());
        for region in &regions {
            let perturbed_source = disable_region(&artifact.source, &region.name);
            let probe = CodeArtifact::ablation_probe(perturbed_source, artifact, &region.name);
            let result = self.executor.execute(&probe).await;

            let impact = match result.score {
                Some(perturbed) => {
                    let impact = match self.direction {
                        // Removing an important region degrades the score:
                        // lower for maximize, higher for minimize. Normalize
                        // so higher impact always means more important.
                        MetricDirection::Maximize => baseline_score - perturbed,
                        MetricDirection::Minimize => perturbed - baseline_score,
                    };
                    RegionImpact {
                        region: region.name.clone(),
                        impact,
                        perturbed_score: Some(perturbed),
                        critical: false,
                    }
                }
                None => RegionImpact {
                    region: region.name.clone(),
                    impact: f64::INFINITY,
                    perturbed_score: None,
                    critical: true,
                },
            };
            debug!(
                region = %impact.region,
                impact = impact.impact,
                critical = impact.critical,
                "region probed"
            );
            impacts.push(impact);
        }

        AblationReport::ranked(baseline_score, impacts)
    }
}
