//! Variant generation: enumerate inclusion policies and recompose once per policy.

use std::collections::BTreeSet;

use figcrop_utils::config::{PolicySpec, VariantMode};
use image::DynamicImage;
use log::{info, warn};
use rayon::prelude::*;

use crate::{
    error::{PipelineError, RegionId},
    recompose::{Recompositor, RegionTable, Replacements},
};

/// A labelled set of region ids to replace in one recomposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionPolicy {
    pub label: String,
    pub include: BTreeSet<RegionId>,
}

impl InclusionPolicy {
    pub fn new(label: impl Into<String>, include: impl IntoIterator<Item = RegionId>) -> Self {
        Self {
            label: label.into(),
            include: include.into_iter().collect(),
        }
    }
}

impl From<&PolicySpec> for InclusionPolicy {
    fn from(policy: &PolicySpec) -> Self {
        InclusionPolicy::new(policy.label.clone(), policy.include.iter().copied())
    }
}

/// Produces the policies to render for a set of replaceable region ids.
pub trait PolicyGenerator: Send + Sync {
    fn policies(&self, ids: &[RegionId]) -> Vec<InclusionPolicy>;
}

/// For each id `k`, replace every other id. Labels are `<prefix>_<k>`.
#[derive(Debug, Clone)]
pub struct ExcludeEach {
    pub prefix: String,
}

impl Default for ExcludeEach {
    fn default() -> Self {
        Self {
            prefix: "partial_replacement".to_string(),
        }
    }
}

impl PolicyGenerator for ExcludeEach {
    fn policies(&self, ids: &[RegionId]) -> Vec<InclusionPolicy> {
        ids.iter()
            .map(|&excluded| {
                InclusionPolicy::new(
                    format!("{}_{excluded}", self.prefix),
                    ids.iter().copied().filter(|&id| id != excluded),
                )
            })
            .collect()
    }
}

/// For each id `k`, replace only `k`. Labels are `only_<k>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeEach;

impl PolicyGenerator for IncludeEach {
    fn policies(&self, ids: &[RegionId]) -> Vec<InclusionPolicy> {
        ids.iter()
            .map(|&id| InclusionPolicy::new(format!("only_{id}"), [id]))
            .collect()
    }
}

/// A single policy replacing every id, labelled `full_replacement`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceAll;

impl PolicyGenerator for ReplaceAll {
    fn policies(&self, ids: &[RegionId]) -> Vec<InclusionPolicy> {
        vec![InclusionPolicy::new("full_replacement", ids.iter().copied())]
    }
}

/// Caller-supplied policies, returned unchanged.
#[derive(Debug, Clone, Default)]
pub struct ExplicitPolicies(pub Vec<InclusionPolicy>);

impl PolicyGenerator for ExplicitPolicies {
    fn policies(&self, _ids: &[RegionId]) -> Vec<InclusionPolicy> {
        self.0.clone()
    }
}

/// Pick a generator from settings: explicit policies win over the mode.
pub fn generator_for(mode: VariantMode, explicit: &[PolicySpec]) -> Box<dyn PolicyGenerator> {
    if !explicit.is_empty() {
        return Box::new(ExplicitPolicies(
            explicit.iter().map(InclusionPolicy::from).collect(),
        ));
    }
    match mode {
        VariantMode::ExcludeEach => Box::new(ExcludeEach::default()),
        VariantMode::IncludeEach => Box::new(IncludeEach),
        VariantMode::All => Box::new(ReplaceAll),
    }
}

/// A rendered variant.
#[derive(Debug, Clone)]
pub struct Variant {
    pub label: String,
    pub include: BTreeSet<RegionId>,
    pub image: DynamicImage,
}

/// A policy that could not be rendered.
#[derive(Debug)]
pub struct VariantFailure {
    pub label: String,
    pub error: PipelineError,
}

/// Outcome of a variant run, in policy order.
#[derive(Debug, Default)]
pub struct VariantReport {
    pub variants: Vec<Variant>,
    pub failures: Vec<VariantFailure>,
}

impl VariantReport {
    fn from_results(results: Vec<(InclusionPolicy, Result<DynamicImage, PipelineError>)>) -> Self {
        let mut report = VariantReport::default();
        for (policy, result) in results {
            match result {
                Ok(image) => report.variants.push(Variant {
                    label: policy.label,
                    include: policy.include,
                    image,
                }),
                Err(error) => {
                    warn!("variant '{}' failed: {error}", policy.label);
                    report.failures.push(VariantFailure {
                        label: policy.label,
                        error,
                    });
                }
            }
        }
        info!(
            "rendered {} variant(s), {} failed",
            report.variants.len(),
            report.failures.len()
        );
        report
    }
}

/// Runs one recomposition per policy over shared, read-only inputs.
///
/// Policy ids are drawn from the replacement keys, so only regions that have
/// an edited image take part.
pub struct VariantDriver<'a> {
    pub base: &'a DynamicImage,
    pub regions: &'a RegionTable,
    pub replacements: &'a Replacements,
    pub recompositor: Recompositor,
}

impl<'a> VariantDriver<'a> {
    pub fn new(
        base: &'a DynamicImage,
        regions: &'a RegionTable,
        replacements: &'a Replacements,
    ) -> Self {
        Self {
            base,
            regions,
            replacements,
            recompositor: Recompositor::default(),
        }
    }

    pub fn with_recompositor(mut self, recompositor: Recompositor) -> Self {
        self.recompositor = recompositor;
        self
    }

    fn policies(&self, generator: &dyn PolicyGenerator) -> Vec<InclusionPolicy> {
        let ids: Vec<RegionId> = self.replacements.keys().copied().collect();
        generator.policies(&ids)
    }

    fn render(&self, policy: &InclusionPolicy) -> Result<DynamicImage, PipelineError> {
        self.recompositor.recompose_with_policy(
            self.base,
            self.regions,
            self.replacements,
            &policy.include,
        )
    }

    /// Render every policy in turn. A failing policy is reported and skipped.
    pub fn generate(&self, generator: &dyn PolicyGenerator) -> VariantReport {
        let _guard = figcrop_utils::timing_guard("figcrop_core::generate_variants", log::Level::Info);
        let results = self
            .policies(generator)
            .into_iter()
            .map(|policy| {
                let result = self.render(&policy);
                (policy, result)
            })
            .collect();
        VariantReport::from_results(results)
    }

    /// Same as [`generate`](Self::generate), rendering policies on the rayon pool.
    pub fn generate_parallel(&self, generator: &dyn PolicyGenerator) -> VariantReport {
        let _guard = figcrop_utils::timing_guard(
            "figcrop_core::generate_variants_parallel",
            log::Level::Info,
        );
        let results = self
            .policies(generator)
            .into_par_iter()
            .map(|policy| {
                let result = self.render(&policy);
                (policy, result)
            })
            .collect();
        VariantReport::from_results(results)
    }
}

impl VariantDriver<'_> {
    /// Render policies one by one and hand each variant to `sink` as soon as it
    /// is ready, so only the variants in flight are held in memory.
    ///
    /// Returns the policies that failed to render; they do not stop siblings.
    pub fn for_each_variant<F>(
        &self,
        generator: &dyn PolicyGenerator,
        parallel: bool,
        sink: F,
    ) -> Vec<VariantFailure>
    where
        F: Fn(Variant) + Sync,
    {
        let _guard = figcrop_utils::timing_guard("figcrop_core::for_each_variant", log::Level::Info);
        let policies = self.policies(generator);
        let total = policies.len();
        let deliver = |policy: InclusionPolicy| match self.render(&policy) {
            Ok(image) => {
                sink(Variant {
                    label: policy.label,
                    include: policy.include,
                    image,
                });
                None
            }
            Err(error) => {
                warn!("variant '{}' failed: {error}", policy.label);
                Some(VariantFailure {
                    label: policy.label,
                    error,
                })
            }
        };
        let failures: Vec<VariantFailure> = if parallel {
            policies.into_par_iter().filter_map(deliver).collect()
        } else {
            policies.into_iter().filter_map(deliver).collect()
        };
        info!(
            "rendered {} variant(s), {} failed",
            total - failures.len(),
            failures.len()
        );
        failures
    }
}

/// Render one variant per policy with the default recompositor.
pub fn generate_variants(
    base: &DynamicImage,
    regions: &RegionTable,
    replacements: &Replacements,
    generator: &dyn PolicyGenerator,
) -> VariantReport {
    VariantDriver::new(base, regions, replacements).generate(generator)
}

/// Parallel counterpart of [`generate_variants`].
pub fn generate_variants_parallel(
    base: &DynamicImage,
    regions: &RegionTable,
    replacements: &Replacements,
    generator: &dyn PolicyGenerator,
) -> VariantReport {
    VariantDriver::new(base, regions, replacements).generate_parallel(generator)
}
