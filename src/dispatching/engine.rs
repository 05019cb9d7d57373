//! Rule engine for multi-criteria dispatching.
//!
//! Composes multiple dispatching rules with configurable evaluation modes
//! and a deterministic final tie-break.
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::cmp::Ordering;
use std::sync::Arc;

use super::{rules, Candidate, DispatchingRule, RuleScore, SchedulingContext};

/// How multiple rules are combined.
#[derive(Debug, Clone, Default)]
pub enum EvaluationMode {
    /// Apply rules in sequence; use next rule only on ties.
    #[default]
    Sequential,
    /// Compute weighted sum of all rule scores.
    Weighted,
}

/// How ties are broken after all rules are exhausted.
#[derive(Debug, Clone, Default)]
pub enum TieBreaker {
    /// Stable input order (`Candidate::sequence`).
    #[default]
    InputOrder,
    /// Ascending operation id.
    ById,
}

#[derive(Clone)]
struct WeightedRule {
    rule: Arc<dyn DispatchingRule>,
    weight: f64,
}

/// A composable rule engine for candidate prioritization.
///
/// # Example
/// ```
/// use jobshop_sim::dispatching::RuleEngine;
/// use jobshop_sim::dispatching::rules;
///
/// let engine = RuleEngine::new()
///     .with_rule(rules::Spt)
///     .with_tie_breaker(rules::EarliestStart);
/// assert_eq!(engine.rule_names(), vec!["SPT", "EST"]);
/// ```
#[derive(Clone)]
pub struct RuleEngine {
    rules: Vec<WeightedRule>,
    mode: EvaluationMode,
    tie_breaker: TieBreaker,
    epsilon: f64,
}

impl RuleEngine {
    /// Creates an empty rule engine.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            mode: EvaluationMode::Sequential,
            tie_breaker: TieBreaker::InputOrder,
            epsilon: 1e-9,
        }
    }

    /// Engine used by the planner unless configured otherwise: SPT.
    pub fn spt() -> Self {
        Self::new().with_rule(rules::Spt)
    }

    /// Adds a primary rule (weight 1.0).
    pub fn with_rule<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight: 1.0,
        });
        self
    }

    /// Adds a weighted rule.
    pub fn with_weighted_rule<R: DispatchingRule + 'static>(
        mut self,
        rule: R,
        weight: f64,
    ) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight,
        });
        self
    }

    /// Adds a tie-breaking rule (weight 0.0, used only in Sequential mode).
    pub fn with_tie_breaker<R: DispatchingRule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight: 0.0,
        });
        self
    }

    /// Sets the evaluation mode.
    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the final tie-breaking strategy.
    pub fn with_final_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    /// Names of the configured rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|wr| wr.rule.name()).collect()
    }

    /// Sorts candidates by priority (highest priority first).
    ///
    /// Returns indices into `candidates`.
    pub fn sort_indices(&self, candidates: &[&Candidate], context: &SchedulingContext) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..candidates.len()).collect();

        match &self.mode {
            EvaluationMode::Sequential => {
                indices.sort_by(|&a, &b| {
                    self.compare_sequential(candidates[a], candidates[b], context)
                });
            }
            EvaluationMode::Weighted => {
                let scores: Vec<f64> = candidates
                    .iter()
                    .map(|c| self.weighted_score(c, context))
                    .collect();
                indices.sort_by(|&a, &b| {
                    if (scores[a] - scores[b]).abs() > self.epsilon {
                        scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal)
                    } else {
                        self.break_tie(candidates[a], candidates[b])
                    }
                });
            }
        }

        indices
    }

    /// Returns the index of the highest-priority candidate.
    pub fn select_best(&self, candidates: &[&Candidate], context: &SchedulingContext) -> Option<usize> {
        self.sort_indices(candidates, context).first().copied()
    }

    /// Evaluates a single candidate and returns weighted scores from each rule.
    pub fn evaluate(&self, candidate: &Candidate, context: &SchedulingContext) -> Vec<RuleScore> {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(candidate, context) * wr.weight)
            .collect()
    }

    fn compare_sequential(
        &self,
        a: &Candidate,
        b: &Candidate,
        context: &SchedulingContext,
    ) -> Ordering {
        for wr in &self.rules {
            let score_a = wr.rule.evaluate(a, context);
            let score_b = wr.rule.evaluate(b, context);

            if (score_a - score_b).abs() > self.epsilon {
                return score_a.partial_cmp(&score_b).unwrap_or(Ordering::Equal);
            }
        }
        self.break_tie(a, b)
    }

    fn break_tie(&self, a: &Candidate, b: &Candidate) -> Ordering {
        match &self.tie_breaker {
            TieBreaker::InputOrder => a.sequence.cmp(&b.sequence),
            TieBreaker::ById => a.operation.cmp(&b.operation),
        }
    }

    fn weighted_score(&self, candidate: &Candidate, context: &SchedulingContext) -> f64 {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(candidate, context) * wr.weight)
            .sum()
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::spt()
    }
}

impl std::fmt::Debug for RuleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEngine")
            .field(
                "rules",
                &self
                    .rules
                    .iter()
                    .map(|r| format!("{}(w={})", r.rule.name(), r.weight))
                    .collect::<Vec<_>>(),
            )
            .field("mode", &self.mode)
            .field("tie_breaker", &self.tie_breaker)
            .finish()
    }
}
