// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of transformation graphs.
//!
//! Checks run in a fixed order and accumulate every error found, like a
//! compiler:
//!
//! 1. **Steps**: unique names, at least one copy, at least one partition
//! 2. **Hops**: both endpoints exist
//! 3. **Routing**: error targets are hops, partitioned targets are not mixed
//!    with unpartitioned ones or with an explicit distributor, distributor
//!    codes are registered
//! 4. **Cycles**: DFS over the hops, only when the hops resolve
//!
//! # Examples
//!
//! ```rust
//! use the_conveyor::config::{validate_graph, GraphStep};
//! use the_conveyor::engine::Hop;
//! use the_conveyor::errors::ValidationError;
//! use the_conveyor::routing::DistributorRegistry;
//!
//! let steps = vec![GraphStep::new("generate", 1), GraphStep::new("log", 1)];
//! let hops = vec![Hop::new("generate", "log"), Hop::new("log", "generate")];
//!
//! let errors = validate_graph(&steps, &hops, &DistributorRegistry::with_builtins()).unwrap_err();
//! assert!(matches!(errors[0], ValidationError::CyclicHops { .. }));
//! ```

use std::collections::{HashMap, HashSet};

use crate::backends::local::LocalStepFactory;
use crate::config::Config;
use crate::engine::Hop;
use crate::errors::ValidationError;
use crate::observability::messages::validation::{ConfigValidated, ValidationFailed};
use crate::observability::messages::StructuredLog;
use crate::routing::DistributorRegistry;

/// The routing-relevant facts of one step.
#[derive(Debug, Clone, Copy)]
pub struct GraphStep<'a> {
    pub name: &'a str,
    pub copies: usize,
    /// Partition count when the step is partitioned.
    pub partitions: Option<usize>,
    pub distributor: Option<&'a str>,
    pub error_target: Option<&'a str>,
}

impl<'a> GraphStep<'a> {
    pub fn new(name: &'a str, copies: usize) -> Self {
        Self {
            name,
            copies,
            partitions: None,
            distributor: None,
            error_target: None,
        }
    }
}

/// Validates steps and hops, returning every error found.
pub fn validate_graph(
    steps: &[GraphStep<'_>],
    hops: &[Hop],
    distributors: &DistributorRegistry,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_steps(steps, distributors);
    let hop_errors = validate_hop_endpoints(steps, hops);
    let hops_resolve = hop_errors.is_empty();
    errors.extend(hop_errors);

    if hops_resolve {
        errors.extend(validate_routing(steps, hops));
        if let Some(cycle) = find_cycle(steps, hops) {
            errors.push(ValidationError::CyclicHops { cycle });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a loaded configuration: the graph plus the step types and
/// distribution defaults it names.
pub fn validate_config(
    config: &Config,
    distributors: &DistributorRegistry,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for step in &config.steps {
        if !LocalStepFactory::supports(&step.step_type) {
            errors.push(ValidationError::UnknownStepType {
                step: step.name.clone(),
                step_type: step.step_type.clone(),
            });
        }
    }
    for code in [&config.distribution.distributing, &config.distribution.copying] {
        if !distributors.contains(code) {
            errors.push(ValidationError::UnknownDistributor {
                step: "distribution".to_string(),
                code: code.clone(),
            });
        }
    }

    let graph: Vec<GraphStep<'_>> = config.steps.iter().map(|s| s.graph_step()).collect();
    if let Err(graph_errors) = validate_graph(&graph, &config.hops, distributors) {
        errors.extend(graph_errors);
    }

    if errors.is_empty() {
        ConfigValidated {
            steps: config.steps.len(),
            hops: config.hops.len(),
        }
        .log();
        Ok(())
    } else {
        for error in &errors {
            ValidationFailed { error }.log();
        }
        Err(errors)
    }
}

fn validate_steps(steps: &[GraphStep<'_>], distributors: &DistributorRegistry) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    let mut errors = Vec::new();

    for step in steps {
        if !seen.insert(step.name) {
            errors.push(ValidationError::DuplicateStep {
                step: step.name.to_string(),
            });
        }
        if step.copies == 0 {
            errors.push(ValidationError::ZeroCopies {
                step: step.name.to_string(),
            });
        }
        if step.partitions == Some(0) {
            errors.push(ValidationError::ZeroPartitions {
                step: step.name.to_string(),
            });
        }
        if let Some(code) = step.distributor {
            if !distributors.contains(code) {
                errors.push(ValidationError::UnknownDistributor {
                    step: step.name.to_string(),
                    code: code.to_string(),
                });
            }
        }
    }
    errors
}

fn validate_hop_endpoints(steps: &[GraphStep<'_>], hops: &[Hop]) -> Vec<ValidationError> {
    let names: HashSet<&str> = steps.iter().map(|s| s.name).collect();
    let mut errors = Vec::new();

    for hop in hops {
        for endpoint in [&hop.from, &hop.to] {
            if !names.contains(endpoint.as_str()) {
                errors.push(ValidationError::UnknownHopEndpoint {
                    from: hop.from.clone(),
                    to: hop.to.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
    }
    errors
}

fn validate_routing(steps: &[GraphStep<'_>], hops: &[Hop]) -> Vec<ValidationError> {
    let by_name: HashMap<&str, &GraphStep<'_>> = steps.iter().map(|s| (s.name, s)).collect();
    let mut errors = Vec::new();

    for step in steps {
        let targets: Vec<&str> = hops
            .iter()
            .filter(|h| h.from == step.name)
            .map(|h| h.to.as_str())
            .collect();

        if let Some(target) = step.error_target {
            if !targets.contains(&target) {
                errors.push(ValidationError::ErrorTargetNotHop {
                    step: step.name.to_string(),
                    target: target.to_string(),
                });
            }
        }

        let normal: Vec<&GraphStep<'_>> = targets
            .iter()
            .filter(|t| Some(**t) != step.error_target)
            .filter_map(|t| by_name.get(t).copied())
            .collect();
        let partitioned: Vec<&GraphStep<'_>> =
            normal.iter().copied().filter(|t| t.partitions.is_some()).collect();
        if partitioned.is_empty() {
            continue;
        }
        if partitioned.len() != normal.len() {
            errors.push(ValidationError::MixedPartitionedTargets {
                step: step.name.to_string(),
            });
        }
        if step.distributor.is_some() {
            for target in partitioned {
                errors.push(ValidationError::PartitioningWithDistributor {
                    step: step.name.to_string(),
                    target: target.name.to_string(),
                });
            }
        }
    }
    errors
}

/// Returns the first loop found, closed by repeating its first step.
fn find_cycle(steps: &[GraphStep<'_>], hops: &[Hop]) -> Option<Vec<String>> {
    let mut graph: HashMap<&str, Vec<&str>> = steps.iter().map(|s| (s.name, Vec::new())).collect();
    for hop in hops {
        if let Some(targets) = graph.get_mut(hop.from.as_str()) {
            targets.push(hop.to.as_str());
        }
    }

    let mut visited = HashSet::new();
    let mut on_path = HashSet::new();
    let mut path = Vec::new();
    for step in steps {
        if !visited.contains(step.name) {
            if let Some(cycle) = visit(step.name, &graph, &mut visited, &mut on_path, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    on_path: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    on_path.insert(node);
    path.push(node);

    for &next in graph.get(node).map(Vec::as_slice).unwrap_or_default() {
        if on_path.contains(next) {
            let start = path.iter().position(|n| *n == next).unwrap_or(0);
            let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
            cycle.push(next.to_string());
            return Some(cycle);
        }
        if !visited.contains(next) {
            if let Some(cycle) = visit(next, graph, visited, on_path, path) {
                return Some(cycle);
            }
        }
    }

    on_path.remove(node);
    path.pop();
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn partitioned(name: &str, copies: usize, partitions: usize) -> GraphStep<'_> {
        GraphStep {
            partitions: Some(partitions),
            ..GraphStep::new(name, copies)
        }
    }

    #[test]
    fn graph_validation_table() {
        struct TestCase {
            name: &'static str,
            steps: Vec<GraphStep<'static>>,
            hops: Vec<Hop>,
            expected: Vec<ValidationError>,
        }

        let test_cases = vec![
            TestCase {
                name: "linear graph is valid",
                steps: vec![GraphStep::new("a", 1), GraphStep::new("b", 2)],
                hops: vec![Hop::new("a", "b")],
                expected: vec![],
            },
            TestCase {
                name: "duplicate and zero copies accumulate",
                steps: vec![GraphStep::new("a", 1), GraphStep::new("a", 0)],
                hops: vec![],
                expected: vec![
                    ValidationError::DuplicateStep {
                        step: "a".to_string(),
                    },
                    ValidationError::ZeroCopies {
                        step: "a".to_string(),
                    },
                ],
            },
            TestCase {
                name: "unknown hop endpoint",
                steps: vec![GraphStep::new("a", 1)],
                hops: vec![Hop::new("a", "ghost")],
                expected: vec![ValidationError::UnknownHopEndpoint {
                    from: "a".to_string(),
                    to: "ghost".to_string(),
                    missing: "ghost".to_string(),
                }],
            },
            TestCase {
                name: "self loop",
                steps: vec![GraphStep::new("a", 1)],
                hops: vec![Hop::new("a", "a")],
                expected: vec![ValidationError::CyclicHops {
                    cycle: vec!["a".to_string(), "a".to_string()],
                }],
            },
            TestCase {
                name: "loop through three steps",
                steps: vec![GraphStep::new("a", 1), GraphStep::new("b", 1), GraphStep::new("c", 1)],
                hops: vec![Hop::new("a", "b"), Hop::new("b", "c"), Hop::new("c", "b")],
                expected: vec![ValidationError::CyclicHops {
                    cycle: vec!["b".to_string(), "c".to_string(), "b".to_string()],
                }],
            },
            TestCase {
                name: "error target must be a hop",
                steps: vec![
                    GraphStep {
                        error_target: Some("rejects"),
                        ..GraphStep::new("check", 1)
                    },
                    GraphStep::new("rejects", 1),
                ],
                hops: vec![],
                expected: vec![ValidationError::ErrorTargetNotHop {
                    step: "check".to_string(),
                    target: "rejects".to_string(),
                }],
            },
            TestCase {
                name: "partitioned and plain targets mixed",
                steps: vec![GraphStep::new("a", 1), partitioned("b", 2, 4), GraphStep::new("c", 1)],
                hops: vec![Hop::new("a", "b"), Hop::new("a", "c")],
                expected: vec![ValidationError::MixedPartitionedTargets {
                    step: "a".to_string(),
                }],
            },
            TestCase {
                name: "error target does not count as a plain target",
                steps: vec![
                    GraphStep {
                        error_target: Some("rejects"),
                        ..GraphStep::new("a", 1)
                    },
                    partitioned("b", 2, 2),
                    GraphStep::new("rejects", 1),
                ],
                hops: vec![Hop::new("a", "b"), Hop::new("a", "rejects")],
                expected: vec![],
            },
            TestCase {
                name: "distributor feeding a partitioned step",
                steps: vec![
                    GraphStep {
                        distributor: Some("broadcast"),
                        ..GraphStep::new("a", 1)
                    },
                    partitioned("b", 2, 2),
                ],
                hops: vec![Hop::new("a", "b")],
                expected: vec![ValidationError::PartitioningWithDistributor {
                    step: "a".to_string(),
                    target: "b".to_string(),
                }],
            },
            TestCase {
                name: "zero partitions and unknown distributor",
                steps: vec![
                    GraphStep {
                        distributor: Some("scatter"),
                        ..partitioned("a", 1, 0)
                    },
                ],
                hops: vec![],
                expected: vec![
                    ValidationError::ZeroPartitions {
                        step: "a".to_string(),
                    },
                    ValidationError::UnknownDistributor {
                        step: "a".to_string(),
                        code: "scatter".to_string(),
                    },
                ],
            },
        ];

        let distributors = DistributorRegistry::with_builtins();
        for test_case in test_cases {
            let result = validate_graph(&test_case.steps, &test_case.hops, &distributors);
            let errors = result.err().unwrap_or_default();
            assert_eq!(errors, test_case.expected, "Test case '{}'", test_case.name);
        }
    }
}
