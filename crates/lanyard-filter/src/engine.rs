//! The attribute filter engine.

use std::collections::{BTreeMap, HashSet};

use lanyard_types::{AttributeMap, AttributeValue};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::FilterContext;
use crate::error::{FilterConfigError, Result};
use crate::policy::AttributeFilterPolicy;
use crate::tristate::Tristate;

// ============================================================================
// Report
// ============================================================================

/// Requirement outcome of one policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyOutcome {
    pub policy: String,
    pub requirement: Tristate,
}

/// Which side of an attribute rule failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSide {
    Permit,
    Deny,
}

/// A permit or deny evaluation that returned `Fail` for one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueFailure {
    pub policy: String,
    pub attribute: String,
    pub value: AttributeValue,
    pub side: RuleSide,
}

/// Diagnostics of one [`AttributeFilter::filter`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    /// Requirement outcome per policy, in evaluation order.
    pub policies: Vec<PolicyOutcome>,
    /// Value-level evaluations that failed.
    pub value_failures: Vec<ValueFailure>,
    /// Attributes that kept at least one value.
    pub released: Vec<String>,
    /// Attributes that lost every value.
    pub removed: Vec<String>,
    /// Values that were permitted but removed by a deny rule.
    pub denied_values: usize,
}

impl FilterReport {
    pub fn outcome(&self, policy: &str) -> Option<Tristate> {
        self.policies
            .iter()
            .find(|o| o.policy == policy)
            .map(|o| o.requirement)
    }

    /// Policies whose requirement evaluated to `True`.
    pub fn applied_policies(&self) -> impl Iterator<Item = &str> {
        self.with_outcome(Tristate::True)
    }

    /// Policies whose requirement could not be evaluated.
    pub fn failed_policies(&self) -> impl Iterator<Item = &str> {
        self.with_outcome(Tristate::Fail)
    }

    fn with_outcome(&self, outcome: Tristate) -> impl Iterator<Item = &str> {
        self.policies
            .iter()
            .filter(move |o| o.requirement == outcome)
            .map(|o| o.policy.as_str())
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Collects policies and validates them into an [`AttributeFilter`].
#[derive(Debug)]
pub struct AttributeFilterBuilder {
    id: String,
    policies: Vec<AttributeFilterPolicy>,
    audit_enabled: bool,
}

impl AttributeFilterBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            policies: Vec::new(),
            audit_enabled: true,
        }
    }

    pub fn with_policy(mut self, policy: AttributeFilterPolicy) -> Self {
        self.policies.push(policy);
        self
    }

    /// Disables per-attribute release logging.
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    pub fn build(self) -> Result<AttributeFilter> {
        let mut seen = HashSet::new();
        for policy in &self.policies {
            if !seen.insert(policy.id()) {
                return Err(FilterConfigError::DuplicatePolicy(policy.id().to_string()));
            }
            policy.validate()?;
        }

        info!(filter = %self.id, policies = self.policies.len(), "attribute filter built");
        Ok(AttributeFilter {
            id: self.id,
            policies: self.policies,
            audit_enabled: self.audit_enabled,
        })
    }
}

// ============================================================================
// Filter
// ============================================================================

/// Immutable set of filter policies, shareable across threads.
#[derive(Debug)]
pub struct AttributeFilter {
    id: String,
    policies: Vec<AttributeFilterPolicy>,
    audit_enabled: bool,
}

#[derive(Debug)]
struct Verdicts {
    permitted: Vec<bool>,
    denied: Vec<bool>,
}

impl AttributeFilter {
    pub fn builder(id: impl Into<String>) -> AttributeFilterBuilder {
        AttributeFilterBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn policies(&self) -> &[AttributeFilterPolicy] {
        &self.policies
    }

    /// Reduces the context's attributes to the permitted values.
    ///
    /// A value is released when at least one applicable permit rule
    /// returns `True` for it and no applicable deny rule returns `True` or
    /// `Fail`. Attributes left without values are dropped.
    pub fn filter(&self, ctx: &mut FilterContext) -> FilterReport {
        let mut report = FilterReport::default();
        let unfiltered = ctx.unfiltered_attributes();
        let mut verdicts: BTreeMap<&str, Verdicts> = BTreeMap::new();

        for policy in &self.policies {
            let requirement = policy.requirement().evaluate_request(ctx);
            report.policies.push(PolicyOutcome {
                policy: policy.id().to_string(),
                requirement,
            });
            match requirement {
                Tristate::True => debug!(policy = %policy.id(), "filter policy applies"),
                Tristate::False => {
                    debug!(policy = %policy.id(), "filter policy does not apply");
                    continue;
                }
                Tristate::Fail => {
                    warn!(policy = %policy.id(), "filter policy requirement failed, policy skipped");
                    continue;
                }
            }

            for rule in policy.rules() {
                // verdicts follow the map key, which need not equal the attribute's own id
                let Some((key, attribute)) = unfiltered.get_key_value(rule.attribute_id()) else {
                    continue;
                };
                let entry = verdicts.entry(key.as_str()).or_insert_with(|| Verdicts {
                    permitted: vec![false; attribute.len()],
                    denied: vec![false; attribute.len()],
                });

                for (i, value) in attribute.values().iter().enumerate() {
                    if rule.has_permits() {
                        match rule.permits(ctx, value) {
                            Tristate::True => entry.permitted[i] = true,
                            Tristate::False => {}
                            Tristate::Fail => report.value_failures.push(ValueFailure {
                                policy: policy.id().to_string(),
                                attribute: key.clone(),
                                value: value.clone(),
                                side: RuleSide::Permit,
                            }),
                        }
                    }
                    if rule.has_denies() {
                        match rule.denies(ctx, value) {
                            Tristate::True => entry.denied[i] = true,
                            Tristate::False => {}
                            Tristate::Fail => {
                                entry.denied[i] = true;
                                report.value_failures.push(ValueFailure {
                                    policy: policy.id().to_string(),
                                    attribute: key.clone(),
                                    value: value.clone(),
                                    side: RuleSide::Deny,
                                });
                            }
                        }
                    }
                }
            }
        }

        let mut filtered = AttributeMap::new();
        for (id, attribute) in unfiltered {
            let mut kept = attribute.clone();
            match verdicts.get(id.as_str()) {
                Some(v) => {
                    report.denied_values += v
                        .permitted
                        .iter()
                        .zip(&v.denied)
                        .filter(|(p, d)| **p && **d)
                        .count();
                    let mut index = 0;
                    kept.retain_values(|_| {
                        let keep = v.permitted[index] && !v.denied[index];
                        index += 1;
                        keep
                    });
                }
                None => kept.retain_values(|_| false),
            }

            if kept.is_empty() {
                if self.audit_enabled {
                    info!(
                        attribute = %id,
                        requester = ?ctx.requester(),
                        "attribute withheld by filter"
                    );
                }
                report.removed.push(id.clone());
            } else {
                if self.audit_enabled && kept.len() < attribute.len() {
                    info!(
                        attribute = %id,
                        requester = ?ctx.requester(),
                        released = kept.len(),
                        withheld = attribute.len() - kept.len(),
                        "attribute values filtered"
                    );
                }
                report.released.push(id.clone());
                filtered.insert(id.clone(), kept);
            }
        }

        info!(
            filter = %self.id,
            policies = self.policies.len(),
            released = report.released.len(),
            removed = report.removed.len(),
            failures = report.value_failures.len(),
            "attribute filtering complete"
        );
        ctx.set_filtered_attributes(filtered);
        report
    }
}
