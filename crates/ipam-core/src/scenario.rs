//! Ordered scenario execution
//!
//! A [`Scenario`] is an ordered list of reconcile steps, optionally
//! annotated with the [`ChangeResult`] each step is expected to produce.
//! Steps run strictly in order; the first error (including an expectation
//! mismatch) stops the run. No step references a resource that a later
//! step creates.
//!
//! The [`conformance`] module generates the built-in per-kind test
//! scenarios: create, create again (expect `unchanged`), update a field
//! (expect `updated`), delete (expect `deleted`), delete again (expect
//! `unchanged`).

use crate::engine::Reconciler;
use crate::error::{Error, Result};
use crate::resource::{ChangeResult, Descriptor, DesiredState, ResourceKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::StreamExt;
use tracing::info;

/// One reconcile step within a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// The desired resource description
    pub descriptor: Descriptor,

    /// Target state (defaults to `present`)
    #[serde(default)]
    pub state: DesiredState,

    /// Expected outcome; when set, a differing result aborts the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect: Option<ChangeResult>,
}

impl Step {
    /// A `present` step without an expectation
    pub fn present(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            state: DesiredState::Present,
            expect: None,
        }
    }

    /// An `absent` step without an expectation
    pub fn absent(descriptor: Descriptor) -> Self {
        Self {
            descriptor,
            state: DesiredState::Absent,
            expect: None,
        }
    }

    /// Attach an expected outcome
    pub fn expecting(mut self, expect: ChangeResult) -> Self {
        self.expect = Some(expect);
        self
    }
}

/// An ordered list of reconcile steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name, used in logs and assertion messages
    pub name: String,

    /// The steps, in execution order
    pub steps: Vec<Step>,
}

/// Outcome of a single executed step
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepOutcome {
    /// Zero-based position in the scenario
    pub index: usize,
    /// Kind of the reconciled resource
    pub kind: ResourceKind,
    /// Natural key of the reconciled resource
    pub key: String,
    /// The target state of the step
    pub state: DesiredState,
    /// What the reconcile reported
    pub result: ChangeResult,
}

/// Result of a completed scenario run
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Per-step outcomes, in execution order
    pub outcomes: Vec<StepOutcome>,
    /// Whether any step mutated remote state
    pub changed: bool,
}

/// Run a scenario to completion
///
/// Steps are driven as a lazy, strictly sequential stream: each reconcile
/// finishes (a blocking network round trip) before the next begins. The
/// first failing step — an API error or an expectation mismatch — ends the
/// run with that error.
pub async fn run(reconciler: &Reconciler, scenario: &Scenario) -> Result<ScenarioReport> {
    let started_at = Utc::now();
    let mut outcomes = Vec::with_capacity(scenario.steps.len());

    let mut steps = tokio_stream::iter(scenario.steps.iter().enumerate());
    while let Some((index, step)) = steps.next().await {
        let result = reconciler.ensure(&step.descriptor, step.state).await?;

        info!(
            scenario = %scenario.name,
            step = index + 1,
            kind = %step.descriptor.kind,
            key = %step.descriptor.key_display(),
            state = %step.state,
            %result,
            "Step finished"
        );

        if let Some(expected) = step.expect
            && expected != result
        {
            return Err(Error::Assertion {
                step: format!(
                    "{}#{} {}/{}",
                    scenario.name,
                    index + 1,
                    step.descriptor.kind,
                    step.descriptor.key_display()
                ),
                expected,
                actual: result,
            });
        }

        outcomes.push(StepOutcome {
            index,
            kind: step.descriptor.kind,
            key: step.descriptor.key_display(),
            state: step.state,
            result,
        });
    }

    let changed = outcomes.iter().any(|o| o.result.changed());
    Ok(ScenarioReport {
        name: scenario.name.clone(),
        started_at,
        outcomes,
        changed,
    })
}

/// Built-in conformance scenarios
///
/// One scenario per resource kind, each encoding the canonical
/// create/create-again/update/delete/delete-again sequence with its
/// expected outcomes. Kinds with parent resources (VLAN, subnet) provision
/// the parent first and tear it down last, without expectations.
pub mod conformance {
    use super::*;

    /// The full conformance suite, in dependency-safe order
    pub fn suite() -> Vec<Scenario> {
        vec![section(), l2domain(), vlan(), subnet(), location(), tag()]
    }

    /// The canonical five-step sequence for one resource
    fn lifecycle(create: Descriptor, update: Descriptor) -> Vec<Step> {
        vec![
            Step::present(create.clone()).expecting(ChangeResult::Created),
            Step::present(create.clone()).expecting(ChangeResult::Unchanged),
            Step::present(update).expecting(ChangeResult::Updated),
            Step::absent(create.clone()).expecting(ChangeResult::Deleted),
            Step::absent(create).expecting(ChangeResult::Unchanged),
        ]
    }

    fn section() -> Scenario {
        let create = Descriptor::new(ResourceKind::Section)
            .field("name", "conformance-section")
            .field("description", "conformance suite")
            .field("strict_mode", "yes");
        let update = create
            .clone()
            .field("description", "conformance suite (updated)");
        Scenario {
            name: "conformance-section".to_string(),
            steps: lifecycle(create, update),
        }
    }

    fn l2domain() -> Scenario {
        let create = Descriptor::new(ResourceKind::L2Domain)
            .field("name", "conformance-domain")
            .field("description", "conformance suite");
        let update = create
            .clone()
            .field("description", "conformance suite (updated)");
        Scenario {
            name: "conformance-l2domain".to_string(),
            steps: lifecycle(create, update),
        }
    }

    fn vlan() -> Scenario {
        let domain = Descriptor::new(ResourceKind::L2Domain)
            .field("name", "conformance-vlan-domain")
            .field("description", "conformance suite parent");
        let create = Descriptor::new(ResourceKind::Vlan)
            .field("number", "1410")
            .field("name", "conformance-vlan")
            .field("routing_domain", "conformance-vlan-domain")
            .field("description", "conformance suite");
        let update = create
            .clone()
            .field("description", "conformance suite (updated)");

        let mut steps = vec![Step::present(domain.clone())];
        steps.extend(lifecycle(create, update));
        steps.push(Step::absent(domain));
        Scenario {
            name: "conformance-vlan".to_string(),
            steps,
        }
    }

    fn subnet() -> Scenario {
        let section = Descriptor::new(ResourceKind::Section)
            .field("name", "conformance-subnet-section")
            .field("description", "conformance suite parent");
        let create = Descriptor::new(ResourceKind::Subnet)
            .field("cidr", "10.110.0.0/24")
            .field("section", "conformance-subnet-section")
            .field("description", "conformance suite")
            .field("show_name", "yes");
        let update = create
            .clone()
            .field("description", "conformance suite (updated)");

        let mut steps = vec![Step::present(section.clone())];
        steps.extend(lifecycle(create, update));
        steps.push(Step::absent(section));
        Scenario {
            name: "conformance-subnet".to_string(),
            steps,
        }
    }

    fn location() -> Scenario {
        let create = Descriptor::new(ResourceKind::Location)
            .field("name", "conformance-location")
            .field("description", "conformance suite")
            .field("address", "1 Example Way");
        let update = create.clone().field("address", "2 Example Way");
        Scenario {
            name: "conformance-location".to_string(),
            steps: lifecycle(create, update),
        }
    }

    fn tag() -> Scenario {
        let create = Descriptor::new(ResourceKind::Tag)
            .field("name", "conformance-tag")
            .field("bg_color", "red");
        let update = create.clone().field("bg_color", "yellow");
        Scenario {
            name: "conformance-tag".to_string(),
            steps: lifecycle(create, update),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_json_round_trip() {
        let json = r#"{
            "descriptor": {"kind": "tag", "fields": {"name": "backbone", "bg_color": "red"}},
            "state": "present",
            "expect": "created"
        }"#;
        let step: Step = serde_json::from_str(json).unwrap();
        assert_eq!(step.state, DesiredState::Present);
        assert_eq!(step.expect, Some(ChangeResult::Created));
        let back = serde_json::to_string(&step).unwrap();
        let reparsed: Step = serde_json::from_str(&back).unwrap();
        assert_eq!(reparsed, step);
    }

    #[test]
    fn state_defaults_to_present_in_scenario_files() {
        let step: Step = serde_json::from_str(
            r#"{"descriptor": {"kind": "section", "fields": {"name": "lab"}}}"#,
        )
        .unwrap();
        assert_eq!(step.state, DesiredState::Present);
        assert_eq!(step.expect, None);
    }

    #[test]
    fn conformance_suite_covers_every_kind() {
        let suite = conformance::suite();
        assert_eq!(suite.len(), ResourceKind::ALL.len());
        for scenario in &suite {
            // Every scenario ends with the resource (and any parent) gone.
            assert_eq!(scenario.steps.last().unwrap().state, DesiredState::Absent);
        }
    }

    #[test]
    fn conformance_lifecycle_expectations_are_canonical() {
        let tag = conformance::suite().pop().unwrap();
        let expects: Vec<_> = tag.steps.iter().filter_map(|s| s.expect).collect();
        assert_eq!(
            expects,
            vec![
                ChangeResult::Created,
                ChangeResult::Unchanged,
                ChangeResult::Updated,
                ChangeResult::Deleted,
                ChangeResult::Unchanged,
            ]
        );
    }
}
