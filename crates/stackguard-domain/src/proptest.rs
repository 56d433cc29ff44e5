//! Property-based tests for the domain crate.
//!
//! These tests use proptest to verify invariants around:
//! - Evaluation determinism and sequential/parallel equivalence
//! - Kind-based dispatch (unrelated resources never trigger rules)
//! - Enforcement-level finalization and verdicts

use crate::engine::{EvalOptions, evaluate, evaluate_with};
use crate::model::{Resource, StackSnapshot};
use crate::reporter::ViolationReporter;
use crate::rules::build_registry;
use crate::test_support::config_enabling;
use proptest::prelude::*;
use serde_json::{Map, Value, json};
use stackguard_types::{EnforcementLevel, Severity, Verdict, Violation, ids};

// ============================================================================
// Strategies
// ============================================================================

const KNOWN_TYPES: &[&str] = &[
    "aws:ec2/vpc:Vpc",
    "aws:ec2/subnet:Subnet",
    "aws:ec2/securityGroupRule:SecurityGroupRule",
    "aws:ec2/route:Route",
    "aws:ec2/internetGateway:InternetGateway",
    "aws:ec2/vpcEndpoint:VpcEndpoint",
    "aws:ec2/flowLog:FlowLog",
    "aws:ec2/instance:Instance",
    "aws:lambda/function:Function",
    "aws:s3/bucket:Bucket",
    "aws:rds/instance:Instance",
    "aws:iam/role:Role",
    "aws:iam/policy:Policy",
    "aws:iam/rolePolicyAttachment:RolePolicyAttachment",
    "aws:secretsmanager/secret:Secret",
    "aws:secretsmanager/secretRotation:SecretRotation",
    "aws:apigateway/restApi:RestApi",
    "aws:apigateway/stage:Stage",
];

/// Property names the built-in rules read, so generated resources actually exercise them.
const KNOWN_KEYS: &[&str] = &[
    "id",
    "acl",
    "cidrBlock",
    "cidrBlocks",
    "fromPort",
    "toPort",
    "vpcId",
    "gatewayId",
    "instanceType",
    "associatePublicIpAddress",
    "enableDnsSupport",
    "mapPublicIpOnLaunch",
    "versioning",
    "rootBlockDevice",
    "ebsBlockDevices",
    "assumeRolePolicy",
    "policy",
    "backupRetentionPeriod",
    "username",
    "endpointConfiguration",
    "serviceName",
    "role",
    "policyArn",
    "arn",
];

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-10i64..70_000).prop_map(|n| json!(n)),
        "[a-z0-9./*:-]{0,16}".prop_map(Value::String),
        prop_oneof![
            Just("0.0.0.0/0"),
            Just("10.0.0.0/16"),
            Just("54.1.0.0/16"),
            Just("vpc-1"),
            Just("igw-1"),
            Just("public-read"),
        ]
        .prop_map(|s| Value::String(s.to_string())),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(2, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z]{1,8}|enabled|encrypted|types", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

fn arb_properties() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::vec((prop::sample::select(KNOWN_KEYS), arb_value()), 0..8).prop_map(
        |pairs| {
            pairs
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect()
        },
    )
}

fn arb_resource(types: &'static [&'static str]) -> impl Strategy<Value = Resource> {
    (prop::sample::select(types), "[a-z][a-z0-9-]{0,10}", arb_properties())
        .prop_map(|(t, name, props)| Resource::new(t, name, props))
}

fn arb_snapshot() -> impl Strategy<Value = StackSnapshot> {
    prop::collection::vec(arb_resource(KNOWN_TYPES), 0..12).prop_map(StackSnapshot::new)
}

const UNRELATED_TYPES: &[&str] = &[
    "gcp:storage/bucket:Bucket",
    "azure-native:network:VirtualNetwork",
    "kubernetes:core/v1:Service",
    "random:index/randomPassword:RandomPassword",
];

fn arb_violation() -> impl Strategy<Value = Violation> {
    (
        "[a-z-]{1,12}",
        prop::option::of("[a-z]{1,6}"),
        prop_oneof![Just(Severity::Advisory), Just(Severity::Mandatory)],
    )
        .prop_map(|(rule, name, severity)| {
            let r = name.map(|n| stackguard_types::ResourceRef::new("aws:s3/bucket:Bucket", n));
            Violation::new(rule, r.as_ref(), "m", severity)
        })
}

fn everything_enabled() -> crate::registry::RuleRegistry {
    build_registry(&config_enabling(ids::all_rule_ids())).expect("builtin registry")
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Running the same pass twice yields the same ordered list.
    #[test]
    fn evaluation_is_deterministic(snapshot in arb_snapshot()) {
        let registry = everything_enabled();
        let first = evaluate(&snapshot, &registry);
        let second = evaluate(&snapshot, &registry);
        prop_assert_eq!(first, second);
    }

    /// Fresh registries built from the same rule set carry no state between passes.
    #[test]
    fn fresh_registries_agree(snapshot in arb_snapshot()) {
        let a = evaluate(&snapshot, &everything_enabled());
        let b = evaluate(&snapshot, &everything_enabled());
        prop_assert_eq!(a, b);
    }

    /// Parallel evaluation never changes the observable order.
    #[test]
    fn parallel_matches_sequential(snapshot in arb_snapshot()) {
        let registry = everything_enabled();
        let sequential = evaluate(&snapshot, &registry);
        let parallel = evaluate_with(
            &snapshot,
            &registry,
            &EvalOptions { parallel: true, ..EvalOptions::default() },
        );
        prop_assert_eq!(sequential, parallel);
    }

    /// Built-in rules reject odd shapes with errors, never with panics.
    #[test]
    fn builtin_rules_do_not_panic(snapshot in arb_snapshot()) {
        for v in evaluate(&snapshot, &everything_enabled()) {
            prop_assert!(!v.message.contains("rule panicked"), "{}", v.message);
        }
    }

    /// Resources no rule matches contribute nothing.
    #[test]
    fn unrelated_resources_trigger_nothing(
        resources in prop::collection::vec(arb_resource(UNRELATED_TYPES), 0..10)
    ) {
        let snapshot = StackSnapshot::new(resources);
        prop_assert!(evaluate(&snapshot, &everything_enabled()).is_empty());
    }

    /// Advisory always succeeds; mandatory succeeds iff nothing was reported.
    #[test]
    fn finalize_follows_enforcement_level(
        violations in prop::collection::vec(arb_violation(), 0..10)
    ) {
        let mut reporter = ViolationReporter::new();
        reporter.extend(violations.clone());
        prop_assert!(reporter.clone().finalize(EnforcementLevel::Advisory).success);

        let outcome = reporter.finalize(EnforcementLevel::Mandatory);
        prop_assert_eq!(outcome.success, violations.is_empty());
        prop_assert_eq!(outcome.violations, violations);
    }

    /// Only mandatory-severity violations under mandatory enforcement fail a run.
    #[test]
    fn verdict_fails_only_on_mandatory_violations(
        violations in prop::collection::vec(arb_violation(), 0..10)
    ) {
        let any_mandatory = violations.iter().any(|v| v.severity == Severity::Mandatory);
        let mut reporter = ViolationReporter::new();
        reporter.extend(violations.clone());

        let expected = if violations.is_empty() {
            Verdict::Pass
        } else if any_mandatory {
            Verdict::Fail
        } else {
            Verdict::Warn
        };
        prop_assert_eq!(reporter.clone().finalize(EnforcementLevel::Mandatory).verdict(), expected);

        let advisory = reporter.finalize(EnforcementLevel::Advisory).verdict();
        prop_assert_ne!(advisory, Verdict::Fail);
    }
}
