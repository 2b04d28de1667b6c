//! Property-Based Tests — Domain Layer Invariants
//!
//! Uses `proptest` to verify that pattern matching, filtering and id
//! generation hold their invariants across random inputs.

use std::collections::BTreeMap;

use proptest::prelude::*;

use registry_admin_bridge::domain::id::{hash_url, InstanceIdGenerator};
use registry_admin_bridge::domain::instance::{InstanceId, Registration};
use registry_admin_bridge::domain::pattern::{simple_match, ServiceFilter};

fn registration(health_url: &str, metadata: &[(&str, &str)]) -> Registration {
    Registration {
        name: "svc".to_string(),
        management_url: None,
        health_url: health_url.to_string(),
        service_url: None,
        source: Some("discovery".to_string()),
        metadata: metadata
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

// ── Pattern Matching Properties ─────────────────────────────

proptest! {
    /// A lone wildcard matches every name.
    #[test]
    fn wildcard_matches_everything(name in "\\PC*") {
        prop_assert!(simple_match("*", &name));
    }

    /// Without wildcards, matching is string equality.
    #[test]
    fn literal_pattern_is_equality(pattern in "[a-z-]{0,12}", name in "[a-z-]{0,12}") {
        prop_assert_eq!(simple_match(&pattern, &name), pattern == name);
    }

    /// Prefix, suffix and infix patterns agree with the std predicates.
    #[test]
    fn affix_patterns_agree_with_std(part in "[a-z]{1,6}", name in "[a-z-]{0,16}") {
        prop_assert_eq!(simple_match(&format!("{part}*"), &name), name.starts_with(&part));
        prop_assert_eq!(simple_match(&format!("*{part}"), &name), name.ends_with(&part));
        prop_assert_eq!(simple_match(&format!("*{part}*"), &name), name.contains(&part));
    }

    /// Any name matches the pattern built from its own head and tail.
    #[test]
    fn split_name_matches_itself(name in "[a-z0-9-]{1,20}", cut in 0usize..20) {
        let cut = cut.min(name.len());
        let pattern = format!("{}*{}", &name[..cut], &name[cut..]);
        prop_assert!(simple_match(&pattern, &name));
    }
}

// ── Service Filter Properties ───────────────────────────────

proptest! {
    /// Exclusion always overrides inclusion.
    #[test]
    fn exclude_overrides_include(name in "[a-z-]{1,16}") {
        let filter = ServiceFilter::new(vec!["*".to_string()], vec![name.clone()]);
        prop_assert!(!filter.should_register(&name));
    }

    /// Eligibility is include-match and not exclude-match.
    #[test]
    fn eligibility_is_include_and_not_exclude(
        name in "[a-c]{1,6}",
        include in "[a-c*]{1,4}",
        exclude in "[a-c*]{1,4}",
    ) {
        let filter = ServiceFilter::new(vec![include.clone()], vec![exclude.clone()]);
        let expected = simple_match(&include, &name) && !simple_match(&exclude, &name);
        prop_assert_eq!(filter.should_register(&name), expected);
    }
}

// ── Instance Id Properties ──────────────────────────────────

proptest! {
    /// Name and instance-id metadata combine as `name:instance-id`.
    #[test]
    fn id_combines_name_and_instance_id(name in "[a-z]{1,10}", id in "[a-z0-9]{1,10}") {
        let r = registration("http://h:1/health", &[("name", &name), ("instance-id", &id)]);
        prop_assert_eq!(InstanceIdGenerator::new().generate(&r), InstanceId::of(format!("{name}:{id}")));
    }

    /// The hash fallback is deterministic and 12 lowercase hex chars.
    #[test]
    fn hash_fallback_is_stable(host in "[a-z]{1,12}", port in 1u16..) {
        let url = format!("http://{host}:{port}/actuator/health");
        let r = registration(&url, &[]);
        let generator = InstanceIdGenerator::new();

        let first = generator.generate(&r);
        prop_assert_eq!(&first, &generator.generate(&r));
        prop_assert_eq!(&first, &hash_url(&url));
        prop_assert_eq!(first.as_str().len(), 12);
        prop_assert!(first.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}

// ── Reconciliation Properties ───────────────────────────────

proptest! {
    /// After one pass the source-tagged registered set equals the live
    /// set, whatever was mirrored before.
    #[test]
    fn reconciliation_converges(
        live in proptest::collection::btree_set("[a-f]{1,3}", 0..8),
        prior in proptest::collection::btree_set("[a-f]{1,3}", 0..8),
    ) {
        use std::sync::Arc;

        use registry_admin_bridge::adapters::memory::{InMemoryDashboard, StaticServiceRegistry};
        use registry_admin_bridge::domain::converter::ServiceInstanceConverter;
        use registry_admin_bridge::domain::instance::{ServiceDescriptor, DEFAULT_SOURCE};
        use registry_admin_bridge::ports::dashboard::InstanceRegistry;
        use registry_admin_bridge::usecases::{InstanceRegistrar, Reconciler};

        let descriptor = |id: &String| {
            ServiceDescriptor::new("svc", id.clone(), "h", 8080).with_metadata("instance-id", id.clone())
        };

        let registered = tokio_test::block_on(async {
            let registry = Arc::new(StaticServiceRegistry::seeded(live.iter().map(descriptor)));
            let dashboard = Arc::new(InMemoryDashboard::new(InstanceIdGenerator::new()));
            let converter = ServiceInstanceConverter::new("/actuator", "health", DEFAULT_SOURCE);
            for id in &prior {
                dashboard.register(converter.convert(&descriptor(id)).unwrap()).await.unwrap();
            }

            let registrar = InstanceRegistrar::new(
                Arc::clone(&dashboard),
                ServiceFilter::default(),
                converter,
                InstanceIdGenerator::new(),
            );
            Reconciler::new(registry, Arc::new(registrar)).reconcile().await.unwrap();
            dashboard.registered_ids(DEFAULT_SOURCE).await
        });

        let expected: Vec<InstanceId> = live.iter().map(InstanceId::of).collect();
        prop_assert_eq!(registered, expected);
    }
}
