use configdb::filter::FilterBuilder;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Tenant(String),
    Id(String),
    Name(String),
    Value(String, i64),
    In(String, Vec<i64>),
    Raw(String, i64),
}

fn field() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["name", "data", "dataType", "attributes.kind"]).prop_map(str::to_string)
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        "[a-z]{1,6}".prop_map(Step::Tenant),
        "[a-z0-9]{1,8}".prop_map(Step::Id),
        "[a-z]{1,6}".prop_map(Step::Name),
        (field(), any::<i64>()).prop_map(|(f, v)| Step::Value(f, v)),
        (field(), prop::collection::vec(any::<i64>(), 0..4)).prop_map(|(f, v)| Step::In(f, v)),
        (field(), -5i64..5).prop_map(|(f, v)| Step::Raw(f, v)),
    ]
}

fn apply(b: &mut FilterBuilder, s: &Step) {
    match s {
        Step::Tenant(t) => b.with_not_deleted_for_tenant(t),
        Step::Id(id) => b.with_id(id),
        Step::Name(n) => b.with_name(n),
        Step::Value(f, v) => b.with_value(f, *v),
        Step::In(f, vs) => b.with_in(f, vs),
        Step::Raw(f, v) => b.with_document(bson::doc! { f.as_str(): { "$gte": *v } }),
    };
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 32,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_get_is_idempotent(steps in prop::collection::vec(step(), 0..10)) {
        let mut b = FilterBuilder::new();
        for s in &steps {
            apply(&mut b, s);
        }
        let first = b.get();
        prop_assert_eq!(&first, &b.get());
        prop_assert_eq!(first, b.clone().get());
    }

    #[test]
    fn prop_same_kind_keeps_last(names in prop::collection::vec("[a-z]{1,6}", 1..6)) {
        let mut b = FilterBuilder::new();
        for n in &names {
            b.with_name(n);
        }
        prop_assert_eq!(b.len(), 1);
        let last = names.last().unwrap();
        prop_assert_eq!(b.get(), bson::doc! { "name": last.as_str() });
    }
}
