use bson::{Bson, Document, doc};
use configdb::query::{item_conditions, parse_field_value};
use configdb::store::matches;
use proptest::prelude::*;

fn range_filter(raw: &str) -> Result<Document, configdb::errors::DbError> {
    let items = parse_field_value(raw)?;
    let conds = item_conditions(&items[0])?;
    let clauses: Vec<Document> = conds.into_iter().map(|c| doc! { "x": c }).collect();
    Ok(doc! { "$and": clauses })
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 32,
        .. proptest::test_runner::Config::default()
    })]

    #[test]
    fn prop_numeric_range_is_inclusive(lo in -50i64..50, hi in -50i64..50, v in -60i64..60, as_float in any::<bool>()) {
        let filter = range_filter(&format!("{lo}&{hi}|range")).unwrap();
        let value = if as_float { Bson::Double(v as f64) } else { Bson::Int64(v) };
        let hit = matches(&doc! { "x": value }, &filter).unwrap();
        prop_assert_eq!(hit, lo <= v && v <= hi);
    }

    #[test]
    fn prop_string_range_is_inclusive(lo in "[a-z]{1,4}", hi in "[a-z]{1,4}", v in "[a-z]{1,4}") {
        let filter = range_filter(&format!("{lo}&{hi}|range")).unwrap();
        let hit = matches(&doc! { "x": v.as_str() }, &filter).unwrap();
        prop_assert_eq!(hit, lo <= v && v <= hi);
    }

    #[test]
    fn prop_mixed_bounds_name_both_types(n in any::<i64>(), s in "[g-z]{1,6}", flip in any::<bool>()) {
        let raw = if flip { format!("{s}&{n}|range") } else { format!("{n}&{s}|range") };
        let err = range_filter(&raw).unwrap_err();
        prop_assert!(err.is_format());
        let msg = err.to_string();
        prop_assert!(msg.contains("int64") && msg.contains("string"), "{}", msg);
    }
}
