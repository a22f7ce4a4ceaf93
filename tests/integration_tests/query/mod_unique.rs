use crate::integration_tests::_support::{CACHE, CacheEntry, TENANT, cache_docs, memory_access, scope};
use configdb::types::{FieldCount, SchemaInfo, UniqueValuesRequest};
use configdb::{DataAccess, TenantScope};
use std::collections::BTreeMap;

fn counts(pairs: &[(&str, i64)]) -> Vec<FieldCount> {
    pairs.iter().map(|(f, c)| FieldCount { field: (*f).to_string(), count: *c }).collect()
}

fn tagged() -> (DataAccess, TenantScope) {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    let docs = vec![
        CacheEntry::new("g1", "one").tags(&["Job", "Pod"]),
        CacheEntry::new("g2", "two").tags(&["Pod"]),
        CacheEntry::new("g3", "three").tags(&["Pod", "Svc"]),
    ];
    dao.insert_documents(&s, docs).unwrap();
    (dao, s)
}

#[test]
fn scalar_values_are_sorted_strings() {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    dao.insert_documents(&s, vec![CacheEntry::new("g1", "a").data(1), CacheEntry::new("g2", "b").data(5)]).unwrap();

    let req = UniqueValuesRequest::for_fields(["data"]);
    let res = dao.unique_values(&s, &req, &SchemaInfo::default()).unwrap();
    assert_eq!(res.fields["data"], ["1", "5"]);
    assert_eq!(res.fields_count["data"], counts(&[("1", 1), ("5", 1)]));
}

#[test]
fn filters_and_paging_apply_to_values() {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    dao.insert_documents(&s, cache_docs()).unwrap();

    let mut req = UniqueValuesRequest::for_fields(["dataType"]);
    req.inner_filters = vec![BTreeMap::from([("dataType".to_string(), "|exists".to_string())])];
    let res = dao.unique_values(&s, &req, &SchemaInfo::default()).unwrap();
    assert_eq!(res.fields["dataType"], ["test-data-type-1", "test-data-type-2", "test-data-type-5"]);
    assert_eq!(res.fields_count["dataType"][0], FieldCount { field: "test-data-type-1".into(), count: 2 });

    req.page_size = Some(1);
    req.page_num = Some(2);
    let res = dao.unique_values(&s, &req, &SchemaInfo::default()).unwrap();
    assert_eq!(res.fields["dataType"], ["test-data-type-2"]);
}

#[test]
fn array_fields_count_elements() {
    let (dao, s) = tagged();
    let schema = SchemaInfo::new(["tags"]);
    let res = dao.unique_values(&s, &UniqueValuesRequest::for_fields(["tags"]), &schema).unwrap();
    assert_eq!(res.fields["tags"], ["Job", "Pod", "Svc"]);
    assert_eq!(res.fields_count["tags"], counts(&[("Job", 1), ("Pod", 3), ("Svc", 1)]));
}

#[test]
fn array_filters_narrow_the_unwound_elements() {
    let (dao, s) = tagged();
    let schema = SchemaInfo::new(["tags"]);
    let mut req = UniqueValuesRequest::for_fields(["tags"]);
    req.inner_filters = vec![BTreeMap::from([("tags".to_string(), "Pod".to_string())])];
    let res = dao.unique_values(&s, &req, &schema).unwrap();
    assert_eq!(res.fields["tags"], ["Pod"]);
    assert_eq!(res.fields_count["tags"], counts(&[("Pod", 3)]));
}

#[test]
fn several_fields_answer_independently() {
    let (dao, s) = tagged();
    let schema = SchemaInfo::new(["tags"]);
    let res = dao.unique_values(&s, &UniqueValuesRequest::for_fields(["tags", "name"]), &schema).unwrap();
    assert_eq!(res.fields["name"], ["one", "three", "two"]);
    assert_eq!(res.fields["tags"].len(), 3);
}

#[test]
fn empty_collection_yields_empty_lists() {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    let res = dao.unique_values(&s, &UniqueValuesRequest::for_fields(["name"]), &SchemaInfo::default()).unwrap();
    assert!(res.fields["name"].is_empty());
    assert!(res.fields_count["name"].is_empty());
}

#[test]
fn request_errors() {
    let (dao, s) = tagged();
    let schema = SchemaInfo::default();
    let err = dao.unique_values(&s, &UniqueValuesRequest::default(), &schema).unwrap_err();
    assert_eq!(err.to_string(), "fields are required");

    let mut req = UniqueValuesRequest::for_fields(["name"]);
    req.until = Some("later".into());
    assert_eq!(dao.unique_values(&s, &req, &schema).unwrap_err().to_string(), "until is not supported");
}
