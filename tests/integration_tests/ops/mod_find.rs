use crate::integration_tests::_support::{CACHE, CacheEntry, OTHER_TENANT, TENANT, cache_docs, memory_access, scope};
use configdb::filter::{FilterBuilder, FindOptions};
use configdb::scope::{CallContext, CollectionScope};
use configdb::types::{Document, SearchResult};

fn names(docs: &[CacheEntry]) -> Vec<&str> {
    docs.iter().map(|d| d.name.as_str()).collect()
}

#[test]
fn find_applies_sort_window_and_projection() {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    dao.insert_documents(&s, cache_docs()).unwrap();

    let mut opts = FindOptions::new();
    opts.sort().desc("name");
    opts.set_skip(1).set_limit(2);
    opts.projection().include(&["name"]);
    let docs: Vec<CacheEntry> = dao.find_for_customer(&s, Some(opts)).unwrap();
    assert_eq!(names(&docs), ["test-name-4", "test-name-3"]);
    assert!(docs.iter().all(|d| d.data.is_none() && d.guid.is_empty()));
}

#[test]
fn paginated_find_counts_every_match() {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    dao.insert_documents(&s, cache_docs()).unwrap();
    dao.insert_documents(&scope(CACHE, OTHER_TENANT), vec![CacheEntry::new("x", "elsewhere")]).unwrap();

    let mut opts = FindOptions::new();
    opts.sort().asc("name");
    opts.set_skip(2).set_limit(2);
    let page: SearchResult<CacheEntry> = dao.find_paginated_for_customer(&s, Some(opts)).unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(names(&page.results), ["test-name-3", "test-name-4"]);

    let mut opts = FindOptions::new();
    opts.filter().with_value("dataType", "test-data-type-1");
    let page: SearchResult<CacheEntry> = dao.find_paginated_for_customer(&s, Some(opts)).unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.results.len(), 2);

    let everything: SearchResult<CacheEntry> = dao.admin_find_paginated(&s.collection_scope(), None).unwrap();
    assert_eq!(everything.total, 6);
}

#[test]
fn paginated_find_on_empty_collection() {
    let (dao, _store) = memory_access();
    let page: SearchResult<CacheEntry> = dao.find_paginated_for_customer(&scope(CACHE, TENANT), None).unwrap();
    assert_eq!(page.total, 0);
    assert!(page.results.is_empty());
}

#[test]
fn existence_and_counts() {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    dao.insert_documents(&s, cache_docs()).unwrap();

    let mut by_type = FilterBuilder::new();
    by_type.with_value("dataType", "test-data-type-1");
    assert!(dao.doc_exist(&s, Some(&by_type)).unwrap());
    assert_eq!(dao.count_docs(&s, Some(&by_type)).unwrap(), 2);
    assert_eq!(dao.count_docs(&s, None).unwrap(), 5);

    let mut nothing = FilterBuilder::new();
    nothing.with_value("dataType", "absent");
    assert!(!dao.doc_exist(&s, Some(&nothing)).unwrap());
    assert!(!dao.doc_exist(&scope(CACHE, OTHER_TENANT), None).unwrap());
}

#[test]
fn caller_scope_clauses_cannot_widen_the_tenant() {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    dao.insert_documents(&s, vec![CacheEntry::new("own", "mine")]).unwrap();
    dao.insert_documents(&scope(CACHE, OTHER_TENANT), vec![CacheEntry::new("theirs", "foreign")]).unwrap();

    let mut foreign = FilterBuilder::new();
    foreign.with_not_deleted_for_tenant(OTHER_TENANT);
    assert_eq!(dao.count_docs(&s, Some(&foreign)).unwrap(), 1);
    foreign.with_name("foreign");
    assert!(!dao.doc_exist(&s, Some(&foreign)).unwrap());
    assert_eq!(dao.count_docs(&s, Some(&foreign)).unwrap(), 0);
}

#[test]
fn caller_global_clause_does_not_pull_in_globals() {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    let admin = CollectionScope::new(CACHE, CallContext::new()).unwrap();
    dao.insert_documents(&s, vec![CacheEntry::new("own", "mine")]).unwrap();
    dao.insert_db_document(&admin, Document::global(CacheEntry::new("g0", "shared"))).unwrap();

    let mut with_globals = FilterBuilder::new();
    with_globals.with_not_deleted_for_tenant_and_global(TENANT);
    assert_eq!(dao.count_docs(&s, Some(&with_globals)).unwrap(), 1);
    with_globals.with_name("shared");
    assert!(!dao.doc_exist(&s, Some(&with_globals)).unwrap());
}

#[test]
fn get_doc_ignores_tenants() {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    dao.insert_documents(&s, cache_docs()).unwrap();

    let mut by_name = FilterBuilder::new();
    by_name.with_name("test-name-5");
    let admin = scope(CACHE, OTHER_TENANT).collection_scope();
    let found: CacheEntry = dao.get_doc(&admin, Some(&by_name)).unwrap().unwrap();
    assert_eq!(found.guid, "test-guid-5");

    by_name.with_name("nobody");
    assert!(dao.get_doc::<CacheEntry>(&admin, Some(&by_name)).unwrap().is_none());
}
