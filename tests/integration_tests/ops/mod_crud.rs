use crate::integration_tests::_support::{CACHE, CacheEntry, OTHER_TENANT, TENANT, memory_access, scope};
use bson::{Bson, doc};
use configdb::CollectionScope;
use configdb::errors::DbError;
use configdb::ops::set_command;
use configdb::scope::CallContext;
use configdb::types::Document;

#[test]
fn insert_assigns_guid_and_creation_time() {
    let (dao, store) = memory_access();
    let s = scope(CACHE, TENANT);
    let inserted = dao.insert_documents(&s, vec![CacheEntry::new("", "first")]).unwrap();
    assert_eq!(inserted.len(), 1);
    let guid = inserted[0].guid.clone();
    assert!(!guid.is_empty());
    assert!(inserted[0].creation_time.is_some());
    assert_eq!(store.len(CACHE), 1);

    let back: CacheEntry = dao.get_doc_by_guid(&s, &guid).unwrap().unwrap();
    assert_eq!(back.name, "first");
    let by_name: CacheEntry = dao.get_doc_by_name(&s, "first").unwrap().unwrap();
    assert_eq!(by_name.guid, guid);
}

#[test]
fn bulk_insert_and_duplicate_key() {
    let (dao, store) = memory_access();
    let s = scope(CACHE, TENANT);
    let docs = vec![CacheEntry::new("g1", "one"), CacheEntry::new("g2", "two"), CacheEntry::new("g3", "three")];
    dao.insert_documents(&s, docs).unwrap();
    assert_eq!(store.len(CACHE), 3);

    let err = dao.insert_documents(&s, vec![CacheEntry::new("g2", "again")]).unwrap_err();
    assert!(err.is_duplicate_key(), "{err}");
    assert_eq!(store.len(CACHE), 3);
    assert!(dao.insert_documents::<CacheEntry>(&s, Vec::new()).unwrap().is_empty());
}

#[test]
fn point_lookups_are_tenant_scoped() {
    let (dao, _store) = memory_access();
    let mine = scope(CACHE, TENANT);
    let theirs = scope(CACHE, OTHER_TENANT);
    dao.insert_documents(&mine, vec![CacheEntry::new("g1", "one")]).unwrap();

    assert!(dao.get_doc_by_guid::<CacheEntry>(&theirs, "g1").unwrap().is_none());
    assert!(dao.get_doc_by_name::<CacheEntry>(&theirs, "one").unwrap().is_none());
    assert!(dao.get_doc_by_guid::<CacheEntry>(&mine, "missing").unwrap().is_none());
    assert!(dao.doc_with_name_exist(&mine, "one").unwrap());
    assert!(!dao.doc_with_name_exist(&theirs, "one").unwrap());
}

#[test]
fn update_document_returns_before_and_after() {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    dao.insert_documents(&s, vec![CacheEntry::new("g1", "one").data_type("old")]).unwrap();

    let missing = dao.update_document::<CacheEntry>(&s, "nope", &doc! {"$set": {"dataType": "new"}}).unwrap();
    assert!(missing.is_none());

    let update = set_command(&doc! {"dataType": "new"}).unwrap();
    let (old, new) = dao.update_document::<CacheEntry>(&s, "g1", &update).unwrap().unwrap();
    assert_eq!(old.data_type.as_deref(), Some("old"));
    assert_eq!(new.data_type.as_deref(), Some("new"));
    assert_eq!(new.guid, "g1");
}

#[test]
fn empty_set_is_rejected() {
    assert!(matches!(set_command(&doc! {}), Err(DbError::NoFieldsToUpdate)));
}

#[test]
fn add_and_pull_report_modified_counts() {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    dao.insert_documents(&s, vec![CacheEntry::new("g1", "one").tags(&["a"])]).unwrap();
    let value = [Bson::String("b".into())];

    assert_eq!(dao.add_to_array(&s, "g1", "tags", &value).unwrap(), 1);
    assert_eq!(dao.add_to_array(&s, "g1", "tags", &value).unwrap(), 0);
    let doc: CacheEntry = dao.get_doc_by_guid(&s, "g1").unwrap().unwrap();
    assert_eq!(doc.tags, Some(vec!["a".to_string(), "b".to_string()]));

    assert_eq!(dao.pull_from_array(&s, "g1", "tags", &value).unwrap(), 1);
    assert_eq!(dao.pull_from_array(&s, "g1", "tags", &value).unwrap(), 0);
    let doc: CacheEntry = dao.get_doc_by_guid(&s, "g1").unwrap().unwrap();
    assert_eq!(doc.tags, Some(vec!["a".to_string()]));
}

#[test]
fn update_one_misses_other_tenants() {
    let (dao, _store) = memory_access();
    dao.insert_documents(&scope(CACHE, TENANT), vec![CacheEntry::new("g1", "one")]).unwrap();
    let n = dao
        .update_one(&scope(CACHE, OTHER_TENANT), "g1", &doc! {"$set": {"name": "stolen"}})
        .unwrap();
    assert_eq!(n, 0);
}

#[test]
fn global_documents_are_shared() {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    let admin = CollectionScope::new(CACHE, CallContext::new()).unwrap();
    dao.insert_documents(&s, vec![CacheEntry::new("g1", "mine")]).unwrap();
    dao.insert_db_document(&admin, Document::global(CacheEntry::new("g0", "shared"))).unwrap();

    let own: Vec<CacheEntry> = dao.get_all_for_customer(&s, false).unwrap();
    assert_eq!(own.len(), 1);
    let mut all: Vec<CacheEntry> = dao.get_all_for_customer(&s, true).unwrap();
    all.sort_by(|a, b| a.name.cmp(&b.name));
    let names: Vec<&str> = all.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["mine", "shared"]);

    let other: Vec<CacheEntry> = dao.find_for_customer_with_globals(&scope(CACHE, OTHER_TENANT), None).unwrap();
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].name, "shared");
}

#[test]
fn soft_deleted_documents_are_hidden() {
    let (dao, _store) = memory_access();
    let s = scope(CACHE, TENANT);
    let admin = s.collection_scope();
    let mut gone = Document::new(CacheEntry::new("g1", "gone"), TENANT);
    gone.deleted = true;
    dao.insert_db_document(&admin, gone).unwrap();

    assert!(dao.get_doc_by_guid::<CacheEntry>(&s, "g1").unwrap().is_none());
    assert_eq!(dao.count_docs(&s, None).unwrap(), 0);
    let raw: Vec<CacheEntry> = dao.admin_find(&admin, None).unwrap();
    assert_eq!(raw.len(), 1);
}

#[test]
fn cancelled_context_stops_operations() {
    let (dao, _store) = memory_access();
    let ctx = CallContext::new();
    let s = configdb::TenantScope::new(CACHE, TENANT, ctx.clone()).unwrap();
    ctx.cancel();
    let err = dao.insert_documents(&s, vec![CacheEntry::new("g1", "one")]).unwrap_err();
    assert!(matches!(err, DbError::Cancelled), "{err}");
}
