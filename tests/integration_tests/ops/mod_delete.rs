use crate::integration_tests::_support::{CACHE, CacheEntry, FailingStore, OTHER_TENANT, TENANT, memory_access, scope};
use configdb::consts::CUSTOMERS_COLLECTION;
use configdb::errors::DbError;
use configdb::filter::FilterBuilder;
use configdb::scope::CallContext;
use configdb::store::DocumentStore;
use configdb::types::Customer;
use configdb::DataAccess;
use std::sync::Arc;

#[test]
fn delete_by_guid_returns_prior_document() {
    let (dao, store) = memory_access();
    let s = scope(CACHE, TENANT);
    dao.insert_documents(&s, vec![CacheEntry::new("g1", "one").data_type("t")]).unwrap();

    assert!(dao.delete_by_guid::<CacheEntry>(&scope(CACHE, OTHER_TENANT), "g1").unwrap().is_none());
    let prior: CacheEntry = dao.delete_by_guid(&s, "g1").unwrap().unwrap();
    assert_eq!(prior.data_type.as_deref(), Some("t"));
    assert!(store.is_empty(CACHE));
    assert!(dao.delete_by_guid::<CacheEntry>(&s, "g1").unwrap().is_none());
}

#[test]
fn delete_by_name() {
    let (dao, store) = memory_access();
    let s = scope(CACHE, TENANT);
    dao.insert_documents(&s, vec![CacheEntry::new("g1", "one"), CacheEntry::new("g2", "two")]).unwrap();
    let prior: CacheEntry = dao.delete_by_name(&s, "two").unwrap().unwrap();
    assert_eq!(prior.guid, "g2");
    assert_eq!(store.len(CACHE), 1);
}

#[test]
fn bulk_deletes_stay_inside_the_tenant() {
    let (dao, store) = memory_access();
    let mine = scope(CACHE, TENANT);
    let theirs = scope(CACHE, OTHER_TENANT);
    dao.insert_documents(&mine, vec![CacheEntry::new("a1", "a"), CacheEntry::new("b1", "b"), CacheEntry::new("c1", "c")])
        .unwrap();
    dao.insert_documents(&theirs, vec![CacheEntry::new("a2", "a")]).unwrap();

    assert_eq!(dao.bulk_delete_by_name(&mine, &["a", "b"]).unwrap(), 2);
    assert_eq!(store.len(CACHE), 2);
    assert!(dao.doc_with_name_exist(&theirs, "a").unwrap());

    let mut by_name = FilterBuilder::new();
    by_name.with_name("c");
    assert_eq!(dao.bulk_delete(&theirs, by_name.clone()).unwrap(), 0);
    assert_eq!(dao.bulk_delete(&mine, by_name).unwrap(), 1);
}

#[test]
fn tenant_deletion_reports_failing_collections() {
    let store = Arc::new(FailingStore::new(&["Z"]));
    let dao = DataAccess::new(store.clone(), 100);
    let x = scope("X", TENANT);
    dao.insert_documents(&x, vec![CacheEntry::new("x1", "1"), CacheEntry::new("x2", "2"), CacheEntry::new("x3", "3")])
        .unwrap();
    store.inner.create_collection("Y");
    dao.insert_documents(&scope("Z", TENANT), vec![CacheEntry::new("z1", "1")]).unwrap();

    let err = dao.admin_delete_customers_docs(&CallContext::new(), &[TENANT]).unwrap_err();
    let DbError::PartialDeletion { deleted, errors } = err else {
        panic!("expected a partial deletion");
    };
    assert_eq!(deleted, 3);
    assert_eq!(errors.collections(), vec!["Z"]);
    assert!(store.inner.is_empty("X"));
    assert!(store.inner.is_empty("Y"));
    assert_eq!(store.inner.len("Z"), 1);
}

#[test]
fn tenant_deletion_removes_customer_record_and_spares_others() {
    let (dao, store) = memory_access();
    let ctx = CallContext::new();
    let customers = configdb::CollectionScope::new(CUSTOMERS_COLLECTION, ctx.clone()).unwrap();
    dao.insert_db_document(&customers, Customer::new(TENANT, "first").into_document()).unwrap();
    dao.insert_db_document(&customers, Customer::new(OTHER_TENANT, "second").into_document()).unwrap();
    dao.insert_documents(&scope(CACHE, TENANT), vec![CacheEntry::new("g1", "one")]).unwrap();
    dao.insert_documents(&scope(CACHE, OTHER_TENANT), vec![CacheEntry::new("g2", "two")]).unwrap();

    assert_eq!(dao.delete_customer_docs(&scope(CACHE, TENANT)).unwrap(), 2);
    assert_eq!(store.len(CUSTOMERS_COLLECTION), 1);
    assert_eq!(store.len(CACHE), 1);
    let left = store.list_collection_names(&ctx).unwrap();
    assert!(left.contains(&CACHE.to_string()));
}

#[test]
fn zero_tenants_is_a_no_op() {
    let store = Arc::new(FailingStore::new(&[CUSTOMERS_COLLECTION]));
    let dao = DataAccess::new(store, 100);
    let none: [&str; 0] = [];
    assert_eq!(dao.admin_delete_customers_docs(&CallContext::new(), &none).unwrap(), 0);
}
