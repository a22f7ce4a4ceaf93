use crate::integration_tests::_support::{CACHE, CacheEntry, TENANT, memory_access};
use configdb::errors::DbError;
use configdb::scope::CallContext;
use configdb::{CollectionScope, TenantScope};
use std::time::{Duration, Instant};

#[test]
fn scopes_reject_missing_identifiers() {
    assert!(matches!(TenantScope::new("", TENANT, CallContext::new()), Err(DbError::Config(_))));
    assert!(matches!(CollectionScope::new("", CallContext::new()), Err(DbError::Config(_))));
    let err = TenantScope::from_parts(None, None, CallContext::new()).unwrap_err();
    assert!(err.to_string().contains("collection is not in scope"));
    assert!(err.to_string().contains("tenant is not in scope"));
}

#[test]
fn expired_deadline_reaches_the_store() {
    let (dao, _store) = memory_access();
    let ctx = CallContext::new().with_deadline(Instant::now() - Duration::from_millis(1));
    let s = TenantScope::new(CACHE, TENANT, ctx).unwrap();
    let err = dao.get_doc_by_guid::<CacheEntry>(&s, "g1").unwrap_err();
    assert!(matches!(err, DbError::DeadlineExceeded), "{err}");

    let live = TenantScope::new(CACHE, TENANT, CallContext::new().with_timeout(Duration::from_secs(60))).unwrap();
    assert!(dao.get_doc_by_guid::<CacheEntry>(&live, "g1").unwrap().is_none());
}
