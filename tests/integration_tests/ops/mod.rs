// Data-access operations against the in-memory store.
#[path = "mod_crud.rs"]
mod crud_tests;
#[path = "mod_delete.rs"]
mod delete_tests;
#[path = "mod_find.rs"]
mod find_tests;
