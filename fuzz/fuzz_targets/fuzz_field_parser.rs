#![no_main]
use libfuzzer_sys::fuzz_target;
use std::collections::BTreeMap;

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 { return; }
    if let Ok(s) = std::str::from_utf8(data) {
        // Parsing and compiling a field filter must never panic
        if let Ok(items) = configdb::query::parse_field_value(s) {
            for item in &items {
                let _ = configdb::query::item_conditions(item);
            }
        }
        let groups = vec![BTreeMap::from([("tags.name".to_string(), s.to_string())])];
        let schema = configdb::types::SchemaInfo::new(["tags"]);
        if let Ok(filter) = configdb::query::build_match(&groups, &schema) {
            let _ = configdb::query::rewrite_for_unwind("tags", &filter);
        }
    }
});
