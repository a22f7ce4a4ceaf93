#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    let Ok(s) = std::str::from_utf8(data) else { return };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(s) else { return };
    let Ok(bson::Bson::Document(filter)) = bson::Bson::try_from(value) else { return };
    let docs = [
        bson::doc! {"name": "x", "data": 1, "customers": ["t1"]},
        bson::doc! {"name": "y", "data": "role,bind", "tags": [{"k": "a"}, {"k": "b"}]},
        bson::doc! {"deleted": true, "nested": {"z": [1, 2, 3]}},
    ];
    for d in &docs {
        let _ = configdb::store::matches(d, &filter);
    }
});
