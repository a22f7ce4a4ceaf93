#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 { return; }
    let Ok(s) = std::str::from_utf8(data) else { return };
    let Ok(value) = serde_json::from_str::<serde_json::Value>(s) else { return };
    let Ok(bson::Bson::Document(update)) = bson::Bson::try_from(value) else { return };
    let mut doc = bson::doc! {"_id": "g1", "name": "x", "tags": ["a", "b"], "count": 1, "attrs": {"k": "v"}};
    let _ = configdb::store::apply_update(&mut doc, &update);
});
