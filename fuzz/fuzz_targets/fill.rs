#![no_main]

use acroscope::{fill, list_fields, pdf::Document, FillOptions, FillRequest, TextOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(doc) = Document::parse(data) else {
        return;
    };
    let Ok(fields) = list_fields(&doc) else {
        return;
    };

    let request: FillRequest = fields
        .iter()
        .map(|field| (field.name.clone(), "fuzz"))
        .collect();
    let _ = fill(data, &request, &FillOptions::default());
    let _ = fill(data, &request, &FillOptions::with_text(TextOptions::helvetica(10.0)));
});
