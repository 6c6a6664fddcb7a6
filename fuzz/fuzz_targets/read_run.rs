#![no_main]

use libfuzzer_sys::fuzz_target;
use rankfuse_core::run::{read_topics, read_trec_run};

fuzz_target!(|data: &[u8]| {
    if let Ok(run) = read_trec_run(data) {
        for list in run.values() {
            assert!(list.is_ranked());
        }
    }
    let _ = read_topics(data);
});
