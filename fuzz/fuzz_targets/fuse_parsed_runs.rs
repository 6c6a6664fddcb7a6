#![no_main]

use libfuzzer_sys::fuzz_target;
use rankfuse_core::run::read_trec_run;
use rankfuse_core::{FusionConfig, FusionMethod, fuse_runs};

// Input is two TREC runs separated by a NUL byte.
fuzz_target!(|data: &[u8]| {
    let Some(split) = data.iter().position(|&b| b == 0) else {
        return;
    };
    let (Ok(a), Ok(b)) = (read_trec_run(&data[..split]), read_trec_run(&data[split + 1..])) else {
        return;
    };

    for method in [
        FusionMethod::LinearInterpolation,
        FusionMethod::ReciprocalRankFusion,
        FusionMethod::Average,
        FusionMethod::Normalize,
    ] {
        let config = FusionConfig {
            normalize: true,
            ..FusionConfig::with_method(method)
        };
        let fused = fuse_runs(&[a.clone(), b.clone()], &config).expect("two runs always fuse");
        for list in fused.values() {
            assert!(list.len() <= config.top_k);
        }
    }
});
