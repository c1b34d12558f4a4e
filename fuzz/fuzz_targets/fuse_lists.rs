#![no_main]

//! Fuse two byte-derived rankings and check the fusion invariants:
//! no duplicate ids, non-increasing scores, pages that reassemble the full
//! order, and an empty semantic side behaving like an absent one.

use libfuzzer_sys::fuzz_target;
use quill_core::model::{Hit, RankedList, RetrievalSource};
use quill_search::fusion::{FusionConfig, fuse, fused_order};
use std::collections::HashSet;

fn hit(line_id: u64) -> Hit {
    Hit {
        line_id,
        rank: 0,
        source_score: 0.0,
        play_name: String::new(),
        speaker: String::new(),
        text_entry: String::new(),
        kind: "line".into(),
        highlight: Vec::new(),
    }
}

fn list(source: RetrievalSource, bytes: &[u8]) -> RankedList {
    RankedList::from_hits(source, bytes.iter().map(|b| hit(u64::from(*b))).collect())
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    let depth = usize::from(data[0]) + 1;
    let page_size = usize::from(data[1] % 16) + 1;
    let split = usize::from(data[2]) % (data.len() - 2);
    let (lexical, semantic) = data[3..].split_at(split.min(data.len() - 3));

    let lexical = list(RetrievalSource::Lexical, lexical);
    let semantic = list(RetrievalSource::DenseSemantic, semantic);
    let config = FusionConfig {
        candidate_depth: depth,
        page_size,
        ..FusionConfig::default()
    };

    let Ok(order) = fused_order(&lexical, Some(&semantic), &config) else {
        return;
    };

    let ids: HashSet<u64> = order.iter().map(|e| e.line_id).collect();
    assert_eq!(ids.len(), order.len());
    assert!(order.windows(2).all(|w| w[0].score >= w[1].score));

    let mut paged = Vec::new();
    let mut offset = 0;
    loop {
        let page = FusionConfig {
            page_offset: offset,
            ..config.clone()
        };
        let Ok(result) = fuse(&lexical, Some(&semantic), &page) else {
            return;
        };
        if result.is_empty() {
            break;
        }
        paged.extend(result.hits.iter().map(|h| h.hit.line_id));
        offset += page_size;
    }
    let full: Vec<u64> = order.iter().map(|e| e.line_id).collect();
    assert_eq!(paged, full);

    let empty = RankedList::empty(RetrievalSource::DenseSemantic);
    assert_eq!(
        fuse(&lexical, Some(&empty), &config).ok(),
        fuse(&lexical, None, &config).ok()
    );
});
