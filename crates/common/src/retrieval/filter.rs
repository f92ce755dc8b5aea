//! Post-query candidate processing: keyword filter and per-case dedup

use crate::index::{CaseKey, IndexHit};
use std::collections::HashMap;

/// Keep hits whose searchable text contains every keyword (case-insensitive)
pub fn filter_by_keywords(hits: Vec<IndexHit>, keywords: &[String]) -> Vec<IndexHit> {
    let keywords: Vec<String> = keywords.iter().map(|k| k.to_uppercase()).collect();

    hits.into_iter()
        .filter(|hit| {
            let text = hit.record.searchable_text();
            keywords.iter().all(|kw| text.contains(kw.as_str()))
        })
        .collect()
}

/// Collapse hits that share a case, keeping the highest score per case
///
/// Output order is the order in which each case was first seen. A better
/// duplicate takes over its case's slot; ties keep the earlier hit. Hits with
/// neither a case id nor a spreadsheet row all share one slot, as do hits
/// whose case id is stored as null.
pub fn dedup_by_case(hits: Vec<IndexHit>) -> Vec<IndexHit> {
    let mut slots: HashMap<CaseKey, usize> = HashMap::new();
    let mut unique: Vec<IndexHit> = Vec::new();

    for hit in hits {
        let key = hit.record.dedup_key();
        match slots.get(&key) {
            Some(&slot) => {
                if hit.score > unique[slot].score {
                    unique[slot] = hit;
                }
            }
            None => {
                slots.insert(key, unique.len());
                unique.push(hit);
            }
        }
    }

    unique
}
