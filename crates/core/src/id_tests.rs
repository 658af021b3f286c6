// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::CorruptionId;

#[test]
fn generated_ids_are_uuid_shaped() {
    let id = CorruptionId::new();
    assert_eq!(id.as_str().len(), 36);
    assert_eq!(id.as_str().matches('-').count(), 4);
}

#[test]
fn generated_ids_are_unique() {
    let a = CorruptionId::new();
    let b = CorruptionId::new();
    assert_ne!(a, b);
}

#[test]
fn from_string_round_trips() {
    let id = CorruptionId::from_string("2fd9c74e-3a71-44a2-b95c-8e5a2f0c1d11");
    assert_eq!(id.as_str(), "2fd9c74e-3a71-44a2-b95c-8e5a2f0c1d11");
    assert_eq!(id, "2fd9c74e-3a71-44a2-b95c-8e5a2f0c1d11");
}

#[test]
fn short_truncates() {
    let id = CorruptionId::from_string("2fd9c74e-3a71-44a2-b95c-8e5a2f0c1d11");
    assert_eq!(id.short(8), "2fd9c74e");
}

#[test]
fn serde_is_transparent() {
    let id = CorruptionId::from_string("2fd9c74e-3a71-44a2-b95c-8e5a2f0c1d11");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"2fd9c74e-3a71-44a2-b95c-8e5a2f0c1d11\"");
    let back: CorruptionId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn idbuf_borrow_matches_str_hash() {
    use std::collections::HashMap;
    let mut map: HashMap<IdBuf, u32> = HashMap::new();
    map.insert(IdBuf::new("abc"), 1);
    assert_eq!(map.get("abc"), Some(&1));
}

#[test]
fn empty_idbuf() {
    assert!(IdBuf::empty().is_empty());
    assert_eq!(IdBuf::empty().as_str(), "");
}
