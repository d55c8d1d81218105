//! Block expansion and joint-unit detection.
//!
//! A raw block such as `"A & B"`, `"A,B"`, `"A/B"` or `"A and B"` becomes one
//! request per letter, with section id `"{section}-{letter}"`. Requests are
//! then deduplicated by key and bundled by `instructor|subject|year`.
//!
//! Only requests with the same session plan share a unit. Blocks of one
//! course with different units become separate units; the second and later
//! ones get ids `"{instructor|subject|year}#2"`, `"#3"`, ...

use std::collections::{HashMap, HashSet};

use crate::models::{CourseRequest, JointUnit, Minute};
use crate::validation::{ValidationIssue, ValidationIssueKind, PLACEHOLDER_BLOCK};

/// Splits a raw block encoding into upper-case letters.
pub fn block_letters(raw: &str) -> Vec<String> {
    let letters: Vec<String> = raw
        .split(|c: char| c == '&' || c == ',' || c == '/' || c.is_whitespace())
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case("and"))
        .map(str::to_ascii_uppercase)
        .collect();
    if letters.is_empty() {
        vec![PLACEHOLDER_BLOCK.to_string()]
    } else {
        letters
    }
}

/// Expands multi-block requests and drops duplicate keys.
pub fn expand_blocks(requests: &[CourseRequest]) -> (Vec<CourseRequest>, Vec<ValidationIssue>) {
    let mut out = Vec::with_capacity(requests.len());
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for req in requests {
        let letters = block_letters(&req.block);
        let expanded: Vec<CourseRequest> = if letters.len() > 1 {
            letters
                .iter()
                .map(|letter| {
                    let mut r = req.clone().with_block(letter.as_str());
                    r.section_id = format!("{}-{}", req.section_id, letter);
                    r
                })
                .collect()
        } else if letters[0] != req.block {
            vec![req.clone().with_block(letters[0].as_str())]
        } else {
            vec![req.clone()]
        };

        for r in expanded {
            if seen.insert(r.key.clone()) {
                out.push(r);
            } else {
                issues.push(ValidationIssue::new(
                    ValidationIssueKind::DuplicateKey,
                    format!("duplicate course key '{}', keeping the first", r.key),
                ));
            }
        }
    }

    if out.len() != requests.len() {
        log::debug!("block expansion: {} requests -> {}", requests.len(), out.len());
    }
    (out, issues)
}

/// Bundles requests sharing `instructor|subject|year` and a session plan
/// into joint units, in order of first appearance.
pub fn detect_joint_units(requests: Vec<CourseRequest>) -> Vec<JointUnit> {
    type GroupKey = (String, Vec<Minute>);
    let mut order: Vec<GroupKey> = Vec::new();
    let mut groups: HashMap<GroupKey, Vec<CourseRequest>> = HashMap::new();

    for req in requests {
        let plan: Vec<Minute> = req.sessions().iter().map(|s| s.duration).collect();
        let key = (req.joint_key(), plan);
        if !groups.contains_key(&key) {
            order.push(key.clone());
        }
        groups.entry(key).or_default().push(req);
    }

    let mut per_course: HashMap<String, usize> = HashMap::new();
    order
        .into_iter()
        .filter_map(|key| {
            let members = groups.remove(&key)?;
            let (joint_key, _) = key;
            let seen = per_course.entry(joint_key.clone()).or_insert(0);
            *seen += 1;
            let id = if *seen == 1 {
                joint_key
            } else {
                log::debug!("{joint_key}: blocks with a different session plan, unit #{seen}");
                format!("{joint_key}#{seen}")
            };
            Some(JointUnit::new(id, members))
        })
        .collect()
}
