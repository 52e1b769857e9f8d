use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::region::{RegionDraft, sanitize_file_name};

pub const INVALID_FILE_NAME: &str = "invalid_file_name";

#[must_use]
pub fn numbered_name(base: &str, index: usize) -> String {
    format!("{base}_{index:04}")
}

/// Gives every region a unique name and returns how many were renamed.
///
/// Every holder of a shared name is suffixed `_0001`, `_0002`, .. in list
/// order, skipping any suffixed name that is already taken. Unique names are
/// never touched.
pub fn resolve_names(regions: &mut [RegionDraft]) -> usize {
    let mut holders: HashMap<String, usize> = HashMap::new();
    for region in regions.iter() {
        *holders.entry(region.name().to_string()).or_default() += 1;
    }

    let mut reserved: HashSet<String> = holders
        .iter()
        .filter(|(_, count)| **count == 1)
        .map(|(name, _)| name.clone())
        .collect();

    let mut renamed = 0;
    for region in regions.iter_mut() {
        if holders.get(region.name()).copied().unwrap_or(0) < 2 {
            continue;
        }
        let original = region.name().to_string();
        let mut addition = 1;
        let mut candidate = numbered_name(&original, addition);
        while reserved.contains(&candidate) {
            addition += 1;
            candidate = numbered_name(&original, addition);
        }
        debug!(from = %original, to = %candidate, "renaming colliding region");
        region.rename(&candidate);
        reserved.insert(candidate);
        renamed += 1;
    }
    renamed
}

/// Sanitized base for fixed-name numbering.
#[must_use]
pub fn fixed_name_base(base: &str) -> String {
    let sanitized = sanitize_file_name(base.trim());
    if sanitized.is_empty() {
        INVALID_FILE_NAME.to_string()
    } else {
        sanitized
    }
}

/// `{base}_0001`, `{base}_0002`, .. for `count` outputs.
#[must_use]
pub fn fixed_names(base: &str, count: usize) -> Vec<String> {
    let base = fixed_name_base(base);
    (1..=count).map(|index| numbered_name(&base, index)).collect()
}
