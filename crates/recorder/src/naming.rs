//! Artifact file names: `{map}_{timestamp:06}_{frame:06}_{suffix}`

use contracts::{Channel, BOUNDING_BOX_SUFFIX};

/// Build the file name of one artifact
///
/// The simulation timestamp is truncated to whole seconds.
pub fn artifact_name(map: &str, timestamp: f64, frame_number: u64, suffix: &str) -> String {
    format!(
        "{}_{:06}_{:06}_{}",
        map,
        timestamp_seconds(timestamp),
        frame_number,
        suffix
    )
}

/// Whole simulation seconds used in file names (negative or NaN → 0)
pub fn timestamp_seconds(timestamp: f64) -> u64 {
    timestamp as u64
}

/// Every suffix the recorder writes
pub fn known_suffixes() -> impl Iterator<Item = &'static str> {
    Channel::ALL
        .iter()
        .flat_map(|c| c.artifact_suffixes().iter().copied())
        .chain(std::iter::once(BOUNDING_BOX_SUFFIX))
}

/// Channel that produces `suffix`; `None` for annotations and unknown suffixes
pub fn suffix_channel(suffix: &str) -> Option<Channel> {
    Channel::ALL
        .into_iter()
        .find(|c| c.artifact_suffixes().contains(&suffix))
}

/// Parsed artifact file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub map: String,
    pub timestamp: u64,
    pub frame_number: u64,
    pub suffix: &'static str,
}

impl ArtifactName {
    /// Grouping key shared by all artifacts of one frame
    pub fn frame_key(&self) -> (String, u64, u64) {
        (self.map.clone(), self.timestamp, self.frame_number)
    }
}

/// Parse a file name written by the recorder
///
/// Map names may themselves contain underscores.
pub fn parse_artifact_name(name: &str) -> Option<ArtifactName> {
    let suffix = known_suffixes().find(|suffix| {
        name.len() > suffix.len() + 1
            && name.ends_with(suffix)
            && name.as_bytes()[name.len() - suffix.len() - 1] == b'_'
    })?;
    let stem = &name[..name.len() - suffix.len() - 1];

    let mut parts = stem.rsplitn(3, '_');
    let frame_number = parts.next()?.parse().ok()?;
    let timestamp = parts.next()?.parse().ok()?;
    let map = parts.next().filter(|m| !m.is_empty())?;

    Some(ArtifactName {
        map: map.to_string(),
        timestamp,
        frame_number,
        suffix,
    })
}
