use edb_store::{Version, VersionChain};
use edb_types::{LogEntry, LogKind, Timestamp};

/// The change feed of one object in `[from, to]`, oldest first.
///
/// A tombstone is a delete. A live version is an insert when it is the first
/// version of the chain or follows a tombstone, and an update otherwise. The
/// version just before `from` is consulted so the first record in range is
/// classified the same way as in an unbounded log.
pub fn change_log(chain: &VersionChain, from: Timestamp, to: Timestamp) -> Vec<LogEntry> {
    if from > to {
        return Vec::new();
    }
    let versions = chain.versions();
    let start = versions.partition_point(|v| v.timestamp < from);
    let mut previous: Option<&Version> = start.checked_sub(1).map(|i| &versions[i]);

    let mut entries = Vec::new();
    for version in versions[start..].iter().take_while(|v| v.timestamp <= to) {
        let kind = if version.is_tombstone() {
            LogKind::Delete
        } else if previous.map_or(true, Version::is_tombstone) {
            LogKind::Insert
        } else {
            LogKind::Update
        };
        entries.push(LogEntry {
            oid: chain.oid().clone(),
            timestamp: version.timestamp,
            revision: version.revision,
            kind,
        });
        previous = Some(version);
    }
    entries
}
