use crate::loader::ConfigGroup;

/// Transient bucket of groups sharing a name prefix. Never fed back into
/// the loader.
#[derive(Debug, Clone)]
pub struct FilteredConfigGroup {
    pub prefix: String,
    pub groups: Vec<ConfigGroup>
}

/// Buckets groups by the first `depth` slash-delimited segments of their
/// name. Depth 0 puts everything in one bucket; a depth at or beyond the
/// deepest name yields one bucket per distinct name. Buckets appear in
/// first-use order.
pub fn split_at_depth(groups: &[ConfigGroup], depth: usize) -> Vec<FilteredConfigGroup> {
    let mut buckets: Vec<FilteredConfigGroup> = Vec::new();

    for group in groups {
        let prefix = name_prefix(&group.name, depth);
        let position = match buckets.iter().position(|bucket| bucket.prefix == prefix) {
            Some(position) => position,
            None => {
                buckets.push(FilteredConfigGroup {
                    prefix,
                    groups: Vec::new()
                });
                buckets.len() - 1
            }
        };
        // True by construction; kept so a bucket can never swallow a
        // group outside its prefix.
        if group.name.starts_with(&buckets[position].prefix) {
            buckets[position].groups.push(group.clone());
        }
    }

    buckets
}

fn name_prefix(name: &str, depth: usize) -> String {
    name.split('/').take(depth).collect::<Vec<_>>().join("/")
}
