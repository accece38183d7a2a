//! Line-oriented source maps for block YAML and pretty-printed JSON.
//!
//! Mapping keys are located by indentation alone; flow collections and
//! sequence items are skipped. That is enough to place paths, webhooks and
//! component entries, which is what diagnostics refer to.

use apijoin_core::SourceMap;

/// Builds a [`SourceMap`] from the text of a document.
pub fn scan(text: &str) -> SourceMap {
    let mut map = SourceMap::new();
    let mut stack: Vec<(usize, String)> = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with(['#', '-', '{', '}', '[', ']']) {
            continue;
        }
        let Some(key) = mapping_key(trimmed) else {
            continue;
        };
        let indent = line.len() - trimmed.len();
        while stack.last().is_some_and(|(depth, _)| *depth >= indent) {
            stack.pop();
        }
        stack.push((indent, key));

        let path = stack
            .iter()
            .map(|(_, key)| key.as_str())
            .collect::<Vec<_>>()
            .join(".");
        map.insert(path, number + 1, indent + 1);
    }
    map
}

fn mapping_key(line: &str) -> Option<String> {
    if let Some(quote) = line.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let rest = &line[1..];
        let end = rest.find(quote)?;
        let after = rest[end + 1..].trim_start();
        return after.starts_with(':').then(|| rest[..end].to_string());
    }
    let end = line
        .find(": ")
        .or_else(|| line.strip_suffix(':').map(str::len))?;
    Some(line[..end].trim_end().to_string())
}
