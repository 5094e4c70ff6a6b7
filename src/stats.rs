//! Dataset statistics modes (`-s` and `--type-stats`).

use crate::manifest::Dataset;
use crate::order::{OrderContext, TypeGrouper, TypeOracle};
use indexmap::IndexMap;
use rayon::prelude::*;
use std::sync::Mutex;

/// Distribution of filename extensions across the dataset.
#[must_use]
pub fn extension_distribution(dataset: &Dataset) -> IndexMap<String, usize> {
    let counts = Mutex::new(IndexMap::<String, usize>::new());
    dataset.records().par_iter().for_each(|rec| {
        let extension = rec
            .filename
            .rsplit('.')
            .next()
            .unwrap_or(&rec.filename)
            .to_string();
        let mut guard = counts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard.entry(extension).or_insert(0) += 1;
    });
    counts
        .into_inner()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Distribution of oracle labels across the dataset (size gates included).
#[must_use]
pub fn label_distribution(ctx: &OrderContext<'_>, oracle: &dyn TypeOracle) -> IndexMap<String, usize> {
    let grouper = TypeGrouper::new(oracle, crate::order::GroupSubOrder::None);
    grouper
        .partition(ctx)
        .into_iter()
        .map(|(label, rows)| (label, rows.len()))
        .collect()
}

/// Print one distribution the way the stats mode reports them: groups in
/// descending size order.
pub fn print_distribution(stats: &IndexMap<String, usize>, method_name: &str) {
    println!("Using {method_name} as file grouping method");
    println!("we get {} different groups", stats.len());
    println!("here they are with their respective size:");

    let mut entries: Vec<(&String, &usize)> = stats.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (label, count) in entries {
        println!("- group \"{label}\" --> {count} blobs");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::BlobRecord;

    #[test]
    fn counts_extensions() {
        let records = ["a.rs", "b.rs", "c.py", "README"]
            .iter()
            .enumerate()
            .map(|(i, name)| BlobRecord {
                swhid: format!("s{i}"),
                file_id: format!("f{i}"),
                length: 1000,
                local_path: "00".into(),
                filename: (*name).to_string(),
                filepath: format!("src/{name}"),
            })
            .collect();
        let ds = Dataset::new("toy", records);
        let dist = extension_distribution(&ds);
        assert_eq!(dist.get("rs"), Some(&2));
        assert_eq!(dist.get("py"), Some(&1));
        assert_eq!(dist.get("README"), Some(&1));
    }
}
