//! Property tests for the metadata-only orderers.
//!
//! The permutation law must hold for arbitrary datasets: every orderer
//! returns a permutation of the full index set, deterministically, with
//! stable tie-breaking.

use ppc_bench::manifest::{BlobRecord, Dataset};
use ppc_bench::order::{
    filename_sort, filepath_sort, is_permutation, length_sort, list_order, random_order,
};
use proptest::prelude::*;

fn arb_dataset() -> impl Strategy<Value = Dataset> {
    proptest::collection::vec(
        (
            0u64..100_000,
            "[a-z]{1,12}",
            proptest::option::of("[a-z]{1,3}"),
        ),
        1..200,
    )
    .prop_map(|rows| {
        let records = rows
            .into_iter()
            .enumerate()
            .map(|(i, (length, stem, ext))| {
                let filename = match ext {
                    Some(ext) => format!("{stem}.{ext}"),
                    None => stem,
                };
                BlobRecord {
                    swhid: format!("swh:1:cnt:{i:08}"),
                    file_id: format!("{i:08}"),
                    length,
                    local_path: "00".into(),
                    filename: filename.clone(),
                    filepath: format!("dir{}/{filename}", i % 7),
                }
            })
            .collect();
        Dataset::new("arb", records)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn orderers_return_permutations(ds in arb_dataset()) {
        let n = ds.len();
        prop_assert!(is_permutation(&list_order(n), n));
        prop_assert!(is_permutation(&random_order(n), n));
        prop_assert!(is_permutation(&length_sort(&ds), n));
        prop_assert!(is_permutation(&filename_sort(&ds), n));
        prop_assert!(is_permutation(&filepath_sort(&ds), n));
    }

    #[test]
    fn orderers_are_deterministic(ds in arb_dataset()) {
        prop_assert_eq!(random_order(ds.len()), random_order(ds.len()));
        prop_assert_eq!(length_sort(&ds), length_sort(&ds));
        prop_assert_eq!(filename_sort(&ds), filename_sort(&ds));
        prop_assert_eq!(filepath_sort(&ds), filepath_sort(&ds));
    }

    #[test]
    fn length_sort_descends(ds in arb_dataset()) {
        let perm = length_sort(&ds);
        for pair in perm.windows(2) {
            prop_assert!(
                ds.record(pair[0]).length >= ds.record(pair[1]).length,
                "lengths must not increase"
            );
        }
    }

    #[test]
    fn length_sort_breaks_ties_by_manifest_order(ds in arb_dataset()) {
        let perm = length_sort(&ds);
        for pair in perm.windows(2) {
            if ds.record(pair[0]).length == ds.record(pair[1]).length {
                prop_assert!(pair[0] < pair[1], "equal keys must keep manifest order");
            }
        }
    }

    #[test]
    fn filename_sort_orders_by_reversed_name(ds in arb_dataset()) {
        let perm = filename_sort(&ds);
        for pair in perm.windows(2) {
            let a: String = ds.record(pair[0]).filename.chars().rev().collect();
            let b: String = ds.record(pair[1]).filename.chars().rev().collect();
            prop_assert!(a <= b, "reversed filenames must ascend: {a:?} vs {b:?}");
        }
    }
}
