#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use depwatch_lookup::advisory::{is_affected, VersionRange};

#[derive(Arbitrary, Debug)]
struct RangeInput {
    introduced: Option<String>,
    fixed: Option<String>,
}

#[derive(Arbitrary, Debug)]
struct MatchInput {
    version: String,
    ranges: Vec<RangeInput>,
}

fuzz_target!(|input: MatchInput| {
    let ranges: Vec<VersionRange> = input
        .ranges
        .into_iter()
        .map(|range| VersionRange {
            introduced: range.introduced,
            fixed: range.fixed,
        })
        .collect();
    let _ = is_affected(&input.version, &ranges);
});
