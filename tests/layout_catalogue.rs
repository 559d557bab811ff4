use layoutbench::{build_layout, flatten, registry, resolve, Category, Params, Segment};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;

#[derive(Debug, Deserialize)]
struct Case {
    layout: String,
    params: BTreeMap<String, String>,
    #[serde(default)]
    nbytes: Option<u64>,
    size: u64,
    extent: i64,
    #[serde(default)]
    lower_bound: i64,
    #[serde(default)]
    segments: Option<Vec<Segment>>,
}

fn load_cases() -> Vec<Case> {
    let contents = fs::read_to_string("tests/fixtures/layouts.ron").unwrap();
    ron::from_str(&contents).unwrap()
}

#[test]
fn every_fixture_matches_its_expected_shape() {
    for case in load_cases() {
        let params: Params = case.params.iter().collect();

        let layout = match case.nbytes {
            Some(nbytes) => {
                let resolved = resolve(&case.layout, &params, nbytes).unwrap();
                assert!(resolved.fits(), "{} does not fit {} bytes", case.layout, nbytes);
                resolved.layout
            }
            None => build_layout(&case.layout, &params).unwrap(),
        };

        assert_eq!(layout.size(), case.size, "size of {}", case.layout);
        assert_eq!(layout.extent(), case.extent, "extent of {}", case.layout);
        assert_eq!(
            layout.lower_bound(),
            case.lower_bound,
            "lower bound of {}",
            case.layout
        );

        if let Some(segments) = &case.segments {
            assert_eq!(&flatten(&layout), segments, "segments of {}", case.layout);
        }

        let covered: u64 = flatten(&layout).iter().map(|s| s.len).sum();
        assert_eq!(covered, case.size, "segments of {} must cover its size", case.layout);
    }
}

#[test]
fn fixtures_cover_the_whole_registry() {
    let covered: BTreeSet<String> = load_cases().into_iter().map(|c| c.layout).collect();

    for entry in registry::entries() {
        assert!(covered.contains(entry.name), "no fixture for {}", entry.name);
    }
}

#[test]
fn size_driven_fixtures_use_a_budget() {
    for case in load_cases() {
        let entry = registry::lookup(&case.layout).unwrap();
        assert_eq!(
            case.nbytes.is_some(),
            entry.category == Category::SizeDriven,
            "{}",
            case.layout
        );
    }
}

#[test]
fn resolver_flags_exactly_the_overflowing_budgets() {
    for case in load_cases() {
        let Some(nbytes) = case.nbytes else { continue };
        let params: Params = case.params.iter().collect();

        for budget in [nbytes, nbytes * 3, nbytes * 10 + 7] {
            let resolved = resolve(&case.layout, &params, budget).unwrap();
            assert_eq!(
                resolved.fits(),
                resolved.layout.size() <= budget,
                "{} at {} bytes",
                case.layout,
                budget
            );
        }
    }
}
