use pinmap_core::{distance_meters, miles_to_meters, Coordinate, Marker, Site};

use super::*;

/// Meters per degree of longitude on the equator (mean Earth radius).
const M_PER_DEG_EQUATOR: f64 = 111_195.08;

fn marker(id: &str, lat: f64, lon: f64) -> Marker {
    Marker::from_site(&Site {
        id: id.to_string(),
        coordinate: Coordinate::new(lat, lon),
        display_name: format!("Site {id}"),
    })
}

/// Marker on the equator `meters` east of the prime meridian.
fn east(id: &str, meters: f64) -> Marker {
    marker(id, 0.0, meters / M_PER_DEG_EQUATOR)
}

/// Two tight groups (3 and 2 markers, ~50 m apart internally) about 5 km apart.
fn two_groups() -> Vec<Marker> {
    vec![
        marker("a1", 34.0, -81.0),
        marker("a2", 34.000_45, -81.0),
        marker("a3", 34.0, -81.000_54),
        marker("b1", 34.045, -81.0),
        marker("b2", 34.045_45, -81.0),
    ]
}

fn ids(markers: &[Marker]) -> Vec<&str> {
    markers.iter().map(|m| m.id.as_str()).collect()
}

/// Groupings without the per-pass cluster ids.
#[allow(clippy::cast_possible_truncation)]
fn shape(markers: &[Marker]) -> Vec<(Option<&str>, Option<usize>, i64, i64)> {
    markers
        .iter()
        .map(|m| {
            (
                m.source_site_id(),
                m.cluster_size(),
                (m.coordinate.lat * 1e9).round() as i64,
                (m.coordinate.lon * 1e9).round() as i64,
            )
        })
        .collect()
}

/// Walk `out` alongside the input in pass order. Each pass must start at the
/// first unassigned input marker and take every unassigned marker within
/// `radius_miles` of it, so nothing near a seed is left for a later group.
#[allow(clippy::cast_precision_loss)]
fn assert_seed_grouping(
    input: &[Marker],
    out: &[Marker],
    radius_miles: f64,
    max_individual: usize,
) {
    let radius_m = miles_to_meters(radius_miles);
    let mut pending: Vec<&Marker> = input.iter().collect();
    let mut at = 0;

    while let Some((&seed, rest)) = pending.split_first() {
        let (near, far): (Vec<&Marker>, Vec<&Marker>) = rest
            .iter()
            .copied()
            .partition(|m| distance_meters(seed.coordinate, m.coordinate) <= radius_m);
        let mut group = vec![seed];
        group.extend(near);

        let emitted = out.get(at).expect("output ended before input was grouped");
        if let Some(size) = emitted.cluster_size() {
            assert_eq!(size, group.len(), "cluster seeded by {}", seed.id);
            assert!(size > max_individual);
            let n = group.len() as f64;
            let lat = group.iter().map(|m| m.coordinate.lat).sum::<f64>() / n;
            let lon = group.iter().map(|m| m.coordinate.lon).sum::<f64>() / n;
            assert!((emitted.coordinate.lat - lat).abs() < 1e-9);
            assert!((emitted.coordinate.lon - lon).abs() < 1e-9);
            at += 1;
        } else {
            assert!(group.len() <= max_individual, "group seeded by {}", seed.id);
            let expected: Vec<&str> = group.iter().map(|m| m.id.as_str()).collect();
            let end = at + group.len();
            assert!(end <= out.len(), "group seeded by {} truncated", seed.id);
            assert_eq!(ids(&out[at..end]), expected, "group seeded by {}", seed.id);
            at = end;
        }

        pending = far;
    }
    assert_eq!(at, out.len(), "output has markers beyond the input groups");
}

#[test]
fn empty_input_yields_empty_output() {
    assert!(cluster(&[], 1.0, 4).is_empty());
}

#[test]
fn single_marker_stays_individual() {
    let input = vec![marker("solo", 10.0, 10.0)];
    assert_eq!(cluster(&input, 5.0, 4), input);
}

#[test]
fn larger_group_clusters_while_smaller_group_stays_individual() {
    let out = cluster(&two_groups(), 0.1, 2);

    assert_eq!(out.len(), 3);
    assert_eq!(out[0].cluster_size(), Some(3));
    assert_eq!(out[0].label.as_deref(), Some("3 sites nearby"));
    assert_eq!(out[1].source_site_id(), Some("b1"));
    assert_eq!(out[2].source_site_id(), Some("b2"));
}

#[test]
fn threshold_of_one_clusters_both_groups() {
    let out = cluster(&two_groups(), 0.1, 1);

    let sizes: Vec<Option<usize>> = out.iter().map(Marker::cluster_size).collect();
    assert_eq!(sizes, vec![Some(3), Some(2)]);
}

#[test]
fn default_threshold_keeps_small_groups_individual() {
    let input = two_groups();
    let out = cluster(&input, 0.1, DEFAULT_MAX_INDIVIDUAL);
    assert_eq!(out, input);
}

#[test]
fn group_of_exactly_max_individual_stays_individual() {
    let input: Vec<Marker> = (0..4).map(|i| marker(&format!("m{i}"), 1.0, 1.0)).collect();
    let out = cluster(&input, 1.0, 4);
    assert_eq!(out.len(), 4);
    assert!(out.iter().all(|m| !m.is_cluster()));
}

#[test]
fn group_of_max_individual_plus_one_collapses() {
    let input: Vec<Marker> = (0..5).map(|i| marker(&format!("m{i}"), 1.0, 1.0)).collect();
    let out = cluster(&input, 1.0, 4);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].cluster_size(), Some(5));
    assert_eq!(out[0].coordinate, Coordinate::new(1.0, 1.0));
}

#[test]
fn membership_is_relative_to_seed_only() {
    // b is 0.8 r from the seed; c is 0.8 r from b but 1.6 r from the seed.
    let r_m = miles_to_meters(1.0);
    let input = vec![east("a", 0.0), east("b", 0.8 * r_m), east("c", 1.6 * r_m)];

    let out = cluster(&input, 1.0, 1);

    assert_eq!(out.len(), 2, "chaining must not pull c into the first group");
    assert_eq!(out[0].cluster_size(), Some(2));
    assert_eq!(out[1].source_site_id(), Some("c"));
}

#[test]
fn group_members_may_be_nearly_two_radii_apart() {
    let r_m = miles_to_meters(1.0);
    let input = vec![
        east("seed", 0.0),
        east("west", -0.9 * r_m),
        east("east", 0.9 * r_m),
    ];

    let out = cluster(&input, 1.0, 2);

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].cluster_size(), Some(3));
}

#[test]
fn seed_absorbs_near_markers_regardless_of_input_position() {
    let r_m = miles_to_meters(1.0);
    let input = vec![
        east("s", 0.0),
        east("f1", 10.0 * r_m),
        east("n1", 0.5 * r_m),
        east("f2", 20.0 * r_m),
        east("n2", -0.5 * r_m),
    ];

    let out = cluster(&input, 1.0, 10);

    assert_eq!(ids(&out), vec!["s", "n1", "n2", "f1", "f2"]);
}

#[test]
fn cluster_coordinate_is_mean_of_members() {
    let input = vec![
        marker("a", 10.0, 20.0),
        marker("b", 10.002, 20.0),
        marker("c", 10.0, 20.004),
    ];

    let out = cluster(&input, 5.0, 2);

    assert_eq!(out.len(), 1);
    let c = out[0].coordinate;
    assert!((c.lat - 10.000_666_666).abs() < 1e-6, "lat {}", c.lat);
    assert!((c.lon - 20.001_333_333).abs() < 1e-6, "lon {}", c.lon);
}

#[test]
fn zero_radius_disables_clustering_even_for_coincident_points() {
    let input: Vec<Marker> = (0..6).map(|i| marker(&format!("m{i}"), 5.0, 5.0)).collect();
    assert_eq!(cluster(&input, 0.0, 1), input);
}

#[test]
fn negative_or_nan_radius_disables_clustering() {
    let input: Vec<Marker> = (0..6).map(|i| marker(&format!("m{i}"), 5.0, 5.0)).collect();
    assert_eq!(cluster(&input, -3.0, 1), input);
    assert_eq!(cluster(&input, f64::NAN, 1), input);
}

#[test]
fn zero_max_individual_disables_clustering() {
    let input: Vec<Marker> = (0..6).map(|i| marker(&format!("m{i}"), 5.0, 5.0)).collect();
    assert_eq!(cluster(&input, 10.0, 0), input);
}

#[test]
fn coincident_points_cluster_once_over_threshold() {
    let input: Vec<Marker> = (0..6).map(|i| marker(&format!("m{i}"), 5.0, 5.0)).collect();
    let out = cluster(&input, 0.01, 4);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].cluster_size(), Some(6));
}

#[test]
fn every_input_marker_is_represented_exactly_once() {
    let input: Vec<Marker> = (0..150u32)
        .map(|i| {
            let lat = 34.0 + f64::from((i * 37) % 100) * 0.001;
            let lon = -81.0 + f64::from((i * 53) % 100) * 0.001;
            marker(&format!("site-{i}"), lat, lon)
        })
        .collect();

    for (radius, max_individual) in [(0.05, 1), (0.2, 2), (1.0, 4), (5.0, 10)] {
        let out = cluster(&input, radius, max_individual);

        let clustered: usize = out.iter().filter_map(Marker::cluster_size).sum();
        let individual: Vec<&str> = out.iter().filter_map(Marker::source_site_id).collect();
        assert_eq!(
            clustered + individual.len(),
            input.len(),
            "radius {radius}, max {max_individual}"
        );

        let unique: std::collections::HashSet<&str> = individual.iter().copied().collect();
        assert_eq!(unique.len(), individual.len(), "duplicate individual pin");
        assert!(out
            .iter()
            .filter_map(Marker::cluster_size)
            .all(|size| size > max_individual));

        assert_seed_grouping(&input, &out, radius, max_individual);
    }
}

#[test]
fn repeated_passes_group_identically() {
    let input = two_groups();
    let first = cluster(&input, 0.1, 1);
    let second = cluster(&input, 0.1, 1);
    assert_eq!(shape(&first), shape(&second));
}

#[test]
fn fresh_cluster_ids_change_every_pass() {
    let input = two_groups();
    let first = cluster(&input, 0.1, 1);
    let second = cluster(&input, 0.1, 1);
    assert_ne!(first[0].id, second[0].id);
}

#[test]
fn membership_ids_are_stable_across_passes_and_input_order() {
    let clusterer = Clusterer::new(1).with_id_strategy(ClusterIdStrategy::Membership);
    let input = two_groups();
    let first = clusterer.cluster(&input, 0.1);
    let second = clusterer.cluster(&input, 0.1);
    assert_eq!(ids(&first), ids(&second));

    let coincident: Vec<Marker> = (0..5).map(|i| marker(&format!("m{i}"), 1.0, 1.0)).collect();
    let mut reversed = coincident.clone();
    reversed.reverse();
    let forward = clusterer.cluster(&coincident, 0.1);
    let backward = clusterer.cluster(&reversed, 0.1);
    assert_eq!(forward[0].id, backward[0].id);
}

#[test]
fn membership_ids_differ_for_different_members() {
    let clusterer = Clusterer::new(1).with_id_strategy(ClusterIdStrategy::Membership);
    let out = clusterer.cluster(&two_groups(), 0.1);
    assert_ne!(out[0].id, out[1].id);
}

#[test]
fn settings_select_id_strategy() {
    let mut settings = pinmap_core::ClusterSettings::default();
    assert_eq!(Clusterer::from(&settings), Clusterer::default());

    settings.stable_cluster_ids = true;
    settings.max_individual = 7;
    let clusterer = Clusterer::from(&settings);
    assert_eq!(clusterer.max_individual(), 7);
    assert_eq!(
        clusterer,
        Clusterer::new(7).with_id_strategy(ClusterIdStrategy::Membership)
    );
}
