use rand::Rng;

/// Splits `total_width_units` cells into run lengths in `1..=max_run_length`
/// that sum exactly to the total.
///
/// Each draw is uniform over the full range and clamped to what is left, so
/// the last run is often shorter than drawn.
pub fn partition_row<R: Rng + ?Sized>(
    rng: &mut R,
    total_width_units: u32,
    max_run_length: u32,
) -> Vec<u32> {
    let max_run_length = max_run_length.max(1);
    let mut remaining = total_width_units;
    let mut runs = Vec::new();
    while remaining > 0 {
        let run = rng.gen_range(1..=max_run_length).min(remaining);
        runs.push(run);
        remaining -= run;
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn runs_sum_to_total_and_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for total in 1..=40 {
            for max in 1..=8 {
                let runs = partition_row(&mut rng, total, max);
                assert_eq!(runs.iter().sum::<u32>(), total, "total={total} max={max}");
                assert!(runs.iter().all(|&run| (1..=max).contains(&run)));
            }
        }
    }

    #[test]
    fn same_seed_gives_same_runs() {
        let first = partition_row(&mut StdRng::seed_from_u64(99), 250, 6);
        let second = partition_row(&mut StdRng::seed_from_u64(99), 250, 6);

        assert_eq!(first, second);
    }

    #[test]
    fn unit_max_run_gives_single_cells() {
        let runs = partition_row(&mut StdRng::seed_from_u64(1), 5, 1);

        assert_eq!(runs, vec![1; 5]);
    }

    #[test]
    fn zero_width_gives_no_runs() {
        assert!(partition_row(&mut StdRng::seed_from_u64(1), 0, 6).is_empty());
    }
}
