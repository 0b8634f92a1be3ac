use life_engine::rule;
use life_engine::{Grid, Partition};
use rand::RngCore;
use rand::SeedableRng;

fn random_grid(size: usize, density: f64, seed: u64) -> Grid {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let threshold = (u64::MAX as f64 * density) as u64;
    let mut grid = Grid::new(size);
    for y in 0..size as i64 {
        for x in 0..size as i64 {
            if rng.next_u64() <= threshold {
                grid.set(x, y, true);
            }
        }
    }
    grid
}

fn run_parity_case(size: usize, chunks: usize, density: f64, steps: usize, seed: u64) {
    let partition = Partition::new(size, chunks).unwrap();
    let mut reference = random_grid(size, density, seed);
    let mut chunked = reference.clone();

    for step in 0..steps {
        reference = rule::advance(&reference);
        chunked = partition.advance(&chunked).unwrap();
        assert_eq!(
            chunked.live_count(),
            reference.live_count(),
            "population mismatch at step {step} for {chunks} chunks, density {density}, seed {seed}"
        );
    }
    assert_eq!(
        chunked, reference,
        "cell mismatch for {chunks} chunks, density {density}, seed {seed}"
    );
}

#[test]
fn parity_sparse_mid_dense() {
    run_parity_case(64, 4, 0.10, 8, 0xA1);
    run_parity_case(64, 4, 0.42, 8, 0xB2);
    run_parity_case(64, 4, 0.83, 4, 0xC3);
}

#[test]
fn parity_across_partitions() {
    for chunks in [1, 2, 3, 5, 6, 8, 9, 12] {
        run_parity_case(45, chunks, 0.35, 6, chunks as u64);
    }
}

#[test]
fn parity_multiple_seeds() {
    for seed in [11u64, 22, 33, 44] {
        run_parity_case(72, 4, 0.35, 7, seed);
    }
}

#[test]
fn parity_with_one_cell_wide_regions() {
    run_parity_case(7, 7, 0.5, 5, 0x77);
}
