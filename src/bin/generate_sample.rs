use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ndarray::Array3;

use obf_export::data::obf::{write_obf_path, Compression, NewStack};

#[derive(Parser, Debug)]
#[command(about = "Write synthetic multi-channel OBF stacks for trying obf-export.")]
struct Cli {
    /// Directory to write sample files into (created if missing)
    #[arg(default_value = "data/separate")]
    out_dir: PathBuf,

    /// Number of files to generate
    #[arg(long, default_value_t = 2)]
    files: usize,

    /// Depth slices per stack
    #[arg(long, default_value_t = 8)]
    depth: usize,

    /// Plane width and height in pixels
    #[arg(long, default_value_t = 128)]
    size: usize,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Gaussian spots (z, y, x, radius, peak) over a noisy background.
fn render_channel(
    shape: (usize, usize, usize),
    spots: &[(f64, f64, f64, f64, f64)],
    background: f64,
    rng: &mut SimpleRng,
) -> Array3<u16> {
    Array3::from_shape_fn(shape, |(z, y, x)| {
        let signal: f64 = spots
            .iter()
            .map(|&(sz, sy, sx, r, peak)| {
                let d2 = (z as f64 - sz).powi(2) * 4.0 + (y as f64 - sy).powi(2) + (x as f64 - sx).powi(2);
                peak * (-d2 / (2.0 * r * r)).exp()
            })
            .sum();
        let noisy = signal + background + rng.gauss(0.0, background.sqrt().max(1.0));
        noisy.clamp(0.0, u16::MAX as f64) as u16
    })
}

fn random_spots(rng: &mut SimpleRng, shape: (usize, usize, usize), n: usize, peak: f64) -> Vec<(f64, f64, f64, f64, f64)> {
    let (d, h, w) = shape;
    (0..n)
        .map(|_| {
            (
                rng.next_f64() * d as f64,
                rng.next_f64() * h as f64,
                rng.next_f64() * w as f64,
                2.0 + rng.next_f64() * 4.0,
                peak * (0.5 + rng.next_f64()),
            )
        })
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("creating {}", cli.out_dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let shape = (cli.depth.max(1), cli.size.max(1), cli.size.max(1));
    let channels = [
        ("STAR RED", 25, 1200.0, 40.0),
        ("STAR GREEN", 15, 800.0, 60.0),
        ("STAR ORANGE", 10, 2000.0, 30.0),
        // not in the default channel config, exercised as "skip"
        ("Transmitted", 0, 0.0, 900.0),
    ];

    for i in 0..cli.files {
        let stacks: Vec<(String, Array3<u16>)> = channels
            .iter()
            .map(|&(name, n_spots, peak, background)| {
                let spots = random_spots(&mut rng, shape, n_spots, peak);
                (
                    format!("Overview {i}/{name}"),
                    render_channel(shape, &spots, background, &mut rng),
                )
            })
            .collect();
        let entries: Vec<NewStack<'_, u16>> = stacks
            .iter()
            .map(|(name, data)| NewStack { name, data })
            .collect();

        let path = cli.out_dir.join(format!("sample{:02}.obf", i + 1));
        write_obf_path(&path, "synthetic sample", &entries, Compression::Zlib)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {} ({} stacks, {:?} each)", path.display(), entries.len(), shape);
    }
    Ok(())
}
