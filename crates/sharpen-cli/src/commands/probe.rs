//! Probe command: timing and cross-stripe determinism

use crate::ProbeArgs;
use anyhow::{Context, Result, bail};
use rayon::ThreadPoolBuilder;
use sharpen_core::PixelBuffer;
use sharpen_ops::UnsharpFilter;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// One stripe count's result.
#[derive(Debug)]
struct ProbeRun {
    stripes: usize,
    median_ms: f64,
    checksum: u64,
}

pub fn run(args: ProbeArgs) -> Result<()> {
    if args.threads.is_empty() {
        bail!("No stripe counts given");
    }
    let base = args.filter.resolve()?;
    let src = args.pattern.render(args.width, args.height, args.seed)?;

    let pool = ThreadPoolBuilder::new()
        .num_threads(args.pool_size)
        .thread_name(|i| format!("sharpen-{i}"))
        .build()
        .context("Failed to build worker pool")?;
    let pool = Arc::new(pool);

    info!(
        pattern = ?args.pattern,
        width = args.width,
        height = args.height,
        pool = pool.current_num_threads(),
        "probing"
    );

    let mut runs = Vec::with_capacity(args.threads.len());
    for &stripes in &args.threads {
        let config = base.clone().with_num_threads(stripes);
        let filter = UnsharpFilter::new(Arc::clone(&pool), config)
            .with_context(|| format!("Invalid settings for {stripes} stripe(s)"))?;

        let mut samples = Vec::with_capacity(args.repeat as usize);
        let mut out: Option<PixelBuffer> = None;
        for _ in 0..args.repeat {
            let t0 = Instant::now();
            let dst = filter
                .filter(&src, out.take())
                .with_context(|| format!("Filter failed with {stripes} stripe(s)"))?;
            samples.push(t0.elapsed().as_secs_f64() * 1000.0);
            out = Some(dst);
        }
        let out = out.context("No runs completed")?;

        let run = ProbeRun {
            stripes,
            median_ms: median_ms(&samples),
            checksum: checksum(&out),
        };
        debug!(?run, "stripe count done");
        println!(
            "METRIC stripes={} median_ms={:.3} checksum={:016x}",
            run.stripes, run.median_ms, run.checksum
        );
        runs.push(run);
    }

    let mismatched = mismatches(&runs);
    if !mismatched.is_empty() {
        bail!(
            "Output differs from {} stripe(s) for stripe counts {:?}",
            runs[0].stripes,
            mismatched
        );
    }
    println!("METRIC deterministic=true runs={}", runs.len());
    Ok(())
}

/// Stripe counts whose checksum differs from the first run.
fn mismatches(runs: &[ProbeRun]) -> Vec<usize> {
    let Some(first) = runs.first() else {
        return Vec::new();
    };
    runs.iter()
        .filter(|r| r.checksum != first.checksum)
        .map(|r| r.stripes)
        .collect()
}

fn median_ms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) * 0.5
    } else {
        sorted[mid]
    }
}

/// FNV-1a over the little-endian bytes of every pixel.
fn checksum(image: &PixelBuffer) -> u64 {
    image
        .pixels()
        .iter()
        .flat_map(|p| p.to_le_bytes())
        .fold(FNV_OFFSET, |hash, byte| {
            (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
        })
}
