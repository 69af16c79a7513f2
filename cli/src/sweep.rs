//! Runs the configured indicator sweep on the selected backend.
//!
//! Every sweep goes through [`nanosweep::apply_concat`], one iteration per
//! window. `crossover` combines the fast moving average with the slow
//! average for window `i` via [`combine::select_and_combine`].

use nanosweep::ndarray::Array1;
use nanosweep::{
    Arity, Backend, BackendKind, Buffer, Context, IterationOutput, Kwargs, LogProgress,
    NoProgress, Progress, ThreadPoolRuntime, apply_concat, combine,
};

use crate::config::{Config, SweepKind};
use crate::error::Result;
use crate::indicators;

/// Positional arguments shared by every iteration.
#[derive(Debug, Clone)]
pub struct SweepArgs {
    pub close: Vec<f64>,
    pub windows: Vec<usize>,
    pub num_std: f64,
    /// Fast moving average, set for crossover sweeps.
    pub pivot: Option<Array1<f64>>,
}

/// Stacked sweep result with one label per column.
#[derive(Debug, Clone)]
pub struct SweepOutput {
    pub kind: SweepKind,
    pub backend: BackendKind,
    pub columns: Vec<String>,
    pub buffer: Buffer,
}

/// Run the sweep described by `config` over `closes` on `backend`.
pub fn run(config: &Config, backend: BackendKind, closes: Vec<f64>) -> Result<SweepOutput> {
    let sweep = &config.sweep;
    let pivot = match sweep.kind {
        SweepKind::Crossover => sweep.fast.map(|fast| indicators::sma(&closes, fast)),
        _ => None,
    };
    let args = SweepArgs {
        close: closes,
        windows: sweep.windows.clone(),
        num_std: sweep.num_std,
        pivot,
    };
    log::info!(
        "{} sweep over {} windows on {} bars ({backend})",
        sweep.kind,
        args.windows.len(),
        args.close.len()
    );

    let columns = labels(sweep.kind, &args.windows, sweep.fast);
    let buffer = with_backend(backend, config.engine.workers, |backend| {
        let mut progress: Box<dyn Progress> = if config.engine.show_progress {
            Box::new(LogProgress::new(sweep.kind.to_string(), config.engine.progress_every))
        } else {
            Box::new(NoProgress)
        };
        window_sweep(sweep.kind, backend, args, progress.as_mut())
    })?;

    Ok(SweepOutput {
        kind: sweep.kind,
        backend,
        columns,
        buffer,
    })
}

/// Resolve `kind` into a [`Backend`], building a thread pool when needed.
fn with_backend<T>(
    kind: BackendKind,
    workers: usize,
    f: impl FnOnce(Backend<'_>) -> Result<T>,
) -> Result<T> {
    match kind {
        BackendKind::Sequential => f(Backend::Sequential),
        BackendKind::Compiled => f(Backend::Compiled),
        BackendKind::Distributed => {
            let runtime = ThreadPoolRuntime::new(workers)?;
            log::info!("thread pool ready with {} workers", runtime.workers());
            f(Backend::Distributed(&runtime))
        }
    }
}

/// Apply function for every sweep: iteration `i` uses `windows[i]`.
///
/// A crossover without a pivot yields no output, which the engine reports
/// as an arity mismatch.
pub fn apply_indicator(kind: SweepKind, i: usize, args: &SweepArgs) -> IterationOutput {
    let window = args.windows[i];
    match kind {
        SweepKind::Sma => IterationOutput::One(indicators::sma(&args.close, window).into()),
        SweepKind::Ema => IterationOutput::One(indicators::ema(&args.close, window).into()),
        SweepKind::Rsi => IterationOutput::One(indicators::rsi(&args.close, window).into()),
        SweepKind::Bbands => {
            IterationOutput::many(indicators::bbands(&args.close, window, args.num_std))
        }
        SweepKind::Crossover => match &args.pivot {
            Some(pivot) => IterationOutput::One(
                combine::select_and_combine(
                    i,
                    pivot,
                    &args.windows,
                    |fast, w, close: &Vec<f64>, _| {
                        indicators::crossed_above(fast, &indicators::sma(close, *w))
                    },
                    &args.close,
                    &Kwargs::new(),
                )
                .into(),
            ),
            None => IterationOutput::Nothing,
        },
    }
}

/// Column labels in stacking order.
fn labels(kind: SweepKind, windows: &[usize], fast: Option<usize>) -> Vec<String> {
    match kind {
        SweepKind::Bbands => ["upper", "middle", "lower"]
            .iter()
            .flat_map(|band| windows.iter().map(move |w| format!("bbands_{band}_{w}")))
            .collect(),
        SweepKind::Crossover => {
            let fast = fast.unwrap_or_default();
            windows.iter().map(|w| format!("cross_{fast}_{w}")).collect()
        }
        _ => windows.iter().map(|w| format!("{kind}_{w}")).collect(),
    }
}

fn window_sweep(
    kind: SweepKind,
    backend: Backend<'_>,
    args: SweepArgs,
    progress: &mut dyn Progress,
) -> Result<Buffer> {
    let arity = match kind {
        SweepKind::Bbands => Arity::Multi,
        _ => Arity::Single,
    };
    let n = args.windows.len();
    let ctx = Context::new(args);
    let stacked = apply_concat(
        n,
        arity,
        backend,
        &ctx,
        |i, args, _: &Kwargs| apply_indicator(kind, i, args),
        progress,
    )?;
    Ok(Buffer::hstack(&stacked.into_buffers())?)
}
