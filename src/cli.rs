//! CLI definition, dispatch and the pipeline stages behind each command.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvStore;
use crate::adapters::csv_report::{
    CsvReportAdapter, write_factor_table, write_percentile_table, write_signal_table,
};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestResult, run_backtest};
use crate::domain::config_validation::{Settings, load_settings};
use crate::domain::error::InvquantError;
use crate::domain::factors::{self, FactorTable};
use crate::domain::instrument::Metal;
use crate::domain::metrics::PerformanceMetrics;
use crate::domain::percentile::{
    PercentileTable, RegionalPercentile, global_percentile, regional_percentiles,
    source_percentile_trend,
};
use crate::domain::regime::{InventoryRegime, RegimeReading};
use crate::domain::series::{AlignedSeriesSet, TimeSeries, date_axis, display_start};
use crate::domain::strategy::summary::{LatestSignal, SignalSummary};
use crate::domain::strategy::{
    SignalRow, StrategyKind, divergence, hysteresis, positions, spread,
};
use crate::ports::data_port::TimeSeriesStore;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "invquant",
    about = "Commodity inventory percentile signals and backtests"
)]
pub struct Cli {
    /// INI configuration file; built-in defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Directory of series CSV files, overriding [data] dir
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Global inventory percentile table for one metal
    Percentile {
        #[arg(long)]
        metal: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Signal table for one strategy
    Signals {
        #[arg(short, long)]
        strategy: String,
        #[arg(long)]
        metal: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest one strategy against futures prices
    Backtest {
        #[arg(short, long)]
        strategy: String,
        #[arg(long)]
        metal: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Derived factor tables (ratios, flows, structure) for one metal
    Factors {
        #[arg(long)]
        metal: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest every default strategy unit and compare them
    Compare,
    /// Inventory regimes, regional percentiles and latest signals
    Dashboard,
    /// Validate the configuration
    Validate,
}

pub fn run(cli: Cli) -> ExitCode {
    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn dispatch(cli: Cli) -> Result<(), InvquantError> {
    let settings = load_cli_settings(cli.config.as_deref(), cli.data_dir.as_deref())?;
    let store = CsvStore::new(settings.data.dir.clone());

    match cli.command {
        Command::Percentile { metal, output } => {
            run_percentile_command(&store, &settings, &metal, output.as_deref())
        }
        Command::Signals {
            strategy,
            metal,
            output,
        } => run_signals_command(&store, &settings, &strategy, metal.as_deref(), output.as_deref()),
        Command::Backtest {
            strategy,
            metal,
            output,
        } => run_backtest_command(&store, &settings, &strategy, metal.as_deref(), output.as_deref()),
        Command::Factors { metal, output } => {
            run_factors_command(&store, &settings, &metal, output.as_deref())
        }
        Command::Compare => run_compare_command(&store, &settings),
        Command::Dashboard => run_dashboard_command(&store, &settings),
        Command::Validate => {
            print_settings(&settings);
            eprintln!("\nConfiguration is valid.");
            Ok(())
        }
    }
}

/// Loads and validates settings. Without a file every default applies.
pub fn load_cli_settings(
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
) -> Result<Settings, InvquantError> {
    let adapter = match config_path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            FileConfigAdapter::from_file(path)?
        }
        None => FileConfigAdapter::from_string("")?,
    };
    let mut settings = load_settings(&adapter)?;
    if let Some(dir) = data_dir {
        settings.data.dir = dir.to_path_buf();
    }
    tracing::debug!(dir = %settings.data.dir.display(), "settings loaded");
    Ok(settings)
}

/// Last axis date: the configured end date, else the latest observation.
pub fn analysis_end(settings: &Settings, series: &[TimeSeries]) -> NaiveDate {
    settings
        .data
        .end_date
        .or_else(|| series.iter().filter_map(TimeSeries::last_date).max())
        .unwrap_or(settings.data.start_date)
}

pub fn rolling_window(metal: Metal, settings: &Settings) -> usize {
    metal
        .spec()
        .rolling_window(settings.factors.window_years as usize)
}

fn display_from(settings: &Settings, axis: &[NaiveDate]) -> Option<NaiveDate> {
    axis.last()
        .map(|&end| display_start(end, settings.factors.display_years))
}

fn in_display(date: NaiveDate, from: Option<NaiveDate>) -> bool {
    from.is_none_or(|start| date >= start)
}

pub fn load_inventory_set(
    store: &dyn TimeSeriesStore,
    metal: Metal,
    settings: &Settings,
) -> Result<AlignedSeriesSet, InvquantError> {
    let series = store.fetch_inventory(metal)?;
    let end = analysis_end(settings, &series);
    Ok(AlignedSeriesSet::align(
        metal.spec().frequency,
        settings.data.start_date,
        end,
        &series,
    ))
}

/// Global percentile over the full history, trimmed to the display window.
pub fn global_table(
    store: &dyn TimeSeriesStore,
    metal: Metal,
    settings: &Settings,
) -> Result<PercentileTable, InvquantError> {
    let set = load_inventory_set(store, metal, settings)?;
    let table = global_percentile(&set, rolling_window(metal, settings))?;
    Ok(match display_from(settings, &set.axis) {
        Some(start) => table.display_from(start),
        None => table,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRun {
    pub kind: StrategyKind,
    pub metal: Metal,
    pub rows: Vec<SignalRow>,
}

impl StrategyRun {
    pub fn label(&self) -> String {
        format!("{}_{}", self.kind.name(), self.metal.code())
    }
}

/// Metal a strategy runs on when none is given.
pub fn default_metal(kind: StrategyKind, settings: &Settings) -> Result<Metal, InvquantError> {
    match kind {
        StrategyKind::Beta => Err(InvquantError::invalid_parameter(
            "metal",
            "--metal is required for Beta_Inventory",
        )),
        StrategyKind::Arbitrage => Ok(settings.arbitrage.metal),
        StrategyKind::Event => Ok(settings.event.metal),
    }
}

/// Every (strategy, metal) unit evaluated by `compare` and `dashboard`.
pub fn default_units(settings: &Settings) -> Vec<(StrategyKind, Metal)> {
    let mut units: Vec<(StrategyKind, Metal)> = Metal::ALL
        .iter()
        .map(|&metal| (StrategyKind::Beta, metal))
        .collect();
    units.push((StrategyKind::Arbitrage, settings.arbitrage.metal));
    units.push((StrategyKind::Event, settings.event.metal));
    units
}

pub fn run_strategy(
    store: &dyn TimeSeriesStore,
    kind: StrategyKind,
    metal: Metal,
    settings: &Settings,
) -> Result<StrategyRun, InvquantError> {
    let rows = match kind {
        StrategyKind::Beta => {
            let table = global_table(store, metal, settings)?;
            hysteresis::scan(&table.scores(), &settings.beta)
        }
        StrategyKind::Arbitrage => arbitrage_signals(store, metal, settings)?,
        StrategyKind::Event => event_signals(store, metal, settings)?,
    };
    tracing::info!(strategy = %kind, metal = %metal, rows = rows.len(), "generated signals");
    Ok(StrategyRun { kind, metal, rows })
}

fn arbitrage_signals(
    store: &dyn TimeSeriesStore,
    metal: Metal,
    settings: &Settings,
) -> Result<Vec<SignalRow>, InvquantError> {
    let arb = &settings.arbitrage;
    let set = load_inventory_set(store, metal, settings)?;
    let window = rolling_window(metal, settings);
    let from = display_from(settings, &set.axis);

    let scores = |source: &str| -> Result<Vec<(NaiveDate, Option<f64>)>, InvquantError> {
        Ok(source_percentile_trend(&set, source, window)?
            .into_iter()
            .filter(|r| in_display(r.date, from))
            .map(|r| (r.date, r.percentile))
            .collect())
    };
    let pairs = spread::align_pair(&scores(&arb.source_a)?, &scores(&arb.source_b)?);
    Ok(spread::scan(&pairs, &arb.params))
}

fn event_signals(
    store: &dyn TimeSeriesStore,
    metal: Metal,
    settings: &Settings,
) -> Result<Vec<SignalRow>, InvquantError> {
    let ev = &settings.event;
    let pair = [
        store.fetch_series(metal, &ev.source_a, &ev.metric_a)?,
        store.fetch_series(metal, &ev.source_b, &ev.metric_b)?,
    ];
    let end = analysis_end(settings, &pair);
    let axis = date_axis(metal.spec().frequency, settings.data.start_date, end);
    let a = pair[0].reindex_as_of(&axis);
    let b = pair[1].reindex_as_of(&axis);
    let from = display_from(settings, &axis);

    let inputs: Vec<divergence::DivergenceInput> = divergence::build_inputs(&axis, &a, &b)?
        .into_iter()
        .filter(|input| in_display(input.date, from))
        .collect();
    Ok(divergence::scan(&inputs, &ev.params))
}

/// Runs a strategy and backtests its signals against the metal's prices.
pub fn backtest_strategy(
    store: &dyn TimeSeriesStore,
    kind: StrategyKind,
    metal: Metal,
    settings: &Settings,
) -> Result<(StrategyRun, BacktestResult), InvquantError> {
    let run = run_strategy(store, kind, metal, settings)?;
    if run.rows.is_empty() {
        return Err(InvquantError::malformed(
            run.label(),
            "strategy produced no signals",
        ));
    }
    let prices = store.fetch_prices(metal)?;
    let result = run_backtest(&prices, &positions(&run.rows), &settings.backtest)?;
    Ok((run, result))
}

/// Every catalogue factor for `metal`, with inputs reindexed as-of onto the
/// metal's axis and trimmed to the display window.
pub fn derived_factors(
    store: &dyn TimeSeriesStore,
    metal: Metal,
    settings: &Settings,
) -> Result<Vec<FactorTable>, InvquantError> {
    let mut tables = Vec::new();
    for spec in factors::catalogue(metal) {
        let series = spec
            .inputs
            .iter()
            .map(|(source, metric)| store.fetch_series(metal, source, metric))
            .collect::<Result<Vec<_>, _>>()?;
        let end = analysis_end(settings, &series);
        let axis = date_axis(metal.spec().frequency, settings.data.start_date, end);
        let inputs: Vec<Vec<f64>> = series.iter().map(|s| s.reindex_as_of(&axis)).collect();

        let price = if spec.with_price {
            let prices = store.fetch_prices(metal)?;
            (!prices.is_empty()).then(|| prices.reindex_as_of(&axis))
        } else {
            None
        };

        let table = spec.compute(&axis, &inputs, price.as_deref())?;
        tracing::info!(metal = %metal, factor = spec.name, rows = table.rows.len(), "derived factor");
        tables.push(match display_from(settings, &axis) {
            Some(start) => table.display_from(start),
            None => table,
        });
    }
    Ok(tables)
}

#[derive(Debug)]
pub struct ComparisonEntry {
    pub label: String,
    pub outcome: Result<PerformanceMetrics, InvquantError>,
}

/// Backtests every default unit in parallel. Units are independent, so one
/// failure never affects another.
pub fn compare_strategies(store: &dyn TimeSeriesStore, settings: &Settings) -> Vec<ComparisonEntry> {
    default_units(settings)
        .par_iter()
        .map(|&(kind, metal)| ComparisonEntry {
            label: format!("{}_{}", kind.name(), metal.code()),
            outcome: backtest_strategy(store, kind, metal, settings).map(|(_, r)| r.metrics),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetalDashboard {
    pub metal: Metal,
    pub regime: RegimeReading,
    pub regional: Vec<RegionalPercentile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub metals: Vec<MetalDashboard>,
    pub latest: Vec<LatestSignal>,
    pub summary: SignalSummary,
}

pub fn build_dashboard(
    store: &dyn TimeSeriesStore,
    settings: &Settings,
) -> Result<Dashboard, InvquantError> {
    let mut metals = Vec::with_capacity(Metal::ALL.len());
    for metal in Metal::ALL {
        let set = load_inventory_set(store, metal, settings)?;
        let window = rolling_window(metal, settings);
        let table = global_percentile(&set, window)?;
        metals.push(MetalDashboard {
            metal,
            regime: InventoryRegime::classify(table.latest_percentile()),
            regional: regional_percentiles(&set, window)?,
        });
    }

    let mut latest = Vec::new();
    for (kind, metal) in default_units(settings) {
        match run_strategy(store, kind, metal, settings) {
            Ok(run) => latest.extend(LatestSignal::from_rows(kind, metal, &run.rows)),
            Err(e) => tracing::warn!(strategy = %kind, metal = %metal, error = %e, "strategy skipped"),
        }
    }
    let summary = SignalSummary::from_latest(&latest);
    Ok(Dashboard {
        metals,
        latest,
        summary,
    })
}

fn resolve_metal(
    kind: StrategyKind,
    metal: Option<&str>,
    settings: &Settings,
) -> Result<Metal, InvquantError> {
    match metal {
        Some(m) => Metal::parse(m),
        None => default_metal(kind, settings),
    }
}

fn run_percentile_command(
    store: &dyn TimeSeriesStore,
    settings: &Settings,
    metal: &str,
    output: Option<&Path>,
) -> Result<(), InvquantError> {
    let metal = Metal::parse(metal)?;
    let table = global_table(store, metal, settings)?;
    eprintln!(
        "{}: {} rows, window {} periods",
        metal,
        table.rows.len(),
        rolling_window(metal, settings)
    );

    write_percentile_table(&table, std::io::stdout())?;

    let reading = InventoryRegime::classify(table.latest_percentile());
    eprintln!(
        "\nLatest percentile: {:.1}% -> {}",
        reading.percentile * 100.0,
        reading.regime
    );

    if let Some(dir) = output {
        CsvReportAdapter::new(dir.to_path_buf()).write_percentiles(&table, metal.code())?;
    }
    Ok(())
}

fn run_signals_command(
    store: &dyn TimeSeriesStore,
    settings: &Settings,
    strategy: &str,
    metal: Option<&str>,
    output: Option<&Path>,
) -> Result<(), InvquantError> {
    let kind = StrategyKind::parse(strategy)?;
    let metal = resolve_metal(kind, metal, settings)?;
    let run = run_strategy(store, kind, metal, settings)?;

    write_signal_table(&run.rows, std::io::stdout())?;
    match run.rows.last() {
        Some(last) => eprintln!("\n{}: {} on {} ({})", run.label(), last.signal, last.date, last.reason),
        None => eprintln!("\n{}: no data", run.label()),
    }

    if let Some(dir) = output {
        CsvReportAdapter::new(dir.to_path_buf()).write_signals(&run.rows, &run.label())?;
    }
    Ok(())
}

fn run_factors_command(
    store: &dyn TimeSeriesStore,
    settings: &Settings,
    metal: &str,
    output: Option<&Path>,
) -> Result<(), InvquantError> {
    let metal = Metal::parse(metal)?;
    let tables = derived_factors(store, metal, settings)?;
    let report = output.map(|dir| CsvReportAdapter::new(dir.to_path_buf()));

    for table in &tables {
        eprintln!("\n{} {}: {} rows", metal, table.name, table.rows.len());
        write_factor_table(table, std::io::stdout())?;
        if let Some(report) = &report {
            report.write_factors(table, metal.code())?;
        }
    }
    Ok(())
}

fn run_backtest_command(
    store: &dyn TimeSeriesStore,
    settings: &Settings,
    strategy: &str,
    metal: Option<&str>,
    output: Option<&Path>,
) -> Result<(), InvquantError> {
    let kind = StrategyKind::parse(strategy)?;
    let metal = resolve_metal(kind, metal, settings)?;
    let (run, result) = backtest_strategy(store, kind, metal, settings)?;

    let first = result.rows.first().map(|r| r.date);
    let last = result.rows.last().map(|r| r.date);
    if let (Some(first), Some(last)) = (first, last) {
        eprintln!(
            "Backtest {}: {} periods, {} to {}",
            run.label(),
            result.rows.len(),
            first,
            last
        );
    }
    println!("{}", result.metrics.summary());

    if let Some(dir) = output {
        let report = CsvReportAdapter::new(dir.to_path_buf());
        report.write_signals(&run.rows, &run.label())?;
        report.write_backtest(&result, &run.label())?;
        eprintln!("Report written to: {}", dir.display());
    }
    Ok(())
}

fn run_compare_command(store: &dyn TimeSeriesStore, settings: &Settings) -> Result<(), InvquantError> {
    let entries = compare_strategies(store, settings);

    println!(
        "{:<26} {:>10} {:>10} {:>8} {:>10} {:>8} {:>7} {:>10}",
        "strategy", "total", "cagr", "sharpe", "max_dd", "win", "trades", "alpha"
    );
    let mut first_error = None;
    let mut succeeded = 0usize;
    for entry in entries {
        match entry.outcome {
            Ok(m) => {
                succeeded += 1;
                println!(
                    "{:<26} {:>9.2}% {:>9.2}% {:>8.2} {:>9.2}% {:>7.1}% {:>7} {:>9.2}%",
                    entry.label,
                    m.total_return * 100.0,
                    m.cagr * 100.0,
                    m.sharpe_ratio,
                    m.max_drawdown * 100.0,
                    m.win_rate * 100.0,
                    m.total_trades,
                    m.alpha * 100.0
                );
            }
            Err(e) => {
                eprintln!("warning: {} failed: {}", entry.label, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match (succeeded, first_error) {
        (0, Some(e)) => Err(e),
        _ => Ok(()),
    }
}

fn run_dashboard_command(store: &dyn TimeSeriesStore, settings: &Settings) -> Result<(), InvquantError> {
    let dashboard = build_dashboard(store, settings)?;

    for entry in &dashboard.metals {
        println!(
            "{:<7} {:>6.1}%  {}",
            entry.metal.code(),
            entry.regime.percentile * 100.0,
            entry.regime.regime
        );
        for region in &entry.regional {
            println!(
                "    {:<6} {:>16.0} {:>6.1}%",
                region.source,
                region.current_value,
                region.percentile * 100.0
            );
        }
    }

    println!();
    for latest in &dashboard.latest {
        println!(
            "{:<26} {:<6} {}  {}",
            format!("{}_{}", latest.strategy.name(), latest.metal.code()),
            latest.signal.name(),
            latest.date,
            latest.reason
        );
    }

    let s = &dashboard.summary;
    eprintln!(
        "\n{} strategies: {} long, {} short, {} flat",
        s.total(),
        s.overall.long,
        s.overall.short,
        s.overall.flat
    );
    Ok(())
}

fn print_settings(settings: &Settings) {
    eprintln!("Data:      {} from {}", settings.data.dir.display(), settings.data.start_date);
    eprintln!(
        "Factors:   window {}y, display {}y",
        settings.factors.window_years, settings.factors.display_years
    );
    let bt = &settings.backtest;
    eprintln!(
        "Backtest:  commission {}, slippage {}, risk-free {}, {} periods/year",
        bt.commission_rate, bt.slippage_rate, bt.risk_free_rate, bt.trading_periods_per_year
    );
    let beta = &settings.beta;
    eprintln!(
        "Beta:      long {} / {}, short {} / {}",
        beta.long_entry(),
        beta.long_exit(),
        beta.short_entry(),
        beta.short_exit()
    );
    let arb = &settings.arbitrage;
    eprintln!(
        "Arbitrage: {} {} - {}",
        arb.metal, arb.source_a, arb.source_b
    );
    let ev = &settings.event;
    eprintln!(
        "Event:     {} {}:{} vs {}:{}",
        ev.metal, ev.source_a, ev.metric_a, ev.source_b, ev.metric_b
    );
}
