//! CLI definition and dispatch.

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{BacktestConfig, BacktestEngine, BacktestJob, BacktestParameters, BacktestRun};
use crate::domain::candle::Candle;
use crate::domain::comparison::compare_runs;
use crate::domain::config_validation::validate_config;
use crate::domain::error::SignalTraderError;
use crate::domain::report::BacktestReport;
use crate::domain::scoring::SignalScorer;
use crate::domain::sentiment::{SentimentScore, SentimentSource, SentimentTrend};
use crate::domain::signal::{Explanation, Signal};
use crate::domain::snapshot::{IndicatorEngine, IndicatorSnapshot};
use crate::domain::timeframe::Timeframe;
use crate::domain::validation::clean_series;
use crate::ports::candle_port::CandlePort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "signaltrader",
    about = "Technical-analysis trading signals and backtests"
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score the latest candles and print a trading signal
    Analyze {
        /// CSV file, or a directory of <COIN>_<timeframe>.csv files
        #[arg(long)]
        candles: PathBuf,
        #[arg(long)]
        coin: String,
        #[arg(short, long)]
        timeframe: String,
        /// Overall market sentiment in [-1, 1]
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        sentiment: f64,
        #[arg(long, value_enum, default_value_t = TrendArg::Stable)]
        sentiment_trend: TrendArg,
        /// Per-source sentiment as NAME=SCORE or NAME=SCORE:WEIGHT (repeatable);
        /// the weighted average replaces --sentiment
        #[arg(long = "sentiment-source", value_parser = parse_sentiment_source, conflicts_with = "sentiment")]
        sentiment_sources: Vec<SentimentSource>,
        /// Oldest-first overall scores; their direction replaces --sentiment-trend
        #[arg(
            long,
            value_delimiter = ',',
            allow_negative_numbers = true,
            conflicts_with = "sentiment_trend"
        )]
        sentiment_history: Vec<f64>,
        /// Print the snapshot, signal and explanation as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one or more backtests
    Backtest {
        /// INI config; repeat to compare several runs
        #[arg(short, long, required = true)]
        config: Vec<PathBuf>,
        /// CSV file, or a directory of <COIN>_<timeframe>.csv files
        #[arg(long)]
        candles: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a backtest configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TrendArg {
    Rising,
    Falling,
    Stable,
}

impl From<TrendArg> for SentimentTrend {
    fn from(arg: TrendArg) -> Self {
        match arg {
            TrendArg::Rising => SentimentTrend::Rising,
            TrendArg::Falling => SentimentTrend::Falling,
            TrendArg::Stable => SentimentTrend::Stable,
        }
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Analyze {
            candles,
            coin,
            timeframe,
            sentiment,
            sentiment_trend,
            sentiment_sources,
            sentiment_history,
            json,
        } => build_sentiment(sentiment, sentiment_trend, sentiment_sources, &sentiment_history)
            .and_then(|sentiment| run_analyze(&candles, &coin, &timeframe, &sentiment, json)),
        Command::Backtest {
            config,
            candles,
            output,
        } => run_backtest(&config, &candles, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

#[derive(Serialize)]
struct Analysis<'a> {
    signal: &'a Signal,
    explanation: &'a Explanation,
    snapshot: &'a IndicatorSnapshot,
}

/// Parses `NAME=SCORE` or `NAME=SCORE:WEIGHT`; the weight defaults to 1.
fn parse_sentiment_source(raw: &str) -> Result<SentimentSource, String> {
    let (name, rest) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=SCORE[:WEIGHT], got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing source name in '{raw}'"));
    }
    let (score, weight) = rest.split_once(':').unwrap_or((rest, "1"));
    let score: f64 = score
        .trim()
        .parse()
        .map_err(|_| format!("invalid score '{score}'"))?;
    let weight: f64 = weight
        .trim()
        .parse()
        .map_err(|_| format!("invalid weight '{weight}'"))?;
    if !(-1.0..=1.0).contains(&score) {
        return Err(format!("score {score} is outside [-1, 1]"));
    }
    if !weight.is_finite() || weight < 0.0 {
        return Err(format!("weight {weight} must be a non-negative number"));
    }
    Ok(SentimentSource {
        name: name.to_string(),
        score,
        weight,
    })
}

/// Sentiment for `analyze`. Sources, when given, replace the single score;
/// a score history, when given, replaces the explicit trend.
fn build_sentiment(
    score: f64,
    trend: TrendArg,
    sources: Vec<SentimentSource>,
    history: &[f64],
) -> Result<SentimentScore, SignalTraderError> {
    let out_of_range = |key: &str, value: f64| SignalTraderError::ConfigInvalid {
        section: "analyze".into(),
        key: key.into(),
        reason: format!("{value} is outside [-1, 1]"),
    };
    if !(-1.0..=1.0).contains(&score) {
        return Err(out_of_range("sentiment", score));
    }
    if let Some(&bad) = history.iter().find(|v| !(-1.0..=1.0).contains(*v)) {
        return Err(out_of_range("sentiment_history", bad));
    }

    let trend: SentimentTrend = if history.is_empty() {
        trend.into()
    } else {
        SentimentTrend::detect(history)
    };
    let sentiment = if sources.is_empty() {
        SentimentScore::new(score, trend)
    } else {
        SentimentScore::from_sources(sources, trend)
    };
    eprintln!(
        "Sentiment: {:.2} ({}, {} source(s))",
        sentiment.overall_score,
        sentiment.trend,
        sentiment.sources.len()
    );
    Ok(sentiment)
}

fn run_analyze(
    candles_path: &Path,
    coin: &str,
    timeframe: &str,
    sentiment: &SentimentScore,
    json: bool,
) -> Result<(), SignalTraderError> {
    let timeframe: Timeframe = timeframe.parse()?;

    // Stage 1: Load and clean candles
    let candles = load_candles(candles_path, coin, timeframe)?;

    // Stage 2: Indicators
    let snapshot = IndicatorEngine::new().compute(&candles)?;

    // Stage 3: Score
    let (signal, explanation) = SignalScorer::new().score(coin, timeframe, &snapshot, sentiment);

    if json {
        let analysis = Analysis {
            signal: &signal,
            explanation: &explanation,
            snapshot: &snapshot,
        };
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_signal(&signal, &explanation, snapshot.confluence_score);
    }
    Ok(())
}

fn print_signal(signal: &Signal, explanation: &Explanation, confluence: f64) {
    println!("=== {} {} ===", signal.coin, signal.timeframe);
    println!("Signal:       {} ({})", signal.signal_type, signal.direction);
    println!("Probability:  {:.1}%", signal.success_probability);
    println!("Confluence:   {:.2}", confluence);
    println!("Stop-Loss:    {:.4}", signal.stop_loss);
    println!("Take-Profit:  {:.4}", signal.take_profit);
    println!("As of:        {}", signal.timestamp);

    let sections = [
        ("Technical", &explanation.technical_reasons),
        ("Fundamental", &explanation.fundamental_reasons),
        ("Supporting", &explanation.supporting_indicators),
        ("Conflicting", &explanation.conflicting_indicators),
        ("Risk", &explanation.risk_factors),
    ];
    for (title, lines) in sections {
        if lines.is_empty() {
            continue;
        }
        println!("\n{title}:");
        for line in lines {
            println!("  - {line}");
        }
    }
}

fn load_candles(
    path: &Path,
    coin: &str,
    timeframe: Timeframe,
) -> Result<Vec<Candle>, SignalTraderError> {
    eprintln!("Loading {} {} candles from {}", coin, timeframe, path.display());
    let raw = CsvAdapter::for_path(path).fetch_candles(coin, timeframe)?;
    let cleaned = clean_series(&raw)?;
    let r = &cleaned.report;
    eprintln!(
        "  {} records -> {} candles ({} filled, {} repaired, {} duplicates, {} outliers)",
        r.input_records,
        cleaned.candles.len(),
        r.filled_values,
        r.repaired_candles,
        r.duplicates_removed,
        r.outliers_removed,
    );
    Ok(cleaned.candles)
}

fn load_settings(path: &Path) -> Result<(BacktestConfig, BacktestParameters), SignalTraderError> {
    eprintln!("Loading config from {}", path.display());
    let adapter = FileConfigAdapter::from_file(path)?;
    validate_config(&adapter)
}

fn run_backtest(
    config_paths: &[PathBuf],
    candles_path: &Path,
    output_path: Option<&Path>,
) -> Result<(), SignalTraderError> {
    // Stage 1: Configs
    let settings = config_paths
        .iter()
        .map(|p| load_settings(p))
        .collect::<Result<Vec<_>, _>>()?;

    // Stage 2: Candles, one series per config
    let series = settings
        .iter()
        .map(|(config, _)| load_candles(candles_path, &config.coin, config.timeframe))
        .collect::<Result<Vec<_>, _>>()?;

    // Stage 3: Replay
    let jobs: Vec<BacktestJob<'_>> = settings
        .into_iter()
        .zip(&series)
        .map(|((config, parameters), candles)| BacktestJob {
            candles,
            config,
            parameters,
        })
        .collect();
    eprintln!("Running {} backtest(s)", jobs.len());
    let runs = BacktestEngine::new()
        .run_many(&jobs)
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    // Stage 4: Summary and report
    for run in &runs {
        print_summary(run);
    }

    let reporter = JsonReportAdapter::new();
    if let [run] = runs.as_slice() {
        let output = output_path.unwrap_or(Path::new("backtest_report.json"));
        reporter.write(&BacktestReport::from(run), &output.to_string_lossy())?;
        eprintln!("\nReport written to: {}", output.display());
    } else {
        let comparison = compare_runs(&runs);
        eprintln!("\n=== Comparison ===");
        for row in &comparison.rows {
            let best = row
                .best
                .map(|i| format!("run {}", i + 1))
                .unwrap_or_else(|| "tie".to_string());
            eprintln!("  {:<26} {:?} best: {}", row.metric, row.values, best);
        }
        let output = output_path.unwrap_or(Path::new("backtest_comparison.json"));
        reporter.write_comparison(&comparison, &output.to_string_lossy())?;
        eprintln!("\nComparison written to: {}", output.display());
    }
    Ok(())
}

fn print_summary(run: &BacktestRun) {
    let m = &run.metrics;
    eprintln!(
        "\n=== {} {} ({} to {}) ===",
        run.coin, run.timeframe, run.period.start, run.period.end
    );
    eprintln!("Run ID:         {}", run.id);
    eprintln!("Final Capital:  {:.2}", run.final_capital);
    eprintln!(
        "Total P/L:      {:.2} ({:.2}%)",
        m.total_profit_loss, m.total_profit_loss_percent
    );
    eprintln!("Total Trades:   {}", m.total_trades);
    eprintln!("Win Rate:       {:.1}%", m.win_rate * 100.0);
    eprintln!(
        "Max Drawdown:   {:.2} ({:.1}%)",
        m.max_drawdown, m.max_drawdown_percent
    );
    eprintln!("Sharpe Ratio:   {:.2}", m.sharpe_ratio);
    eprintln!("Profit Factor:  {:.2}", m.profit_factor);
}

fn run_validate(config_path: &Path) -> Result<(), SignalTraderError> {
    let (config, parameters) = load_settings(config_path)?;

    eprintln!("\nBacktest:");
    eprintln!("  coin:            {}", config.coin);
    eprintln!("  timeframe:       {}", config.timeframe);
    eprintln!("  period:          {} to {}", config.start, config.end);
    eprintln!("  initial_capital: {:.2}", config.initial_capital);
    eprintln!("  risk_free_rate:  {}", config.risk_free_rate);

    eprintln!("\nStrategy:");
    eprintln!("  indicators:       {}", parameters.indicators.join(", "));
    eprintln!("  use_fundamental:  {}", parameters.use_fundamental);
    eprintln!("  signal_threshold: {}", parameters.signal_threshold);
    for (name, value) in &parameters.indicator_thresholds {
        eprintln!("  threshold {name}: {value}");
    }

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(name: &str, score: f64, weight: f64) -> SentimentSource {
        SentimentSource {
            name: name.into(),
            score,
            weight,
        }
    }

    #[test]
    fn source_spec_parsing() {
        assert_eq!(parse_sentiment_source("news=0.6:2").unwrap(), source("news", 0.6, 2.0));
        assert_eq!(parse_sentiment_source("social=-0.4").unwrap(), source("social", -0.4, 1.0));
        assert!(parse_sentiment_source("news").is_err());
        assert!(parse_sentiment_source("=0.5").is_err());
        assert!(parse_sentiment_source("news=1.5").is_err());
        assert!(parse_sentiment_source("news=0.5:-1").is_err());
    }

    #[test]
    fn sources_replace_single_score() {
        let sentiment = build_sentiment(
            0.0,
            TrendArg::Stable,
            vec![source("news", 0.8, 3.0), source("social", -0.4, 1.0)],
            &[],
        )
        .unwrap();
        assert!((sentiment.overall_score - 0.5).abs() < 1e-12);
        assert_eq!(sentiment.sources.len(), 2);
        assert_eq!(sentiment.trend, SentimentTrend::Stable);
    }

    #[test]
    fn history_replaces_explicit_trend() {
        let sentiment =
            build_sentiment(0.3, TrendArg::Stable, Vec::new(), &[-0.5, -0.3, 0.0, 0.2, 0.5]).unwrap();
        assert_eq!(sentiment.trend, SentimentTrend::Rising);
        assert!((sentiment.overall_score - 0.3).abs() < 1e-12);

        let explicit = build_sentiment(0.3, TrendArg::Falling, Vec::new(), &[]).unwrap();
        assert_eq!(explicit.trend, SentimentTrend::Falling);
    }

    #[test]
    fn out_of_range_history_rejected() {
        let err = build_sentiment(0.0, TrendArg::Stable, Vec::new(), &[0.1, 1.4]).unwrap_err();
        assert!(matches!(err, SignalTraderError::ConfigInvalid { key, .. } if key == "sentiment_history"));
    }
}
