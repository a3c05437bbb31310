use clap::Parser;
use pktsim_rs::net::LinkCostConfig;
use pktsim_rs::report::Report;
use pktsim_rs::setup::{self, ScenarioConfig};
use pktsim_rs::sim::{SimTime, Simulation};
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "pktsim", about = "Run a packet network scenario file")]
struct Args {
    /// Path to the scenario configuration
    config: PathBuf,

    /// Stop after this simulated time (seconds); defaults to running until no events remain
    #[arg(long)]
    until_secs: Option<f64>,

    /// Bin width for throughput series (ms)
    #[arg(long, default_value_t = 100)]
    bin_ms: u64,

    /// Use only propagation delay as the routing cost
    #[arg(long)]
    static_costs: bool,

    /// Re-advertise routes on this period (ms); only useful together with --until-secs
    #[arg(long)]
    refresh_ms: Option<u64>,

    /// Output run report JSON
    #[arg(long)]
    report_json: Option<PathBuf>,

    /// Output per-event trace JSON
    #[arg(long)]
    trace_json: Option<PathBuf>,
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut cfg = ScenarioConfig::default();
    if args.static_costs {
        cfg.cost = LinkCostConfig::static_only();
    }
    cfg.router.refresh_interval = args.refresh_ms.map(SimTime::from_millis);

    let scenario = setup::load(&args.config, &cfg)?;
    let mut sim = Simulation::new(scenario.network);
    if args.trace_json.is_some() {
        sim.enable_trace();
    }

    match args.until_secs {
        Some(secs) => sim.run_until(SimTime::from_secs_f64(secs)),
        None => sim.run(),
    }

    let bin = SimTime::from_millis(args.bin_ms.max(1));
    let mut report = Report::build(&sim, bin);
    report.name_links(&scenario.links);
    report.retain_measured(&scenario.measured_flows, &scenario.measured_links);

    let s = &report.stats;
    println!(
        "summary end_s={:.6} events={} delivered_pkts={} delivered_bits={} duplicates={} acks={} dropped={} unroutable={} timeouts={} adverts={}",
        SimTime(report.end_ns).as_secs_f64(),
        report.processed_events,
        s.delivered_pkts,
        s.delivered_bits,
        s.duplicate_pkts,
        s.acks_received,
        s.dropped_pkts,
        s.unroutable_pkts,
        s.timeouts,
        s.advertisements
    );
    for f in &report.flows {
        println!(
            "flow name={} src={} dst={} algo={} window={:.3} acked_bits={} timeouts={} complete={}",
            f.name, f.source, f.dest, f.algorithm, f.window, f.bits_acked, f.timeouts, f.complete
        );
    }
    for l in &report.links {
        println!(
            "link name={} from={} to={} sent={} losses={} mean_bps={:.1}",
            l.name.as_deref().unwrap_or("-"),
            l.from,
            l.to,
            l.packets_sent,
            l.losses.len(),
            l.mean_throughput_bps
        );
    }

    if let Some(path) = args.report_json {
        fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        eprintln!("wrote report to {}", path.display());
    }
    if let Some(path) = args.trace_json {
        if let Some(trace) = sim.trace.take() {
            fs::write(&path, serde_json::to_string_pretty(&trace.events)?)?;
            eprintln!("wrote trace events to {}", path.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
