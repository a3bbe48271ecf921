//! pv-monitor entry point: CLI wiring and config-driven monitor construction.

use std::path::Path;
use std::process;
use std::time::{Duration, Instant};

use chrono::{Datelike, Local, NaiveDate};
use pv_monitor::config::PlantConfig;
use pv_monitor::io::export::{export_buckets_csv, export_orders_csv, export_report_csv};
use pv_monitor::ivcurve::IvTestParameters;
use pv_monitor::logging::init_tracing;
use pv_monitor::monitor::Monitor;
use pv_monitor::orders::{OrderStatus, ServiceOrderRegistry};
use pv_monitor::sim::aggregate::Scope;
use pv_monitor::sim::kpi::PerformanceMetric;
use pv_monitor::sim::time::Period;

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<String>,
    preset: Option<String>,
    period: String,
    date: Option<NaiveDate>,
    scope: Scope,
    buckets_out: Option<String>,
    report_out: Option<String>,
    orders_out: Option<String>,
    iv_test: Option<String>,
    live_ticks: u64,
}

fn print_help() {
    eprintln!("pv-monitor: photovoltaic plant telemetry and performance model");
    eprintln!();
    eprintln!("Usage: pv-monitor [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>          Load plant from TOML config file");
    eprintln!("  --preset <name>          Use a built-in preset (default, iv_test)");
    eprintln!("  --period <kind>          daily, monthly or annual (default: monthly)");
    eprintln!("  --date <YYYY-MM-DD>      Date the period contains (default: today)");
    eprintln!("  --scope <scope>          plant, inverter:<id> or string:<id> (default: plant)");
    eprintln!("  --buckets-out <path>     Export the aggregated buckets to CSV");
    eprintln!("  --report-out <path>      Export the monthly plant report to CSV");
    eprintln!("  --orders-out <path>      Export the service orders to CSV");
    eprintln!("  --iv-test <inverter>     Run an IV-curve test on an inverter");
    eprintln!("  --live-ticks <n>         Run n seconds of live telemetry refresh");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --config or --preset is given, the default preset is used.");
}

fn fail(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}

fn value(args: &[String], i: usize, flag: &str, what: &str) -> String {
    match args.get(i) {
        Some(v) => v.clone(),
        None => fail(&format!("{flag} requires {what} argument")),
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        preset: None,
        period: "monthly".to_string(),
        date: None,
        scope: Scope::Plant,
        buckets_out: None,
        report_out: None,
        orders_out: None,
        iv_test: None,
        live_ticks: 0,
    };

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => {
                i += 1;
                cli.config_path = Some(value(&args, i, flag, "a path"));
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(value(&args, i, flag, "a name"));
            }
            "--period" => {
                i += 1;
                cli.period = value(&args, i, flag, "a period");
            }
            "--date" => {
                i += 1;
                let raw = value(&args, i, flag, "a date");
                match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
                    Ok(d) => cli.date = Some(d),
                    Err(_) => fail(&format!("--date value \"{raw}\" is not YYYY-MM-DD")),
                }
            }
            "--scope" => {
                i += 1;
                let raw = value(&args, i, flag, "a scope");
                match raw.parse::<Scope>() {
                    Ok(s) => cli.scope = s,
                    Err(e) => fail(&e.to_string()),
                }
            }
            "--buckets-out" => {
                i += 1;
                cli.buckets_out = Some(value(&args, i, flag, "a path"));
            }
            "--report-out" => {
                i += 1;
                cli.report_out = Some(value(&args, i, flag, "a path"));
            }
            "--orders-out" => {
                i += 1;
                cli.orders_out = Some(value(&args, i, flag, "a path"));
            }
            "--iv-test" => {
                i += 1;
                cli.iv_test = Some(value(&args, i, flag, "an inverter id"));
            }
            "--live-ticks" => {
                i += 1;
                let raw = value(&args, i, flag, "a count");
                match raw.parse::<u64>() {
                    Ok(n) => cli.live_ticks = n,
                    Err(_) => fail(&format!("--live-ticks value \"{raw}\" is not a valid u64")),
                }
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn load_config(cli: &CliArgs) -> PlantConfig {
    let loaded = if let Some(ref path) = cli.config_path {
        PlantConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        PlantConfig::from_preset(name)
    } else {
        Ok(PlantConfig::dashboard())
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    config
}

fn print_plant(monitor: &Monitor) {
    let plant = monitor.plant();
    println!("--- Plant: {} ---", plant.name);
    println!(
        "Inverters online:     {}/{}",
        plant.online_count(),
        plant.inverters().len()
    );
    println!(
        "Current output:       {:.2} kW of {:.2} kW",
        plant.power_kw(),
        plant.rated_kw()
    );
    for inv in plant.inverters() {
        let state = if inv.online { "online" } else { "offline" };
        let load = match monitor.load_gauge(&inv.id) {
            Ok((percent, status)) => format!("{percent:.0}% load ({status})"),
            Err(e) => fail(&e.to_string()),
        };
        println!(
            "  {} ({}) {state}: {:.2} kW, {load}, {:.1} V, {:.1} A, {:.1} °C, {} strings",
            inv.name,
            inv.id,
            inv.power_kw,
            inv.voltage_v,
            inv.current_a,
            inv.temperature_c,
            inv.strings.len()
        );
    }
}

fn print_projections(monitor: &Monitor, year: i32, as_of: NaiveDate) {
    let rows = monitor
        .compare_projections(year, as_of)
        .unwrap_or_else(|e| fail(&e.to_string()));
    println!("\n--- Projections {year} ---");
    for r in &rows {
        let actual = r.actual_kwh.map_or_else(|| "-".to_string(), |a| format!("{a:.1}"));
        let attainment = r.attainment.map_or_else(|| "-".to_string(), |a| a.to_string());
        println!(
            "  {:<10} target {:>8.0} kWh  actual {:>10}  attainment {attainment}",
            r.name, r.target_kwh, actual
        );
    }
    println!(
        "Annual target:        {:.0} kWh",
        monitor.projections().annual_target_kwh()
    );
}

fn print_orders(orders: &ServiceOrderRegistry) {
    println!("\n--- Service Orders ---");
    for status in OrderStatus::ALL {
        println!(
            "{:<20} {}",
            format!("{status}:"),
            orders.filter(Some(status)).len()
        );
    }
    for o in orders.list() {
        println!(
            "  {} [{}/{}] {} ({})",
            o.id, o.priority, o.status, o.title, o.equipment
        );
    }
}

fn main() {
    let cli = parse_args();
    init_tracing();

    let config = load_config(&cli);
    let mut monitor = match Monitor::from_config(&config) {
        Ok(m) => m.with_orders(ServiceOrderRegistry::sample()),
        Err(e) => fail(&e.to_string()),
    };

    let date = cli.date.unwrap_or_else(|| Local::now().date_naive());
    let period = Period::containing(&cli.period, date).unwrap_or_else(|e| fail(&e.to_string()));

    print_plant(&monitor);

    // Aggregation for the requested scope and period
    let buckets = monitor
        .aggregate(&cli.scope, period)
        .unwrap_or_else(|e| fail(&e.to_string()));
    let thresholds = monitor.thresholds().performance;
    println!("\n--- Scope: {} / {period} ---", cli.scope);
    for b in &buckets {
        println!("{b} | {}", PerformanceMetric::from_bucket(b, thresholds));
    }
    let total = monitor
        .period_total(&cli.scope, period)
        .unwrap_or_else(|e| fail(&e.to_string()));
    println!("Total actual:         {:.2} kWh", total.actual_kwh);
    println!("Total expected:       {:.2} kWh", total.expected_kwh);
    println!(
        "Period performance:   {}",
        PerformanceMetric::from_bucket(&total, thresholds)
    );

    if let Period::Annual(year) = period {
        print_projections(&monitor, year, date);
    }

    if let Some(ref path) = cli.buckets_out {
        if let Err(e) = export_buckets_csv(&buckets, thresholds, Path::new(path)) {
            fail(&format!("failed to write CSV: {e}"));
        }
        eprintln!("Buckets written to {path}");
    }

    if let Some(ref path) = cli.report_out {
        let report = monitor
            .month_report(date.year(), date.month())
            .unwrap_or_else(|e| fail(&e.to_string()));
        println!("\n{report}");
        if let Err(e) = export_report_csv(&report, Path::new(path)) {
            fail(&format!("failed to write CSV: {e}"));
        }
        eprintln!("Report written to {path}");
    }

    if let Some(ref id) = cli.iv_test {
        let curve = monitor
            .iv_test(id, &IvTestParameters::default())
            .unwrap_or_else(|e| fail(&e.to_string()));
        let s = curve.summary;
        println!("\n--- IV Curve: {id} ---");
        println!("Voc:                  {:.1} V", s.voc_v);
        println!("Isc:                  {:.2} A", s.isc_a);
        println!("Vmp / Imp:            {:.1} V / {:.2} A", s.vmp_v, s.imp_a);
        println!("Pmax:                 {:.1} W", s.pmax_w);
        println!("Fill factor:          {:.3}", s.fill_factor);
    }

    if cli.live_ticks > 0 {
        println!("\n--- Live refresh ---");
        let t0 = Instant::now();
        if let Err(e) = monitor.mount(t0) {
            fail(&e.to_string());
        }
        for s in 1..=cli.live_ticks {
            let tick = monitor.tick(t0 + Duration::from_secs(s));
            if tick.any() {
                println!("t={s:>4}s  plant output {:.2} kW", monitor.plant().power_kw());
            }
        }
        monitor.unmount();
    }

    print_orders(monitor.orders());
    if let Some(ref path) = cli.orders_out {
        if let Err(e) = export_orders_csv(monitor.orders().list(), Path::new(path)) {
            fail(&format!("failed to write CSV: {e}"));
        }
        eprintln!("Orders written to {path}");
    }
}
