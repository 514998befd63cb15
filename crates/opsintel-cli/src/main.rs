//! `opsintel`: load a seed file into the compliance engine and run
//! rule-engine and KPI operations against it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use opsintel_core::{
    ComplianceEngine, DomainStore, EmergencyType, Event, EventLog, EventType, KpiAggregator, Seed,
};

#[derive(Parser, Debug)]
#[command(name = "opsintel", version, about = "Retail operations compliance engine")]
struct Cli {
    /// Seed file (YAML, or JSON by .json extension)
    #[arg(long, global = true)]
    seed: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the seed and report what was ingested.
    Validate,
    /// Check whether a shift may open and close.
    ShiftCheck { shift_id: String },
    OpenShift {
        shift_id: String,
        #[arg(long)]
        actor: String,
    },
    CloseShift {
        shift_id: String,
        #[arg(long)]
        actor: String,
    },
    /// Trigger an emergency plan, e.g. `emergency loc-1 fire --actor mgr-1`.
    Emergency {
        location_id: String,
        emergency_type: EmergencyType,
        #[arg(long)]
        actor: String,
    },
    /// Fraud pattern analysis over the last 7 days.
    Fraud { location_id: String },
    Supplier { supplier_id: String },
    Training { staff_id: String },
    Kpi { location_id: String },
    Dashboard,
    /// List the event log, optionally by type (e.g. `fraud_alert`).
    Events {
        #[arg(long = "type")]
        event_type: Option<EventType>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let engine = load_engine(cli.seed.as_ref())?;
    run(&engine, cli.command, cli.format)
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_engine(seed: Option<&PathBuf>) -> Result<ComplianceEngine> {
    let engine = ComplianceEngine::new(Arc::new(DomainStore::new()), Arc::new(EventLog::new()));
    let Some(path) = seed else {
        tracing::debug!("No seed file given, starting empty");
        return Ok(engine);
    };

    let seed = Seed::from_file(path)
        .with_context(|| format!("Failed to read seed file {}", path.display()))?;
    seed.apply(&engine)
        .with_context(|| format!("Failed to apply seed file {}", path.display()))?;
    Ok(engine)
}

fn run(engine: &ComplianceEngine, command: Command, format: Format) -> Result<()> {
    match command {
        Command::Validate => {
            let store = engine.store();
            let counts = [
                ("locations", store.locations.len()),
                ("staff", store.staff.len()),
                ("shifts", store.shifts.len()),
                ("suppliers", store.suppliers.len()),
                ("events", engine.events().len()),
            ];
            match format {
                Format::Json => {
                    let map: serde_json::Map<String, serde_json::Value> = counts
                        .iter()
                        .map(|(k, v)| (k.to_string(), (*v).into()))
                        .collect();
                    print_json(&map)?;
                }
                Format::Text => {
                    println!("Seed OK");
                    for (name, count) in counts {
                        println!("  {:<10} {}", name, count);
                    }
                }
            }
        }

        Command::ShiftCheck { shift_id } => {
            let open = engine.can_open_shift(&shift_id);
            let close = engine.can_close_shift(&shift_id);
            match format {
                Format::Json => print_json(&serde_json::json!({
                    "shift_id": shift_id,
                    "open": open,
                    "close": close,
                }))?,
                Format::Text => {
                    println!("open:  {}", verdict(open.allowed, open.reason.as_deref()));
                    println!("close: {}", verdict(close.allowed, close.reason.as_deref()));
                }
            }
        }

        Command::OpenShift { shift_id, actor } => {
            let transition = engine.open_shift(&shift_id, &actor);
            output(format, &transition, |t| {
                verdict(t.success, t.reason.as_deref())
            })?;
            if !transition.success {
                bail!("Shift {} not opened", shift_id);
            }
        }

        Command::CloseShift { shift_id, actor } => {
            let transition = engine.close_shift(&shift_id, &actor);
            output(format, &transition, |t| {
                verdict(t.success, t.reason.as_deref())
            })?;
            if !transition.success {
                bail!("Shift {} not closed", shift_id);
            }
        }

        Command::Emergency {
            location_id,
            emergency_type,
            actor,
        } => {
            let dispatch = engine.trigger_emergency(&location_id, emergency_type, &actor);
            output(format, &dispatch, |d| {
                if !d.triggered {
                    return format!("No {} plan for {}", emergency_type, location_id);
                }
                let roles: Vec<_> = d.notify_roles.iter().map(|r| r.to_string()).collect();
                let mut text = format!("{} plan triggered, notify: {}", emergency_type, roles.join(", "));
                for (i, step) in d.steps.iter().enumerate() {
                    text.push_str(&format!("\n  {}. {}", i + 1, step));
                }
                text
            })?;
        }

        Command::Fraud { location_id } => {
            let analysis = engine.analyze_fraud_patterns(&location_id);
            output(format, &analysis, |a| {
                let mut text = format!(
                    "{}: {:?} ({} signals, avg severity {:.1})",
                    a.location_id, a.risk_level, a.signal_count, a.average_severity
                );
                for pattern in &a.patterns {
                    text.push_str(&format!("\n  pattern: {}", pattern));
                }
                for rec in &a.recommendations {
                    text.push_str(&format!("\n  - {}", rec));
                }
                text
            })?;
        }

        Command::Supplier { supplier_id } => {
            let compliance = engine.verify_supplier_compliance(&supplier_id);
            output(format, &compliance, |c| {
                let mut text = format!(
                    "{}: {}",
                    c.supplier_id,
                    if c.compliant { "compliant" } else { "NOT compliant" }
                );
                for issue in &c.issues {
                    text.push_str(&format!("\n  - {}", issue));
                }
                text
            })?;
        }

        Command::Training { staff_id } => {
            let validation = engine.validate_training_certifications(&staff_id);
            output(format, &validation, |v| {
                let mut text = format!("{}: {}", v.staff_id, verdict(v.valid, v.reason.as_deref()));
                for upcoming in &v.upcoming {
                    text.push_str(&format!(
                        "\n  expiring: {} on {}",
                        upcoming.module_id,
                        upcoming.expires_at.format("%Y-%m-%d")
                    ));
                }
                text
            })?;
        }

        Command::Kpi { location_id } => {
            let kpi = aggregator(engine).generate_location_kpi(&location_id);
            output(format, &kpi, |k| {
                format!(
                    "{}: QA {:.1} over {} inspections, {} incidents ({} high risk), {} fraud alerts",
                    k.location_id,
                    k.avg_qa_score,
                    k.inspections,
                    k.total_incidents,
                    k.high_risk_incidents,
                    k.fraud_alerts
                )
            })?;
        }

        Command::Dashboard => {
            let dashboard = aggregator(engine).generate_global_kpi_dashboard();
            output(format, &dashboard, |d| {
                let mut text = format!(
                    "{} locations, avg QA {:.1}, {} incidents ({} high risk), supplier compliance {:.1}%",
                    d.locations.len(),
                    d.avg_qa_score,
                    d.total_incidents,
                    d.high_risk_incidents,
                    d.supplier_compliance_pct
                );
                for kpi in &d.locations {
                    let flag = if kpi.is_below_qa_threshold() { "  !" } else { "" };
                    text.push_str(&format!(
                        "\n  {:<12} QA {:>5.1}  incidents {:>3}{}",
                        kpi.location_id, kpi.avg_qa_score, kpi.total_incidents, flag
                    ));
                }
                text
            })?;
        }

        Command::Events { event_type } => {
            let events = match event_type {
                Some(t) => engine.events().by_type(t),
                None => engine.events().events(),
            };
            match format {
                Format::Json => print_json(&events)?,
                Format::Text => {
                    for event in &events {
                        println!("{}", event_line(event));
                    }
                }
            }
        }
    }
    Ok(())
}

fn aggregator(engine: &ComplianceEngine) -> KpiAggregator {
    KpiAggregator::new(engine.store().clone(), engine.events().clone())
}

fn output<T: Serialize>(format: Format, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    match format {
        Format::Json => print_json(value),
        Format::Text => {
            println!("{}", text(value));
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to encode output")?;
    println!("{}", json);
    Ok(())
}

fn verdict(ok: bool, reason: Option<&str>) -> String {
    match (ok, reason) {
        (true, _) => "ok".to_string(),
        (false, Some(reason)) => format!("blocked: {}", reason),
        (false, None) => "blocked".to_string(),
    }
}

fn event_line(event: &Event) -> String {
    format!(
        "{} {} {:<24} {}{}",
        event.id,
        event.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
        event.event_type().as_str(),
        event.kind.location_id().unwrap_or("-"),
        if event.resolved { " (resolved)" } else { "" }
    )
}
