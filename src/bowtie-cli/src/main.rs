// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use bowtie_engine::datamodel::{Diagram, NodeType};
use bowtie_engine::json::{from_json_str, to_json_string};
use bowtie_engine::lanes::LaneOrders;
use bowtie_engine::layout::layered::compute_layered_layout;
use bowtie_engine::layout::{LayoutConfig, compute_layout};
use bowtie_engine::roles::{collect_available_roles, compute_role_filtered_diagram};
use bowtie_engine::scenarios::sample_diagram;
use bowtie_engine::step::{MAX_STEP, StepOptions, compute_step_diagram, groups_from_lanes};
use bowtie_engine::validation::{validate_connection, validate_diagram};

const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "bowtie", version, about = "Validate, structure and lay out bowtie risk diagrams")]
struct Cli {
    /// Log pipeline phases to stderr (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Write output here instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a diagram's structure; exits non-zero if it has violations
    Validate {
        /// Diagram JSON, or - for stdin
        path: PathBuf,
    },
    /// Print the threat and consequence lanes derived from the edges
    Lanes { path: PathBuf },
    /// Print every role tag in the diagram
    Roles { path: PathBuf },
    /// Compute node positions and routed edges
    Layout {
        path: PathBuf,
        /// Progressive reveal step, 0 to 10
        #[arg(long, default_value_t = MAX_STEP)]
        step: u8,
        #[arg(long)]
        collapse_left: bool,
        #[arg(long)]
        collapse_right: bool,
        /// Only keep nodes tagged with this role (repeatable)
        #[arg(long = "role")]
        roles: Vec<String>,
        /// JSON file with layout spacing overrides
        #[arg(long)]
        config: Option<PathBuf>,
        /// Use the ranked left-to-right layout instead of lanes
        #[arg(long)]
        layered: bool,
    },
    /// Ask whether an edge between two node types would be accepted
    CheckConnection {
        #[arg(long)]
        source_type: String,
        #[arg(long)]
        target_type: String,
        #[arg(long, default_value = "source")]
        source_id: String,
        #[arg(long, default_value = "target")]
        target_id: String,
    },
    /// Print a complete example diagram
    Sample,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut contents = String::new();
        io::stdin()
            .read_to_string(&mut contents)
            .context("reading diagram from stdin")?;
        Ok(contents)
    } else {
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn load_diagram(path: &Path) -> Result<Diagram> {
    let contents = read_input(path)?;
    let diagram =
        from_json_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    debug!(
        nodes = diagram.nodes.len(),
        edges = diagram.edges.len(),
        "loaded diagram"
    );
    Ok(diagram)
}

fn load_config(path: Option<&Path>) -> Result<LayoutConfig> {
    let Some(path) = path else {
        return Ok(LayoutConfig::default());
    };
    let contents = read_input(path)?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing layout config {}", path.display()))
}

fn write_output(contents: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{contents}").context("writing to stdout")
        }
    }
}

fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing output")?;
    write_output(&json, output)
}

fn run(cli: Cli) -> Result<i32> {
    let output = cli.output.as_deref();

    match cli.command {
        Command::Validate { path } => {
            let diagram = load_diagram(&path)?;
            match validate_diagram(&diagram) {
                Ok(()) => {
                    emit(&Vec::<String>::new(), output)?;
                    Ok(0)
                }
                Err(errors) => {
                    emit(&errors, output)?;
                    Ok(EXIT_FAILURE)
                }
            }
        }
        Command::Lanes { path } => {
            let diagram = load_diagram(&path)?;
            emit(&LaneOrders::derive(&diagram), output)?;
            Ok(0)
        }
        Command::Roles { path } => {
            let diagram = load_diagram(&path)?;
            emit(&collect_available_roles(&diagram), output)?;
            Ok(0)
        }
        Command::Layout {
            path,
            step,
            collapse_left,
            collapse_right,
            roles,
            config,
            layered,
        } => {
            let diagram = load_diagram(&path)?;
            let config = load_config(config.as_deref())?;
            let lanes = LaneOrders::derive(&diagram);

            let options = StepOptions {
                step,
                left_expanded: !collapse_left,
                right_expanded: !collapse_right,
                prevention_groups: groups_from_lanes(&lanes.threats),
                mitigation_groups: groups_from_lanes(&lanes.consequences),
            };
            let visible = compute_step_diagram(&diagram, &options);
            let selected: BTreeSet<String> = roles.into_iter().collect();
            let visible = compute_role_filtered_diagram(&visible, &selected);

            let layout = if layered {
                compute_layered_layout(&visible, &config).context("computing layered layout")?
            } else {
                compute_layout(&visible, &config, Some(&lanes))
            };
            emit(&layout, output)?;
            Ok(0)
        }
        Command::CheckConnection {
            source_type,
            target_type,
            source_id,
            target_id,
        } => {
            let result = validate_connection(
                &NodeType::from(source_type),
                &NodeType::from(target_type),
                &source_id,
                &target_id,
            );
            emit(&result, output)?;
            Ok(if result.valid { 0 } else { EXIT_FAILURE })
        }
        Command::Sample => {
            let json = to_json_string(&sample_diagram())?;
            write_output(&json, output)?;
            Ok(0)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(EXIT_FAILURE);
        }
    }
}
