//! tricount: command-line front end for the triangle counting pipeline
//!
//! `run` executes all four stages. `degrees`, `orient`, `close` and
//! `aggregate` run a single stage over materialized record files, so a run can
//! be inspected or resumed stage by stage.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tricount::persistence::{partition_lines, read_records, write_parts};
use tricount::{
    build_report, run_aggregate_stage, run_close_stage, run_degree_stage, run_orient_stage,
    EdgeSource, InputPolicy, LocalExecutor, Partitioner, PipelineConfig, StageOutput, StageStore,
    TriangleCounter, TriangleReport,
};
use tricount_graphgen::{preferential_attachment, uniform_random, GeneratedGraph};

#[derive(Parser)]
#[command(name = "tricount", version, about = "Skew-resistant triangle counting")]
struct Cli {
    /// Output format
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Table,
    Json,
}

/// Pipeline settings shared by every stage command
#[derive(Args)]
struct PipelineArgs {
    /// YAML configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of reducers
    #[arg(short, long)]
    reducers: Option<usize>,

    /// Map tasks per input stream
    #[arg(long)]
    map_splits: Option<usize>,

    /// Disable map-side combining
    #[arg(long)]
    no_combine: bool,

    /// Skip self-loops and accept duplicate edges
    #[arg(long)]
    lenient: bool,
}

impl PipelineArgs {
    fn load(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_yaml_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => PipelineConfig::default(),
        };
        if let Some(reducers) = self.reducers {
            config.reducers = reducers;
        }
        if let Some(map_splits) = self.map_splits {
            config.map_splits = map_splits;
        }
        if self.no_combine {
            config.combine = false;
        }
        if self.lenient {
            config.input_policy = InputPolicy::Lenient;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run all four stages and print the report
    Run {
        /// Edge list: plain text, .gz, or a directory of part files
        input: PathBuf,

        /// Materialize every stage and the report here
        #[arg(long)]
        work_dir: Option<PathBuf>,

        /// Dump the tagged pair records of the closing stage here
        #[arg(long)]
        shuffle_dir: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Stage 1: vertex degrees
    Degrees {
        edges: PathBuf,

        /// Output directory for part files
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Stage 2: forward adjacency lists
    Orient {
        edges: PathBuf,

        /// Complete stage-1 output
        #[arg(long)]
        degrees: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Stage 3: close wedges against the real edges
    Close {
        edges: PathBuf,

        /// Complete stage-2 output
        #[arg(long)]
        adjacency: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        /// Dump the tagged pair records here
        #[arg(long)]
        shuffle_dir: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Stage 4: sum contributions and print the report
    Aggregate {
        /// Complete stage-3 output
        contributions: PathBuf,

        /// Also write the reducer outputs here
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Generate a random simple graph
    Generate {
        #[command(subcommand)]
        kind: GenerateKind,
    },
    /// Split a record file into part files by the first token of each line
    Partition {
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(short, long, default_value_t = 8)]
        reducers: usize,
    },
}

#[derive(Subcommand)]
enum GenerateKind {
    /// Uniformly random edges
    Uniform {
        vertices: u64,
        edges: u64,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Preferential attachment, `m` edges per new vertex
    Skewed {
        vertices: u64,
        m: u64,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let format = cli.format;
    match cli.command {
        Commands::Run {
            input,
            work_dir,
            shuffle_dir,
            pipeline,
        } => {
            let mut config = pipeline.load()?;
            if work_dir.is_some() {
                config.work_dir = work_dir;
            }
            let mut counter = TriangleCounter::new(config)?;
            if let Some(dir) = shuffle_dir {
                counter = counter.with_shuffle_store(StageStore::new(dir)?);
            }
            let report = counter.run(EdgeSource::File(input)).await?;
            print_report(&report, format)
        }
        Commands::Degrees {
            edges,
            output,
            pipeline,
        } => {
            let config = pipeline.load()?;
            let executor = LocalExecutor::from_config(&config)?;
            let edges = load(&edges)?;
            let result = run_degree_stage(&executor, edges, &config)?;
            finish_stage(&result, &output, format)
        }
        Commands::Orient {
            edges,
            degrees,
            output,
            pipeline,
        } => {
            let config = pipeline.load()?;
            let executor = LocalExecutor::from_config(&config)?;
            let degrees = load(&degrees)?;
            let result = run_orient_stage(&executor, load(&edges)?, &degrees, &config)?;
            finish_stage(&result, &output, format)
        }
        Commands::Close {
            edges,
            adjacency,
            output,
            shuffle_dir,
            pipeline,
        } => {
            let config = pipeline.load()?;
            let executor = LocalExecutor::from_config(&config)?;
            let shuffle_store = shuffle_dir.map(StageStore::new).transpose()?;
            let result = run_close_stage(
                &executor,
                load(&adjacency)?,
                load(&edges)?,
                &config,
                shuffle_store.as_ref(),
            )?;
            finish_stage(&result, &output, format)
        }
        Commands::Aggregate {
            contributions,
            output,
            pipeline,
        } => {
            let config = pipeline.load()?;
            let executor = LocalExecutor::from_config(&config)?;
            let result = run_aggregate_stage(&executor, load(&contributions)?, &config)?;
            if let Some(dir) = output {
                write_parts(&dir, result.parts())?;
            }
            print_report(&build_report(&result)?, format)
        }
        Commands::Generate { kind } => generate(kind),
        Commands::Partition {
            input,
            output,
            reducers,
        } => {
            let partitioner = Partitioner::new(reducers)?;
            let lines = read_records(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let parts = partition_lines(lines, &partitioner);
            write_parts(&output, &parts)?;
            println!("Partitioned into {} parts at {}", parts.len(), output.display());
            Ok(())
        }
    }
}

fn load(path: &Path) -> Result<Arc<Vec<String>>> {
    let lines = read_records(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Arc::new(lines))
}

fn finish_stage(output: &StageOutput, dir: &Path, format: OutputFormat) -> Result<()> {
    write_parts(dir, output.parts()).with_context(|| format!("writing {}", dir.display()))?;
    let counters = output.counters();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(counters)?),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Counter", "Value"]);
            table.add_row(vec!["map tasks".to_string(), counters.map_tasks.to_string()]);
            table.add_row(vec!["input records".to_string(), counters.input_records.to_string()]);
            table.add_row(vec![
                "skipped records".to_string(),
                counters.skipped_records.to_string(),
            ]);
            table.add_row(vec![
                "shuffled records".to_string(),
                counters.shuffled_records.to_string(),
            ]);
            table.add_row(vec!["output records".to_string(), counters.output_records.to_string()]);
            println!("{}", table);
        }
        OutputFormat::Text => println!(
            "Stage {}: {} records in {} parts at {}",
            output.stage(),
            counters.output_records,
            output.parts().len(),
            dir.display()
        ),
    }
    Ok(())
}

fn print_report(report: &TriangleReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Vertex", "Triangles"]);
            for (vertex, count) in &report.vertex_counts {
                table.add_row(vec![vertex.to_string(), count.to_string()]);
            }
            println!("{}", table);
            println!("total_triangles {}", report.total_triangles);
        }
        OutputFormat::Text => print!("{}", report),
    }
    Ok(())
}

fn generate(kind: GenerateKind) -> Result<()> {
    let (graph, output): (GeneratedGraph, PathBuf) = match kind {
        GenerateKind::Uniform {
            vertices,
            edges,
            output,
            seed,
        } => (uniform_random(vertices, edges, seed)?, output),
        GenerateKind::Skewed {
            vertices,
            m,
            output,
            seed,
        } => (preferential_attachment(vertices, m, seed)?, output),
    };
    let file = File::create(&output).with_context(|| format!("creating {}", output.display()))?;
    graph.write_to(BufWriter::new(file))?;
    info!(
        "Generated {} vertices, {} edges (max degree {})",
        graph.vertices,
        graph.edges.len(),
        graph.max_degree()
    );
    println!("{} edges written to {}", graph.edges.len(), output.display());
    Ok(())
}
