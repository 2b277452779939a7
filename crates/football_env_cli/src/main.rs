use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use football_env::representation::build_encoder;
use football_env::{
    ChannelDimensions, ConfigValue, CreateOptions, EnvironmentPlan, Observation, ObservationFrame, Representation,
    ScenarioResolver,
};

#[derive(Parser)]
#[command(name = "football_env")]
#[command(about = "Plan football environments and encode observation frames")]
struct Cli {
    /// Extra scenario definitions (JSON array)
    #[arg(long, global = true, value_name = "FILE")]
    scenarios_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List known scenarios
    Scenarios,

    /// Resolve construction options and print the environment plan as JSON
    Plan {
        /// Scenario name (required unless --options is given)
        #[arg(short, long)]
        scenario: Option<String>,

        /// Construction options as JSON; the flags below are applied on top
        #[arg(long, value_name = "FILE")]
        options: Option<PathBuf>,

        #[arg(short, long)]
        representation: Option<String>,

        #[arg(long)]
        rewards: Option<String>,

        #[arg(long)]
        left: Option<usize>,

        #[arg(long)]
        right: Option<usize>,

        #[arg(long)]
        stacked: bool,

        #[arg(long)]
        render: bool,

        #[arg(long)]
        dump_frequency: Option<u32>,

        #[arg(long)]
        logdir: Option<String>,

        /// Free-form config override, applied last (repeatable)
        #[arg(long = "override", value_name = "KEY=VALUE", value_parser = parse_override)]
        overrides: Vec<(String, ConfigValue)>,
    },

    /// Encode a JSON observation frame with one representation
    Encode {
        /// Observation frame (JSON array of records)
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        #[arg(short, long, default_value = "simple115v2")]
        representation: String,

        #[arg(long, default_value_t = 96)]
        width: u32,

        #[arg(long, default_value_t = 72)]
        height: u32,
    },
}

/// Flags of the `plan` subcommand, layered over the base options
struct PlanFlags {
    scenario: Option<String>,
    representation: Option<String>,
    rewards: Option<String>,
    left: Option<usize>,
    right: Option<usize>,
    stacked: bool,
    render: bool,
    dump_frequency: Option<u32>,
    logdir: Option<String>,
    overrides: Vec<(String, ConfigValue)>,
}

impl PlanFlags {
    fn apply(self, mut options: CreateOptions) -> CreateOptions {
        if let Some(scenario) = self.scenario {
            options.scenario = scenario;
        }
        if let Some(representation) = self.representation {
            options.representation = representation;
        }
        if let Some(rewards) = self.rewards {
            options.rewards = rewards;
        }
        options.left_agents = self.left.unwrap_or(options.left_agents);
        options.right_agents = self.right.unwrap_or(options.right_agents);
        options.stacked |= self.stacked;
        options.render |= self.render;
        options.dump_frequency = self.dump_frequency.unwrap_or(options.dump_frequency);
        if let Some(logdir) = self.logdir {
            options.logdir = logdir;
        }
        options.overrides.extend(self.overrides);
        options
    }
}

/// `key=value`; the value is read as bool, integer, float, then string
fn parse_override(raw: &str) -> Result<(String, ConfigValue), String> {
    let (key, value) = raw.split_once('=').ok_or_else(|| format!("'{raw}' is not key=value"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("'{raw}' has an empty key"));
    }
    let value = value.trim();
    let value = if let Ok(b) = value.parse::<bool>() {
        ConfigValue::Bool(b)
    } else if let Ok(i) = value.parse::<i64>() {
        ConfigValue::Int(i)
    } else if let Ok(f) = value.parse::<f64>() {
        ConfigValue::Float(f)
    } else {
        ConfigValue::Str(value.to_string())
    };
    Ok((key.to_string(), value))
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("football_env=info,warn"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    let resolver = load_resolver(cli.scenarios_file.as_deref())?;

    match cli.command {
        Commands::Scenarios => list_scenarios(&resolver),
        Commands::Plan {
            scenario,
            options,
            representation,
            rewards,
            left,
            right,
            stacked,
            render,
            dump_frequency,
            logdir,
            overrides,
        } => {
            let base = match options {
                Some(path) => read_options(&path)?,
                None => CreateOptions::default(),
            };
            let flags = PlanFlags {
                scenario,
                representation,
                rewards,
                left,
                right,
                stacked,
                render,
                dump_frequency,
                logdir,
                overrides,
            };
            let options = flags.apply(base);
            if options.scenario.is_empty() {
                bail!("a scenario is required (--scenario or --options)");
            }
            print_plan(&options, &resolver)
        }
        Commands::Encode { input, representation, width, height } => {
            encode_frame(&input, &representation, ChannelDimensions::new(width, height))
        }
    }
}

fn load_resolver(path: Option<&Path>) -> Result<ScenarioResolver> {
    let resolver = ScenarioResolver::new();
    let Some(path) = path else {
        return Ok(resolver);
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenarios file: {}", path.display()))?;
    let resolver = resolver.with_json(&json)?;
    info!(path = %path.display(), "Loaded extra scenarios");
    Ok(resolver)
}

fn list_scenarios(resolver: &ScenarioResolver) -> Result<()> {
    for s in resolver.scenarios() {
        println!(
            "{}\t{}v{}\tcontrollable {}/{}{}",
            s.name,
            s.left_team_size,
            s.right_team_size,
            s.controllable_left,
            s.controllable_right,
            if s.control_all_players { "\tcontrol_all" } else { "" }
        );
    }
    Ok(())
}

fn read_options(path: &Path) -> Result<CreateOptions> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read options file: {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid options in {}", path.display()))
}

fn print_plan(options: &CreateOptions, resolver: &ScenarioResolver) -> Result<()> {
    let plan = EnvironmentPlan::build(options, resolver)?;
    info!(scenario = %plan.scenario.name, stages = ?plan.stage_names(), "Planned environment");
    println!("{}", plan.to_json_pretty()?);
    Ok(())
}

fn encode_frame(path: &Path, representation: &str, dims: ChannelDimensions) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read frame file: {}", path.display()))?;
    let frame = ObservationFrame::from_json(&json).with_context(|| format!("Invalid frame in {}", path.display()))?;
    frame.validate(frame.len())?;

    let encoder = build_encoder(Representation::parse(representation)?, dims)?;
    let observation = encoder.encode(&frame)?;
    info!(records = frame.len(), shape = ?observation.shape(), "Encoded frame");
    let data = match &observation {
        Observation::Vector { array } => serde_json::to_value(array.iter().collect::<Vec<_>>())?,
        Observation::Spatial { array } => serde_json::to_value(array.iter().collect::<Vec<_>>())?,
        Observation::Raw { frame } => serde_json::to_value(frame)?,
    };
    println!("{}", serde_json::json!({ "shape": observation.shape(), "data": data }));
    Ok(())
}
