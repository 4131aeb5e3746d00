//! Developer utility to train a growth model and export its snapshot.

use std::path::PathBuf;

use popgrowth::app_dirs;
use popgrowth::config::BoostConfig;
use popgrowth::data::{load_entities_json, sample_entities};
use popgrowth::logging;
use popgrowth::ml::gbdt::GrowthModel;

fn main() {
    if let Err(err) = logging::init() {
        eprintln!("Logging disabled: {err}");
    }
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config = match &options.config_path {
        Some(path) => BoostConfig::load_toml(path),
        None => BoostConfig::load_from_app_dir(),
    }
    .map_err(|err| err.to_string())?;
    options.overrides.apply(&mut config);

    let entities = match &options.data_path {
        Some(path) => load_entities_json(path).map_err(|err| err.to_string())?,
        None => sample_entities().map_err(|err| err.to_string())?,
    };
    let mut model = GrowthModel::new(config).map_err(|err| err.to_string())?;
    let metrics = model.train(&entities).map_err(|err| err.to_string())?;

    let out = match options.model_out {
        Some(path) => path,
        None => app_dirs::models_dir()
            .map_err(|err| err.to_string())?
            .join("growth_model.json"),
    };
    model.save_json(&out).map_err(|err| err.to_string())?;

    println!("trees: {}", model.trees().len());
    println!(
        "rmse={:.4}  mae={:.4}  r2={:.4}  time={:.3}s",
        metrics.rmse, metrics.mae, metrics.r2, metrics.training_time_seconds
    );
    let mut importance: Vec<(&String, &usize)> = model.feature_importance().iter().collect();
    importance.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    println!("feature importance (split counts):");
    for (name, count) in importance {
        println!("  {name:<20} {count}");
    }
    println!("model written to {}", out.display());
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct ConfigOverrides {
    num_trees: Option<usize>,
    learning_rate: Option<f64>,
    max_depth: Option<usize>,
    min_samples_leaf: Option<usize>,
    subsample_rate: Option<f64>,
    seed: Option<u64>,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut BoostConfig) {
        if let Some(value) = self.num_trees {
            config.num_trees = value;
        }
        if let Some(value) = self.learning_rate {
            config.learning_rate = value;
        }
        if let Some(value) = self.max_depth {
            config.max_depth = value;
        }
        if let Some(value) = self.min_samples_leaf {
            config.min_samples_leaf = value;
        }
        if let Some(value) = self.subsample_rate {
            config.subsample_rate = value;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    data_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    model_out: Option<PathBuf>,
    overrides: ConfigOverrides,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions {
        data_path: None,
        config_path: None,
        model_out: None,
        overrides: ConfigOverrides::default(),
    };
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        if matches!(flag, "-h" | "--help") {
            return Err(help_text());
        }
        idx += 1;
        let value = args
            .get(idx)
            .ok_or_else(|| format!("{flag} requires a value"))?;
        match flag {
            "--data" => options.data_path = Some(PathBuf::from(value)),
            "--config" => options.config_path = Some(PathBuf::from(value)),
            "--out" => options.model_out = Some(PathBuf::from(value)),
            "--trees" => options.overrides.num_trees = Some(parse_value(flag, value)?),
            "--learning-rate" => options.overrides.learning_rate = Some(parse_value(flag, value)?),
            "--max-depth" => options.overrides.max_depth = Some(parse_value(flag, value)?),
            "--min-samples-leaf" => {
                options.overrides.min_samples_leaf = Some(parse_value(flag, value)?)
            }
            "--subsample" => options.overrides.subsample_rate = Some(parse_value(flag, value)?),
            "--seed" => options.overrides.seed = Some(parse_value(flag, value)?),
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn help_text() -> String {
    [
        "popgrowth-train",
        "",
        "Trains a gradient-boosted growth model and writes its JSON snapshot.",
        "",
        "Usage:",
        "  popgrowth-train [--data entities.json] [--out model.json] [options]",
        "",
        "Options:",
        "  --data <file>             Entity JSON (default: bundled five-country sample).",
        "  --config <file>           Boosting config TOML (default: boost.toml in the app dir).",
        "  --out <file>              Output model path (default: models/growth_model.json in the app dir).",
        "  --trees <n>               Boosting rounds.",
        "  --learning-rate <f64>     Learning rate.",
        "  --max-depth <n>           Maximum tree depth.",
        "  --min-samples-leaf <n>    Minimum rows per split side.",
        "  --subsample <f64>         Row subsample rate in (0, 1].",
        "  --seed <u64>              Seed for reproducible sampling.",
    ]
    .join("\n")
}
