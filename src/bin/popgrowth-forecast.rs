//! Developer utility to project an entity's population with a saved model.

use std::path::PathBuf;

use popgrowth::app_dirs;
use popgrowth::data::{load_entities_json, sample_entities};
use popgrowth::forecast::{ForecastBaseline, build_forecast};
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
    let model_path = match options.model_path {
        Some(path) => path,
        None => app_dirs::models_dir()
            .map_err(|err| err.to_string())?
            .join("growth_model.json"),
    };
    let model = GrowthModel::load_json(&model_path).map_err(|err| err.to_string())?;
    let entities = match &options.data_path {
        Some(path) => load_entities_json(path).map_err(|err| err.to_string())?,
        None => sample_entities().map_err(|err| err.to_string())?,
    };
    let entity = entities.get(&options.entity).ok_or_else(|| {
        let known: Vec<&str> = entities.keys().map(String::as_str).collect();
        format!("Unknown entity {} (known: {})", options.entity, known.join(", "))
    })?;
    let baseline = ForecastBaseline::from_entity(entity)
        .ok_or_else(|| format!("Entity {} has no history", options.entity))?;
    let points = build_forecast(&model, &baseline, options.years).map_err(|err| err.to_string())?;

    println!("{} from {}:", entity.name, baseline.period);
    println!(
        "{:>6} {:>14} {:>10} {:>12} {:>12} {:>6}",
        "period", "population", "growth%", "births", "deaths", "conf%"
    );
    for point in points {
        println!(
            "{:>6} {:>14.1} {:>10.3} {:>12.1} {:>12.1} {:>6.1}",
            point.period,
            point.population,
            point.predicted_growth,
            point.births,
            point.deaths,
            point.confidence
        );
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct CliOptions {
    entity: String,
    model_path: Option<PathBuf>,
    data_path: Option<PathBuf>,
    years: u32,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut entity: Option<String> = None;
    let mut model_path: Option<PathBuf> = None;
    let mut data_path: Option<PathBuf> = None;
    let mut years = 10u32;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--entity" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--entity requires a value".to_string())?;
                entity = Some(value.clone());
            }
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                model_path = Some(PathBuf::from(value));
            }
            "--data" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--data requires a value".to_string())?;
                data_path = Some(PathBuf::from(value));
            }
            "--years" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--years requires a value".to_string())?;
                years = value
                    .parse::<u32>()
                    .map_err(|_| format!("Invalid --years value: {value}"))?;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    let entity = entity.ok_or_else(help_text)?;
    Ok(CliOptions {
        entity,
        model_path,
        data_path,
        years,
    })
}

fn help_text() -> String {
    [
        "popgrowth-forecast",
        "",
        "Projects an entity's population forward with a trained growth model.",
        "",
        "Usage:",
        "  popgrowth-forecast --entity <key> [--model model.json] [options]",
        "",
        "Options:",
        "  --entity <key>     Entity key in the data file (required).",
        "  --model <file>     Model snapshot (default: models/growth_model.json in the app dir).",
        "  --data <file>      Entity JSON (default: bundled five-country sample).",
        "  --years <n>        Periods to project (default: 10).",
    ]
    .join("\n")
}
