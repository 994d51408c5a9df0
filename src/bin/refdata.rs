use anyhow::{Context, Result, anyhow, bail};
use tracing_subscriber::EnvFilter;

use rift_coach::cache::ReferenceDataCache;
use rift_coach::config::RefDataConfig;
use rift_coach::predict::{self, resolve_team};
use rift_coach::search::SearchOptions;

const USAGE: &str = "usage: refdata <command> [args]

commands:
  version                     print the current reference-data version
  search <query> [--limit N]  rank characters against a query
  resolve <name>...           map display names to canonical ids
  items <id>...               print item labels and image urls
  predict <blue> <red>        comma-separated teams, e.g. \"Ahri,Lee Sin\" \"Jinx,Thresh\"";

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some((command, rest)) = args.split_first() else {
        println!("{USAGE}");
        return Ok(());
    };

    let cfg = RefDataConfig::from_env();
    let cache = ReferenceDataCache::from_config(&cfg).context("unable to build reference cache")?;

    match command.as_str() {
        "version" => print_version(&cache).await,
        "search" => run_search(&cache, &cfg, rest).await,
        "resolve" => run_resolve(&cache, rest).await,
        "items" => run_items(&cache, rest).await,
        "predict" => run_predict(&cache, &cfg, rest).await,
        "help" | "--help" | "-h" => {
            println!("{USAGE}");
            Ok(())
        }
        other => Err(anyhow!("unknown command {other:?}\n\n{USAGE}")),
    }
}

async fn print_version(cache: &ReferenceDataCache) -> Result<()> {
    let version = cache.current_version().await;
    let resolver = cache.version_resolver();
    println!("Version: {version}");
    if resolver.last_known().is_none() {
        println!("Upstream unreachable; using fallback {}", resolver.fallback());
    }
    Ok(())
}

async fn run_search(cache: &ReferenceDataCache, cfg: &RefDataConfig, args: &[String]) -> Result<()> {
    let (query, limit) = split_search_args(args)?;
    if query.trim().is_empty() {
        bail!("search needs a query");
    }

    let mut opts = SearchOptions::from_config(cfg);
    if let Some(limit) = limit {
        opts = opts.with_limit(limit);
    }
    let hits = cache.search_characters(&query, &opts).await;
    if hits.is_empty() {
        println!("No matches for {query:?}");
        return Ok(());
    }
    for hit in hits {
        println!(
            "{:<18} {:<16} {:.3} {}",
            hit.item.name,
            hit.item.id,
            hit.score,
            hit.quality.label()
        );
    }
    Ok(())
}

/// Splits `search` arguments into the query text and an optional
/// `--limit N` / `--limit=N`. Only the flag's own tokens are removed.
fn split_search_args(args: &[String]) -> Result<(String, Option<usize>)> {
    let mut limit = None;
    let mut words = Vec::new();
    let mut idx = 0;
    while idx < args.len() {
        let arg = &args[idx];
        if let Some(raw) = arg.strip_prefix("--limit=") {
            limit = Some(raw.trim().parse::<usize>().context("invalid --limit")?);
        } else if arg == "--limit" {
            let Some(next) = args.get(idx + 1) else {
                bail!("--limit needs a value");
            };
            limit = Some(next.trim().parse::<usize>().context("invalid --limit")?);
            idx += 1;
        } else {
            words.push(arg.as_str());
        }
        idx += 1;
    }
    Ok((words.join(" "), limit))
}

async fn run_resolve(cache: &ReferenceDataCache, names: &[String]) -> Result<()> {
    if names.is_empty() {
        bail!("resolve needs at least one name");
    }
    for name in names {
        match cache.resolve_canonical_id(name).await {
            Some(id) => {
                let detail = cache.character_detail_url(&id).await;
                println!("{name} -> {id}  {detail}");
            }
            None => println!("{name} -> (unresolved)"),
        }
    }
    Ok(())
}

async fn run_items(cache: &ReferenceDataCache, args: &[String]) -> Result<()> {
    if args.is_empty() {
        bail!("items needs at least one id");
    }
    let ids = args
        .iter()
        .map(|raw| {
            raw.trim()
                .parse::<u32>()
                .with_context(|| format!("invalid item id {raw:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let labels = cache.build_labels(&ids).await;
    for (id, label) in ids.iter().zip(labels) {
        println!("{id:>5} {label:<32} {}", cache.item_image_url(*id).await);
    }
    Ok(())
}

async fn run_predict(cache: &ReferenceDataCache, cfg: &RefDataConfig, args: &[String]) -> Result<()> {
    let [blue, red] = args else {
        bail!("predict needs exactly two comma-separated teams");
    };
    let characters = cache.characters_or_roster().await;
    let blue = resolve_team(cache.normalizer(), &characters, &split_team(blue));
    let red = resolve_team(cache.normalizer(), &characters, &split_team(red));
    for name in blue.unresolved.iter().chain(&red.unresolved) {
        eprintln!("warning: unknown character {name:?} dropped");
    }
    if blue.resolved.is_empty() || red.resolved.is_empty() {
        bail!("each team needs at least one known character");
    }

    let backend = predict::backend_from_config(cfg)?;
    let prediction = backend
        .predict_matchup(&blue.resolved, &red.resolved)
        .await
        .context("prediction backend failed")?;

    println!("Blue: {}", blue.resolved.join(", "));
    println!("Red:  {}", red.resolved.join(", "));
    println!(
        "Blue {:.1}% / Red {:.1}% -> {} ({} confidence)",
        prediction.blue_win_probability * 100.0,
        prediction.red_win_probability * 100.0,
        prediction.prediction,
        prediction.confidence
    );
    if let Some(details) = prediction.details {
        println!("Model: {}", details.model);
    }
    Ok(())
}

fn split_team(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
