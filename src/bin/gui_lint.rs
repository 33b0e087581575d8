use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use invgui::config::GuiConfig;
use invgui::host::RecordingHost;
use invgui::lang::StaticLanguages;
use invgui::layout::parse::{layout_files, load_layout};
use invgui::{BuiltInstance, GuiLayout, GuiRegistry, Player};

/// Build, load and open one layout against a recording host.
/// Returns (pages, languages).
fn dry_render(registry: &GuiRegistry, layout: &GuiLayout) -> Result<(usize, usize)> {
    let built = registry.build_from_layout::<()>(layout);
    let instance = built.as_instance();
    registry
        .register(Arc::clone(&instance))
        .with_context(|| format!("Cannot register {}", layout.id()))?;

    let viewer = Player::new(0, "lint");
    anyhow::ensure!(instance.open(&viewer, false), "open was cancelled");
    let pages = match &built {
        BuiltInstance::Fillable(f) => f.page_count(),
        BuiltInstance::SinglePage(_) => 1,
    };
    let languages = layout.core().languages().len();
    registry.unregister(layout.id());
    Ok((pages, languages))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut conf_file = "conf/gui.yaml".to_string();
    let mut layouts_dir: Option<String> = None;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "--h" | "--?" | "/?" => {
                println!("Usage: gui_lint [--conf FILE] [--layouts DIR]");
                return Ok(());
            }
            "--conf" => {
                if i + 1 < args.len() {
                    i += 1;
                    conf_file = args[i].clone();
                } else {
                    eprintln!("Error: --conf requires a FILE argument");
                    return Ok(());
                }
            }
            "--layouts" => {
                if i + 1 < args.len() {
                    i += 1;
                    layouts_dir = Some(args[i].clone());
                } else {
                    eprintln!("Error: --layouts requires a DIR argument");
                    return Ok(());
                }
            }
            _ => {}
        }
        i += 1;
    }

    let config = if Path::new(&conf_file).exists() {
        GuiConfig::from_file(&conf_file)
            .with_context(|| format!("Cannot load config: {}", conf_file))?
    } else {
        tracing::warn!("[lint] [config] {} not found, using defaults", conf_file);
        GuiConfig::default()
    };

    let mut languages = StaticLanguages::new(config.main_language.clone());
    if let Some(lang_file) = &config.lang_file {
        let content = std::fs::read_to_string(lang_file)
            .with_context(|| format!("Cannot read lang file: {}", lang_file))?;
        languages = languages.with_lang_file(config.main_language.clone(), &content);
    }
    let host = Arc::new(RecordingHost::with_languages(languages));

    let dir = PathBuf::from(layouts_dir.unwrap_or_else(|| config.layouts_dir.clone()));
    let main_language = config.main_language.clone();
    let preload = config.preload.clone();
    let registry = GuiRegistry::new(host, config, tokio::runtime::Handle::current());

    let mut failures = 0usize;
    let mut layouts = Vec::new();
    for path in layout_files(&dir)? {
        let result = load_layout(&path, &main_language)
            .map_err(anyhow::Error::from)
            .and_then(|layout| Ok((dry_render(&registry, &layout)?, layout)));
        match result {
            Ok(((pages, langs), layout)) => {
                println!(
                    "ok   {} ({}, {} page(s), {} language(s))",
                    path.display(),
                    if layout.is_fillable() { "fillable" } else { "single" },
                    pages,
                    langs
                );
                layouts.push(layout);
            }
            Err(e) => {
                failures += 1;
                println!("FAIL {}: {:#}", path.display(), e);
            }
        }
    }

    for id in &preload {
        if !layouts.iter().any(|l| l.id().eq_ignore_ascii_case(id)) {
            failures += 1;
            println!("FAIL preload {}: no such layout in {}", id, dir.display());
        }
    }

    registry.shutdown();
    tracing::info!("[lint] [done] layouts={} failures={}", layouts.len(), failures);
    anyhow::ensure!(failures == 0, "{} problem(s) found", failures);
    Ok(())
}
