//! Mini XAML 命令行
//! 用法: mini-xaml <bundle-dir> <Full.Type.Name> [--config loader.json] [--tolerant] [--verbose]

use mini_xaml::loader::ResourceBundle;
use mini_xaml::{ComponentType, DirectoryBundle, LoadOptions, LoaderConfig, TypeRegistry, Value, XamlLoader};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{info, Level};

struct Args {
    bundle_dir: PathBuf,
    type_name: String,
    config: Option<PathBuf>,
    tolerant: bool,
    verbose: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut positional = Vec::new();
    let mut config = None;
    let mut tolerant = false;
    let mut verbose = false;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config requires a path")?;
                config = Some(PathBuf::from(path));
            }
            "--tolerant" => tolerant = true,
            "--verbose" | "-v" => verbose = true,
            other if other.starts_with("--") => return Err(format!("Unknown option {}", other)),
            _ => positional.push(arg),
        }
    }

    if positional.len() != 2 {
        return Err("Usage: mini-xaml <bundle-dir> <Full.Type.Name> [--config loader.json] [--tolerant] [--verbose]".into());
    }
    let type_name = positional.pop().unwrap_or_default();
    let bundle_dir = PathBuf::from(positional.pop().unwrap_or_default());
    Ok(Args {
        bundle_dir,
        type_name,
        config,
        tolerant,
        verbose,
    })
}

fn bundle_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string())
}

fn run(args: Args) -> Result<(), String> {
    let mut registry = TypeRegistry::with_controls();
    let mut tolerant = args.tolerant;
    if let Some(path) = &args.config {
        let config = LoaderConfig::load(path).map_err(|e| e.to_string())?;
        config.apply(&mut registry).map_err(|e| e.to_string())?;
        tolerant |= config.do_not_throw_on_exceptions;
    }

    let bundle = DirectoryBundle::open(&bundle_name(&args.bundle_dir), &args.bundle_dir)
        .map_err(|e| format!("Failed to open {}: {}", args.bundle_dir.display(), e))?;
    info!("Bundle {}: {} resources", bundle.name(), bundle.resource_ids().len());

    let ty = ComponentType::new(&args.type_name, Arc::new(bundle));
    let loader = XamlLoader::new(Arc::new(registry)).with_options(LoadOptions {
        do_not_throw_on_exceptions: tolerant,
    });

    let target = loader.create_component(&ty).map_err(|e| e.to_string())?;
    let report = loader.load_type(&target, &ty).map_err(|e| e.to_string())?;

    for diagnostic in &report.diagnostics {
        eprintln!("⚠️  {}", diagnostic);
    }
    let json = serde_json::to_string_pretty(&Value::from(report.root.clone()).to_json())
        .map_err(|e| e.to_string())?;
    println!("{}", json);
    Ok(())
}

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        eprintln!("❌ {}", e);
        process::exit(1);
    }
}
