use clap::{Parser, Subcommand};
use graft_core::{ConfigHandle, GraftConfig};
use graft_dom::Page;
use graft_inject::{default_injectors, select_injector};
use graft_watch::PageSession;

#[derive(Parser)]
#[command(name = "graft")]
#[command(about = "Inject a workspace launch button into code host page snapshots")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report which host injector claims a page snapshot
    Detect {
        #[arg(help = "Path to a page snapshot (JSON)")]
        page: String,
    },
    /// Run one reconciliation pass over a snapshot and emit the result
    Inject {
        #[arg(help = "Path to a page snapshot (JSON)")]
        page: String,
        #[arg(short, long, help = "Path to a graft.toml config file")]
        config: Option<String>,
        #[arg(short, long, help = "Write the result here instead of stdout")]
        output: Option<String>,
        #[arg(long, help = "Emit rendered HTML instead of a JSON snapshot")]
        html: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "graft=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Detect { page } => run_detect(page).await,
        Commands::Inject {
            page,
            config,
            output,
            html,
        } => run_inject(page, config, output, html).await,
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn load_page(path: &str) -> Result<Page, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

async fn run_detect(page_path: String) -> Result<(), Box<dyn std::error::Error>> {
    let page = load_page(&page_path)?;
    let config = ConfigHandle::default();
    let injectors = default_injectors(&config);

    match select_injector(&injectors, &page) {
        Some(injector) => {
            println!("host: {}", injector.name());
            println!("location: {}", page.href());
            println!(
                "injected: {}",
                if injector.check_is_injected(&page) {
                    "yes"
                } else {
                    "no"
                }
            );
        }
        None => println!("no host injector claims this page"),
    }

    Ok(())
}

async fn run_inject(
    page_path: String,
    config_path: Option<String>,
    output: Option<String>,
    html: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = match config_path {
        Some(path) => GraftConfig::from_file(&path)?,
        None => GraftConfig::default(),
    };
    let handle = ConfigHandle::new(config);
    let injectors = default_injectors(&handle);

    let page = load_page(&page_path)?;
    let Some(injector) = select_injector(&injectors, &page) else {
        return Err("no host injector claims this page".into());
    };
    tracing::info!(host = %injector.name(), url = %page.href(), "running injection pass");

    let session = PageSession::new(page);
    session.mark_loaded();
    injector.update(&session).await?;

    let page = session.page().await;
    let rendered = if html {
        page.document.to_html()
    } else {
        let mut json = serde_json::to_string_pretty(&*page)?;
        json.push('\n');
        json
    };

    match output {
        Some(path) => std::fs::write(&path, rendered)?,
        None => print!("{}", rendered),
    }

    Ok(())
}
