use std::path::PathBuf;
use std::rc::Rc;

use anyhow::Context;
use clap::Parser;
use site_editor::{EditorConfig, EditorSession, HttpGateway, PreviewRenderer};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "site-editor")]
#[command(version)]
#[command(about = "Headless tools for the site CMS editor")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Subcommand)]
enum Command {
    /// Render a markdown file the way the editor's preview pane does
    Preview {
        /// Markdown file to render
        file: PathBuf,
    },
    /// List the site's pages in editor order
    Pages,
    /// List the site's uploaded files
    Files,
    /// Print the site style, or set it when a name is given
    Style {
        name: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EditorConfig::from_env()?;
    tracing::debug!(api = %config.api_base_url, site = %config.site_base_url, "Loaded configuration");

    if let Command::Preview { file } = &cli.command {
        let markdown = std::fs::read_to_string(file)
            .with_context(|| format!("failed to read {}", file.display()))?;
        let renderer = PreviewRenderer::new(config.site_base_url.clone());
        println!("{}", renderer.render(&markdown));
        return Ok(());
    }

    let gateway = Rc::new(HttpGateway::new(&config)?);
    let session = EditorSession::new(gateway, &config);
    session.mount().await?;
    let state = session
        .snapshot()
        .context("editor session closed while loading")?;

    match cli.command {
        Command::Pages => {
            for page in &state.pages {
                let marker = if state.is_selected(&page.name) { "*" } else { " " };
                println!("{marker} {}", page.name);
            }
        }
        Command::Files => {
            for file in &state.files {
                match file.size() {
                    Some(size) => println!("{}\t{size}", file.name),
                    None => println!("{}", file.name),
                }
            }
        }
        Command::Style { name: Some(name) } => {
            session.set_style(&name).await?;
            tracing::info!(style = %name, "Style updated");
        }
        Command::Style { name: None } => println!("{}", state.style),
        Command::Preview { .. } => {}
    }

    session.unmount();
    Ok(())
}
