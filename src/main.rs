use alt_history::{
    agents::ResearchPipeline,
    config::Config,
    models::AppState,
    routes::create_router,
    session::ChatSession,
    tui::{app::save_chart_blocking, ChartOutcome},
    utils::{init_file_logging, init_stdout_logging},
};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "alt-history", version, about = "Research assistant for alternative Russian history")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive terminal chat (default)
    Tui,
    /// Serve the web chat
    Serve {
        /// Port to listen on, overrides PORT
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Answer a single question and exit
    Ask {
        /// The "what if" question
        question: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Command::Tui) {
        Command::Tui => {
            let _guard = init_file_logging(&config.server.log_dir);
            info!("Configuration loaded: model {}", config.llm.model);
            alt_history::tui::run(config).await
        }
        Command::Serve { port } => {
            init_stdout_logging();
            serve(config, port).await
        }
        Command::Ask { question } => {
            init_stdout_logging();
            ask(config, &question).await
        }
    }
}

async fn serve(mut config: Config, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port {
        config.server.port = port;
    }
    info!("Configuration loaded: {:?}", config.server);
    if !config.has_search_key() {
        warn!("SERPAPI_API_KEY is not set, searches will return error text");
    }

    let pipeline = ResearchPipeline::new(&config);
    let state = AppState::new(config.clone(), pipeline);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on http://{}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn ask(config: Config, question: &str) -> anyhow::Result<()> {
    let pipeline = ResearchPipeline::new(&config);
    let mut session = ChatSession::new();

    let reply = session.submit(&pipeline, question).await?;

    println!("{}\n", reply.content());

    if !reply.subquestions().is_empty() {
        println!("Вспомогательные вопросы:");
        for q in reply.subquestions() {
            println!("  - {}", q);
        }
        println!();
    }

    if !reply.sources().is_empty() {
        println!("Источники:");
        for source in reply.sources() {
            let links = alt_history::search::links_in(&source.result);
            println!("  {}", source.question);
            for link in links {
                println!("    {}", link);
            }
        }
    }

    if let Some(request) = reply.chart() {
        match save_chart_blocking(config.charts.output_dir.clone(), reply.id(), request.clone()).await {
            ChartOutcome::Saved(path) => println!("\nГрафик сохранён: {}", path.display()),
            ChartOutcome::Failed { error, request } => {
                eprintln!("\nНе удалось построить график: {}\n\nЗапрос:\n{}", error, request)
            }
        }
    }

    Ok(())
}
