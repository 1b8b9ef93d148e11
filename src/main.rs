use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use medchat::api::HttpApi;
use medchat::api::types::ApiError;
use medchat::cancel;
use medchat::config::{ClientConfig, ConfigError};
use medchat::controller::ConsultationController;
use medchat::download::DownloadManager;
use medchat::repl::{Command, HELP_TEXT, Interrupt, on_interrupt, parse_command};
use medchat::session::profile::ProfileForm;
use medchat::view::TerminalView;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("api client error: {0}")]
    Api(#[from] ApiError),
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "medchat", about = "Terminal client for the medical consultation API")]
struct Cli {
    #[arg(long, env = "MEDCHAT_API_BASE_URL")]
    api_base_url: Option<String>,

    #[arg(long, env = "MEDCHAT_DOWNLOAD_DIR")]
    download_dir: Option<PathBuf>,
}

/// Conventional status for termination by SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

type Controller<W, R> = ConsultationController<HttpApi, TerminalView<W, R>>;

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("medchat=info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::from_env()?.with_overrides(cli.api_base_url, cli.download_dir)?;
    info!(api = %config.api_base_url, downloads = %config.download_dir.display(), "medchat starting");

    let api = HttpApi::new(&config)?;
    let (handle, token) = cancel::channel();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if on_interrupt(&handle) == Interrupt::Cancelled {
                debug!("interrupt received; cancelled in-flight request");
                continue;
            }
            // Idle prompt: the main task is blocked on stdin, so exit here.
            info!("interrupt at idle prompt; exiting");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });

    let view = TerminalView::new(io::stdout(), io::stdin().lock());
    let mut controller = ConsultationController::new(api, view, DownloadManager::new(config.download_dir), token);
    controller.initialize().await;
    controller.view_mut().print(HELP_TEXT);

    run(&mut controller).await?;
    info!("medchat exiting");
    Ok(())
}

async fn run<W: Write, R: BufRead>(controller: &mut Controller<W, R>) -> Result<(), CliError> {
    loop {
        let Some(line) = controller.view_mut().read_line("> ")? else {
            return Ok(());
        };
        match parse_command(&line) {
            Command::Start => {
                let previous = controller.state().form().clone();
                let Some(form) = prompt_form(controller.view_mut(), &previous)? else {
                    return Ok(());
                };
                if let Err(e) = controller.start_consultation(form).await {
                    debug!(error = %e, "intake form rejected");
                }
            }
            Command::Edit => controller.edit_profile(),
            Command::Report => controller.generate_report().await,
            Command::Clear => {
                controller.clear_chat();
            }
            Command::Check(symptoms) => controller.check_symptoms(&symptoms).await,
            Command::Treatment(diagnosis) => controller.treatment_plan(&diagnosis).await,
            Command::Save => controller.save_record().await,
            Command::Suggest(index) => {
                if controller.pick_suggestion(index).is_none() {
                    controller.view_mut().print(&format!("No suggestion #{}", index + 1));
                }
            }
            Command::Help => controller.view_mut().print(HELP_TEXT),
            Command::Quit => return Ok(()),
            Command::Message(text) => controller.send_message(&text).await,
            Command::SendDraft => {
                let draft = controller.view_mut().take_draft();
                controller.send_message(&draft).await;
            }
            Command::Unknown(input) => {
                controller.view_mut().print(&format!("Unknown command: {input} (try /help)"));
            }
        }
    }
}

/// Prompt for each intake field. An empty answer keeps the previous value.
fn prompt_form<W: Write, R: BufRead>(view: &mut TerminalView<W, R>, previous: &ProfileForm) -> io::Result<Option<ProfileForm>> {
    let mut form = previous.clone();
    let fields: [(&str, &mut String); 5] = [
        ("Name", &mut form.name),
        ("Age", &mut form.age),
        ("Gender", &mut form.gender),
        ("Contact (optional)", &mut form.contact),
        ("Medical history (optional)", &mut form.medical_history),
    ];
    for (label, value) in fields {
        let prompt = if value.is_empty() { format!("{label}: ") } else { format!("{label} [{value}]: ") };
        let Some(answer) = view.read_line(&prompt)? else {
            return Ok(None);
        };
        if !answer.trim().is_empty() {
            *value = answer;
        }
    }
    Ok(Some(form))
}
