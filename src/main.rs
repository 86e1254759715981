use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oldnew::auth::{self, CredentialResolver};
use oldnew::banner::{BannerInfo, print_banner};
use oldnew::client::{self, GatewayClient};
use oldnew::config::Settings;
use oldnew::consts::{
    DEFAULT_BIND, DEFAULT_FIDELITY, DEFAULT_MAX_POLLS, DEFAULT_PROVIDER_URL, DEFAULT_UPSCALE,
    DOWNLOAD_FILE_NAME, MODEL_VERSION, default_db_path,
};
use oldnew::gateway::{Gateway, PollConfig};
use oldnew::image;
use oldnew::provider::EnhanceParams;
use oldnew::provider::replicate::ReplicateProvider;
use oldnew::server::{self, AppState};
use oldnew::session::{ComparisonSession, Phase};
use oldnew::spinner::Spinner;

const TOKEN_PAGE: &str = "https://replicate.com/account/api-tokens";

#[derive(Parser)]
#[command(name = "oldnew", version, about = "Breathe new life into old photographs.")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Credential database (default: ~/.oldnew/oldnew.db)
    #[arg(long, global = true, env = "OLDNEW_DB")]
    db: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the enhancement gateway
    Serve(ServeArgs),
    /// Restore a photo through a running gateway and save the result
    Restore(RestoreArgs),
    /// Save a Replicate API token for later runs
    Login {
        /// Token to save (prompted for when omitted)
        #[arg(long)]
        token: Option<String>,
    },
    /// Forget the saved token
    Logout,
    /// Show where the token would be taken from
    Whoami,
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(short, long, env = "OLDNEW_BIND", default_value = DEFAULT_BIND)]
    bind: std::net::SocketAddr,

    /// Replicate API token (overrides REPLICATE_API_TOKEN and the saved token)
    #[arg(long)]
    token: Option<String>,

    /// Provider API root
    #[arg(long, env = "REPLICATE_BASE_URL", default_value = DEFAULT_PROVIDER_URL)]
    provider_url: String,

    /// Model version hash
    #[arg(long, env = "OLDNEW_MODEL_VERSION", default_value = MODEL_VERSION)]
    model_version: String,

    /// Milliseconds between status checks
    #[arg(long, default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Give up on a job after this many seconds
    #[arg(long, default_value_t = 300)]
    deadline_secs: u64,

    /// Give up on a job after this many status checks
    #[arg(long, default_value_t = DEFAULT_MAX_POLLS)]
    max_polls: u32,

    /// Identity preservation (1.0) versus enhancement strength (0.0)
    #[arg(long, default_value_t = DEFAULT_FIDELITY)]
    fidelity: f64,

    /// Upscaling factor
    #[arg(long, default_value_t = DEFAULT_UPSCALE)]
    upscale: u32,
}

#[derive(Args)]
struct RestoreArgs {
    /// Photo to restore
    file: PathBuf,

    /// Gateway base URL
    #[arg(short, long, env = "OLDNEW_GATEWAY", default_value = "http://127.0.0.1:3000")]
    gateway: String,

    /// Where to save the enhanced photo
    #[arg(short, long, default_value = DOWNLOAD_FILE_NAME)]
    out: PathBuf,

    /// Open the saved photo when done
    #[arg(long, default_value_t = false)]
    open: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oldnew=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let db_path = cli.db.or_else(default_db_path);

    match cli.command {
        Command::Serve(args) => serve(args, db_path).await,
        Command::Restore(args) => restore(args).await,
        Command::Login { token } => login(token, db_path),
        Command::Logout => logout(db_path),
        Command::Whoami => {
            whoami(db_path);
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs, db_path: Option<PathBuf>) -> anyhow::Result<()> {
    let settings = Settings {
        bind: args.bind,
        provider_url: args.provider_url,
        model_version: args.model_version,
        token: args.token,
        db_path,
        params: EnhanceParams {
            upscale: args.upscale,
            codeformer_fidelity: args.fidelity,
            ..EnhanceParams::default()
        },
        poll: PollConfig {
            interval: Duration::from_millis(args.poll_interval_ms),
            deadline: Duration::from_secs(args.deadline_secs),
            max_polls: args.max_polls,
        },
    };
    settings.validate()?;

    let credentials =
        CredentialResolver::standard(settings.token.clone(), settings.db_path.clone());
    let resolved = credentials.resolve();
    print_banner(&BannerInfo {
        settings: &settings,
        token_source: resolved.as_ref().map(|t| t.source.as_str()),
    });
    if resolved.is_none() {
        tracing::warn!(
            "no token yet; requests fail until REPLICATE_API_TOKEN is set or `oldnew login` runs"
        );
    }

    let provider = ReplicateProvider::new(
        Some(settings.provider_url.clone()),
        Some(settings.model_version.clone()),
    )?;
    let gateway = Gateway::new(Arc::new(provider), settings.params, settings.poll);
    server::serve(settings.bind, AppState::new(gateway, credentials)).await
}

async fn restore(args: RestoreArgs) -> anyhow::Result<()> {
    let data_url = image::load_image(&args.file)?;
    let client = GatewayClient::new(&args.gateway)?;
    let mut session = ComparisonSession::new();

    let spinner = Spinner::start("Restoring your memory...");
    let phase = client::restore(&client, &mut session, data_url).await;
    let elapsed = spinner.stop().await;

    match phase? {
        Phase::Enhanced => {}
        _ => {
            let reason = session.error().unwrap_or("Enhancement failed");
            bail!("{reason}");
        }
    }
    info!(elapsed_s = elapsed.as_secs(), "photo restored");

    let source = session
        .download_source()
        .context("no enhanced photo to download")?;
    let bytes = client.download(source).await?;
    client::save(&bytes, &args.out).await?;
    println!("✓ Saved {} ({} bytes)", args.out.display(), bytes.len());

    if args.open {
        // Headless machines have nothing to open with; the file is saved regardless.
        let _ = open::that(&args.out);
    }
    Ok(())
}

fn login(token: Option<String>, db_path: Option<PathBuf>) -> anyhow::Result<()> {
    let db_path = db_path.context("cannot determine home directory; pass --db")?;

    let token = match token {
        Some(token) => token,
        None => {
            let _ = open::that(TOKEN_PAGE);
            println!("Create a token at:\n\n  {TOKEN_PAGE}\n");
            print!("Paste the token: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            line
        }
    };

    auth::login(&db_path, &token)?;
    println!("✓ Token saved to {}", db_path.display());
    Ok(())
}

fn logout(db_path: Option<PathBuf>) -> anyhow::Result<()> {
    let db_path = db_path.context("cannot determine home directory; pass --db")?;
    if auth::logout(&db_path)? {
        println!("✓ Token removed.");
    } else {
        println!("No saved token.");
    }
    Ok(())
}

fn whoami(db_path: Option<PathBuf>) {
    let resolver = CredentialResolver::standard(None, db_path);
    match resolver.resolve() {
        Some(resolved) => println!("  token  {} ({})", mask(&resolved.token), resolved.source),
        None => println!("  token  not configured"),
    }
}

/// Show just enough of a token to tell two apart.
fn mask(token: &str) -> String {
    let visible: String = token.chars().take(4).collect();
    format!("{visible}…")
}
