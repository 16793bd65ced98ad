use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use taskdeck::config::AppConfig;
use taskdeck::session::{FileStorage, Session};
use taskdeck::store::ProjectStats;
use taskdeck::types::Priority;
use taskdeck::views::{ListQuery, Page, SortDirection, SortKey};
use taskdeck::{AggregationStore, ApiClient, DataError, HttpClient};

fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr so command output stays clean on stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = match args.get(1).map(String::as_str) {
        None | Some("--help") | Some("-h") => {
            print_help();
            return Ok(());
        }
        Some("--version") | Some("-V") => {
            println!("taskdeck {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(cmd) => Command::parse(cmd, &args[2..])?,
    };

    let config_path = PathBuf::from("config.toml");
    let config = AppConfig::load_or_default(&config_path)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config, command))
}

fn print_help() {
    println!("taskdeck {}", env!("CARGO_PKG_VERSION"));
    println!("{}\n", env!("CARGO_PKG_DESCRIPTION"));
    println!("Usage: taskdeck [COMMAND]\n");
    println!("Commands:");
    println!("  dashboard                     Totals, progress and your open work");
    println!("  projects [--search TEXT] [--status S] [--page N]");
    println!("                                List projects with progress");
    println!("  tasks [--search TEXT] [--status S] [--sort KEY] [--desc] [--page N]");
    println!("                                List tasks (KEY: priority, deadline, title, created)");
    println!("  login <email> <password>      Sign in and remember the session");
    println!("  logout                        Forget the stored session");
    println!("\nOptions:");
    println!("  -h, --help       Print help");
    println!("  -V, --version    Print version");
}

enum Command {
    Dashboard,
    Projects(ListQuery),
    Tasks(ListQuery),
    Login { email: String, password: String },
    Logout,
}

impl Command {
    fn parse(name: &str, rest: &[String]) -> anyhow::Result<Self> {
        match name {
            "dashboard" => Ok(Command::Dashboard),
            "projects" => Ok(Command::Projects(parse_list_flags(rest, false)?)),
            "tasks" => Ok(Command::Tasks(parse_list_flags(rest, true)?)),
            "login" => match rest {
                [email, password] => Ok(Command::Login {
                    email: email.clone(),
                    password: password.clone(),
                }),
                _ => bail!("Usage: taskdeck login <email> <password>"),
            },
            "logout" => Ok(Command::Logout),
            other => bail!("Unknown command: '{}'. Run `taskdeck --help`.", other),
        }
    }
}

/// Page size is filled in from config once it is loaded.
fn parse_list_flags(args: &[String], allow_sort: bool) -> anyhow::Result<ListQuery> {
    let mut query = ListQuery::default();
    let mut iter = args.iter();
    while let Some(flag) = iter.next() {
        let mut value = |name: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| anyhow!("{} needs a value", name))
        };
        match flag.as_str() {
            "--search" => query = query.searching(value("--search")?),
            "--status" => query = query.with_status(Some(value("--status")?)),
            "--page" => {
                let raw = value("--page")?;
                query.page = raw
                    .parse::<usize>()
                    .map_err(|_| anyhow!("Invalid page number: '{}'", raw))?
                    .max(1);
            }
            "--sort" if allow_sort => {
                let raw = value("--sort")?;
                let key = SortKey::from_str(&raw).ok_or_else(|| anyhow!("Unknown sort key: '{}'", raw))?;
                query = query.sorted_by(key);
            }
            "--desc" if allow_sort => query = query.direction(SortDirection::Descending),
            other => bail!("Unexpected argument: '{}'", other),
        }
    }
    Ok(query)
}

fn user_facing(err: DataError) -> anyhow::Error {
    anyhow!(err.user_message())
}

async fn run(config: AppConfig, command: Command) -> anyhow::Result<()> {
    let session = Session::new(Arc::new(FileStorage::open(&config.session.storage_path)));
    let http = HttpClient::with_reqwest(&config.api.base_url, config.api.timeout(), session.clone())
        .map_err(|e| anyhow!(e))?;
    let api = Arc::new(ApiClient::new(http).with_default_per_page(config.api.per_page));
    info!(base_url = %config.api.base_url, "API client ready");

    match command {
        Command::Login { email, password } => {
            let resp = api.login(&email, &password).await.map_err(|e| {
                match e.downcast::<DataError>() {
                    Ok(data) => user_facing(data),
                    Err(other) => other,
                }
            })?;
            match resp.user {
                Some(user) => println!("Signed in as {} (#{})", user.name, user.id),
                None => println!("Signed in."),
            }
            return Ok(());
        }
        Command::Logout => {
            if let Err(e) = api.logout().await {
                info!(error = %e, "Server logout failed; local session cleared anyway");
            }
            println!("Signed out.");
            return Ok(());
        }
        _ => {}
    }

    let store = AggregationStore::new(api);
    store.set_token(
        session
            .current_user()
            .map(|u| u.id)
            .or(config.session.user_id),
    );
    store.fetch_all().await.map_err(user_facing)?;

    let page_size = config.views.page_size;
    match command {
        Command::Dashboard => print_dashboard(&store),
        Command::Projects(query) => {
            let page_no = query.page;
            let query = query.paged(page_no, page_size);
            let page = query.apply(&store.projects());
            for project in &page.items {
                let stats: ProjectStats = store.project_stats(project.id);
                println!(
                    "#{:<5} {:<32} {:<10} {:>3}%  {} tasks",
                    project.id, project.title, project.status, stats.progress, stats.total
                );
            }
            print_footer(&page);
        }
        Command::Tasks(query) => {
            let page_no = query.page;
            let query = query.paged(page_no, page_size);
            let page = query.apply(&store.tasks());
            for task in &page.items {
                println!(
                    "#{:<5} {:<40} {:<12} {:<9} {}",
                    task.id,
                    task.title,
                    task.status().as_str(),
                    task.priority().map(|p: Priority| p.as_str()).unwrap_or("-"),
                    task.due_date.as_deref().unwrap_or("-")
                );
            }
            print_footer(&page);
        }
        Command::Login { .. } | Command::Logout => {}
    }
    Ok(())
}

fn print_dashboard(store: &AggregationStore) {
    let summary = store.dashboard_summary();
    println!("Users:     {}", summary.users);
    println!("Projects:  {}", summary.projects);
    println!(
        "Tasks:     {} todo, {} in progress, {} done ({}% complete)",
        summary.tasks.todo, summary.tasks.in_progress, summary.tasks.done, summary.completion
    );
    println!("Blocked:   {}", summary.blocked);
    println!("Overdue:   {}", summary.overdue);
    match store.token() {
        Some(user_id) => println!(
            "Mine (#{}): {} projects, {} open tasks",
            user_id,
            summary.my_projects,
            summary.my_tasks.todo + summary.my_tasks.in_progress
        ),
        None => println!("Not signed in; run `taskdeck login` to see your own work."),
    }
}

fn print_footer<T>(page: &Page<T>) {
    if page.total == 0 {
        println!("Nothing matches.");
    } else {
        println!("-- page {}/{} ({} total)", page.page, page.page_count, page.total);
    }
}
