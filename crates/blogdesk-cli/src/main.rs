use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use blogdesk_bus::Topic;
use blogdesk_client::api::{
    self, ArticleDraft, CategoryDraft, ListQuery, Resource, SortDirection, TagDraft, UserDraft,
};
use blogdesk_core::Console;
use blogdesk_schema::BusMessage;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blogdesk", version, about = "Admin console for the blog backend")]
struct Cli {
    #[arg(long, default_value = ".", help = "Config root directory (contains config/)")]
    config_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Log in and store the session token")]
    Login {
        #[arg(help = "User name or email")]
        username: String,
        #[arg(long, help = "Password (prompted when omitted)")]
        password: Option<String>,
    },
    #[command(about = "Forget the stored session token")]
    Logout,
    #[command(about = "Show the user behind the session token")]
    Whoami,
    #[command(about = "Run the navigation guard for a route")]
    Navigate {
        #[arg(help = "Target route name")]
        route: String,
        #[arg(long, help = "Route navigated from")]
        from: Option<String>,
    },
    #[command(about = "List the route table")]
    Routes,
    #[command(subcommand, about = "Article management")]
    Articles(CrudCommands),
    #[command(subcommand, about = "Category management")]
    Categories(CrudCommands),
    #[command(subcommand, about = "Tag management")]
    Tags(CrudCommands),
    #[command(subcommand, about = "User management")]
    Users(CrudCommands),
    #[command(subcommand, about = "Roles (read only)")]
    Roles(ReadCommands),
    #[command(subcommand, about = "Article sources (read only)")]
    Sources(ReadCommands),
}

#[derive(Args, Debug, Default)]
struct ListArgs {
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    page_size: Option<u32>,
    #[arg(long, help = "Field to sort by")]
    sort: Option<String>,
    #[arg(long, help = "asc or desc")]
    direction: Option<SortDirection>,
    #[arg(long, help = "Only items changed since (RFC 3339)")]
    since: Option<DateTime<Utc>>,
    #[arg(long = "filter", value_name = "KEY=VALUE", help = "Extra filter, repeatable")]
    filters: Vec<String>,
}

impl ListArgs {
    fn to_query(&self) -> Result<ListQuery> {
        let mut query = ListQuery {
            since: self.since,
            sort: self.sort.clone(),
            direction: self.direction,
            page: self.page,
            page_size: self.page_size,
            ..ListQuery::default()
        };
        for filter in &self.filters {
            let (key, value) = filter
                .split_once('=')
                .ok_or_else(|| anyhow!("filter must look like KEY=VALUE: {filter}"))?;
            query = query.filter(key, value);
        }
        Ok(query)
    }
}

#[derive(Subcommand)]
enum CrudCommands {
    #[command(about = "List items")]
    List(ListArgs),
    #[command(about = "Show one item")]
    Get { id: String },
    #[command(about = "Create an item from JSON fields")]
    Create {
        #[arg(long, help = "Fields as a JSON object")]
        json: String,
    },
    #[command(about = "Update an item from JSON fields")]
    Update {
        id: String,
        #[arg(long, help = "Fields as a JSON object")]
        json: String,
    },
    #[command(about = "Delete an item")]
    Delete { id: String },
}

#[derive(Subcommand)]
enum ReadCommands {
    #[command(about = "List items")]
    List(ListArgs),
    #[command(about = "Show one item")]
    Get { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let console = Console::open(&cli.config_root)?;
    tracing::debug!(base_url = %console.dispatcher.base_url(), "console ready");
    let mut events = console
        .bus
        .subscribe_many(&[Topic::Notice, Topic::Redirect])
        .await;

    let result = run(&console, cli.command).await;
    report_events(&mut events);
    result
}

async fn run(console: &Console, command: Commands) -> Result<()> {
    let dispatcher = &console.dispatcher;
    match command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => dialoguer::Password::new()
                    .with_prompt("Password")
                    .interact()
                    .context("read password")?,
            };
            match console.account.login(&username, &password).await? {
                Some(user) => println!("Logged in as {} ({}).", user.name, join_roles(&user.roles)),
                None => println!("Logged in."),
            }
        }
        Commands::Logout => {
            console.account.logout()?;
            println!("Logged out.");
        }
        Commands::Whoami => {
            let user = console.account.whoami().await?;
            println!("{:<10} {}", "ID", user.id);
            println!("{:<10} {}", "NAME", user.name);
            let roles: Vec<String> = user
                .effective_roles()
                .into_iter()
                .map(str::to_string)
                .collect();
            println!("{:<10} {}", "ROLES", join_roles(&roles));
        }
        Commands::Navigate { route, from } => {
            let decision = console.guard.navigate(from.as_deref(), &route).await?;
            let target = decision.target(&route, console.guard.routes());
            println!("{decision:?} -> {target}");
            for (key, value) in decision.query() {
                println!("  {key}={value}");
            }
        }
        Commands::Routes => {
            println!("{:<22} {:<36} {:<10} {:<12}", "NAME", "PATH", "KIND", "ROLES");
            println!("{}", "-".repeat(82));
            for route in console.guard.routes().iter() {
                let roles: Vec<String> = route.required_roles.iter().cloned().collect();
                println!(
                    "{:<22} {:<36} {:<10} {:<12}",
                    route.name,
                    route.path,
                    route.kind.to_string(),
                    join_roles(&roles)
                );
            }
        }
        Commands::Articles(cmd) => {
            run_crud(api::articles(dispatcher), cmd, |v| {
                Ok(serde_json::to_value(serde_json::from_value::<ArticleDraft>(v)?)?)
            })
            .await?
        }
        Commands::Categories(cmd) => {
            run_crud(api::categories(dispatcher), cmd, |v| {
                Ok(serde_json::to_value(serde_json::from_value::<CategoryDraft>(v)?)?)
            })
            .await?
        }
        Commands::Tags(cmd) => {
            run_crud(api::tags(dispatcher), cmd, |v| {
                let draft: TagDraft = serde_json::from_value(v)?;
                Ok(serde_json::to_value(TagDraft::named(&draft.name))?)
            })
            .await?
        }
        Commands::Users(cmd) => {
            run_crud(api::users(dispatcher), cmd, |v| {
                Ok(serde_json::to_value(serde_json::from_value::<UserDraft>(v)?)?)
            })
            .await?
        }
        Commands::Roles(cmd) => run_read(api::roles(dispatcher), cmd).await?,
        Commands::Sources(cmd) => run_read(api::sources(dispatcher), cmd).await?,
    }
    Ok(())
}

/// `normalize` parses user JSON into the resource's draft type and back,
/// translating field names on the way.
async fn run_crud(
    resource: Resource<'_>,
    command: CrudCommands,
    normalize: impl Fn(Value) -> Result<Value>,
) -> Result<()> {
    let body = match command {
        CrudCommands::List(args) => resource.list(&args.to_query()?).await?,
        CrudCommands::Get { id } => resource.get(&id).await?,
        CrudCommands::Create { json } => {
            let fields = normalize(parse_fields(&json)?)
                .with_context(|| format!("invalid {} fields", resource.envelope()))?;
            resource.create(&fields).await?
        }
        CrudCommands::Update { id, json } => {
            let fields = normalize(parse_fields(&json)?)
                .with_context(|| format!("invalid {} fields", resource.envelope()))?;
            resource.update(&id, &fields).await?
        }
        CrudCommands::Delete { id } => resource.delete(&id).await?,
    };
    print_body(&body)
}

async fn run_read(resource: Resource<'_>, command: ReadCommands) -> Result<()> {
    let body = match command {
        ReadCommands::List(args) => resource.list(&args.to_query()?).await?,
        ReadCommands::Get { id } => resource.get(&id).await?,
    };
    print_body(&body)
}

fn parse_fields(json: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(json).context("fields must be valid JSON")?;
    if !value.is_object() {
        return Err(anyhow!("fields must be a JSON object"));
    }
    Ok(value)
}

fn print_body(body: &Value) -> Result<()> {
    if !body.is_null() {
        println!("{}", serde_json::to_string_pretty(body)?);
    }
    Ok(())
}

fn join_roles(roles: &[String]) -> String {
    if roles.is_empty() {
        "-".to_string()
    } else {
        roles.join(",")
    }
}

fn report_events(events: &mut mpsc::Receiver<BusMessage>) {
    while let Ok(msg) = events.try_recv() {
        match msg {
            BusMessage::Notice { text, .. } => eprintln!("! {text}"),
            BusMessage::Redirect { route, .. } => eprintln!("-> run `blogdesk navigate {route}`"),
            _ => {}
        }
    }
}
