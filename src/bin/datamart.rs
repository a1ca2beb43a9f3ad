use std::process::ExitCode;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use datamart_client::api::ApiClient;
use datamart_client::app::{App, BrowseRequest};
use datamart_client::cart::{CartUpdate, Priority, RequestType};
use datamart_client::catalog::{CatalogClient, DownloadFormat, HttpCatalogClient};
use datamart_client::config::ConfigLoader;
use datamart_client::directory::{HttpOrganizationClient, OrganizationClient, OrganizationPage};
use datamart_client::domain::{Classification, Dataset, DatasetId, Maturity, Organization};
use datamart_client::error::DatamartError;
use datamart_client::fixtures::FixtureCatalog;
use datamart_client::output::{JsonOutput, OutputMode};
use datamart_client::profile::{HttpProfileClient, Profile, ProfileClient, RecentView};
use datamart_client::search::{DateRange, QualityRange, SearchFilters, SortKey, SortOrder};
use datamart_client::session::{SessionGate, StaticIdentityProvider};
use datamart_client::store::FileStore;
use datamart_client::tui::Tui;

#[derive(Parser)]
#[command(name = "datamart")]
#[command(about = "Corporate data marketplace client: browse, search, rate, and request access to governed datasets")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    non_interactive: bool,

    /// Use the built-in fixture catalog instead of the HTTP API.
    #[arg(long, global = true)]
    mock: bool,

    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Log in to the marketplace")]
    Login(LoginArgs),
    #[command(about = "Log out and clear the persisted session")]
    Logout,
    #[command(about = "Show the current session")]
    Whoami,
    #[command(about = "Landing digest: featured, popular, and recent datasets")]
    Home(HomeArgs),
    #[command(about = "Show the account profile")]
    Profile,
    #[command(about = "Search and filter the catalog")]
    Browse(BrowseArgs),
    #[command(about = "Show one dataset in detail")]
    Show(ShowArgs),
    #[command(about = "Submit a review for a dataset")]
    Rate(RateArgs),
    #[command(about = "Toggle a dataset bookmark")]
    Bookmark(ShowArgs),
    #[command(about = "List bookmarked datasets")]
    Bookmarks,
    #[command(about = "List provider organizations")]
    Orgs(OrgsArgs),
    #[command(about = "Manage pending access requests")]
    Cart(CartArgs),
    #[command(about = "Resolve a download URL for a dataset")]
    Download(DownloadArgs),
    #[command(about = "Export search results as CSV")]
    Export(ExportArgs),
    #[command(about = "Export a dataset preview as CSV")]
    Preview(PreviewArgs),
}

#[derive(Args)]
struct LoginArgs {
    username: String,
    password: String,
}

#[derive(Args, Clone)]
struct BrowseArgs {
    /// Free-text query.
    query: Option<String>,

    #[arg(long = "category")]
    categories: Vec<String>,

    #[arg(long = "classification", value_enum)]
    classifications: Vec<Classification>,

    #[arg(long = "maturity", value_enum)]
    maturity: Vec<Maturity>,

    #[arg(long = "organization")]
    organizations: Vec<String>,

    #[arg(long = "tag")]
    tags: Vec<String>,

    #[arg(long)]
    quality_min: Option<u8>,

    #[arg(long)]
    quality_max: Option<u8>,

    /// Inclusive lower bound on the update date (YYYY-MM-DD).
    #[arg(long)]
    updated_after: Option<String>,

    /// Inclusive upper bound on the update date (YYYY-MM-DD).
    #[arg(long)]
    updated_before: Option<String>,

    #[arg(long, value_enum, default_value_t = SortKey::Relevance)]
    sort: SortKey,

    #[arg(long, value_enum, default_value_t = SortOrder::Desc)]
    order: SortOrder,

    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long)]
    page_size: Option<u32>,

    /// Let the server rank the results instead of the local pipeline.
    #[arg(long)]
    remote: bool,
}

#[derive(Args)]
struct ShowArgs {
    id: String,
}

#[derive(Args)]
struct RateArgs {
    id: String,

    #[arg(long)]
    rating: u8,

    #[arg(long)]
    comment: String,
}

#[derive(Args)]
struct HomeArgs {
    #[arg(long, default_value_t = 6)]
    limit: u32,
}

#[derive(Args)]
struct OrgsArgs {
    /// Search by name instead of listing.
    query: Option<String>,

    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = 20)]
    page_size: u32,
}

#[derive(Args)]
struct CartArgs {
    #[command(subcommand)]
    command: CartCommand,
}

#[derive(Subcommand)]
enum CartCommand {
    #[command(about = "Add a dataset access request")]
    Add(CartAddArgs),
    #[command(about = "Remove a request by dataset id")]
    Rm(ShowArgs),
    #[command(about = "Update a request's fields")]
    Update(CartUpdateArgs),
    #[command(about = "List pending requests")]
    List,
    #[command(about = "Empty the cart")]
    Clear,
    #[command(about = "Submit pending requests")]
    Submit,
}

#[derive(Args)]
struct CartAddArgs {
    id: String,

    #[arg(long, value_enum, default_value_t = RequestType::Access)]
    request_type: RequestType,

    #[arg(long, value_enum, default_value_t = Priority::Standard)]
    priority: Priority,

    #[arg(long)]
    justification: String,
}

#[derive(Args)]
struct CartUpdateArgs {
    id: String,

    #[arg(long, value_enum)]
    request_type: Option<RequestType>,

    #[arg(long, value_enum)]
    priority: Option<Priority>,

    #[arg(long)]
    justification: Option<String>,
}

#[derive(Args)]
struct DownloadArgs {
    id: String,

    #[arg(long, value_enum, default_value_t = DownloadFormat::Csv)]
    format: DownloadFormat,

    /// Fetch the export body and write it to this path instead of printing
    /// the download URL.
    #[arg(long)]
    save: Option<String>,
}

#[derive(Args)]
struct ExportArgs {
    #[command(flatten)]
    browse: BrowseArgs,

    /// Write to a file instead of stdout.
    #[arg(long)]
    output: Option<String>,
}

#[derive(Args)]
struct PreviewArgs {
    id: String,

    #[arg(long)]
    output: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<DatamartError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &DatamartError) -> u8 {
    match error {
        DatamartError::DatasetNotFound(_)
        | DatamartError::MissingConfig
        | DatamartError::ConfigRead(_) => 2,
        DatamartError::ApiHttp(_)
        | DatamartError::ApiStatus { .. }
        | DatamartError::ApiFailure(_)
        | DatamartError::ResponseParse(_) => 3,
        DatamartError::InvalidCredentials | DatamartError::NotAuthenticated => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.non_interactive {
        OutputMode::NonInteractive
    } else {
        OutputMode::Interactive
    };

    let resolved = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;
    let store = FileStore::new().into_diagnostic()?;
    let session = SessionGate::new(store, StaticIdentityProvider);

    if cli.mock {
        let app = App::new(
            FixtureCatalog::new(),
            FixtureDirectory,
            FixtureProfile,
            session,
            resolved.page_size,
        );
        dispatch(app, cli.command, output_mode)
    } else {
        let api = ApiClient::new(&resolved.api_base_url, resolved.timeout, resolved.retries)
            .into_diagnostic()?;
        let app = App::new(
            HttpCatalogClient::new(api.clone()),
            HttpOrganizationClient::new(api.clone()),
            HttpProfileClient::new(api),
            session,
            resolved.page_size,
        );
        dispatch(app, cli.command, output_mode)
    }
}

fn dispatch<C, O, P>(
    mut app: App<C, O, P, FileStore, StaticIdentityProvider>,
    command: Option<Commands>,
    output_mode: OutputMode,
) -> miette::Result<()>
where
    C: CatalogClient,
    O: OrganizationClient,
    P: ProfileClient,
{
    app.startup().into_diagnostic()?;

    let Some(command) = command else {
        return match output_mode {
            OutputMode::Interactive => {
                if !app.whoami().authenticated {
                    return Err(miette::Report::msg(
                        "not logged in (try `datamart login <username> <password>`)",
                    ));
                }
                let mut tui = Tui::new();
                tui.run(&mut app)
            }
            OutputMode::NonInteractive => Err(miette::Report::msg(
                "command required (try `datamart --help`)",
            )),
        };
    };

    match command {
        Commands::Login(args) => {
            let result = app
                .login(&args.username, &args.password, &JsonOutput)
                .into_diagnostic()?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Logout => {
            app.logout(&JsonOutput).into_diagnostic()?;
            JsonOutput::print(&serde_json::json!({"loggedOut": true})).into_diagnostic()
        }
        Commands::Whoami => JsonOutput::print(&app.whoami()).into_diagnostic(),
        Commands::Home(args) => {
            let result = app.home(args.limit, &JsonOutput).into_diagnostic()?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Profile => {
            let result = app.profile_overview(&JsonOutput).into_diagnostic()?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Browse(args) => {
            let request = browse_request(&args).into_diagnostic()?;
            let result = if args.remote {
                app.browse_remote(&request, &JsonOutput).into_diagnostic()?
            } else {
                app.browse(&request, &JsonOutput).into_diagnostic()?
            };
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Show(args) => {
            let id = parse_id(&args.id)?;
            let result = app.show(&id, &JsonOutput).into_diagnostic()?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Rate(args) => {
            let id = parse_id(&args.id)?;
            let result = app
                .rate(&id, args.rating, &args.comment, &JsonOutput)
                .into_diagnostic()?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Bookmark(args) => {
            let id = parse_id(&args.id)?;
            let result = app.toggle_bookmark(&id, &JsonOutput).into_diagnostic()?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Bookmarks => {
            let result = app.bookmarks(&JsonOutput).into_diagnostic()?;
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Orgs(args) => {
            let result = match &args.query {
                Some(query) => app
                    .search_organizations(query, args.page_size, &JsonOutput)
                    .into_diagnostic()?,
                None => app
                    .organizations(args.page, args.page_size, &JsonOutput)
                    .into_diagnostic()?,
            };
            JsonOutput::print(&result).into_diagnostic()
        }
        Commands::Cart(args) => run_cart(&mut app, args.command),
        Commands::Download(args) => {
            let id = parse_id(&args.id)?;
            match args.save {
                Some(path) => {
                    let body = app.download(&id, args.format, &JsonOutput).into_diagnostic()?;
                    std::fs::write(&path, body).into_diagnostic()?;
                    JsonOutput::print(&serde_json::json!({"written": path})).into_diagnostic()
                }
                None => {
                    let result = app
                        .download_url(&id, args.format, &JsonOutput)
                        .into_diagnostic()?;
                    JsonOutput::print(&result).into_diagnostic()
                }
            }
        }
        Commands::Export(args) => {
            let request = browse_request(&args.browse).into_diagnostic()?;
            let result = app.export_search(&request, &JsonOutput).into_diagnostic()?;
            write_csv(result.csv, args.output)
        }
        Commands::Preview(args) => {
            let id = parse_id(&args.id)?;
            let result = app.export_preview(&id, &JsonOutput).into_diagnostic()?;
            write_csv(result.csv, args.output)
        }
    }
}

fn run_cart<C, O, P>(
    app: &mut App<C, O, P, FileStore, StaticIdentityProvider>,
    command: CartCommand,
) -> miette::Result<()>
where
    C: CatalogClient,
    O: OrganizationClient,
    P: ProfileClient,
{
    match command {
        CartCommand::Add(args) => {
            let id = parse_id(&args.id)?;
            let view = app
                .cart_add(
                    &id,
                    args.request_type,
                    args.priority,
                    args.justification,
                    &JsonOutput,
                )
                .into_diagnostic()?;
            JsonOutput::print(&view).into_diagnostic()
        }
        CartCommand::Rm(args) => JsonOutput::print(&app.cart_remove(&args.id)).into_diagnostic(),
        CartCommand::Update(args) => {
            let view = app.cart_update(
                &args.id,
                CartUpdate {
                    request_type: args.request_type,
                    priority: args.priority,
                    business_justification: args.justification,
                },
            );
            JsonOutput::print(&view).into_diagnostic()
        }
        CartCommand::List => JsonOutput::print(&app.cart_view()).into_diagnostic(),
        CartCommand::Clear => JsonOutput::print(&app.cart_clear()).into_diagnostic(),
        CartCommand::Submit => {
            let result = app.submit_requests(&JsonOutput).into_diagnostic()?;
            JsonOutput::print(&result).into_diagnostic()
        }
    }
}

fn browse_request(args: &BrowseArgs) -> Result<BrowseRequest, DatamartError> {
    let quality_range = match (args.quality_min, args.quality_max) {
        (None, None) => None,
        (min, max) => Some(QualityRange::new(min.unwrap_or(0), max.unwrap_or(100))?),
    };
    let date_range = match (&args.updated_after, &args.updated_before) {
        (None, None) => None,
        (after, before) => {
            let start = after
                .as_deref()
                .map(|value| parse_day(value, false))
                .transpose()?
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            let end = before
                .as_deref()
                .map(|value| parse_day(value, true))
                .transpose()?
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            Some(DateRange { start, end })
        }
    };

    Ok(BrowseRequest {
        query: args.query.clone().unwrap_or_default(),
        filters: SearchFilters {
            categories: args.categories.clone(),
            classifications: args.classifications.clone(),
            maturity: args.maturity.clone(),
            organizations: args.organizations.clone(),
            tags: args.tags.clone(),
            quality_range,
            date_range,
        },
        sort_key: args.sort,
        sort_order: args.order,
        page: args.page,
        page_size: args.page_size,
    })
}

fn parse_day(value: &str, end_of_day: bool) -> Result<DateTime<Utc>, DatamartError> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| DatamartError::ConfigParse(format!("invalid date: {value}")))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    Ok(time.unwrap_or_default().and_utc())
}

fn parse_id(value: &str) -> miette::Result<DatasetId> {
    value.parse::<DatasetId>().into_diagnostic()
}

fn write_csv(csv: String, output: Option<String>) -> miette::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(&path, csv).into_diagnostic()?;
            JsonOutput::print(&serde_json::json!({"written": path})).into_diagnostic()
        }
        None => {
            println!("{csv}");
            Ok(())
        }
    }
}

/// Fixture counterparts for the secondary services, used with `--mock`.
struct FixtureDirectory;
struct FixtureProfile;

impl OrganizationClient for FixtureDirectory {
    fn list(&self, page: u32, page_size: u32) -> Result<OrganizationPage, DatamartError> {
        let organizations = fixture_organizations();
        Ok(OrganizationPage {
            pagination: datamart_client::api::Pagination {
                page,
                page_size,
                total_count: organizations.len() as u64,
                total_pages: 1,
            },
            organizations,
        })
    }

    fn get(&self, id: &str) -> Result<Organization, DatamartError> {
        fixture_organizations()
            .into_iter()
            .find(|org| org.id == id)
            .ok_or_else(|| DatamartError::ApiFailure(format!("unknown organization {id}")))
    }

    fn search(&self, query: &str, limit: u32) -> Result<Vec<Organization>, DatamartError> {
        let needle = query.to_lowercase();
        let mut matched: Vec<Organization> = fixture_organizations()
            .into_iter()
            .filter(|org| org.name.to_lowercase().contains(&needle))
            .collect();
        matched.truncate(limit as usize);
        Ok(matched)
    }

    fn featured(&self, limit: u32) -> Result<Vec<Organization>, DatamartError> {
        let mut organizations = fixture_organizations();
        organizations.truncate(limit as usize);
        Ok(organizations)
    }

    fn datasets(&self, _id: &str, _page: u32, _page_size: u32) -> Result<Vec<Dataset>, DatamartError> {
        Ok(Vec::new())
    }
}

impl ProfileClient for FixtureProfile {
    fn current(&self) -> Result<Profile, DatamartError> {
        Ok(Profile {
            id: "admin".to_string(),
            name: "Administrator".to_string(),
            email: "admin@datamarketplace.com".to_string(),
            organization: "Data Governance Office".to_string(),
            role: "admin".to_string(),
        })
    }

    fn favorites(&self) -> Result<Vec<String>, DatamartError> {
        Ok(Vec::new())
    }

    fn add_favorite(&self, _dataset_id: &str) -> Result<(), DatamartError> {
        Ok(())
    }

    fn remove_favorite(&self, _dataset_id: &str) -> Result<(), DatamartError> {
        Ok(())
    }

    fn recently_viewed(&self) -> Result<Vec<RecentView>, DatamartError> {
        Ok(Vec::new())
    }

    fn push_recently_viewed(&self, _dataset_id: &str) -> Result<(), DatamartError> {
        Ok(())
    }

    fn interests(&self) -> Result<Vec<String>, DatamartError> {
        Ok(Vec::new())
    }

    fn update_interests(&self, interests: &[String]) -> Result<Vec<String>, DatamartError> {
        Ok(interests.to_vec())
    }
}

fn fixture_organizations() -> Vec<Organization> {
    let created = DateTime::parse_from_rfc3339("2022-05-01T00:00:00Z")
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or_default();
    vec![
        Organization {
            id: "org-001".to_string(),
            name: "Customer Intelligence".to_string(),
            description: "Behavioral analytics and segmentation".to_string(),
            verified: true,
            dataset_count: 12,
            average_dataset_rating: 4.6,
            active_users: 48,
            created_at: created,
        },
        Organization {
            id: "org-002".to_string(),
            name: "Financial Planning".to_string(),
            description: "Revenue and performance reporting".to_string(),
            verified: true,
            dataset_count: 9,
            average_dataset_rating: 4.8,
            active_users: 31,
            created_at: created,
        },
        Organization {
            id: "org-003".to_string(),
            name: "Risk Office".to_string(),
            description: "Credit and market risk datasets".to_string(),
            verified: false,
            dataset_count: 5,
            average_dataset_rating: 4.2,
            active_users: 17,
            created_at: created,
        },
    ]
}
