use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use client::api::types::{HotQuery, NewChatRoom, RequestDecision, SearchQuery, SemanticQuery, VideoListQuery, VideoUpload};
use client::api::{self, UploadFile};
use client::config::ConfigError;
use client::format::{format_number, format_time_str, local_now};
use client::notify::{Level, Notification};
use client::pages::auth::{AuthPage, LoginForm, RegisterForm};
use client::pages::home::{HomeView, render_friends, render_profile, render_videos};
use client::realtime::{ConnectionState, RealtimeError};
use client::router::{Navigation, guard, resolve};
use client::{ApiError, Client, ClientConfig, ClientError};
use frames::ChatFrame;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const CLOSED_POLL: Duration = Duration::from_secs(3600);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Client(#[from] ClientError),
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error("{0}")]
    Realtime(#[from] RealtimeError),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("not logged in; run `videohub login` first")]
    NotLoggedIn,
    #[error("{0}")]
    Failed(String),
}

#[derive(Parser, Debug)]
#[command(name = "videohub", about = "videohub video and social client")]
struct Cli {
    #[arg(long, env = "VIDEOHUB_API_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "VIDEOHUB_WS_URL")]
    ws_url: Option<String>,

    #[arg(long, env = "VIDEOHUB_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    #[arg(long, env = "VIDEOHUB_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "VIDEOHUB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm: String,
    },
    Logout,
    Whoami,
    /// Profile, latest videos and friends in one view.
    Home,
    /// Upload a new avatar image.
    Avatar {
        path: PathBuf,
    },
    Video(VideoCommand),
    Friends(FriendsCommand),
    Messages(MessagesCommand),
    Rooms(RoomsCommand),
    /// Interactive chat over the realtime socket; reads lines from stdin.
    Chat(ChatArgs),
    /// Resolve a client route and apply the auth guard.
    Route {
        location: String,
    },
}

#[derive(Args, Debug)]
struct VideoCommand {
    #[command(subcommand)]
    command: VideoSubcommand,
}

#[derive(Subcommand, Debug)]
enum VideoSubcommand {
    List {
        #[arg(long)]
        user_id: Option<i64>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        size: u32,
        #[arg(long, default_value = "")]
        category: String,
    },
    Show {
        video_id: i64,
    },
    Hot {
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long)]
        category: Option<String>,
    },
    Search {
        keywords: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        size: u32,
        #[arg(long)]
        username: Option<String>,
    },
    Semantic {
        query: String,
        #[arg(long, default_value_t = 0.3)]
        threshold: f64,
    },
    Upload {
        path: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        category: String,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, default_value_t = false)]
        private: bool,
    },
    Like {
        video_id: i64,
    },
    Visit {
        video_id: i64,
    },
}

#[derive(Args, Debug)]
struct FriendsCommand {
    #[command(subcommand)]
    command: FriendsSubcommand,
}

#[derive(Subcommand, Debug)]
enum FriendsSubcommand {
    List,
    Add {
        user_id: i64,
        #[arg(long, default_value = "")]
        message: String,
    },
    Requests {
        #[arg(long)]
        status: Option<i64>,
    },
    Accept {
        request_id: i64,
    },
    Reject {
        request_id: i64,
    },
    Remark {
        friend_id: i64,
        remark: String,
    },
    Delete {
        friend_id: i64,
    },
}

#[derive(Args, Debug)]
struct MessagesCommand {
    #[command(subcommand)]
    command: MessagesSubcommand,
}

#[derive(Subcommand, Debug)]
enum MessagesSubcommand {
    History {
        user_id: i64,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        size: u32,
    },
    Read {
        message_id: i64,
    },
    Unread,
}

#[derive(Args, Debug)]
struct RoomsCommand {
    #[command(subcommand)]
    command: RoomsSubcommand,
}

#[derive(Subcommand, Debug)]
enum RoomsSubcommand {
    List,
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 1)]
        kind: i64,
        #[arg(long, value_delimiter = ',')]
        members: Vec<i64>,
    },
    Show {
        room_id: i64,
    },
    History {
        room_id: i64,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        size: u32,
    },
    Role {
        room_id: i64,
        user_id: i64,
        role: i64,
    },
    Remove {
        room_id: i64,
        user_id: i64,
    },
}

#[derive(Args, Debug)]
struct ChatArgs {
    /// Join this chat room.
    #[arg(long)]
    room: Option<i64>,
    /// Send private messages to this user instead of the room.
    #[arg(long)]
    to: Option<i64>,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let dotenv = dotenvy::dotenv();
    init_tracing();
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(error) if error.not_found() => {}
        Err(error) => tracing::warn!(%error, "failed to load .env"),
    }

    let cli = Cli::parse();
    let cancel = cancel_on_ctrl_c();
    let client = Client::open(build_config(&cli)?)?.with_cancel(cancel.clone());

    match cli.command {
        Command::Login { username, password } => run_login(&client, username, password).await,
        Command::Register {
            username,
            password,
            confirm,
        } => run_register(&client, username, password, confirm).await,
        Command::Logout => report(auth_page(&client).handle_logout()),
        Command::Whoami => run_whoami(&client).await,
        Command::Home => run_home(&client).await,
        Command::Avatar { path } => run_avatar(&client, path).await,
        Command::Video(video) => run_video(&client, video).await,
        Command::Friends(friends) => run_friends(&client, friends).await,
        Command::Messages(messages) => run_messages(&client, messages).await,
        Command::Rooms(rooms) => run_rooms(&client, rooms).await,
        Command::Chat(args) => run_chat(&client, args, &cancel).await,
        Command::Route { location } => {
            run_route(&client, &location);
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Token cancelled on the first ctrl-c; in-flight requests resolve as cancelled.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted; cancelling in-flight requests");
            trigger.cancel();
        }
    });
    cancel
}

fn build_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(ws_url) = &cli.ws_url {
        config.ws_url = Some(ws_url.clone());
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout = Duration::from_millis(timeout_ms);
    }
    if let Some(state_dir) = &cli.state_dir {
        config.state_dir.clone_from(state_dir);
    }
    tracing::debug!(base_url = %config.base_url, state_dir = %config.state_dir.display(), "configuration loaded");
    Ok(config)
}

fn auth_page(client: &Client) -> AuthPage {
    AuthPage::new(client.http.clone(), client.notices.clone())
}

fn home_view(client: &Client) -> HomeView {
    HomeView::new(client.http.clone(), client.notices.clone())
}

/// Print a notice; an error notice becomes the command's failure.
fn report(notice: Notification) -> Result<(), CliError> {
    if notice.level == Level::Error {
        return Err(CliError::Failed(notice.message));
    }
    println!("{}", notice.message);
    Ok(())
}

fn done() -> Result<(), CliError> {
    println!("ok");
    Ok(())
}

async fn run_login(client: &Client, username: String, password: String) -> Result<(), CliError> {
    let form = LoginForm { username, password };
    report(auth_page(client).handle_login(&form).await)
}

async fn run_register(client: &Client, username: String, password: String, confirm: String) -> Result<(), CliError> {
    let form = RegisterForm {
        username,
        password,
        confirm,
    };
    report(auth_page(client).handle_register(&form).await)
}

async fn run_whoami(client: &Client) -> Result<(), CliError> {
    if !client.session.is_logged_in() {
        return Err(CliError::NotLoggedIn);
    }
    match home_view(client).load_profile().await? {
        Some(profile) => println!("{}", render_profile(&profile)),
        None => println!("user id: {}", client.session.user_id().unwrap_or_default()),
    }
    Ok(())
}

async fn run_home(client: &Client) -> Result<(), CliError> {
    let home = home_view(client);
    let now = local_now();

    if client.session.is_logged_in() {
        if let Some(profile) = home.load_profile().await? {
            println!("{}\n", render_profile(&profile));
        }
    }

    let query = VideoListQuery {
        user_id: client.session.user_id(),
        ..VideoListQuery::default()
    };
    let page = home.load_videos(&query).await?;
    println!("{}", render_videos(&page.videos, now));

    if client.session.is_logged_in() {
        let friends = home.load_friends().await?;
        println!("\n好友\n{}", render_friends(&friends));
    }
    Ok(())
}

async fn run_avatar(client: &Client, path: PathBuf) -> Result<(), CliError> {
    let file = UploadFile::from_path(&path).await?;
    let data = api::user::upload_avatar(&client.http, &file).await?;
    println!("{}", data.avatar_url.unwrap_or_default());
    Ok(())
}

async fn run_video(client: &Client, video: VideoCommand) -> Result<(), CliError> {
    let http = &client.http;
    let now = local_now();
    match video.command {
        VideoSubcommand::List {
            user_id,
            page,
            size,
            category,
        } => {
            let query = VideoListQuery {
                user_id,
                page,
                size,
                category,
            };
            let result = api::video::list(http, &query).await?;
            println!("{}\n\n共 {} 个视频", render_videos(&result.videos, now), format_number(result.total));
            Ok(())
        }
        VideoSubcommand::Show { video_id } => {
            let video = api::video::detail(http, video_id).await?;
            print_json(&serde_json::to_value(&video)?)
        }
        VideoSubcommand::Hot { limit, category } => {
            let query = HotQuery {
                limit,
                category,
                ..HotQuery::default()
            };
            let videos = api::video::hot(http, &query).await?;
            println!("{}", render_videos(&videos, now));
            Ok(())
        }
        VideoSubcommand::Search {
            keywords,
            page,
            size,
            username,
        } => {
            let query = SearchQuery {
                page_num: page,
                page_size: size,
                username,
                ..SearchQuery::new(keywords)
            };
            let result = api::video::search(http, &query).await?;
            println!("{}", render_videos(&result.videos, now));
            Ok(())
        }
        VideoSubcommand::Semantic { query, threshold } => {
            let query = SemanticQuery {
                threshold,
                ..SemanticQuery::new(query)
            };
            let result = api::video::semantic_search(http, &query).await?;
            if !result.summary.is_empty() {
                println!("{}\n", result.summary);
            }
            println!("{}", render_videos(&result.videos, now));
            Ok(())
        }
        VideoSubcommand::Upload {
            path,
            title,
            description,
            category,
            tags,
            private,
        } => {
            let upload = VideoUpload {
                file: UploadFile::from_path(&path).await?,
                title,
                description,
                category,
                tags,
                is_private: private,
            };
            report(home_view(client).upload_video(&upload).await)
        }
        VideoSubcommand::Like { video_id } => {
            api::video::like(http, video_id).await?;
            done()
        }
        VideoSubcommand::Visit { video_id } => {
            api::video::increment_visit(http, video_id).await?;
            done()
        }
    }
}

async fn run_friends(client: &Client, friends: FriendsCommand) -> Result<(), CliError> {
    let http = &client.http;
    match friends.command {
        FriendsSubcommand::List => {
            let friends = api::social::friends::list(http).await?;
            println!("{}", render_friends(&friends));
            Ok(())
        }
        FriendsSubcommand::Add { user_id, message } => {
            api::social::friends::send_request(http, user_id, &message).await?;
            done()
        }
        FriendsSubcommand::Requests { status } => {
            let now = local_now();
            for request in api::social::friends::requests(http, status).await? {
                let age = format_time_str(request.created_at.as_deref().unwrap_or_default(), now);
                println!("#{} from {} [{}] {} {age}", request.id, request.sender_id, request.status, request.message);
            }
            Ok(())
        }
        FriendsSubcommand::Accept { request_id } => {
            api::social::friends::handle_request(http, request_id, RequestDecision::Accept).await?;
            done()
        }
        FriendsSubcommand::Reject { request_id } => {
            api::social::friends::handle_request(http, request_id, RequestDecision::Reject).await?;
            done()
        }
        FriendsSubcommand::Remark { friend_id, remark } => {
            api::social::friends::update_remark(http, friend_id, &remark).await?;
            done()
        }
        FriendsSubcommand::Delete { friend_id } => {
            api::social::friends::delete(http, friend_id).await?;
            done()
        }
    }
}

async fn run_messages(client: &Client, messages: MessagesCommand) -> Result<(), CliError> {
    let http = &client.http;
    match messages.command {
        MessagesSubcommand::History { user_id, page, size } => {
            let now = local_now();
            let page = api::social::Page { page, size };
            for message in api::social::messages::history(http, user_id, page).await? {
                let age = format_time_str(message.created_at.as_deref().unwrap_or_default(), now);
                let unread = if message.is_read { "" } else { " *" };
                println!("{} -> {}: {} ({age}){unread}", message.sender_id, message.receiver_id, message.content);
            }
            Ok(())
        }
        MessagesSubcommand::Read { message_id } => {
            api::social::messages::mark_read(http, message_id).await?;
            done()
        }
        MessagesSubcommand::Unread => {
            println!("{}", api::social::messages::unread_count(http).await?);
            Ok(())
        }
    }
}

async fn run_rooms(client: &Client, rooms: RoomsCommand) -> Result<(), CliError> {
    let http = &client.http;
    match rooms.command {
        RoomsSubcommand::List => {
            for room in api::social::rooms::list(http, api::social::Page::default()).await? {
                println!("#{} {} ({} members)", room.id, room.name, room.members.len());
            }
            Ok(())
        }
        RoomsSubcommand::Create { name, kind, members } => {
            let room = NewChatRoom {
                name,
                kind,
                member_ids: members,
            };
            let created = api::social::rooms::create(http, &room).await?;
            println!("#{} {}", created.id, created.name);
            Ok(())
        }
        RoomsSubcommand::Show { room_id } => {
            let room = api::social::rooms::detail(http, room_id).await?;
            println!("#{} {} (creator {})", room.id, room.name, room.creator_id);
            for member in room.members {
                println!("  {} {} role={}", member.user_id, member.nickname, member.role);
            }
            Ok(())
        }
        RoomsSubcommand::History { room_id, page, size } => {
            let now = local_now();
            let page = api::social::Page { page, size };
            for message in api::social::rooms::history(http, room_id, page).await? {
                let age = format_time_str(message.created_at.as_deref().unwrap_or_default(), now);
                println!("{}: {} ({age})", message.sender_id, message.content);
            }
            Ok(())
        }
        RoomsSubcommand::Role { room_id, user_id, role } => {
            api::social::rooms::set_member_role(http, room_id, user_id, role).await?;
            done()
        }
        RoomsSubcommand::Remove { room_id, user_id } => {
            api::social::rooms::remove_member(http, room_id, user_id).await?;
            done()
        }
    }
}

fn render_frame(frame: &ChatFrame) -> String {
    let sender = frame.from.map_or_else(|| "system".to_owned(), |id| id.to_string());
    let mut line = format!("[{}] {sender}: {}", frame.kind, frame.content);
    if let Some(extra) = &frame.extra {
        line.push(' ');
        line.push_str(&Value::Object(extra.clone()).to_string());
    }
    line
}

async fn run_chat(client: &Client, args: ChatArgs, cancel: &CancellationToken) -> Result<(), CliError> {
    let token = client.session.token().ok_or(CliError::NotLoggedIn)?;
    let realtime = &client.realtime;
    realtime.set_message_handler(|frame| println!("{}", render_frame(&frame)));
    tokio::select! {
        result = realtime.connect(&token, args.room, args.to) => result?,
        () = cancel.cancelled() => {
            realtime.close().await;
            return Ok(());
        }
    }
    eprintln!("connected; type a message and press enter, /quit to leave");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let text = line.trim();
                if text.is_empty() {
                    continue;
                }
                if text == "/quit" {
                    break;
                }
                let sent = match args.to {
                    Some(to_user) => realtime.send_private_message(to_user, text),
                    None => realtime.send_chat_message(text),
                };
                if !sent {
                    eprintln!("connection lost");
                    break;
                }
            }
            () = cancel.cancelled() => break,
            closed = realtime.wait_for_state(ConnectionState::Closed, CLOSED_POLL) => {
                if closed.is_ok() {
                    eprintln!("server closed the connection");
                    break;
                }
            }
        }
    }

    realtime.clear_message_handler();
    realtime.close().await;
    Ok(())
}

fn run_route(client: &Client, location: &str) {
    let target = resolve(location);
    let params = target
        .params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ");
    println!("{} {params}", target.name.as_str());
    match guard(&target, &client.session.snapshot()) {
        Navigation::Proceed => println!("proceed"),
        Navigation::Redirect(login) => println!("redirect {login}"),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
