use concort_client::config::{LoggingSettings, Settings};
use concort_client::models::Gender;
use concort_client::{
    ApiClient, AuthHolder, AuthRepository, ChatHolder, ChatRepository, HomeHolder, MatchRepository,
    Navigator, Outcome, Screen, SessionMachine, SessionStore,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: concort <command>

  register <phone>                 request an OTP
  resend                           request a new OTP for the same number
  verify <otp>                     verify the OTP sent to the registered number
  profile <name> <gender> [age] [city]
  me                               show the signed-in user
  status                           show queue position
  matches                          list matches
  match <id>                       show one match
  messages <id>                    show chat history
  send <id> <text...>              send a message
  read <id>                        mark a chat as read
  logout
  delete-account
  state                            show session state and current screen";

/// One driver invocation
#[derive(Debug)]
enum Command {
    Register { phone_number: String },
    Resend,
    Verify { otp_code: String },
    Profile { name: String, gender: Gender, age: Option<u8>, city: Option<String> },
    Me,
    Status,
    Matches,
    Match { match_id: String },
    Messages { match_id: String },
    Send { match_id: String, content: String },
    Read { match_id: String },
    Logout,
    DeleteAccount,
    State,
}

impl Command {
    fn parse(args: &[String]) -> Result<Self, String> {
        let arg = |i: usize| args.get(i).cloned().ok_or_else(|| USAGE.to_string());

        let command = match args.first().map(String::as_str) {
            Some("register") => Command::Register { phone_number: arg(1)? },
            Some("resend") => Command::Resend,
            Some("verify") => Command::Verify { otp_code: arg(1)? },
            Some("profile") => {
                let gender = arg(2)?.parse::<Gender>()?;
                let age = match args.get(3) {
                    Some(raw) => Some(raw.parse::<u8>().map_err(|e| format!("invalid age: {}", e))?),
                    None => None,
                };
                Command::Profile {
                    name: arg(1)?,
                    gender,
                    age,
                    city: args.get(4).cloned(),
                }
            }
            Some("me") => Command::Me,
            Some("status") => Command::Status,
            Some("matches") => Command::Matches,
            Some("match") => Command::Match { match_id: arg(1)? },
            Some("messages") => Command::Messages { match_id: arg(1)? },
            Some("send") => {
                if args.len() < 3 {
                    return Err(USAGE.to_string());
                }
                Command::Send {
                    match_id: arg(1)?,
                    content: args[2..].join(" "),
                }
            }
            Some("read") => Command::Read { match_id: arg(1)? },
            Some("logout") => Command::Logout,
            Some("delete-account") => Command::DeleteAccount,
            Some("state") => Command::State,
            _ => return Err(USAGE.to_string()),
        };
        Ok(command)
    }
}

/// Everything one invocation needs, wired once
struct AppState {
    machine: Arc<SessionMachine>,
    auth_repository: Arc<AuthRepository>,
    match_repository: Arc<MatchRepository>,
    chat_repository: Arc<ChatRepository>,
    auth: AuthHolder,
    navigator: Navigator,
}

impl AppState {
    async fn build(settings: &Settings) -> Result<Self, String> {
        let api = Arc::new(
            ApiClient::new(&settings.api.base_url, settings.api.timeout())
                .map_err(|e| format!("API client error: {}", e))?,
        );

        let session = Arc::new(
            SessionStore::open(&settings.session.path)
                .await
                .map_err(|e| format!("Session store error: {}", e))?,
        );

        let machine = Arc::new(SessionMachine::restore(&session.snapshot()));
        let auth_repository = Arc::new(AuthRepository::new(api.clone(), session.clone()));
        let match_repository = Arc::new(MatchRepository::new(api.clone(), session.clone()));
        let chat_repository = Arc::new(ChatRepository::new(api.clone(), session));

        let auth = AuthHolder::new(auth_repository.clone(), machine.clone());
        let mut navigator = Navigator::new(machine.current());
        navigator.complete_splash();

        info!("Client ready against {} (session: {})", api.base_url(), machine.current().name());

        Ok(Self {
            machine,
            auth_repository,
            match_repository,
            chat_repository,
            auth,
            navigator,
        })
    }

    fn home(&self) -> HomeHolder {
        HomeHolder::new(self.auth_repository.clone(), self.match_repository.clone())
    }

    fn chat(&self, match_id: &str) -> ChatHolder {
        ChatHolder::new(match_id, self.match_repository.clone(), self.chat_repository.clone())
    }

    fn auth_result(&self) -> Result<(), String> {
        match self.auth.snapshot().error_message {
            Some(message) => Err(message),
            None => Ok(()),
        }
    }

    async fn run(&mut self, command: Command) -> Result<(), String> {
        match command {
            Command::Register { phone_number } => {
                self.navigator.navigate(Screen::Register).map_err(|e| e.to_string())?;
                self.auth.register(&phone_number).await;
                self.auth_result()?;
                println!("OTP sent to {}", self.auth.snapshot().phone_number);
            }
            Command::Resend => {
                self.auth.resend_otp().await;
                self.auth_result()?;
                println!("OTP re-sent to {}", self.auth.snapshot().phone_number);
            }
            Command::Verify { otp_code } => {
                let phone_number = self.auth.snapshot().phone_number;
                if phone_number.is_empty() {
                    return Err("Register a phone number first".to_string());
                }
                self.auth.verify_otp(&phone_number, &otp_code).await;
                self.auth_result()?;
                println!("Phone number verified");
            }
            Command::Profile { name, gender, age, city } => {
                self.navigator.navigate(Screen::ProfileSetup).map_err(|e| e.to_string())?;
                self.auth.setup_profile(&name, gender, age, city.as_deref()).await;
                self.auth_result()?;
                println!("Welcome, {}", name);
            }
            Command::Me => match self.auth_repository.current_user().await {
                Outcome::Success(user) => {
                    println!("{} ({})", user.display_name(), user.phone_number);
                    println!("status: {:?}", user.status);
                    if let Some(rank) = user.queue_rank {
                        println!("queue rank: #{}", rank);
                    }
                }
                Outcome::Error { message, .. } => return Err(message),
            },
            Command::Status => {
                self.navigator.navigate(Screen::Home).map_err(|e| e.to_string())?;
                let home = self.home();
                home.load_queue_status().await;
                let state = home.snapshot();
                if let Some(message) = state.error_message {
                    return Err(message);
                }
                if let Some(status) = state.queue_status {
                    println!("Hi {}, you are {} in the queue", state.user_name, status.rank_label());
                    println!("{} men and {} women waiting", status.males_waiting, status.females_waiting);
                    if let Some(wait) = status.estimated_wait_time {
                        println!("estimated wait: {}", wait);
                    }
                }
            }
            Command::Matches => {
                self.navigator.navigate(Screen::Home).map_err(|e| e.to_string())?;
                let home = self.home();
                home.load_matches().await;
                let matches = home.snapshot().matches;
                if matches.is_empty() {
                    println!("No matches yet");
                }
                for m in matches {
                    println!(
                        "{}  {}  {:?}  unread: {}",
                        m.id,
                        m.partner.name.as_deref().unwrap_or("Unknown"),
                        m.status,
                        m.unread_count
                    );
                }
            }
            Command::Match { match_id } => {
                self.navigator
                    .navigate(Screen::MatchFound { match_id: match_id.clone() })
                    .map_err(|e| e.to_string())?;
                match self.match_repository.get_match(&match_id).await {
                    Outcome::Success(m) => {
                        let partner = &m.partner;
                        println!("Matched with {}", partner.name.as_deref().unwrap_or("Unknown"));
                        if let Some(age) = partner.age {
                            println!("age: {}", age);
                        }
                        if let Some(city) = &partner.city {
                            println!("city: {}", city);
                        }
                        println!("since: {}", m.matched_at.format("%Y-%m-%d %H:%M"));
                    }
                    Outcome::Error { message, .. } => return Err(message),
                }
            }
            Command::Messages { match_id } => {
                let chat = self.open_chat(&match_id)?;
                chat.load().await;
                let state = chat.snapshot();
                if let Some(message) = state.error_message {
                    return Err(message);
                }
                let partner = state
                    .match_info
                    .as_ref()
                    .and_then(|m| m.partner.name.clone())
                    .unwrap_or_else(|| "them".to_string());
                for message in state.messages {
                    let who = if message.is_sent_by_me { "me" } else { partner.as_str() };
                    println!("[{}] {}: {}", message.sent_at.format("%H:%M"), who, message.content);
                }
            }
            Command::Send { match_id, content } => {
                let chat = self.open_chat(&match_id)?;
                chat.send_message(&content).await;
                let state = chat.snapshot();
                if let Some(message) = state.error_message {
                    return Err(message);
                }
                println!("Sent");
            }
            Command::Read { match_id } => {
                let chat = self.open_chat(&match_id)?;
                chat.mark_as_read().await;
            }
            Command::Logout => {
                self.auth.logout().await;
                self.auth_result()?;
                println!("Logged out");
            }
            Command::DeleteAccount => {
                self.auth.delete_account().await;
                self.auth_result()?;
                println!("Account removed from this device");
            }
            Command::State => {}
        }

        self.navigator.on_state_changed(self.machine.current());
        println!(
            "session: {}  screen: {}",
            self.machine.current().name(),
            self.navigator.current().route()
        );
        Ok(())
    }

    fn open_chat(&mut self, match_id: &str) -> Result<ChatHolder, String> {
        self.navigator
            .navigate(Screen::Chat { match_id: match_id.to_string() })
            .map_err(|e| e.to_string())?;
        Ok(self.chat(match_id))
    }
}

fn init_tracing(logging: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.pretty().init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&settings.logging);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    let mut app = match AppState::build(&settings).await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match app.run(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("Command failed: {}", message);
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}
