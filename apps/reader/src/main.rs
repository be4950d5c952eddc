use std::{
    io::{self, Write},
    sync::Arc,
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    display::format_phone, ActionOutcome, ApiClient, ArticleRegistry, CommentSort, CommentStore,
    CommentViewModel, EngagementClient, EngagementViewModel, InMemorySession, ProfileViewModel,
    Session, SessionEvent, VerificationViewModel,
};
use shared::domain::{Article, Comment, CommentId, SavedList};
use tracing_subscriber::EnvFilter;

mod config;

use config::{load_settings, prepare_api_config};

#[derive(Parser, Debug)]
#[command(name = "reader", about = "Article engagement and comments from the terminal")]
struct Cli {
    /// Overrides the configured bearer token.
    #[arg(long, global = true)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct ArticleArgs {
    #[arg(long)]
    link: String,
    #[arg(long)]
    title: Option<String>,
}

impl ArticleArgs {
    fn article(&self) -> Article {
        Article {
            title: self.title.clone(),
            ..Article::from_link(self.link.clone())
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a view and print engagement state.
    View(ArticleArgs),
    Like(ArticleArgs),
    Bookmark(ArticleArgs),
    Comments {
        #[command(flatten)]
        article: ArticleArgs,
        #[arg(long, default_value = "newest")]
        sort: CommentSort,
        #[command(subcommand)]
        action: CommentAction,
    },
    /// List bookmarks, likes or history.
    Saved { list: String },
    Verify {
        #[command(subcommand)]
        action: VerifyAction,
    },
    /// Format a phone number for display.
    Phone { number: String },
}

#[derive(Subcommand, Debug)]
enum CommentAction {
    List,
    Add { text: String },
    Edit { comment_id: String, text: String },
    Delete { comment_id: String },
    Upvote { comment_id: String },
}

#[derive(Subcommand, Debug)]
enum VerifyAction {
    Send,
    Confirm { code: String },
}

struct App {
    api: Arc<ApiClient>,
    engagement: Arc<EngagementClient>,
    registry: Arc<ArticleRegistry>,
    comments: Arc<CommentStore>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let settings = load_settings();
    let api_config = prepare_api_config(&settings)?;
    tracing::debug!(base_url = %api_config.base_url, "reader configured");
    let token = cli.token.clone().or(settings.api_token.clone());

    let session = Arc::new(match token {
        Some(token) => InMemorySession::signed_in(Session::new(token)),
        None => InMemorySession::signed_out(),
    });
    let api = ApiClient::new(api_config, session).context("failed to build http client")?;
    let engagement = Arc::new(EngagementClient::new(api.clone()));
    let app = App {
        registry: ArticleRegistry::new(engagement.clone()),
        comments: Arc::new(CommentStore::new(api.clone())),
        engagement,
        api,
    };

    let mut session_events = app.api.subscribe();
    let result = run(&app, cli.command).await;
    if let Ok(SessionEvent::Expired { path }) = session_events.try_recv() {
        eprintln!("Session expired ({path}); sign in again and retry.");
    }
    result
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::View(args) => {
            let vm = app.engagement_view(&args);
            match vm.open().await {
                Some(article_id) => println!("article_id={article_id}"),
                None => println!("view not registered"),
            }
            print_engagement(&vm).await;
        }
        Command::Like(args) => {
            let vm = app.engagement_view(&args);
            report(vm.toggle_like().await);
            print_engagement(&vm).await;
        }
        Command::Bookmark(args) => {
            let vm = app.engagement_view(&args);
            report(vm.toggle_bookmark().await);
            print_engagement(&vm).await;
        }
        Command::Comments {
            article,
            sort,
            action,
        } => run_comments(app, &article, sort, action).await?,
        Command::Saved { list } => {
            let list = parse_saved_list(&list)?;
            let vm = ProfileViewModel::new(app.engagement.clone());
            if let Some(user) = vm.user() {
                println!("{} <{}>", user.display_name, user.email);
            }
            report(vm.select_tab(list).await);
            for article in vm.articles(list).await.unwrap_or_default() {
                println!(
                    "  {} ({})",
                    article.title.as_deref().unwrap_or("untitled"),
                    article.link
                );
            }
        }
        Command::Verify { action } => {
            let vm = VerificationViewModel::new(app.api.clone());
            let outcome = match action {
                VerifyAction::Send => vm.send_code().await,
                VerifyAction::Confirm { code } => vm.verify(&code).await,
            };
            report(outcome);
            println!("verification: {:?}", vm.phase().await);
        }
        Command::Phone { number } => println!("{}", format_phone(&number)),
    }
    Ok(())
}

async fn run_comments(
    app: &App,
    article: &ArticleArgs,
    sort: CommentSort,
    action: CommentAction,
) -> Result<()> {
    let vm = CommentViewModel::new(article.article(), app.comments.clone(), app.registry.clone());
    vm.set_sort(sort).await;
    report(vm.refresh().await);

    match action {
        CommentAction::List => {}
        CommentAction::Add { text } => {
            vm.set_draft(text).await;
            report(vm.submit().await);
        }
        CommentAction::Edit { comment_id, text } => {
            if !vm.begin_edit(&CommentId(comment_id.clone())).await {
                bail!("no comment with id {comment_id}");
            }
            vm.set_edit_draft(text).await;
            report(vm.save_edit().await);
        }
        CommentAction::Delete { comment_id } => {
            report(vm.delete(&CommentId(comment_id), &confirm_on_stdin).await);
        }
        CommentAction::Upvote { comment_id } => {
            report(vm.upvote(&CommentId(comment_id)).await);
        }
    }

    for comment in vm.comments().await {
        println!(
            "[{}] {} (+{}) {}: {}",
            comment.id,
            comment.created_at.format("%Y-%m-%d %H:%M"),
            comment.upvote_count,
            comment.author_display_name,
            comment.body_text
        );
    }
    Ok(())
}

impl App {
    fn engagement_view(&self, args: &ArticleArgs) -> EngagementViewModel {
        EngagementViewModel::new(
            args.article(),
            self.engagement.clone(),
            self.registry.clone(),
        )
    }
}

async fn print_engagement(vm: &EngagementViewModel) {
    let state = vm.state().await;
    println!(
        "bookmarked={} liked={} likes={}",
        state.is_bookmarked, state.is_liked, state.like_count
    );
}

fn report(outcome: ActionOutcome) {
    match outcome {
        ActionOutcome::Completed => {}
        ActionOutcome::Cancelled => println!("cancelled"),
        ActionOutcome::Invalid(reason) => println!("not sent: {reason}"),
        ActionOutcome::Unauthenticated => println!("sign in to use this feature"),
        ActionOutcome::Unavailable => println!("this article is unavailable right now"),
        ActionOutcome::Failed => println!("request failed; see log for details"),
    }
}

fn confirm_on_stdin(comment: &Comment) -> bool {
    print!("Delete comment \"{}\"? [y/N] ", comment.body_text);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn parse_saved_list(raw: &str) -> Result<SavedList> {
    SavedList::ALL
        .into_iter()
        .find(|list| list.path_segment().eq_ignore_ascii_case(raw.trim()))
        .with_context(|| format!("unknown list '{raw}' (expected bookmarks, likes or history)"))
}
